//! Example payloads for documentation, `mailroom schema` and tests.

use serde_json::{json, Value as JsonValue};

/// Batch request with one email carrying an invoice and one without
/// attachments.
pub fn example_request() -> JsonValue {
    json!({
        "extraction_timestamp": "2025-01-15T12:00:00.000000",
        "total_emails": 2,
        "emails": [
            {
                "id": "email_001",
                "subject": "Invoice INV-2025-001",
                "sender_email_id": "billing@acme.example",
                "body": "Please find the January invoice attached.",
                "has_attachments": true,
                "updated_at": "2025-01-15T12:00:00+00:00",
                "files": [{
                    "id": "file_001",
                    "file_name": "invoice_2025_001.pdf",
                    "cloud_storage_url":
                        "gs://mailroom_incoming_emails/attachments/email_001/file_001_invoice_2025_001.pdf"
                }]
            },
            {
                "id": "email_002",
                "subject": "Project update",
                "sender_email_id": "pm@acme.example",
                "body": "Everything is on schedule.",
                "has_attachments": false,
                "files": []
            }
        ]
    })
}

/// Successful response for [`example_request`] including one calendar event.
pub fn example_response() -> JsonValue {
    json!({
        "status": "success",
        "results": {
            "email_001": {
                "Summary": "Invoice from ACME for consulting services, due 2025-01-30.",
                "ActionItems": ["Pay invoice by 2025-01-30", "Check the deliverables list"],
                "Urgency": "High",
                "files": {
                    "file_001": {
                        "Type": "Invoice",
                        "sender": "ACME GmbH",
                        "received_date": "2025-01-15",
                        "Summary": "Consulting invoice for December 2024",
                        "Details": "Consulting services for December 2024, total 1,200.00 EUR.",
                        "tags": ["Invoice", "Consulting", "Payment Due"],
                        "Urgency": "High",
                        "Status": "Unpaid",
                        "ActionRequired": "Pay by due date",
                        "Amount": "1,200.00 EUR",
                        "PaymentDetails": {
                            "due_date": "2025-01-30",
                            "method": "Bank transfer",
                            "reference": "INV-2025-001",
                            "recipient": "ACME GmbH"
                        }
                    }
                }
            },
            "email_002": {
                "Summary": "Project is on schedule.",
                "ActionItems": [],
                "Urgency": "Low",
                "files": {}
            },
            "calendar_add_details": [{
                "date": "2025-01-30",
                "time": "09:00",
                "action": "Pay ACME invoice INV-2025-001",
                "source_mail_id": "email_001",
                "source_file_id": "file_001",
                "execution_details": {
                    "amount": "1,200.00 EUR",
                    "reference": "INV-2025-001",
                    "recipient": "ACME GmbH"
                }
            }]
        }
    })
}

/// Successful response for an already paid document. No calendar events.
pub fn paid_document_response() -> JsonValue {
    json!({
        "status": "success",
        "results": {
            "email_003": {
                "Summary": "Payment confirmation for INV-2025-001.",
                "ActionItems": [],
                "Urgency": "Low",
                "files": {
                    "file_003": {
                        "Type": "Payment Confirmation",
                        "sender": "Example Bank",
                        "received_date": "2025-01-20",
                        "Summary": "SEPA transfer of 1,200.00 EUR completed",
                        "Details": "Transfer for INV-2025-001 executed on 2025-01-20.",
                        "tags": ["Payment", "Confirmation"],
                        "Urgency": "Low",
                        "Status": "Paid",
                        "Amount": "1,200.00 EUR",
                        "PaymentDetails": {
                            "method": "SEPA transfer",
                            "reference": "INV-2025-001"
                        }
                    }
                }
            },
            "calendar_add_details": []
        }
    })
}

/// Batch-level failure.
pub fn error_response() -> JsonValue {
    json!({
        "status": "error",
        "error_message": "Failed to read attachment gs://mailroom_incoming_emails/attachments/email_001/file_001_invoice_2025_001.pdf",
        "results": {}
    })
}
