//! Required-field validation for batch requests, extraction results and
//! calendar events.
//!
//! Every validator takes raw JSON and returns the violations it found, in
//! field order. An empty list means the value is valid. Validators never
//! panic and never return `Err`: malformed input is just another violation.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value as JsonValue};

use crate::defaults::{
    CALENDAR_RESULTS_KEY, RESPONSE_STATUS_ERROR, RESPONSE_STATUS_SUCCESS, STORAGE_URI_SCHEME,
};
use crate::error::Error;
use crate::extraction::{PaymentStatus, Urgency};

/// Top-level fields of a batch request.
pub const REQUEST_FIELDS: [&str; 3] = ["extraction_timestamp", "total_emails", "emails"];

/// Fields of an email inside a batch request.
pub const EMAIL_ENTRY_FIELDS: [&str; 6] = [
    "id",
    "subject",
    "sender_email_id",
    "body",
    "has_attachments",
    "files",
];

/// Fields of an attachment reference inside a batch request.
pub const FILE_REF_FIELDS: [&str; 3] = ["id", "file_name", "cloud_storage_url"];

/// Required fields of a per-email extraction result.
pub const EMAIL_RESULT_FIELDS: [&str; 3] = ["Summary", "ActionItems", "Urgency"];

/// Required fields of a per-attachment extraction result.
pub const FILE_RESULT_FIELDS: [&str; 7] = [
    "Type",
    "sender",
    "received_date",
    "Summary",
    "Details",
    "tags",
    "Urgency",
];

/// Required, non-empty fields of a calendar event.
pub const CALENDAR_EVENT_FIELDS: [&str; 4] = ["date", "time", "action", "source_mail_id"];

/// The kinds of document the validator knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Request,
    Response,
    EmailResult,
    FileResult,
    CalendarEvent,
}

impl Shape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Shape::Request => "request",
            Shape::Response => "response",
            Shape::EmailResult => "result",
            Shape::FileResult => "file",
            Shape::CalendarEvent => "event",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Shape {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "request" => Ok(Shape::Request),
            "response" => Ok(Shape::Response),
            "result" | "email" => Ok(Shape::EmailResult),
            "file" => Ok(Shape::FileResult),
            "event" | "calendar" => Ok(Shape::CalendarEvent),
            other => Err(Error::InvalidInput(format!("unknown shape: {other}"))),
        }
    }
}

/// Validate `value` against the named shape.
pub fn validate(shape: Shape, value: &JsonValue) -> Vec<String> {
    match shape {
        Shape::Request => validate_request(value),
        Shape::Response => validate_response(value),
        Shape::EmailResult => validate_email_result(value),
        Shape::FileResult => validate_file_result(value),
        Shape::CalendarEvent => validate_calendar_event(value),
    }
}

/// JSON type name used in violation messages.
pub fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Whether a value counts as empty: null, `false`, `0`, `""`, `[]` or `{}`.
pub fn is_blank(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::Bool(b) => !b,
        JsonValue::Number(n) => n.as_f64() == Some(0.0),
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Array(a) => a.is_empty(),
        JsonValue::Object(o) => o.is_empty(),
    }
}

fn as_object<'a>(
    value: &'a JsonValue,
    what: &str,
    violations: &mut Vec<String>,
) -> Option<&'a Map<String, JsonValue>> {
    match value.as_object() {
        Some(map) => Some(map),
        None => {
            violations.push(format!(
                "{what} must be an object, found {}",
                type_name(value)
            ));
            None
        }
    }
}

fn missing_fields(map: &Map<String, JsonValue>, fields: &[&str], violations: &mut Vec<String>) {
    for field in fields {
        if !map.contains_key(*field) {
            violations.push(format!("Missing required field: {field}"));
        }
    }
}

fn check_urgency(map: &Map<String, JsonValue>, violations: &mut Vec<String>) {
    if let Some(value) = map.get("Urgency") {
        let valid = value.as_str().and_then(Urgency::parse).is_some();
        if !valid {
            violations.push(format!(
                "Invalid Urgency value: {value}, must be one of {}",
                Urgency::ALL.map(|u| u.as_str()).join(", ")
            ));
        }
    }
}

// =============================================================================
// BATCH REQUEST
// =============================================================================

/// Validate a complete batch request.
pub fn validate_request(value: &JsonValue) -> Vec<String> {
    let mut violations = Vec::new();
    let Some(map) = as_object(value, "request", &mut violations) else {
        return violations;
    };
    missing_fields(map, &REQUEST_FIELDS, &mut violations);

    match map.get("emails") {
        Some(JsonValue::Array(emails)) => {
            for (i, email) in emails.iter().enumerate() {
                for v in validate_email_entry(email) {
                    violations.push(format!("Email {i}: {v}"));
                }
            }
        }
        Some(other) => violations.push(format!(
            "emails must be an array, found {}",
            type_name(other)
        )),
        None => {}
    }
    violations
}

/// Validate one email entry of a batch request.
pub fn validate_email_entry(value: &JsonValue) -> Vec<String> {
    let mut violations = Vec::new();
    let Some(map) = as_object(value, "email", &mut violations) else {
        return violations;
    };
    missing_fields(map, &EMAIL_ENTRY_FIELDS, &mut violations);

    match map.get("files") {
        Some(JsonValue::Array(files)) => {
            for (i, file) in files.iter().enumerate() {
                for v in validate_file_ref(file) {
                    violations.push(format!("File {i}: {v}"));
                }
            }
        }
        Some(other) => violations.push(format!(
            "files must be an array, found {}",
            type_name(other)
        )),
        None => {}
    }
    violations
}

/// Validate one attachment reference of a batch request.
pub fn validate_file_ref(value: &JsonValue) -> Vec<String> {
    let mut violations = Vec::new();
    let Some(map) = as_object(value, "file", &mut violations) else {
        return violations;
    };
    missing_fields(map, &FILE_REF_FIELDS, &mut violations);

    if let Some(url) = map.get("cloud_storage_url") {
        let valid = url
            .as_str()
            .is_some_and(|u| u.starts_with(STORAGE_URI_SCHEME));
        if !valid {
            violations.push(format!(
                "Invalid cloud_storage_url: {url}, must start with {STORAGE_URI_SCHEME}"
            ));
        }
    }
    violations
}

// =============================================================================
// EXTRACTION RESULTS
// =============================================================================

/// Validate a per-email extraction result after normalization.
pub fn validate_email_result(value: &JsonValue) -> Vec<String> {
    let mut violations = Vec::new();
    let Some(map) = as_object(value, "result", &mut violations) else {
        return violations;
    };
    missing_fields(map, &EMAIL_RESULT_FIELDS, &mut violations);

    if let Some(items) = map.get("ActionItems") {
        if !items.is_array() {
            violations.push(format!(
                "ActionItems must be an array, found {}",
                type_name(items)
            ));
        }
    }
    check_urgency(map, &mut violations);

    match map.get("files") {
        Some(files) if is_blank(files) => {}
        Some(JsonValue::Object(files)) => {
            for (file_id, file) in files {
                for v in validate_file_result(file) {
                    violations.push(format!("File {file_id}: {v}"));
                }
            }
        }
        Some(other) => violations.push(format!(
            "files must be an object, found {}",
            type_name(other)
        )),
        None => {}
    }
    violations
}

/// Validate a per-attachment extraction result.
pub fn validate_file_result(value: &JsonValue) -> Vec<String> {
    let mut violations = Vec::new();
    let Some(map) = as_object(value, "file result", &mut violations) else {
        return violations;
    };
    missing_fields(map, &FILE_RESULT_FIELDS, &mut violations);

    if let Some(tags) = map.get("tags") {
        if !tags.is_array() {
            violations.push(format!("tags must be an array, found {}", type_name(tags)));
        }
    }
    check_urgency(map, &mut violations);

    if let Some(status) = map.get("Status") {
        let valid = status.as_str().and_then(PaymentStatus::parse).is_some();
        if !valid {
            violations.push(format!(
                "Invalid Status value: {status}, must be one of {}",
                PaymentStatus::ALL.map(|p| p.as_str()).join(", ")
            ));
        }
    }
    violations
}

// =============================================================================
// CALENDAR EVENTS
// =============================================================================

/// Validate one calendar event.
///
/// Required fields must be present and non-blank. `source_file_id` must be
/// present but may be null.
pub fn validate_calendar_event(value: &JsonValue) -> Vec<String> {
    let mut violations = Vec::new();
    let Some(map) = as_object(value, "event", &mut violations) else {
        return violations;
    };
    for field in CALENDAR_EVENT_FIELDS {
        match map.get(field) {
            None => violations.push(format!("Missing required field: {field}")),
            Some(v) if is_blank(v) => violations.push(format!("Empty required field: {field}")),
            Some(_) => {}
        }
    }
    if !map.contains_key("source_file_id") {
        violations.push("Missing field: source_file_id (may be null)".to_string());
    }
    violations
}

// =============================================================================
// FULL RESPONSE
// =============================================================================

/// Validate a complete service response without normalizing its results.
///
/// Results must already be in canonical form; this is the check used for
/// hand-written fixtures and by `mailroom validate --kind response`.
pub fn validate_response(value: &JsonValue) -> Vec<String> {
    let mut violations = Vec::new();
    let Some(map) = as_object(value, "response", &mut violations) else {
        return violations;
    };

    match map.get("status").and_then(JsonValue::as_str) {
        Some(RESPONSE_STATUS_SUCCESS) | Some(RESPONSE_STATUS_ERROR) => {}
        _ => violations.push(format!(
            "status must be {RESPONSE_STATUS_SUCCESS:?} or {RESPONSE_STATUS_ERROR:?}"
        )),
    }

    let results = match map.get("results") {
        Some(JsonValue::Object(results)) => results,
        Some(other) => {
            violations.push(format!(
                "results must be an object, found {}",
                type_name(other)
            ));
            return violations;
        }
        None => {
            violations.push("Missing required field: results".to_string());
            return violations;
        }
    };

    for (key, result) in results {
        if key == CALENDAR_RESULTS_KEY {
            match result {
                JsonValue::Array(events) => {
                    for (i, event) in events.iter().enumerate() {
                        for v in validate_calendar_event(event) {
                            violations.push(format!("Event {i}: {v}"));
                        }
                    }
                }
                other => violations.push(format!(
                    "{CALENDAR_RESULTS_KEY} must be an array, found {}",
                    type_name(other)
                )),
            }
            continue;
        }
        for v in validate_email_result(result) {
            violations.push(format!("Result {key}: {v}"));
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_file_result() -> JsonValue {
        json!({
            "Type": "Invoice",
            "sender": "Company XYZ",
            "received_date": "2025-01-15",
            "Summary": "Invoice",
            "Details": "Due January 30",
            "tags": ["Invoice"],
            "Urgency": "High",
            "Status": "Unpaid"
        })
    }

    fn valid_request() -> JsonValue {
        json!({
            "extraction_timestamp": "2025-01-15T10:00:00.000000",
            "total_emails": 1,
            "emails": [{
                "id": "email_001",
                "subject": "Invoice",
                "sender_email_id": "billing@example.com",
                "body": "Please pay",
                "has_attachments": true,
                "files": [{
                    "id": "file_001",
                    "file_name": "invoice.pdf",
                    "cloud_storage_url": "gs://bucket/attachments/email_001/file_001_invoice.pdf"
                }]
            }]
        })
    }

    #[test]
    fn test_valid_request() {
        assert!(validate_request(&valid_request()).is_empty());
    }

    #[test]
    fn test_request_missing_top_level_field() {
        let mut request = valid_request();
        request.as_object_mut().unwrap().remove("total_emails");
        assert_eq!(
            validate_request(&request),
            vec!["Missing required field: total_emails"]
        );
    }

    #[test]
    fn test_request_rejects_non_gs_location() {
        let mut request = valid_request();
        request["emails"][0]["files"][0]["cloud_storage_url"] = json!("https://example.com/x");
        let violations = validate_request(&request);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].starts_with("Email 0: File 0: Invalid cloud_storage_url"));
    }

    #[test]
    fn test_request_emails_must_be_array() {
        let request = json!({
            "extraction_timestamp": "t",
            "total_emails": 0,
            "emails": {}
        });
        assert_eq!(
            validate_request(&request),
            vec!["emails must be an array, found object"]
        );
    }

    #[test]
    fn test_non_object_inputs_are_violations() {
        for shape in [
            Shape::Request,
            Shape::Response,
            Shape::EmailResult,
            Shape::FileResult,
            Shape::CalendarEvent,
        ] {
            let violations = validate(shape, &json!("not an object"));
            assert_eq!(violations.len(), 1, "shape {shape}");
            assert!(violations[0].contains("found string"));
        }
    }

    #[test]
    fn test_valid_email_result_without_files() {
        let result = json!({"Summary": "s", "ActionItems": [], "Urgency": "Low"});
        assert!(validate_email_result(&result).is_empty());
    }

    #[test]
    fn test_email_result_blank_files_are_accepted() {
        for files in [json!(null), json!({}), json!([])] {
            let result = json!({
                "Summary": "s", "ActionItems": [], "Urgency": "Low", "files": files
            });
            assert!(validate_email_result(&result).is_empty());
        }
    }

    #[test]
    fn test_email_result_missing_fields_in_order() {
        let violations = validate_email_result(&json!({}));
        assert_eq!(
            violations,
            vec![
                "Missing required field: Summary",
                "Missing required field: ActionItems",
                "Missing required field: Urgency",
            ]
        );
    }

    #[test]
    fn test_email_result_invalid_urgency() {
        let result = json!({"Summary": "s", "ActionItems": [], "Urgency": "Urgent"});
        let violations = validate_email_result(&result);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("Invalid Urgency value"));
    }

    #[test]
    fn test_email_result_action_items_must_be_array() {
        let result = json!({"Summary": "s", "ActionItems": "pay", "Urgency": "Low"});
        assert_eq!(
            validate_email_result(&result),
            vec!["ActionItems must be an array, found string"]
        );
    }

    #[test]
    fn test_email_result_validates_nested_files() {
        let mut bad_file = valid_file_result();
        bad_file["Status"] = json!("Overdue");
        bad_file.as_object_mut().unwrap().remove("tags");

        let result = json!({
            "Summary": "s",
            "ActionItems": [],
            "Urgency": "Low",
            "files": {"file_001": valid_file_result(), "file_002": bad_file}
        });
        let violations = validate_email_result(&result);
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().all(|v| v.starts_with("File file_002: ")));
    }

    #[test]
    fn test_email_result_files_must_be_mapping() {
        let result = json!({
            "Summary": "s", "ActionItems": [], "Urgency": "Low", "files": ["file_001"]
        });
        assert_eq!(
            validate_email_result(&result),
            vec!["files must be an object, found array"]
        );
    }

    #[test]
    fn test_file_result_status_optional() {
        let mut file = valid_file_result();
        file.as_object_mut().unwrap().remove("Status");
        assert!(validate_file_result(&file).is_empty());
    }

    #[test]
    fn test_calendar_event_valid_with_null_file_id() {
        let event = json!({
            "date": "2025-01-30", "time": "09:00", "action": "Pay",
            "source_mail_id": "email_001", "source_file_id": null
        });
        assert!(validate_calendar_event(&event).is_empty());
    }

    #[test]
    fn test_calendar_event_empty_field_is_violation() {
        let event = json!({
            "date": "2025-01-30", "time": "", "action": "Pay",
            "source_mail_id": "email_001", "source_file_id": null
        });
        assert_eq!(
            validate_calendar_event(&event),
            vec!["Empty required field: time"]
        );
    }

    #[test]
    fn test_calendar_event_requires_source_file_id_key() {
        let event = json!({
            "date": "2025-01-30", "time": "09:00", "action": "Pay",
            "source_mail_id": "email_001"
        });
        let violations = validate_calendar_event(&event);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("source_file_id"));
    }

    #[test]
    fn test_response_status_and_results() {
        let response = json!({"status": "ok", "results": []});
        let violations = validate_response(&response);
        assert_eq!(violations.len(), 2);
        assert!(violations[1].contains("results must be an object"));
    }

    #[test]
    fn test_response_validates_results_and_events() {
        let response = json!({
            "status": "success",
            "results": {
                "email_001": {"Summary": "s", "ActionItems": [], "Urgency": "Low"},
                "email_002": {"Summary": "s"},
                "calendar_add_details": [{
                    "date": "", "time": "09:00", "action": "Pay",
                    "source_mail_id": "email_001", "source_file_id": null
                }]
            }
        });
        let violations = validate_response(&response);
        assert!(violations.contains(&"Event 0: Empty required field: date".to_string()));
        assert!(violations.contains(&"Result email_002: Missing required field: Urgency".to_string()));
        assert_eq!(violations.len(), 3);
    }

    #[test]
    fn test_shape_from_str() {
        assert_eq!("request".parse::<Shape>().unwrap(), Shape::Request);
        assert_eq!("RESULT".parse::<Shape>().unwrap(), Shape::EmailResult);
        assert_eq!("event".parse::<Shape>().unwrap(), Shape::CalendarEvent);
        assert!("invoice".parse::<Shape>().is_err());
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(&json!(null)));
        assert!(is_blank(&json!("")));
        assert!(is_blank(&json!(false)));
        assert!(is_blank(&json!(0)));
        assert!(!is_blank(&json!("x")));
        assert!(!is_blank(&json!(["x"])));
    }
}
