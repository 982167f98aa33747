//! Typed extraction results returned by the extraction service.
//!
//! Field names follow the service's wire format (`Summary`, `ActionItems`,
//! `Type`, ...). Values only become these types after the schema module has
//! accepted the raw JSON, so deserialization failures here are rare and are
//! treated as validation failures by the caller.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

/// Urgency level of an email or a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    /// All urgency levels in ascending order.
    pub const ALL: [Urgency; 4] = [
        Urgency::Low,
        Urgency::Medium,
        Urgency::High,
        Urgency::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "Low",
            Urgency::Medium => "Medium",
            Urgency::High => "High",
            Urgency::Critical => "Critical",
        }
    }

    /// Parse the wire value. Matching is exact: `"high"` is not an urgency.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.as_str() == s)
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status of a financial document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    Unknown,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 3] = [
        PaymentStatus::Paid,
        PaymentStatus::Unpaid,
        PaymentStatus::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Unpaid => "Unpaid",
            PaymentStatus::Unknown => "Unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment information attached to a financial document.
///
/// A view over the raw `PaymentDetails` object; see
/// [`FileExtraction::payment`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    /// Due date (YYYY-MM-DD).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<JsonValue>,
}

/// Text form of a loosely typed wire value. Strings are returned as-is,
/// anything else as compact JSON.
pub fn value_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Extraction result for one attachment.
///
/// Only the enumerations (`Urgency`, `Status`) and the `tags` list are
/// typed; the schema module checks nothing else about the values, so the
/// remaining fields keep whatever JSON the service sent. Unknown keys are
/// kept in [`FileExtraction::extra`]. On serialization the extension
/// entries are merged last and never replace a known field of the same name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileExtraction {
    /// Document type (Invoice, Contract, ...).
    #[serde(rename = "Type")]
    pub document_type: JsonValue,
    pub sender: JsonValue,
    /// Document date (YYYY-MM-DD).
    pub received_date: JsonValue,
    #[serde(rename = "Summary")]
    pub summary: JsonValue,
    #[serde(rename = "Details")]
    pub details: JsonValue,
    pub tags: Vec<JsonValue>,
    #[serde(rename = "Urgency")]
    pub urgency: Urgency,

    #[serde(rename = "Status", default)]
    pub status: Option<PaymentStatus>,
    #[serde(rename = "ActionRequired", default)]
    pub action_required: Option<JsonValue>,
    #[serde(rename = "Amount", default)]
    pub amount: Option<JsonValue>,
    #[serde(rename = "PaymentDetails", default)]
    pub payment_details: Option<JsonValue>,
    #[serde(rename = "Authority", default)]
    pub authority: Option<JsonValue>,
    #[serde(rename = "Reference", default)]
    pub reference: Option<JsonValue>,
    #[serde(rename = "Location", default)]
    pub location: Option<JsonValue>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl FileExtraction {
    /// Payment details, when the service sent them as an object.
    pub fn payment(&self) -> Option<PaymentDetails> {
        match self.payment_details.as_ref()? {
            details @ JsonValue::Object(_) => PaymentDetails::deserialize(details).ok(),
            _ => None,
        }
    }

    /// Wire representation with extension fields merged in.
    pub fn to_json_map(&self) -> Map<String, JsonValue> {
        let mut map = Map::new();
        map.insert("Type".into(), self.document_type.clone());
        map.insert("sender".into(), self.sender.clone());
        map.insert("received_date".into(), self.received_date.clone());
        map.insert("Summary".into(), self.summary.clone());
        map.insert("Details".into(), self.details.clone());
        map.insert("tags".into(), JsonValue::Array(self.tags.clone()));
        map.insert("Urgency".into(), self.urgency.as_str().into());

        if let Some(status) = self.status {
            map.insert("Status".into(), status.as_str().into());
        }
        insert_opt(&mut map, "ActionRequired", &self.action_required);
        insert_opt(&mut map, "Amount", &self.amount);
        insert_opt(&mut map, "PaymentDetails", &self.payment_details);
        insert_opt(&mut map, "Authority", &self.authority);
        insert_opt(&mut map, "Reference", &self.reference);
        insert_opt(&mut map, "Location", &self.location);

        for (key, value) in &self.extra {
            map.entry(key.clone()).or_insert_with(|| value.clone());
        }
        map
    }
}

fn insert_opt(map: &mut Map<String, JsonValue>, key: &str, value: &Option<JsonValue>) {
    if let Some(v) = value {
        map.insert(key.to_string(), v.clone());
    }
}

impl Serialize for FileExtraction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_map().serialize(serializer)
    }
}

/// Canonical extraction result for one email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailExtraction {
    #[serde(rename = "Summary")]
    pub summary: JsonValue,
    #[serde(rename = "ActionItems")]
    pub action_items: Vec<JsonValue>,
    #[serde(rename = "Urgency")]
    pub urgency: Urgency,
    /// Per-attachment results keyed by attachment id.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_files"
    )]
    pub files: Option<BTreeMap<String, FileExtraction>>,
}

impl EmailExtraction {
    /// Ids of the attachments this result covers.
    pub fn file_ids(&self) -> Vec<&str> {
        self.files
            .as_ref()
            .map(|files| files.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Summary as stored text.
    pub fn summary_text(&self) -> String {
        value_text(&self.summary)
    }
}

/// `files` is optional and the service sends `null`, `{}` or `[]` when an
/// email has no attachments. All of those mean "no file results".
fn deserialize_files<'de, D>(
    deserializer: D,
) -> Result<Option<BTreeMap<String, FileExtraction>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = JsonValue::deserialize(deserializer)?;
    match value {
        JsonValue::Object(map) if map.is_empty() => Ok(None),
        JsonValue::Object(map) => {
            let files = serde_json::from_value(JsonValue::Object(map))
                .map_err(serde::de::Error::custom)?;
            Ok(Some(files))
        }
        other if crate::schema::is_blank(&other) => Ok(None),
        other => Err(serde::de::Error::custom(format!(
            "files must be an object, found {}",
            crate::schema::type_name(&other)
        ))),
    }
}

/// Calendar entry derived from an email or one of its attachments.
///
/// Required values only have to be present and non-blank, so they are kept
/// as raw JSON. Use [`value_text`] to store them as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Event date (YYYY-MM-DD).
    pub date: JsonValue,
    /// Event time (HH:mm).
    pub time: JsonValue,
    /// Human-readable action.
    pub action: JsonValue,
    pub source_mail_id: JsonValue,
    /// Serialized as `null` when the event is not tied to an attachment.
    pub source_file_id: Option<JsonValue>,
    /// Structured data for automation (amount, reference, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_details: Option<JsonValue>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invoice_json() -> JsonValue {
        json!({
            "Type": "Invoice",
            "sender": "Company XYZ",
            "received_date": "2025-01-15",
            "Summary": "Consulting services invoice",
            "Details": "Total amount 1,200.00 due by January 30",
            "tags": ["Invoice", "Payment Due"],
            "Urgency": "High",
            "Status": "Unpaid",
            "Amount": "1,200.00",
            "PaymentDetails": {"due_date": "2025-01-30", "method": "Bank transfer"},
            "VatNumber": "DE123"
        })
    }

    #[test]
    fn test_urgency_parse_is_exact() {
        assert_eq!(Urgency::parse("Critical"), Some(Urgency::Critical));
        assert_eq!(Urgency::parse("critical"), None);
        assert_eq!(Urgency::parse(""), None);
    }

    #[test]
    fn test_payment_status_parse() {
        assert_eq!(PaymentStatus::parse("Paid"), Some(PaymentStatus::Paid));
        assert_eq!(PaymentStatus::parse("Overdue"), None);
    }

    #[test]
    fn test_file_extraction_collects_unknown_fields() {
        let file: FileExtraction = serde_json::from_value(invoice_json()).unwrap();
        assert_eq!(file.document_type, "Invoice");
        assert_eq!(file.status, Some(PaymentStatus::Unpaid));
        assert_eq!(
            file.payment().and_then(|p| p.method),
            Some(json!("Bank transfer"))
        );
        assert_eq!(file.extra.len(), 1);
        assert_eq!(file.extra["VatNumber"], json!("DE123"));
    }

    #[test]
    fn test_file_extraction_serializes_extension_fields() {
        let file: FileExtraction = serde_json::from_value(invoice_json()).unwrap();
        let value = serde_json::to_value(&file).unwrap();
        assert_eq!(value, invoice_json());
    }

    #[test]
    fn test_known_fields_win_over_extension_fields() {
        let mut file: FileExtraction = serde_json::from_value(invoice_json()).unwrap();
        file.extra.insert("Summary".into(), json!("overridden"));
        file.extra.insert("Amount".into(), json!("0.00"));

        let map = file.to_json_map();
        assert_eq!(map["Summary"], json!("Consulting services invoice"));
        assert_eq!(map["Amount"], json!("1,200.00"));
    }

    #[test]
    fn test_extension_field_fills_absent_optional() {
        let mut file: FileExtraction = serde_json::from_value(invoice_json()).unwrap();
        file.authority = None;
        file.extra.insert("Authority".into(), json!("Tax office"));

        let map = file.to_json_map();
        assert_eq!(map["Authority"], json!("Tax office"));
    }

    #[test]
    fn test_optional_fields_omitted_when_absent() {
        let file: FileExtraction = serde_json::from_value(json!({
            "Type": "Letter",
            "sender": "Bank",
            "received_date": "2025-02-01",
            "Summary": "s",
            "Details": "d",
            "tags": [],
            "Urgency": "Low"
        }))
        .unwrap();

        let map = file.to_json_map();
        assert_eq!(map.len(), 7);
        assert!(!map.contains_key("Status"));
        assert!(!map.contains_key("PaymentDetails"));
    }

    #[test]
    fn test_email_extraction_empty_files_variants() {
        for files in [json!(null), json!({}), json!([])] {
            let result: EmailExtraction = serde_json::from_value(json!({
                "Summary": "s",
                "ActionItems": [],
                "Urgency": "Low",
                "files": files
            }))
            .unwrap();
            assert!(result.files.is_none());
            assert!(result.file_ids().is_empty());
        }
    }

    #[test]
    fn test_email_extraction_file_ids() {
        let result: EmailExtraction = serde_json::from_value(json!({
            "Summary": "s",
            "ActionItems": ["Pay"],
            "Urgency": "High",
            "files": {"file_001": invoice_json()}
        }))
        .unwrap();
        assert_eq!(result.file_ids(), vec!["file_001"]);
    }

    #[test]
    fn test_email_extraction_rejects_non_object_files() {
        let result = serde_json::from_value::<EmailExtraction>(json!({
            "Summary": "s",
            "ActionItems": [],
            "Urgency": "Low",
            "files": ["file_001"]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_file_extraction_keeps_non_string_values() {
        let mut raw = invoice_json();
        raw["Amount"] = json!(1200);
        raw["sender"] = JsonValue::Null;
        raw["Details"] = json!({"k": "v"});
        raw["tags"] = json!(["Invoice", 7]);
        raw["PaymentDetails"] = json!("see attachment");
        assert!(crate::schema::validate_file_result(&raw).is_empty());

        let file: FileExtraction = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(file.amount, Some(json!(1200)));
        assert_eq!(file.sender, JsonValue::Null);
        assert!(file.payment().is_none());
        assert_eq!(serde_json::to_value(&file).unwrap(), raw);
    }

    #[test]
    fn test_email_extraction_keeps_non_string_values() {
        let result: EmailExtraction = serde_json::from_value(json!({
            "Summary": {"text": "s"},
            "ActionItems": [1, "Pay"],
            "Urgency": "Low"
        }))
        .unwrap();
        assert_eq!(result.summary_text(), r#"{"text":"s"}"#);
        assert_eq!(result.action_items[0], json!(1));
    }

    #[test]
    fn test_calendar_event_accepts_non_string_ids() {
        let event: CalendarEvent = serde_json::from_value(json!({
            "date": "2025-01-30",
            "time": "09:00",
            "action": "Pay",
            "source_mail_id": 42,
            "source_file_id": 7
        }))
        .unwrap();
        assert_eq!(value_text(&event.source_mail_id), "42");
        assert_eq!(event.source_file_id.as_ref().map(value_text).as_deref(), Some("7"));
        assert_eq!(value_text(&event.date), "2025-01-30");
    }

    #[test]
    fn test_calendar_event_serializes_null_file_id() {
        let event = CalendarEvent {
            date: "2025-01-30".into(),
            time: "09:00".into(),
            action: "Pay invoice".into(),
            source_mail_id: "email_001".into(),
            source_file_id: None,
            execution_details: None,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["source_file_id"], JsonValue::Null);
        assert!(value.get("execution_details").is_none());
    }
}
