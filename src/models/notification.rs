//! Inbound object-created notifications and the acknowledgement sent back.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Message returned alongside every successfully parsed payload.
pub const SUCCESS_MESSAGE: &str = "JSON data processed successfully.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("notification payload is not a JSON object")]
    NotAnObject,
    #[error("notification is missing `{0}`")]
    MissingField(&'static str),
    #[error("notification field `{field}` is invalid: {value}")]
    InvalidField { field: &'static str, value: String },
}

/// An object-created event in a source bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    /// Source bucket name.
    pub bucket: String,

    /// Full object name, slash-delimited.
    pub object_name: String,

    /// Object size in bytes, as declared by the event.
    pub size: u64,
}

impl NotificationEvent {
    /// Extract the event from a parsed payload.
    ///
    /// Eventarc wraps the storage object resource in a `data` field; a payload
    /// without one is treated as the bare object resource. `size` arrives as a
    /// decimal string from GCS but plain integers are accepted too.
    pub fn from_received(received: &Value) -> Result<Self, EventError> {
        let data = match received.get("data") {
            Some(inner @ Value::Object(_)) => inner,
            _ => received,
        };
        let fields = data.as_object().ok_or(EventError::NotAnObject)?;

        Ok(Self {
            bucket: required_str(fields.get("bucket"), "bucket")?,
            object_name: required_str(fields.get("name"), "name")?,
            size: parse_size(fields.get("size"))?,
        })
    }
}

fn required_str(value: Option<&Value>, field: &'static str) -> Result<String, EventError> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        None | Some(Value::Null) | Some(Value::String(_)) => Err(EventError::MissingField(field)),
        Some(other) => Err(EventError::InvalidField {
            field,
            value: other.to_string(),
        }),
    }
}

fn parse_size(value: Option<&Value>) -> Result<u64, EventError> {
    let invalid = |value: String| EventError::InvalidField {
        field: "size",
        value,
    };
    match value {
        None | Some(Value::Null) => Err(EventError::MissingField("size")),
        Some(Value::Number(n)) => n.as_u64().ok_or_else(|| invalid(n.to_string())),
        Some(Value::String(s)) => s.trim().parse::<u64>().map_err(|_| invalid(s.clone())),
        Some(other) => Err(invalid(other.to_string())),
    }
}

/// Body of the `200` response, sent once the payload parsed as JSON.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Acknowledgement {
    pub status: &'static str,
    pub received_data: Value,
    pub message: String,
}

impl Acknowledgement {
    pub fn success(received_data: Value) -> Self {
        Self {
            status: "success",
            received_data,
            message: SUCCESS_MESSAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_fields_from_nested_data() {
        let payload = json!({
            "specversion": "1.0",
            "data": {"bucket": "b1", "name": "caseA/report.pdf", "size": "1024"}
        });
        let event = NotificationEvent::from_received(&payload).unwrap();
        assert_eq!(
            event,
            NotificationEvent {
                bucket: "b1".into(),
                object_name: "caseA/report.pdf".into(),
                size: 1024,
            }
        );
    }

    #[test]
    fn reads_fields_from_bare_object_resource() {
        let payload = json!({"bucket": "b1", "name": "report.pdf", "size": 7});
        let event = NotificationEvent::from_received(&payload).unwrap();
        assert_eq!(event.object_name, "report.pdf");
        assert_eq!(event.size, 7);
    }

    #[test]
    fn missing_bucket_or_name_is_rejected() {
        let no_bucket = json!({"data": {"name": "a.txt", "size": "1"}});
        assert_eq!(
            NotificationEvent::from_received(&no_bucket),
            Err(EventError::MissingField("bucket"))
        );

        let empty_name = json!({"bucket": "b1", "name": "", "size": "1"});
        assert_eq!(
            NotificationEvent::from_received(&empty_name),
            Err(EventError::MissingField("name"))
        );
    }

    #[test]
    fn size_must_be_a_non_negative_integer() {
        let missing = json!({"bucket": "b1", "name": "a.txt"});
        assert_eq!(
            NotificationEvent::from_received(&missing),
            Err(EventError::MissingField("size"))
        );

        let garbage = json!({"bucket": "b1", "name": "a.txt", "size": "12kb"});
        assert!(matches!(
            NotificationEvent::from_received(&garbage),
            Err(EventError::InvalidField { field: "size", .. })
        ));

        let negative = json!({"bucket": "b1", "name": "a.txt", "size": -3});
        assert!(NotificationEvent::from_received(&negative).is_err());
    }

    #[test]
    fn non_object_payload_is_rejected() {
        assert_eq!(
            NotificationEvent::from_received(&json!([1, 2, 3])),
            Err(EventError::NotAnObject)
        );
    }

    #[test]
    fn acknowledgement_serializes_envelope() {
        let ack = Acknowledgement::success(json!({"a": 1}));
        assert_eq!(
            serde_json::to_value(&ack).unwrap(),
            json!({
                "status": "success",
                "received_data": {"a": 1},
                "message": SUCCESS_MESSAGE,
            })
        );
    }
}
