//! Record store types

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Metadata-only row returned by the diagnostic probe.
///
/// Column types vary between deployments, so both id and timestamp accept
/// several shapes and serialize back in the shape they arrived in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub user_id: UserId,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub created_at: Option<RecordTimestamp>,
}

/// `user_id` column: text/uuid or integer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Int(i64),
    Text(String),
}

/// `created_at` column: `timestamptz`, `timestamp`, or anything else verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordTimestamp {
    Zoned(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
    Raw(String),
}

/// Row carrying the document payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Base64, possibly behind a `data:` URL prefix
    #[serde(default)]
    pub file_data: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Error)]
pub enum RecordStoreError {
    #[error("Invalid record store configuration: {0}")]
    Config(String),

    #[error("Record store request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Record store returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metadata_with_text_id_and_zoned_timestamp() {
        let rows: Vec<DocumentMetadata> = serde_json::from_value(json!([{
            "user_id": "2b1f0c9e-uuid",
            "filename": "cv.pdf",
            "created_at": "2024-05-01T10:00:00.123456+00:00"
        }]))
        .unwrap();

        assert_eq!(rows[0].user_id, UserId::Text("2b1f0c9e-uuid".to_string()));
        assert!(matches!(rows[0].created_at, Some(RecordTimestamp::Zoned(_))));
        assert_eq!(
            serde_json::to_value(&rows[0]).unwrap()["created_at"],
            "2024-05-01T10:00:00.123456+00:00"
        );
    }

    #[test]
    fn test_metadata_with_integer_id_and_naive_timestamp() {
        let rows: Vec<DocumentMetadata> = serde_json::from_value(json!([{
            "user_id": 42,
            "filename": null,
            "created_at": "2024-05-01T10:00:00.123456"
        }]))
        .unwrap();

        assert_eq!(rows[0].user_id, UserId::Int(42));
        assert!(matches!(rows[0].created_at, Some(RecordTimestamp::Naive(_))));

        let value = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(value["user_id"], 42);
        assert_eq!(value["created_at"], "2024-05-01T10:00:00.123456");
    }

    #[test]
    fn test_metadata_with_unparsed_or_missing_timestamp() {
        let rows: Vec<DocumentMetadata> = serde_json::from_value(json!([
            {"user_id": "a", "created_at": "yesterday"},
            {"user_id": "b"}
        ]))
        .unwrap();

        assert_eq!(
            rows[0].created_at,
            Some(RecordTimestamp::Raw("yesterday".to_string()))
        );
        assert_eq!(rows[1].created_at, None);
        assert_eq!(rows[1].filename, None);
    }
}
