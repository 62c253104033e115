//! Submitted record type

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Submitted field values keyed by field path, in submission order.
pub type RecordData = Map<String, Value>;

/// One submitted or edited instance of data for a study form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    /// Unknown keys are kept as submitted
    #[serde(default)]
    pub data: RecordData,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Record {
    /// Creates a record with a fresh id, never edited.
    pub fn new(data: RecordData, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            data,
            created_at: now,
            updated_at: None,
        }
    }

    /// Replaces the data wholesale; id and creation time are untouched.
    pub fn replace_data(&mut self, data: RecordData, now: DateTime<Utc>) {
        self.data = data;
        self.updated_at = Some(now);
    }

    /// `updatedAt` when edited, else `createdAt`
    pub fn last_modified(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_new_record_has_no_update_time() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let record = Record::new(Map::new(), now);
        assert_eq!(record.last_modified(), now);

        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("updatedAt").is_none());
        assert!(value.get("createdAt").is_some());
    }

    #[test]
    fn test_replace_data_keeps_identity() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let edited = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let mut record = Record::new(json!({"A": 1}).as_object().cloned().unwrap(), created);
        let id = record.id.clone();

        record.replace_data(json!({"B": 2}).as_object().cloned().unwrap(), edited);

        assert_eq!(record.id, id);
        assert_eq!(record.created_at, created);
        assert_eq!(record.updated_at, Some(edited));
        assert!(record.data.get("A").is_none());
        assert_eq!(record.last_modified(), edited);
    }

    #[test]
    fn test_data_key_order_is_preserved() {
        let record: Record = serde_json::from_str(
            r#"{"id":"r1","data":{"Z":1,"A":2,"M":3},"createdAt":"2024-01-01T00:00:00.000Z"}"#,
        )
        .unwrap();
        let keys: Vec<_> = record.data.keys().cloned().collect();
        assert_eq!(keys, vec!["Z", "A", "M"]);
    }
}
