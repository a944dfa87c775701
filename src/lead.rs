use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Structured data captured by the remote agent's `submit_lead` call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadRecord {
    pub fields: BTreeMap<String, String>,
    pub captured_at: DateTime<Utc>,
}

impl LeadRecord {
    /// Build from tool-call arguments; non-string values keep their JSON text
    pub fn from_args(args: &serde_json::Value) -> Self {
        let fields = args
            .as_object()
            .map(|map| {
                map.iter()
                    .map(|(key, value)| {
                        let text = match value {
                            serde_json::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (key.clone(), text)
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            fields,
            captured_at: Utc::now(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

/// Holds the most recent lead; each new capture replaces the previous one
#[derive(Clone, Default)]
pub struct LeadStore {
    latest: Arc<RwLock<Option<LeadRecord>>>,
}

impl LeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, lead: LeadRecord) {
        info!("Lead captured with fields: {:?}", lead.fields.keys().collect::<Vec<_>>());
        *self.latest.write().await = Some(lead);
    }

    pub async fn latest(&self) -> Option<LeadRecord> {
        self.latest.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_args_stringifies_values() {
        let lead = LeadRecord::from_args(&json!({
            "name": "Dana",
            "phone": 5551234,
            "summary": "Wants a quote"
        }));
        assert_eq!(lead.get("name"), Some("Dana"));
        assert_eq!(lead.get("phone"), Some("5551234"));
        assert_eq!(lead.get("summary"), Some("Wants a quote"));
    }

    #[test]
    fn test_from_non_object_args_is_empty() {
        assert!(LeadRecord::from_args(&json!(null)).fields.is_empty());
    }

    #[tokio::test]
    async fn test_new_lead_overwrites_previous() {
        let store = LeadStore::new();
        assert!(store.latest().await.is_none());

        store.record(LeadRecord::from_args(&json!({ "name": "First" }))).await;
        store.record(LeadRecord::from_args(&json!({ "name": "Second" }))).await;

        let latest = store.latest().await.unwrap();
        assert_eq!(latest.get("name"), Some("Second"));
    }
}
