mod http;
mod pattern;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

pub use http::HttpObjectClient;
pub use pattern::matches as pattern_matches;

/// Object kinds the pattern query can filter by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    State,
    Channel,
    Device,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::State => "state",
            Self::Channel => "channel",
            Self::Device => "device",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata shared by all foreign objects.
///
/// Only the fields the synthesis pipeline inspects are typed; everything
/// else is preserved verbatim so a read-modify-write cycle does not strip
/// data owned by other tools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectCommon {
    /// Display name, either a plain string or a localized record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,

    /// Value type of a state object (e.g. "boolean")
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,

    /// Declared semantic role of a state object (e.g. "switch.light")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Instance id of the default history provider, set on `system.config`
    #[serde(rename = "defaultHistory", skip_serializing_if = "Option::is_none")]
    pub default_history: Option<String>,

    /// Per-consumer custom settings, keyed by consumer instance id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<Map<String, Value>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A foreign object fetched through the gateway
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForeignObject {
    /// Object type ("state", "channel", "device", "instance", ...)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,

    #[serde(default)]
    pub common: ObjectCommon,

    #[serde(default)]
    pub native: Value,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ForeignObject {
    /// Display name, resolving localized records to their English entry
    pub fn display_name(&self) -> Option<String> {
        match self.common.name.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => map
                .get("en")
                .or_else(|| map.values().next())
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        }
    }
}

/// A state value fetched through the gateway
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForeignState {
    pub val: Value,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ack: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts: Option<i64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ForeignState {
    pub fn as_str(&self) -> Option<&str> {
        self.val.as_str()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("failed to decode gateway response for {id}: {source}")]
    Decode {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Read/write access to the foreign object store.
///
/// This trait allows mocking the object store for testing purposes. Every
/// read is fallible and "absent" is an ordinary result, never an error.
#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// All objects of the given kind whose ids match the glob pattern.
    ///
    /// `*` matches within one dot-separated path segment. Results are
    /// ordered by id.
    async fn get_objects(
        &self,
        pattern: &str,
        kind: ObjectKind,
    ) -> Result<BTreeMap<String, ForeignObject>, GatewayError>;

    async fn get_object(&self, id: &str) -> Result<Option<ForeignObject>, GatewayError>;

    async fn get_state(&self, id: &str) -> Result<Option<ForeignState>, GatewayError>;

    /// Full-object replace
    async fn set_object(&self, id: &str, object: &ForeignObject) -> Result<(), GatewayError>;
}

/// In-memory object store for tests
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockObjectClient {
    objects: std::sync::Mutex<BTreeMap<String, ForeignObject>>,
    states: std::sync::Mutex<BTreeMap<String, ForeignState>>,
    pub writes: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockObjectClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object from its JSON representation
    pub fn add_object(&self, id: &str, object: Value) {
        let object: ForeignObject = serde_json::from_value(object).expect("valid object JSON");
        self.objects.lock().unwrap().insert(id.to_string(), object);
    }

    /// Insert a state with an acknowledged value
    pub fn add_state(&self, id: &str, val: Value) {
        self.states.lock().unwrap().insert(
            id.to_string(),
            ForeignState {
                val,
                ack: Some(true),
                ts: None,
                extra: Map::new(),
            },
        );
    }

    pub fn object(&self, id: &str) -> Option<ForeignObject> {
        self.objects.lock().unwrap().get(id).cloned()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl ObjectClient for MockObjectClient {
    async fn get_objects(
        &self,
        pattern: &str,
        kind: ObjectKind,
    ) -> Result<BTreeMap<String, ForeignObject>, GatewayError> {
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .iter()
            .filter(|(id, object)| {
                object.object_type.as_deref() == Some(kind.as_str()) && pattern_matches(pattern, id)
            })
            .map(|(id, object)| (id.clone(), object.clone()))
            .collect())
    }

    async fn get_object(&self, id: &str) -> Result<Option<ForeignObject>, GatewayError> {
        Ok(self.objects.lock().unwrap().get(id).cloned())
    }

    async fn get_state(&self, id: &str) -> Result<Option<ForeignState>, GatewayError> {
        Ok(self.states.lock().unwrap().get(id).cloned())
    }

    async fn set_object(&self, id: &str, object: &ForeignObject) -> Result<(), GatewayError> {
        self.writes.lock().unwrap().push(id.to_string());
        self.objects
            .lock()
            .unwrap()
            .insert(id.to_string(), object.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_name_plain_and_localized() {
        let object: ForeignObject = serde_json::from_value(json!({
            "type": "state",
            "common": { "name": "Haustür" },
        }))
        .unwrap();
        assert_eq!(object.display_name().as_deref(), Some("Haustür"));

        let object: ForeignObject = serde_json::from_value(json!({
            "type": "state",
            "common": { "name": { "en": "Front door", "de": "Haustür" } },
        }))
        .unwrap();
        assert_eq!(object.display_name().as_deref(), Some("Front door"));

        let object: ForeignObject = serde_json::from_value(json!({
            "type": "state",
            "common": {},
        }))
        .unwrap();
        assert_eq!(object.display_name(), None);
    }

    #[test]
    fn test_object_round_trip_preserves_unknown_fields() {
        let raw = json!({
            "_id": "shelly.0.SHPLG-S#X#1.Relay0",
            "type": "channel",
            "common": { "name": "Relay0", "icon": "plug.png" },
            "native": { "dev": { "mode": "relay" } },
            "acl": { "owner": "system.user.admin" },
        });
        let object: ForeignObject = serde_json::from_value(raw.clone()).unwrap();
        let back = serde_json::to_value(&object).unwrap();
        assert_eq!(back["acl"]["owner"], "system.user.admin");
        assert_eq!(back["common"]["icon"], "plug.png");
        assert_eq!(back["native"]["dev"]["mode"], "relay");
    }

    #[tokio::test]
    async fn test_mock_pattern_query_filters_kind() {
        let mock = MockObjectClient::new();
        mock.add_object(
            "tr-064.0.states.wps",
            json!({"type": "state", "common": {"type": "boolean"}}),
        );
        mock.add_object(
            "tr-064.0.states.reboot",
            json!({"type": "state", "common": {"type": "boolean"}}),
        );
        mock.add_object("tr-064.0.states", json!({"type": "channel", "common": {}}));

        let states = mock
            .get_objects("tr-064.0.states.*", ObjectKind::State)
            .await
            .unwrap();
        assert_eq!(states.len(), 2);
        assert!(states.contains_key("tr-064.0.states.wps"));
    }
}
