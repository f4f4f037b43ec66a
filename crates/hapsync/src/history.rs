//! History opt-in side channel.
//!
//! Some source states are worth charting (temperatures, battery levels,
//! link quality). Processing such a state opts it into the installation's
//! default history provider by merging a logging record into the state
//! object's per-consumer custom settings and writing the object back only
//! when that actually changed something.

use serde_json::json;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::diff;
use crate::gateway::GatewayError;
use crate::gateway::ObjectClient;

/// Opt-in handle bound to the installation's default history provider.
///
/// When no default provider is configured the handle is inert and every
/// `enable` call is a no-op.
pub struct History {
    provider: Option<String>,
}

impl History {
    /// Read the default history provider from the system configuration
    pub async fn discover<C: ObjectClient>(client: &C) -> Result<Self, GatewayError> {
        let provider = client
            .get_object("system.config")
            .await?
            .and_then(|config| config.common.default_history)
            .filter(|id| !id.is_empty());

        match &provider {
            Some(id) => debug!("history provider: {}", id),
            None => debug!("no default history provider configured"),
        }

        Ok(Self { provider })
    }

    #[cfg(test)]
    pub fn with_provider(provider: &str) -> Self {
        Self {
            provider: Some(provider.to_string()),
        }
    }

    /// Opt one source state into history logging.
    ///
    /// Existing custom settings win over the defaults, except that
    /// `enabled` is always forced on. Missing or non-state targets are
    /// skipped with a warning.
    pub async fn enable<C: ObjectClient>(
        &self,
        client: &C,
        state_id: &str,
    ) -> Result<(), GatewayError> {
        let Some(provider) = &self.provider else {
            return Ok(());
        };

        let Some(old_object) = client.get_object(state_id).await? else {
            warn!("history target {} is missing", state_id);
            return Ok(());
        };
        if old_object.object_type.as_deref() != Some("state") {
            warn!("history target {} is not a state", state_id);
            return Ok(());
        }

        let mut new_object = old_object.clone();
        let custom = new_object.common.custom.get_or_insert_with(Map::new);
        let existing = custom
            .get(provider)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let mut merged = default_history_settings();
        for (key, value) in existing {
            merged.insert(key, value);
        }
        merged.insert("enabled".to_string(), Value::Bool(true));
        custom.insert(provider.clone(), Value::Object(merged));

        let old_value = serde_json::to_value(&old_object).map_err(|source| {
            GatewayError::Decode {
                id: state_id.to_string(),
                source,
            }
        })?;
        let new_value = serde_json::to_value(&new_object).map_err(|source| {
            GatewayError::Decode {
                id: state_id.to_string(),
                source,
            }
        })?;

        let entries = diff::diff(&old_value, &new_value);
        if entries.is_empty() {
            return Ok(());
        }

        for entry in &entries {
            debug!("history {} {}", state_id, entry);
        }
        info!("enabling history for {}", state_id);
        client.set_object(state_id, &new_object).await
    }
}

fn default_history_settings() -> Map<String, Value> {
    let defaults = json!({
        "enabled": true,
        "changesRelogInterval": 0,
        "retention": 0,
        "changesOnly": false,
    });
    match defaults {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}
