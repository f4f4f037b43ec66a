//! Live device directory of the zigbee bridge.
//!
//! The bridge publishes its full device list as retained JSON on a
//! well-known topic. The directory is fetched once per run with a one-shot
//! subscribe, and the payload is parsed into a strict schema: a record with
//! a missing or wrong-typed required field is a hard error, because
//! proceeding would risk binding accessories to misinterpreted fields.

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::AsyncClient;
use rumqttc::Event;
use rumqttc::MqttOptions;
use rumqttc::Packet;
use rumqttc::QoS;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::ZigbeeConfig;

/// Feature value types the bridge exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    Binary,
    Numeric,
    Enum,
    Composite,
}

/// One exposed capability of a device
#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    pub access: i64,

    pub label: String,

    pub name: String,

    #[serde(rename = "type")]
    pub feature_type: FeatureType,

    #[serde(default)]
    pub description: Option<String>,

    /// Sub-features of a composite feature
    #[serde(default)]
    pub features: Option<Vec<Feature>>,
}

/// Group kinds that carry a feature list instead of a single value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    Light,
    Composite,
}

/// A typed feature group (e.g. the `light` group carrying state/brightness)
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureGroup {
    #[serde(rename = "type")]
    pub group_type: GroupType,

    #[serde(default)]
    pub name: Option<String>,

    pub features: Vec<Feature>,
}

/// Either a feature group or a plain feature
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Expose {
    Group(FeatureGroup),
    Feature(Feature),
}

/// Hardware definition of a directory record
#[derive(Debug, Clone, Deserialize)]
pub struct Definition {
    pub model: String,

    pub vendor: String,

    pub description: String,

    pub exposes: Vec<Expose>,

    pub supports_ota: bool,

    pub options: Vec<Value>,

    #[serde(default)]
    pub icon: Option<String>,
}

impl Definition {
    /// The light feature group, if the device exposes one
    pub fn light_group(&self) -> Option<&FeatureGroup> {
        self.exposes.iter().find_map(|expose| match expose {
            Expose::Group(group) if group.group_type == GroupType::Light => Some(group),
            _ => None,
        })
    }

    /// Plain (non-grouped) features
    pub fn named_features(&self) -> impl Iterator<Item = &Feature> {
        self.exposes.iter().filter_map(|expose| match expose {
            Expose::Feature(feature) => Some(feature),
            Expose::Group(_) => None,
        })
    }

    pub fn has_feature(&self, name: &str) -> bool {
        self.named_features().any(|feature| feature.name == name)
    }
}

/// One device record from the bridge's directory
#[derive(Debug, Clone, Deserialize)]
pub struct ZigbeeDevice {
    pub ieee_address: String,

    /// "EndDevice", "Router", ...
    #[serde(rename = "type")]
    pub device_type: String,

    pub network_address: u64,

    pub supported: bool,

    pub friendly_name: String,

    pub disabled: bool,

    pub definition: Definition,

    #[serde(default)]
    pub power_source: Option<String>,

    #[serde(default)]
    pub software_build_id: Option<String>,

    pub model_id: String,

    pub interviewing: bool,

    pub interview_completed: bool,

    pub manufacturer: String,

    pub endpoints: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("failed to reach the zigbee broker: {0}")]
    Subscribe(#[from] rumqttc::ClientError),

    #[error("zigbee broker connection failed: {0}")]
    Connection(#[from] rumqttc::ConnectionError),

    #[error("no device directory received on {topic} within {seconds}s")]
    Timeout { topic: String, seconds: u64 },

    #[error("malformed device directory: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Source of the live device directory.
///
/// This trait allows mocking the directory for testing purposes.
#[async_trait]
pub trait DeviceDirectory: Send + Sync {
    async fn fetch(&self) -> Result<Vec<ZigbeeDevice>, DirectoryError>;
}

/// One-shot directory fetch over the local MQTT broker.
///
/// Connects, waits for the first (retained) publish on the directory topic,
/// then disconnects. The wait is bounded; a silent broker fails the fetch
/// instead of hanging the run.
pub struct MqttDeviceDirectory {
    config: ZigbeeConfig,
}

impl MqttDeviceDirectory {
    pub fn new(config: &ZigbeeConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait]
impl DeviceDirectory for MqttDeviceDirectory {
    async fn fetch(&self) -> Result<Vec<ZigbeeDevice>, DirectoryError> {
        let mut options = MqttOptions::new(
            self.config.client_id.clone(),
            self.config.broker.clone(),
            self.config.port,
        );
        options.set_keep_alive(Duration::from_secs(30));

        // The directory of a large network exceeds the default packet size
        options.set_max_packet_size(2 * 1024 * 1024, 2 * 1024 * 1024);

        let (client, mut event_loop) = AsyncClient::new(options, 10);
        client
            .subscribe(&self.config.devices_topic, QoS::AtMostOnce)
            .await?;

        let wait = Duration::from_secs(self.config.fetch_timeout_secs);
        let payload: Result<Result<Vec<u8>, DirectoryError>, _> = tokio::time::timeout(wait, async {
            loop {
                match event_loop.poll().await? {
                    Event::Incoming(Packet::Publish(publish))
                        if publish.topic == self.config.devices_topic =>
                    {
                        return Ok(publish.payload.to_vec());
                    }
                    event => debug!("ignoring event while waiting for directory: {:?}", event),
                }
            }
        })
        .await;

        // Disconnect on success and timeout alike; the connection is only
        // needed for this single message.
        let _ = client.disconnect().await;

        let payload = payload.map_err(|_| DirectoryError::Timeout {
            topic: self.config.devices_topic.clone(),
            seconds: self.config.fetch_timeout_secs,
        })??;

        Ok(serde_json::from_slice(&payload)?)
    }
}

/// Directory stub replaying a fixed payload for tests.
///
/// The payload goes through the same strict parse as the real fetch, so
/// tests exercise schema rejection the way production does.
#[cfg(test)]
pub struct MockDeviceDirectory {
    payload: Vec<u8>,
}

#[cfg(test)]
impl MockDeviceDirectory {
    pub fn from_json(payload: &str) -> Self {
        Self {
            payload: payload.as_bytes().to_vec(),
        }
    }

    /// An empty directory
    pub fn empty() -> Self {
        Self::from_json("[]")
    }
}

#[cfg(test)]
#[async_trait]
impl DeviceDirectory for MockDeviceDirectory {
    async fn fetch(&self) -> Result<Vec<ZigbeeDevice>, DirectoryError> {
        Ok(serde_json::from_slice(&self.payload)?)
    }
}
