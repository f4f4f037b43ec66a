//! Per-source-kind accessory builders.
//!
//! The set of supported source integrations is a fixed list; each kind has
//! one builder turning the source's object tree into accessory descriptors.
//! Instances whose adapter prefix matches no kind are skipped explicitly by
//! the orchestrator.

mod dect;
mod roles;
mod router;
mod smart_plug;
mod thermostat;
mod zigbee;

use crate::accessory::Accessory;
use crate::directory::DeviceDirectory;
use crate::directory::DirectoryError;
use crate::gateway::GatewayError;
use crate::gateway::ObjectClient;
use crate::history::History;

/// Supported source integration kinds, keyed on the adapter-id prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Router toggle states (tr-064)
    RouterStates,
    /// DECT smart home devices behind the router (fritzdect)
    DectDevices,
    /// Smart plug / dimmer bridge (shelly)
    SmartPlug,
    /// Floor heating thermostat bridge (danfossicon)
    ThermostatBridge,
    /// Zigbee bridge with a live device directory (zigbee2mqtt)
    ZigbeeBridge,
    /// Role-tagged GPIO style states (rpi-io, switchboard-io)
    RoleTagged,
}

impl SourceKind {
    /// Resolve the kind for an instance id like `"shelly.0"`
    pub fn from_instance(instance_id: &str) -> Option<Self> {
        let adapter = instance_id.split('.').next().unwrap_or(instance_id);
        match adapter {
            "tr-064" => Some(Self::RouterStates),
            "fritzdect" => Some(Self::DectDevices),
            "shelly" => Some(Self::SmartPlug),
            "danfossicon" => Some(Self::ThermostatBridge),
            "zigbee2mqtt" => Some(Self::ZigbeeBridge),
            "rpi-io" | "switchboard-io" => Some(Self::RoleTagged),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Run the builder for one source instance
pub async fn build_accessories<C: ObjectClient, D: DeviceDirectory>(
    kind: SourceKind,
    instance_id: &str,
    client: &C,
    directory: &D,
    history: &History,
) -> Result<Vec<Accessory>, BuildError> {
    match kind {
        SourceKind::RouterStates => Ok(router::build(instance_id, client).await?),
        SourceKind::DectDevices => Ok(dect::build(instance_id, client, history).await?),
        SourceKind::SmartPlug => Ok(smart_plug::build(instance_id, client).await?),
        SourceKind::ThermostatBridge => Ok(thermostat::build(instance_id, client).await?),
        SourceKind::ZigbeeBridge => zigbee::build(instance_id, client, directory, history).await,
        SourceKind::RoleTagged => Ok(roles::build(instance_id, client).await?),
    }
}

/// First two id segments, the instance prefix ("shelly.0")
pub(crate) fn instance_of(id: &str) -> String {
    id.split('.').take(2).collect::<Vec<_>>().join(".")
}

/// Id with the instance prefix stripped ("SHPLG-S#X#1.Relay0")
pub(crate) fn local_part(id: &str) -> String {
    id.split('.').skip(2).collect::<Vec<_>>().join(".")
}
