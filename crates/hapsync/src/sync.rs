//! Synthesis orchestrator.
//!
//! One run walks the destination instances of the mapping table, rebuilds
//! each destination's accessory list from its enabled sources, reconciles
//! the result against the persisted list and writes the destination object
//! back only when something actually changed. Failures are isolated per
//! destination: a broken source aborts the current destination (a partial
//! write would orphan every accessory of that source) but the run
//! continues with the next one.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::accessory::Accessory;
use crate::directory::DeviceDirectory;
use crate::gateway::GatewayError;
use crate::gateway::ObjectClient;
use crate::history::History;
use crate::reconcile;
use crate::sources;
use crate::sources::BuildError;
use crate::sources::SourceKind;

/// Destination instance id to enabled source instances
pub type Mapping = BTreeMap<String, BTreeMap<String, bool>>;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("failed to encode the persisted device list: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Run one synthesis pass over every destination in the mapping
pub async fn run<C: ObjectClient, D: DeviceDirectory>(
    mapping: &Mapping,
    client: &C,
    directory: &D,
) -> Result<(), SyncError> {
    let history = History::discover(client).await?;

    for (destination_id, source_map) in mapping {
        if let Err(e) =
            sync_destination(destination_id, source_map, client, directory, &history).await
        {
            error!("skipping {}: {}", destination_id, e);
        }
    }

    Ok(())
}

async fn sync_destination<C: ObjectClient, D: DeviceDirectory>(
    destination_id: &str,
    source_map: &BTreeMap<String, bool>,
    client: &C,
    directory: &D,
    history: &History,
) -> Result<(), SyncError> {
    let full_id = format!("system.adapter.{destination_id}");
    let Some(mut destination) = client.get_object(&full_id).await? else {
        warn!("{} is not installed", full_id);
        return Ok(());
    };

    let old_devices: Vec<Accessory> = match destination.native.pointer("/bridge/devices") {
        Some(devices) => serde_json::from_value(devices.clone())?,
        None => Vec::new(),
    };

    let mut created: Vec<Accessory> = Vec::new();
    for (source_id, enabled) in source_map {
        if !*enabled {
            info!("{} {} skipped", destination_id, source_id);
            continue;
        }
        info!("{} {} enabled", destination_id, source_id);

        match SourceKind::from_instance(source_id) {
            Some(kind) => created.extend(
                sources::build_accessories(kind, source_id, client, directory, history).await?,
            ),
            None => debug!("{} has no matching builder", source_id),
        }
    }

    // An accessory without services cannot be addressed by the bridge
    created.retain(|accessory| {
        if accessory.services.is_empty() {
            debug!("dropping {}: no services", accessory.name);
            false
        } else {
            true
        }
    });

    let merged = reconcile::merge(&old_devices, created);
    let diffs = reconcile::diff_lists(&old_devices, &merged)?;
    for entry in &diffs {
        info!("{} {}", destination_id, entry);
    }
    if diffs.is_empty() {
        info!("{} is up to date", destination_id);
        return Ok(());
    }

    match destination.native.get_mut("bridge") {
        Some(Value::Object(bridge)) => {
            bridge.insert("devices".to_string(), serde_json::to_value(&merged)?);
        }
        _ => {
            warn!("{} has no bridge configuration, not saving", full_id);
            return Ok(());
        }
    }

    info!("{} saving {} devices", destination_id, merged.len());
    client.set_object(&full_id, &destination).await?;
    Ok(())
}
