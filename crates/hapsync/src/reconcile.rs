//! Merge of freshly synthesized accessories with the persisted list.
//!
//! `name` is the merge key: the bridge derives the durable HomeKit
//! identifier from it, so an entry must keep its name across runs and an
//! entry that disappeared from the sources is kept (disabled) rather than
//! deleted, because the bridge may hold manual customizations against it.

use tracing::info;

use crate::accessory::Accessory;
use crate::diff;
use crate::diff::DiffEntry;

/// Group label for entries the user disabled in the destination UI
pub const DISABLED_GROUP: &str = "~disabled~";

/// Group label for entries whose source object disappeared
pub const OBSOLETE_GROUP: &str = "~obsolete~";

/// Merge `created` into the previously persisted `old` list, keyed by name.
///
/// Entries present on both sides take the fresh structure with the old
/// enable flag. Old-only entries are kept, disabled and regrouped.
/// Created-only entries are appended as newly discovered devices.
pub fn merge(old: &[Accessory], created: Vec<Accessory>) -> Vec<Accessory> {
    let mut remaining: Vec<Option<Accessory>> = created.into_iter().map(Some).collect();
    let mut merged = Vec::with_capacity(old.len() + remaining.len());

    for old_entry in old {
        let taken = remaining
            .iter_mut()
            .find(|slot| {
                slot.as_ref()
                    .is_some_and(|candidate| candidate.name == old_entry.name)
            })
            .and_then(Option::take);

        match taken {
            Some(mut fresh) => {
                fresh.enabled = old_entry.enabled;
                if !fresh.enabled {
                    fresh.group_string = DISABLED_GROUP.to_string();
                    info!("disabled {}", fresh.name);
                }
                merged.push(fresh);
            }
            None => {
                let mut orphan = old_entry.clone();
                orphan.enabled = false;
                orphan.group_string = OBSOLETE_GROUP.to_string();
                info!("obsolete {}", orphan.name);
                merged.push(orphan);
            }
        }
    }

    for fresh in remaining.into_iter().flatten() {
        info!("added    {}", fresh.name);
        merged.push(fresh);
    }

    merged
}

/// Copy of `list` sorted by name, the order used for change detection
pub fn sorted_by_name(list: &[Accessory]) -> Vec<Accessory> {
    let mut sorted = list.to_vec();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    sorted
}

/// Structural differences between two accessory lists.
///
/// Both lists are sorted by name first so that unchanged entries line up
/// index by index and the result is deterministic.
pub fn diff_lists(old: &[Accessory], new: &[Accessory]) -> Result<Vec<DiffEntry>, serde_json::Error> {
    let old = serde_json::to_value(sorted_by_name(old))?;
    let new = serde_json::to_value(sorted_by_name(new))?;
    Ok(diff::diff(&old, &new))
}
