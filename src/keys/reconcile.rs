// Key reconciliation: decide which local key to upload by comparing the
// local inventory with what the account already has registered.

use super::inventory::{KeyInventory, SshKey};
use crate::api::PlatformApi;
use crate::error::{Error, Result};
use crate::ui::{self, Prompter};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

/// Fingerprints already registered on the account. Listing failures are
/// logged and treated as "nothing registered" so the user can still
/// pick a key.
pub fn registered_fingerprints(api: &mut dyn PlatformApi) -> HashSet<String> {
    match api.list_keys() {
        Ok(keys) => keys.into_iter().map(|k| k.fingerprint).collect(),
        Err(e) => {
            warn!(error = %e, "cannot list registered keys, offering every local key");
            HashSet::new()
        }
    }
}

/// Local keys not yet registered, in discovery order.
pub fn unregistered(keys: Vec<SshKey>, registered: &HashSet<String>) -> Vec<SshKey> {
    keys.into_iter()
        .filter(|k| !registered.contains(&k.fingerprint))
        .collect()
}

/// Choose the key to upload.
///
/// An explicit `key_path` must parse or the upload is refused. Otherwise
/// the user picks from unregistered local keys, and is offered a freshly
/// generated pair when there are none.
pub fn select_key_to_upload(
    inventory: &mut dyn KeyInventory,
    prompter: &mut dyn Prompter,
    key_path: Option<&Path>,
    registered: &HashSet<String>,
) -> Result<SshKey> {
    if let Some(path) = key_path {
        return inventory
            .read(path)
            .map_err(|e| Error::RefusingUpload(format!("{:#}", e)));
    }

    let mut candidates = unregistered(inventory.discover(), registered);
    if candidates.is_empty() && prompter.confirm("No SSH keys to add. Create a new key?")? {
        let created = inventory.generate()?;
        println!("Created key pair {}", created.display());
        candidates = unregistered(inventory.discover(), registered);
    }

    match candidates.len() {
        0 => Err(Error::NoKeys),
        1 => {
            let key = candidates.remove(0);
            println!("Using key {} {}", key.label(), key.preview());
            Ok(key)
        }
        _ => {
            let rows: Vec<String> = candidates
                .iter()
                .map(|k| format!("{:<20} {}", k.label(), k.preview()))
                .collect();
            let index = ui::pick(prompter, "key", &rows)?;
            Ok(candidates.swap_remove(index))
        }
    }
}

/// The user's answer verbatim, or `today` as `YYYY-MM-DD` when blank.
pub fn key_name(answer: &str, today: NaiveDate) -> String {
    if answer.trim().is_empty() {
        today.format("%Y-%m-%d").to_string()
    } else {
        answer.to_string()
    }
}
