// SSH key handling: `inventory` reads keys from disk, `reconcile` decides
// which of them to offer for upload.
pub mod inventory;
pub mod reconcile;

pub use inventory::{FsKeyInventory, KeyInventory, SshKey};
