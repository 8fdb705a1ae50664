// Key inventory: finds the user's SSH public keys on disk, parses them
// with `ssh-key`, and can ask `ssh-keygen` to create a new pair.

use crate::error::Result;
use anyhow::{anyhow, Context};
use ssh_key::{HashAlg, PublicKey};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// A parsed public key ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct SshKey {
    /// File the key was read from, if any.
    pub path: Option<PathBuf>,
    /// SHA-256 fingerprint, `SHA256:<base64>`.
    pub fingerprint: String,
    pub comment: String,
    /// Canonical single-line authorized-key text.
    pub authorized: String,
}

impl SshKey {
    /// Parse one line of authorized-key text.
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let key = PublicKey::from_openssh(text.trim()).context("not an OpenSSH public key")?;
        Ok(SshKey {
            path: None,
            fingerprint: key.fingerprint(HashAlg::Sha256).to_string(),
            comment: key.comment().to_string(),
            authorized: key
                .to_openssh()
                .context("cannot serialize public key")?
                .trim()
                .to_string(),
        })
    }

    /// Comment, else file name, else a placeholder.
    pub fn label(&self) -> String {
        if !self.comment.is_empty() {
            return self.comment.clone();
        }
        self.path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "(unnamed)".to_string())
    }

    /// Algorithm plus an abbreviated key body.
    pub fn preview(&self) -> String {
        let mut parts = self.authorized.split_whitespace();
        let algorithm = parts.next().unwrap_or_default();
        let body = parts.next().unwrap_or_default();
        if body.len() <= 20 {
            return format!("{} {}", algorithm, body);
        }
        format!("{} {}...{}", algorithm, &body[..8], &body[body.len() - 8..])
    }
}

/// Where local keys come from.
pub trait KeyInventory {
    /// Every parsable public key in the key directory, in file name order.
    fn discover(&self) -> Vec<SshKey>;

    /// Parse a single explicit path.
    fn read(&self, path: &Path) -> anyhow::Result<SshKey>;

    /// Create a new key pair and return the private key path.
    fn generate(&mut self) -> Result<PathBuf>;
}

/// Keys stored as `*.pub` files in one directory, `~/.ssh` by default.
pub struct FsKeyInventory {
    dir: PathBuf,
}

impl FsKeyInventory {
    pub fn new(dir: PathBuf) -> Self {
        FsKeyInventory { dir }
    }
}

impl KeyInventory for FsKeyInventory {
    fn discover(&self) -> Vec<SshKey> {
        discover_public_keys(&self.dir)
    }

    fn read(&self, path: &Path) -> anyhow::Result<SshKey> {
        read_public_key(path)
    }

    fn generate(&mut self) -> Result<PathBuf> {
        generate_key_pair(&self.dir)
    }
}

pub fn read_public_key(path: &Path) -> anyhow::Result<SshKey> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let mut key = SshKey::parse(&text).with_context(|| path.display().to_string())?;
    key.path = Some(path.to_path_buf());
    Ok(key)
}

pub fn discover_public_keys(dir: &Path) -> Vec<SshKey> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "no key directory");
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().map_or(false, |ext| ext == "pub"))
        .collect();
    paths.sort();

    paths
        .into_iter()
        .filter_map(|path| match read_public_key(&path) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{:#}", e), "skipping key");
                None
            }
        })
        .collect()
}

/// First of `id_ed25519`, `id_ed25519_1`, ... with no existing private or
/// public half.
fn free_key_path(dir: &Path) -> PathBuf {
    let taken = |p: &Path| p.exists() || p.with_extension("pub").exists();
    let first = dir.join("id_ed25519");
    if !taken(&first) {
        return first;
    }
    (1..)
        .map(|n| dir.join(format!("id_ed25519_{}", n)))
        .find(|p| !taken(p))
        .unwrap_or(first)
}

/// Run `ssh-keygen` interactively so the user can choose a passphrase.
pub fn generate_key_pair(dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = free_key_path(dir);
    info!(path = %path.display(), "generating ssh key pair");

    let status = Command::new("ssh-keygen")
        .arg("-t")
        .arg("ed25519")
        .arg("-f")
        .arg(&path)
        .status()
        .context("Failed to run ssh-keygen")?;
    if !status.success() {
        return Err(anyhow!("ssh-keygen exited with {}", status).into());
    }
    Ok(path)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    pub const KEY_A: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIGFhYWFhYWFhYWFhYWFhYWFhYWFhYWFhYWFhYWFhYWFh a@host";
    pub const KEY_B: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIGJiYmJiYmJiYmJiYmJiYmJiYmJiYmJiYmJiYmJiYmJi b@host";
    pub const KEY_C: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIGNjY2NjY2NjY2NjY2NjY2NjY2NjY2NjY2NjY2NjY2Nj c@host";

    pub fn key(text: &str) -> SshKey {
        SshKey::parse(text).unwrap()
    }

    /// Inventory held in memory. `generate` moves `pending` into `keys`.
    #[derive(Default)]
    pub struct MemoryInventory {
        pub keys: Vec<SshKey>,
        pub pending: Vec<SshKey>,
        pub generated: Rc<Cell<usize>>,
    }

    impl MemoryInventory {
        pub fn with_keys(texts: &[&str]) -> Self {
            MemoryInventory {
                keys: texts.iter().map(|t| key(t)).collect(),
                ..Default::default()
            }
        }
    }

    impl KeyInventory for MemoryInventory {
        fn discover(&self) -> Vec<SshKey> {
            self.keys.clone()
        }

        fn read(&self, path: &Path) -> anyhow::Result<SshKey> {
            read_public_key(path)
        }

        fn generate(&mut self) -> Result<PathBuf> {
            self.generated.set(self.generated.get() + 1);
            self.keys.append(&mut self.pending);
            Ok(PathBuf::from("/tmp/id_ed25519"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn parses_fingerprint_comment_and_text() {
        let key = key(KEY_A);
        assert_eq!(key.fingerprint, "SHA256:TGIk2D1DFZBKmjWssB2+Qdiona/OUK1TSuWAAHMK+n0");
        assert_eq!(key.comment, "a@host");
        assert_eq!(key.authorized, KEY_A);
        assert_eq!(key.label(), "a@host");
    }

    #[test]
    fn serialized_text_reparses_to_same_fingerprint() {
        let first = SshKey::parse(&format!("  {}\n", KEY_B)).unwrap();
        let second = SshKey::parse(&first.authorized).unwrap();
        assert_eq!(first.fingerprint, second.fingerprint);
        assert_eq!(first.authorized, second.authorized);
    }

    #[test]
    fn preview_abbreviates_key_body() {
        assert_eq!(key(KEY_A).preview(), "ssh-ed25519 AAAAC3Nz...YWFhYWFh");
    }

    #[test]
    fn discovery_skips_junk_and_sorts_by_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.pub"), KEY_B).unwrap();
        std::fs::write(dir.path().join("a.pub"), KEY_A).unwrap();
        std::fs::write(dir.path().join("broken.pub"), "ssh-ed25519 !!!").unwrap();
        std::fs::write(dir.path().join("id_ed25519"), "private material").unwrap();
        std::fs::create_dir(dir.path().join("dir.pub")).unwrap();

        let keys = discover_public_keys(dir.path());
        let comments: Vec<_> = keys.iter().map(|k| k.comment.as_str()).collect();
        assert_eq!(comments, vec!["a@host", "b@host"]);
        assert_eq!(keys[0].path.as_deref(), Some(dir.path().join("a.pub").as_path()));
    }

    #[test]
    fn missing_directory_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_public_keys(&dir.path().join("absent")).is_empty());
    }

    #[test]
    fn explicit_path_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.pub");
        std::fs::write(&path, "garbage").unwrap();
        let err = read_public_key(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("bad.pub"));
    }

    #[test]
    fn free_key_path_avoids_existing_pairs() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(free_key_path(dir.path()), dir.path().join("id_ed25519"));
        std::fs::write(dir.path().join("id_ed25519.pub"), KEY_A).unwrap();
        assert_eq!(free_key_path(dir.path()), dir.path().join("id_ed25519_1"));
    }
}
