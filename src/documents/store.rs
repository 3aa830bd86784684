//! Transient artifact storage on the local filesystem.
//!
//! Layout under the output directory:
//!   `<name>.docx`        - published artifacts, retrievable by name
//!   `.staging/`          - buffers being written, never visible by name
//!   `.claims/`           - artifacts taken by a retrieval, deleted once streamed,
//!                          named `<claimed-at millis>-<uuid>-<name>`
//!
//! Publishing is a hard link from staging, so an artifact becomes visible
//! only when fully written and an existing name is never overwritten.
//! Retrieval renames the artifact into `.claims/`; only one caller can win
//! that rename, later callers see `NotFound`.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::Utc;
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

use super::delivery::ClaimedArtifact;

const CLAIMS_DIR: &str = ".claims";
const STAGING_DIR: &str = ".staging";
const MAX_NAME_LEN: usize = 255;
/// Only files with this suffix are ever swept from the output directory.
const ARTIFACT_SUFFIX: &str = ".docx";

/// Directories visited by the retention sweep.
#[derive(Debug, Clone, Copy)]
enum SweepArea {
    Published,
    Claims,
    Staging,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("File not found")]
    NotFound,

    #[error("Artifact {0} already exists")]
    AlreadyExists(String),

    #[error("Invalid file name: {0:?}")]
    InvalidName(String),

    #[error("Failed to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn io_error(operation: &'static str, path: &Path) -> impl FnOnce(io::Error) -> StoreError {
    let path = path.to_path_buf();
    move |source| StoreError::Io {
        operation,
        path,
        source,
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: Arc<PathBuf>,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Accept only bare file names: no separators, no control characters, no leading dot.
    pub fn validate_name(name: &str) -> Result<(), StoreError> {
        let invalid = name.is_empty()
            || name.len() > MAX_NAME_LEN
            || name.starts_with('.')
            || name.contains(['/', '\\'])
            || name.chars().any(char::is_control);
        if invalid {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(())
    }

    /// Write `bytes` under `name`, failing with `AlreadyExists` instead of overwriting.
    ///
    /// Returns the absolute path of the published artifact.
    pub async fn write_new(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, StoreError> {
        Self::validate_name(name)?;

        let staging_dir = self.root.join(STAGING_DIR);
        fs::create_dir_all(&staging_dir)
            .await
            .map_err(io_error("create", &staging_dir))?;

        let staged = staging_dir.join(format!("{}-{}", Uuid::new_v4(), name));
        if let Err(e) = fs::write(&staged, bytes).await {
            let _ = fs::remove_file(&staged).await;
            return Err(io_error("write", &staged)(e));
        }

        let target = self.root.join(name);
        let published = fs::hard_link(&staged, &target).await;
        if let Err(e) = fs::remove_file(&staged).await {
            tracing::warn!("Failed to remove staged file {}: {}", staged.display(), e);
        }

        match published {
            Ok(()) => Ok(std::path::absolute(&target).unwrap_or(target)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(StoreError::AlreadyExists(name.to_string()))
            }
            Err(e) => Err(io_error("publish", &target)(e)),
        }
    }

    /// Take exclusive ownership of a published artifact for delivery.
    pub async fn claim(&self, name: &str) -> Result<ClaimedArtifact, StoreError> {
        Self::validate_name(name)?;

        let source = self.root.join(name);
        match fs::metadata(&source).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(StoreError::NotFound),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(StoreError::NotFound),
            Err(e) => return Err(io_error("inspect", &source)(e)),
        }

        let claims_dir = self.root.join(CLAIMS_DIR);
        fs::create_dir_all(&claims_dir)
            .await
            .map_err(io_error("create", &claims_dir))?;

        let claimed = claims_dir.join(format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4(),
            name
        ));
        match fs::rename(&source, &claimed).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(StoreError::NotFound),
            Err(e) => return Err(io_error("claim", &source)(e)),
        }

        let file = match fs::File::open(&claimed).await {
            Ok(file) => file,
            Err(e) => {
                let _ = fs::remove_file(&claimed).await;
                return Err(io_error("open", &claimed)(e));
            }
        };
        let len = file.metadata().await.ok().map(|meta| meta.len());

        Ok(ClaimedArtifact::new(name.to_string(), claimed, file, len))
    }

    /// Remove a published artifact; an already missing one is not an error.
    pub async fn discard(&self, name: &str) -> Result<(), StoreError> {
        Self::validate_name(name)?;
        let path = self.root.join(name);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("remove", &path)(e)),
        }
    }

    pub async fn exists(&self, name: &str) -> bool {
        Self::validate_name(name).is_ok() && fs::metadata(self.root.join(name)).await.is_ok()
    }

    /// Delete artifacts, claims and staged buffers older than `ttl`.
    ///
    /// Published artifacts age from their last modification, claims from the
    /// moment they were claimed. Files in the output directory that do not
    /// look like artifacts are never touched. Returns how many files were removed.
    pub async fn sweep_expired(&self, ttl: Duration) -> Result<usize, StoreError> {
        let now = SystemTime::now();
        let now_ms = Utc::now().timestamp_millis();
        let mut removed = 0;

        for (area, dir) in [
            (SweepArea::Published, self.root.to_path_buf()),
            (SweepArea::Claims, self.root.join(CLAIMS_DIR)),
            (SweepArea::Staging, self.root.join(STAGING_DIR)),
        ] {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(io_error("list", &dir)(e)),
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(io_error("list", &dir))?
            {
                let file_name = entry.file_name().to_string_lossy().into_owned();
                if !file_name.ends_with(ARTIFACT_SUFFIX) {
                    continue;
                }
                if matches!(area, SweepArea::Published)
                    && Self::validate_name(&file_name).is_err()
                {
                    continue;
                }
                let Ok(meta) = entry.metadata().await else {
                    continue;
                };
                if !meta.is_file() {
                    continue;
                }

                let modified_age = meta
                    .modified()
                    .ok()
                    .and_then(|modified| now.duration_since(modified).ok())
                    .unwrap_or_default();
                let age = match area {
                    SweepArea::Claims => match claimed_at_ms(&file_name) {
                        Some(claimed) => {
                            Duration::from_millis(u64::try_from(now_ms - claimed).unwrap_or(0))
                        }
                        None => modified_age,
                    },
                    SweepArea::Published | SweepArea::Staging => modified_age,
                };
                if age <= ttl {
                    continue;
                }

                let path = entry.path();
                match fs::remove_file(&path).await {
                    Ok(()) => {
                        tracing::info!("Swept expired artifact {}", path.display());
                        removed += 1;
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => tracing::warn!("Failed to sweep {}: {}", path.display(), e),
                }
            }
        }

        Ok(removed)
    }
}

/// Claim time encoded in the leading segment of a claim file name.
fn claimed_at_ms(claim_name: &str) -> Option<i64> {
    claim_name.split_once('-')?.0.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(ArtifactStore::validate_name("nda-Acme-1700000000000.docx").is_ok());
        for bad in [
            "",
            ".claims",
            "..",
            "../secret.docx",
            "a/b.docx",
            "a\\b.docx",
            "a\0b",
        ] {
            assert!(
                matches!(ArtifactStore::validate_name(bad), Err(StoreError::InvalidName(_))),
                "{bad:?} should be rejected"
            );
        }
        assert!(ArtifactStore::validate_name(&"x".repeat(300)).is_err());
    }

    #[tokio::test]
    async fn test_write_new_creates_directory_and_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("output"));

        let path = store.write_new("a.docx", b"first").await.unwrap();
        assert!(path.is_absolute());
        assert_eq!(std::fs::read(&path).unwrap(), b"first");

        let err = store.write_new("a.docx", b"second").await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(ref n) if n == "a.docx"));
        assert_eq!(std::fs::read(&path).unwrap(), b"first");

        let staged: Vec<_> = std::fs::read_dir(store.root().join(STAGING_DIR))
            .unwrap()
            .collect();
        assert!(staged.is_empty());
    }

    #[tokio::test]
    async fn test_claim_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.write_new("a.docx", b"bytes").await.unwrap();

        let claimed = store.claim("a.docx").await.unwrap();
        assert_eq!(claimed.file_name(), "a.docx");
        assert_eq!(claimed.size(), Some(5));
        assert!(!store.exists("a.docx").await);

        assert!(matches!(store.claim("a.docx").await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_claim_missing_and_invalid_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        assert!(matches!(
            store.claim("nda-Acme-Sons-Inc-1700000000000.docx").await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.claim("../etc/passwd").await,
            Err(StoreError::InvalidName(_))
        ));
    }

    #[tokio::test]
    async fn test_discard_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.write_new("a.docx", b"x").await.unwrap();

        store.discard("a.docx").await.unwrap();
        store.discard("a.docx").await.unwrap();
        assert!(!store.exists("a.docx").await);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.write_new("old.docx", b"x").await.unwrap();

        assert_eq!(store.sweep_expired(Duration::from_secs(3600)).await.unwrap(), 0);
        assert!(store.exists("old.docx").await);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.sweep_expired(Duration::from_millis(1)).await.unwrap(), 1);
        assert!(!store.exists("old.docx").await);
    }

    #[tokio::test]
    async fn test_sweep_leaves_unrelated_files_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        std::fs::write(dir.path().join("Cargo.toml"), b"[package]").unwrap();
        std::fs::write(dir.path().join(".hidden.docx"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("nested.docx")).unwrap();
        store.write_new("nda-Acme-1.docx", b"x").await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.sweep_expired(Duration::from_millis(1)).await.unwrap(), 1);

        assert!(dir.path().join("Cargo.toml").exists());
        assert!(dir.path().join(".hidden.docx").exists());
        assert!(dir.path().join("nested.docx").is_dir());
        assert!(!store.exists("nda-Acme-1.docx").await);
    }

    #[tokio::test]
    async fn test_sweep_ages_claims_from_claim_time() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.write_new("a.docx", b"bytes").await.unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;

        let claimed = store.claim("a.docx").await.unwrap();
        assert_eq!(store.sweep_expired(Duration::from_millis(200)).await.unwrap(), 0);
        assert!(claimed.path().exists());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(store.sweep_expired(Duration::from_millis(200)).await.unwrap(), 1);
        assert!(!claimed.path().exists());
    }

    #[test]
    fn test_claimed_at_is_read_from_claim_name() {
        assert_eq!(
            claimed_at_ms("1700000000000-6f1c2d2e-8d7a-4f3e-9b1a-2c3d4e5f6a7b-a.docx"),
            Some(1_700_000_000_000)
        );
        assert_eq!(claimed_at_ms("a.docx"), None);
    }

    #[tokio::test]
    async fn test_sweep_on_missing_root_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("never-created"));
        assert_eq!(store.sweep_expired(Duration::ZERO).await.unwrap(), 0);
    }
}
