//! Background retention sweep for artifacts nobody downloaded.

use std::time::Duration;

use tokio::time::MissedTickBehavior;

use super::store::ArtifactStore;
use crate::config::RetentionConfig;

pub struct ArtifactSweeper {
    store: ArtifactStore,
    ttl: Duration,
    interval: Duration,
}

impl ArtifactSweeper {
    pub fn new(store: ArtifactStore, retention: RetentionConfig) -> Self {
        Self {
            store,
            ttl: retention.ttl,
            interval: retention.sweep_interval,
        }
    }

    /// Sweep forever, once per interval. Meant to be spawned.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.sweep_once().await;
        }
    }

    pub async fn sweep_once(&self) -> usize {
        match self.store.sweep_expired(self.ttl).await {
            Ok(0) => 0,
            Ok(removed) => {
                tracing::info!(
                    "Artifact sweep removed {} file(s) older than {}s",
                    removed,
                    self.ttl.as_secs()
                );
                removed
            }
            Err(e) => {
                tracing::error!("Artifact sweep failed: {}", e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sweep_once_reports_removed_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.write_new("a.docx", b"x").await.unwrap();
        store.write_new("b.docx", b"y").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let sweeper = ArtifactSweeper::new(
            store.clone(),
            RetentionConfig {
                ttl: Duration::from_millis(1),
                sweep_interval: Duration::from_secs(60),
            },
        );
        assert_eq!(sweeper.sweep_once().await, 2);
        assert_eq!(sweeper.sweep_once().await, 0);
        assert!(!store.exists("a.docx").await);
    }
}
