//! Download-once delivery of claimed artifacts.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Bytes;
use futures::Stream;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// An artifact taken out of the store by a retrieval.
///
/// The claimed file is deleted when the stream built from it is dropped,
/// whether the transfer finished, failed or the client went away.
#[derive(Debug)]
pub struct ClaimedArtifact {
    file_name: String,
    path: PathBuf,
    file: File,
    size: Option<u64>,
}

impl ClaimedArtifact {
    pub(crate) fn new(file_name: String, path: PathBuf, file: File, size: Option<u64>) -> Self {
        Self {
            file_name,
            path,
            file,
            size,
        }
    }

    /// Name the artifact was published under.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn into_stream(self) -> ArtifactStream {
        ArtifactStream {
            inner: ReaderStream::new(self.file),
            guard: DeleteOnDrop {
                file_name: self.file_name,
                path: self.path,
                bytes_sent: 0,
                outcome: Outcome::InFlight,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    InFlight,
    Completed,
    Failed,
}

/// Byte stream over a claimed artifact; deletes the file exactly once on drop.
///
/// Inside a runtime the removal runs on the blocking pool, so the file may
/// outlive the stream by a moment.
pub struct ArtifactStream {
    inner: ReaderStream<File>,
    guard: DeleteOnDrop,
}

impl Stream for ArtifactStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = Pin::new(&mut self.inner).poll_next(cx);
        match &polled {
            Poll::Ready(Some(Ok(chunk))) => self.guard.bytes_sent += chunk.len() as u64,
            Poll::Ready(Some(Err(e))) => {
                tracing::error!("Stream error for {}: {}", self.guard.file_name, e);
                self.guard.outcome = Outcome::Failed;
            }
            Poll::Ready(None) => {
                if self.guard.outcome == Outcome::InFlight {
                    self.guard.outcome = Outcome::Completed;
                }
            }
            Poll::Pending => {}
        }
        polled
    }
}

struct DeleteOnDrop {
    file_name: String,
    path: PathBuf,
    bytes_sent: u64,
    outcome: Outcome,
}

impl Drop for DeleteOnDrop {
    fn drop(&mut self) {
        match self.outcome {
            Outcome::Completed => tracing::debug!(
                "Delivered {} ({} bytes)",
                self.file_name,
                self.bytes_sent
            ),
            Outcome::Failed | Outcome::InFlight => tracing::warn!(
                "Delivery of {} ended early after {} bytes",
                self.file_name,
                self.bytes_sent
            ),
        }

        let file_name = std::mem::take(&mut self.file_name);
        let path = std::mem::take(&mut self.path);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || remove_claimed(&file_name, &path));
            }
            Err(_) => remove_claimed(&file_name, &path),
        }
    }
}

fn remove_claimed(file_name: &str, path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::info!("Successfully deleted file: {}", file_name),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("Claimed file {} was already removed", path.display())
        }
        Err(e) => tracing::error!("Error deleting file {}: {}", path.display(), e),
    }
}
