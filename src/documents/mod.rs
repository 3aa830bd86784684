//! Document generation and delivery
//!
//! Rendered documents are transient artifacts: written once into the output
//! directory, streamed to the first caller that asks for them, then deleted.

mod batch;
mod delivery;
mod generator;
mod store;
mod sweeper;

pub use batch::{generate_batch, BatchError};
pub use delivery::{ArtifactStream, ClaimedArtifact};
pub use generator::{
    artifact_file_name, sanitize_company_name, DocumentGenerator, GenerateError,
    GeneratedArtifact, DOCX_MIME_TYPE,
};
pub use store::{ArtifactStore, StoreError};
pub use sweeper::ArtifactSweeper;
