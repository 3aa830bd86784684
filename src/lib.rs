//! docgen - form-driven Word document generation
//!
//! Callers post form fields; the service checks them against a template's
//! declared inputs, renders the matching `.docx` templates and hands back
//! download links. Each generated document can be downloaded exactly once.
//!
//! ## Request flow
//! HTTP body -> [`templates::VariableResolver`] -> [`documents::DocumentGenerator`]
//! -> transient artifact in the output directory -> streamed once, then deleted

// Environment configuration
pub mod config;

// Template descriptors, catalog loading and variable resolution
pub mod templates;

// Rendering, artifact storage and delivery
pub mod documents;

// HTTP routes
pub mod api;

pub use api::{create_doc_router, AppState};
pub use config::{ConfigError, ServerConfig};
