//! Document Generator
//!
//! Renders a template with resolved variables and publishes the result as a
//! transient artifact named `<kind>-<company>-<unix millis>.docx`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Utc;
use docx_template::{DocxTemplate, RenderOptions, TemplateError};
use serde::Serialize;
use thiserror::Error;

use super::store::{ArtifactStore, StoreError};
use crate::templates::{ResolvedVariableSet, TemplateDescriptor};

pub const DOCX_EXTENSION: &str = "docx";
pub const DOCX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Attempts at finding a free name before giving up on a collision streak.
const MAX_NAME_ATTEMPTS: i64 = 1000;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Failed to read template {path}: {source}")]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Render(#[from] TemplateError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("No free artifact name for {0} after repeated collisions")]
    NameExhausted(String),

    #[error("Render task failed: {0}")]
    RenderTask(#[from] tokio::task::JoinError),
}

/// A rendered document waiting in the output directory.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedArtifact {
    pub kind: String,
    pub file_name: String,
    /// Absolute path, for logs and the single-document response
    pub path: PathBuf,
    pub download_url: String,
}

/// Replace each non-alphanumeric character with `-`, collapse repeats and
/// trim separators from both ends.
pub fn sanitize_company_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

/// `<kind>-<company>-<millis>.docx`; the company segment is dropped when empty.
pub fn artifact_file_name(kind: &str, company_name: &str, timestamp_ms: i64) -> String {
    let kind = sanitize_company_name(kind);
    let company = sanitize_company_name(company_name);
    if company.is_empty() {
        format!("{kind}-{timestamp_ms}.{DOCX_EXTENSION}")
    } else {
        format!("{kind}-{company}-{timestamp_ms}.{DOCX_EXTENSION}")
    }
}

pub struct DocumentGenerator {
    store: ArtifactStore,
    download_base_url: String,
    options: RenderOptions,
}

impl DocumentGenerator {
    /// `download_base_url` is the scheme/host/port prefix of download links.
    pub fn new(store: ArtifactStore, download_base_url: impl Into<String>) -> Self {
        Self {
            store,
            download_base_url: download_base_url.into().trim_end_matches('/').to_string(),
            options: RenderOptions { linebreaks: true },
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn download_url(&self, file_name: &str) -> String {
        format!("{}/download/{}", self.download_base_url, file_name)
    }

    pub async fn generate(
        &self,
        kind: &str,
        descriptor: &TemplateDescriptor,
        variables: &ResolvedVariableSet,
        company_name: &str,
    ) -> Result<GeneratedArtifact, GenerateError> {
        self.generate_at(
            kind,
            descriptor,
            variables,
            company_name,
            Utc::now().timestamp_millis(),
        )
        .await
    }

    /// Render and publish, naming the artifact after `timestamp_ms`.
    ///
    /// When the name is taken the timestamp is bumped by a millisecond until
    /// a free one is found.
    pub async fn generate_at(
        &self,
        kind: &str,
        descriptor: &TemplateDescriptor,
        variables: &ResolvedVariableSet,
        company_name: &str,
        timestamp_ms: i64,
    ) -> Result<GeneratedArtifact, GenerateError> {
        tracing::debug!(kind, ?variables, "Template variables");

        let bytes = tokio::fs::read(&descriptor.path)
            .await
            .map_err(|source| GenerateError::TemplateRead {
                path: descriptor.path.clone(),
                source,
            })?;

        let values = variables.as_map().clone();
        let options = self.options.clone();
        let task_kind = kind.to_string();
        let rendered = tokio::task::spawn_blocking(move || {
            render_document(&task_kind, &bytes, &values, &options)
        })
        .await??;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let file_name = artifact_file_name(kind, company_name, timestamp_ms + attempt);
            match self.store.write_new(&file_name, &rendered).await {
                Ok(path) => {
                    tracing::info!(kind, "Generated {} ({} bytes)", path.display(), rendered.len());
                    return Ok(GeneratedArtifact {
                        kind: kind.to_string(),
                        download_url: self.download_url(&file_name),
                        file_name,
                        path,
                    });
                }
                Err(StoreError::AlreadyExists(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(GenerateError::NameExhausted(kind.to_string()))
    }

    /// Remove an artifact that will never be handed out.
    pub async fn discard(&self, artifact: &GeneratedArtifact) {
        if let Err(e) = self.store.discard(&artifact.file_name).await {
            tracing::error!("Failed to discard {}: {}", artifact.file_name, e);
        }
    }
}

/// Parse and render one template. Runs on the blocking pool.
fn render_document(
    kind: &str,
    bytes: &[u8],
    values: &BTreeMap<String, String>,
    options: &RenderOptions,
) -> Result<Vec<u8>, TemplateError> {
    let template = DocxTemplate::from_bytes(bytes)?;
    match template.tags() {
        Ok(tags) => tracing::debug!(kind, ?tags, "Tags found in template"),
        Err(e) => tracing::debug!(kind, "Tag inspection failed: {}", e),
    }

    template.render(values, options).map_err(|e| {
        tracing::warn!(kind, "Template error: {}", e);
        e
    })
}
