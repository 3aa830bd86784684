//! Shared application state

use std::sync::Arc;

use crate::config::{ConfigError, ServerConfig};
use crate::documents::{ArtifactStore, DocumentGenerator};
use crate::templates::TemplateCatalog;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<TemplateCatalog>,
    pub generator: Arc<DocumentGenerator>,
    pub store: ArtifactStore,
    /// Kind rendered when the request body selects none
    pub default_kind: Arc<str>,
}

impl AppState {
    pub fn new(
        catalog: TemplateCatalog,
        generator: DocumentGenerator,
        default_kind: &str,
    ) -> Result<Self, ConfigError> {
        if !catalog.contains(default_kind) {
            return Err(ConfigError::UnknownDefaultKind(default_kind.to_string()));
        }
        Ok(Self {
            store: generator.store().clone(),
            catalog: Arc::new(catalog),
            generator: Arc::new(generator),
            default_kind: Arc::from(default_kind),
        })
    }

    /// Load the catalog named by `config` and wire the generator to its output directory.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ConfigError> {
        let catalog = TemplateCatalog::from_file(&config.template_config)?;
        let store = ArtifactStore::new(&config.output_dir);
        let generator = DocumentGenerator::new(store, config.download_base_url());
        Self::new(catalog, generator, &config.default_kind)
    }
}
