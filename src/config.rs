//! Server configuration
//!
//! Reads config from env vars (a `.env` file is honoured by the binary):
//!   HOST                         - host used in download links (default: localhost, may include `:port`)
//!   PORT                         - listen port (default: 3000)
//!   BIND_ADDR                    - listen address (default: 0.0.0.0:$PORT)
//!   PUBLIC_BASE_URL              - overrides the download link base entirely
//!   TEMPLATE_CONFIG              - template catalog file (default: config/templates.yaml)
//!   OUTPUT_DIR                   - transient artifact directory (default: output)
//!   DEFAULT_DOCUMENT_KIND        - kind generated when the body selects none (default: nda)
//!   ARTIFACT_TTL_SECS            - enables the retention sweep for undownloaded artifacts (> 0)
//!   ARTIFACT_SWEEP_INTERVAL_SECS - sweep period (default: 60)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Failed to read template catalog {path}: {source}")]
    CatalogRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Template catalog is not valid: {0}")]
    CatalogParse(#[from] serde_yaml::Error),

    #[error("Template catalog declares no document kinds")]
    EmptyCatalog,

    #[error("Template '{kind}' declares input '{name}' with an empty variable name")]
    EmptyVariable { kind: String, name: String },

    #[error("Template '{kind}' declares variable '{variable}' more than once")]
    DuplicateVariable { kind: String, variable: String },

    #[error("Template '{kind}' points at missing file {path}")]
    TemplateMissing { kind: String, path: PathBuf },

    #[error("Default document kind '{0}' is not in the template catalog")]
    UnknownDefaultKind(String),
}

/// Retention policy for artifacts that are never downloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionConfig {
    pub ttl: Duration,
    pub sweep_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub bind_addr: String,
    pub public_base_url: Option<String>,
    pub template_config: PathBuf,
    pub output_dir: PathBuf,
    pub default_kind: String,
    /// `None` keeps undownloaded artifacts forever
    pub retention: Option<RetentionConfig>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(raw) => parse_value("PORT", &raw)?,
            None => DEFAULT_PORT,
        };
        let host = get("HOST").unwrap_or_else(|| "localhost".to_string());
        let bind_addr = get("BIND_ADDR").unwrap_or_else(|| format!("0.0.0.0:{port}"));

        let retention = match get("ARTIFACT_TTL_SECS") {
            Some(raw) => {
                let ttl = parse_value::<u64>("ARTIFACT_TTL_SECS", &raw)?;
                if ttl == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "ARTIFACT_TTL_SECS",
                        value: raw,
                    });
                }
                let interval = match get("ARTIFACT_SWEEP_INTERVAL_SECS") {
                    Some(raw) => parse_value::<u64>("ARTIFACT_SWEEP_INTERVAL_SECS", &raw)?,
                    None => DEFAULT_SWEEP_INTERVAL_SECS,
                };
                if interval == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "ARTIFACT_SWEEP_INTERVAL_SECS",
                        value: "0".to_string(),
                    });
                }
                Some(RetentionConfig {
                    ttl: Duration::from_secs(ttl),
                    sweep_interval: Duration::from_secs(interval),
                })
            }
            None => None,
        };

        Ok(Self {
            host,
            port,
            bind_addr,
            public_base_url: get("PUBLIC_BASE_URL"),
            template_config: get("TEMPLATE_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("config/templates.yaml")),
            output_dir: get("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("output")),
            default_kind: get("DEFAULT_DOCUMENT_KIND").unwrap_or_else(|| "nda".to_string()),
            retention,
        })
    }

    /// Base of the download links handed to callers, without a trailing slash.
    pub fn download_base_url(&self) -> String {
        if let Some(url) = &self.public_base_url {
            return url.trim_end_matches('/').to_string();
        }
        if self.host.contains(':') {
            format!("http://{}", self.host)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}
