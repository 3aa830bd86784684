//! Scalar placeholder substitution for Word (`.docx`) packages.
//!
//! A template is an ordinary `.docx` whose text contains `{placeholder}`
//! tags. Rendering replaces every tag with the supplied value and
//! repackages the archive. Only scalar tags are understood: section and
//! loop markers (`{#x}`, `{/x}`, `{^x}`) are reported as errors.
//!
//! Word freely splits a run of typed text into several `<w:t>` nodes, so a
//! tag such as `{companyName}` may arrive as `{company` + `Name}`. The
//! renderer scans each paragraph as a whole and reassembles tags across
//! node boundaries before substituting.
//!
//! # Example
//!
//! ```no_run
//! use std::collections::BTreeMap;
//! use docx_template::{DocxTemplate, RenderOptions};
//!
//! let bytes = std::fs::read("templates/nda.docx")?;
//! let template = DocxTemplate::from_bytes(&bytes)?;
//! let mut values = BTreeMap::new();
//! values.insert("companyName".to_string(), "Acme Corp".to_string());
//! let rendered: Vec<u8> = template.render(&values, &RenderOptions::default())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod archive;
mod error;
mod render;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixture;

pub use error::TemplateError;
pub use render::{DocxTemplate, RenderOptions};
