//! Errors reported by the template engine

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template archive is not readable: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Template part {part} is not valid UTF-8")]
    Encoding { part: String },

    #[error("Template is missing required part {0}")]
    MissingPart(String),

    #[error("I/O error while packaging document: {0}")]
    Io(#[from] std::io::Error),

    /// One or more tags could not be rendered. Every problem found in the
    /// template is collected before failing.
    #[error("{}", .explanations.join("\n"))]
    Render { explanations: Vec<String> },
}

impl TemplateError {
    /// Human-readable explanations, one per problem found.
    pub fn explanations(&self) -> Vec<String> {
        match self {
            TemplateError::Render { explanations } => explanations.clone(),
            other => vec![other.to_string()],
        }
    }
}
