//! Template descriptor types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Marker carried by every alias; removing one occurrence gives the variable key.
pub const ALIAS_MARKER: char = '$';

/// Variable computed by the resolver, never read from the caller.
pub const TITLE_VARIABLE: &str = "companyTitle";
pub const TITLE_NAME: &str = "Company Title";

/// One declared template input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDeclaration {
    /// Human-readable label, used in error messages
    pub name: String,
    /// Placeholder token, e.g. `$companyName`
    pub alias: String,
}

impl InputDeclaration {
    pub fn new(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: alias.into(),
        }
    }

    /// Runtime variable key: the alias with exactly one marker removed.
    pub fn variable(&self) -> String {
        self.alias.replacen(ALIAS_MARKER, "", 1)
    }

    pub fn is_derived(&self) -> bool {
        self.variable() == TITLE_VARIABLE
    }
}

/// Field the company title is taken from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleSource {
    #[default]
    CompanyName,
    CompanyAddress,
}

impl TitleSource {
    pub fn variable(&self) -> &'static str {
        match self {
            TitleSource::CompanyName => "companyName",
            TitleSource::CompanyAddress => "companyAddress",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TitleSource::CompanyName => "Company Name",
            TitleSource::CompanyAddress => "Company Address",
        }
    }
}

/// Everything needed to render one document kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDescriptor {
    /// Path to the `.docx` template
    pub path: PathBuf,
    /// Declared inputs, in declaration order
    pub inputs: Vec<InputDeclaration>,
    #[serde(default)]
    pub title_source: TitleSource,
}

impl TemplateDescriptor {
    pub fn new(path: impl Into<PathBuf>, inputs: Vec<InputDeclaration>) -> Self {
        Self {
            path: path.into(),
            inputs,
            title_source: TitleSource::default(),
        }
    }

    pub fn with_title_source(mut self, title_source: TitleSource) -> Self {
        self.title_source = title_source;
        self
    }

    /// Inputs the caller has to supply, i.e. everything except the derived title.
    pub fn required_variables(&self) -> Vec<RequiredVariable> {
        self.inputs
            .iter()
            .filter(|input| !input.is_derived())
            .map(|input| RequiredVariable {
                name: input.name.clone(),
                variable: input.variable(),
            })
            .collect()
    }
}

/// Entry of the `requiredVariables` list returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequiredVariable {
    pub name: String,
    pub variable: String,
}
