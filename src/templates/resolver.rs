//! Variable Resolver
//!
//! Turns a caller's free-form field map into the exact variable set a
//! template consumes: every declared input must be present and non-empty,
//! and the company title is derived rather than read from the caller.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::Value;

use super::descriptor::{InputDeclaration, TemplateDescriptor, TitleSource, TITLE_VARIABLE};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Missing required variable: {0}")]
    MissingRequiredVariable(String),
}

/// Inbound caller fields. Keys are whatever the client sent.
#[derive(Debug, Clone, Default)]
pub struct RequestFieldMap {
    fields: HashMap<String, Option<String>>,
}

impl RequestFieldMap {
    /// Build from a JSON object body. Only string values count as supplied;
    /// `null`, numbers, booleans and nested values are kept as absent.
    pub fn from_json(body: &serde_json::Map<String, Value>) -> Self {
        let fields = body
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => Some(s.clone()),
                    _ => None,
                };
                (key.clone(), value)
            })
            .collect();
        Self { fields }
    }

    /// Supplied, non-empty value of `key`. Empty strings count as missing.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(|v| v.as_deref())
            .filter(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequestFieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), Some(v.into())))
                .collect(),
        }
    }
}

/// Variable name -> value, ready for the template engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResolvedVariableSet {
    variables: BTreeMap<String, String>,
}

impl ResolvedVariableSet {
    pub fn get(&self, variable: &str) -> Option<&str> {
        self.variables.get(variable).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.variables
    }
}

/// Resolves request fields against declared template inputs
pub struct VariableResolver;

impl VariableResolver {
    /// Resolve the variables for one descriptor.
    pub fn resolve_descriptor(
        fields: &RequestFieldMap,
        descriptor: &TemplateDescriptor,
    ) -> Result<ResolvedVariableSet, ResolveError> {
        Self::resolve(fields, &descriptor.inputs, descriptor.title_source)
    }

    /// Resolve `inputs` from `fields`.
    ///
    /// Inputs are checked in declaration order and the first missing one is
    /// reported. The derived title is checked last, against its source field.
    pub fn resolve(
        fields: &RequestFieldMap,
        inputs: &[InputDeclaration],
        title_source: TitleSource,
    ) -> Result<ResolvedVariableSet, ResolveError> {
        let mut variables = BTreeMap::new();

        for input in inputs.iter().filter(|input| !input.is_derived()) {
            let variable = input.variable();
            let value = fields
                .get(&variable)
                .ok_or_else(|| ResolveError::MissingRequiredVariable(input.name.clone()))?;
            variables.insert(variable, value.to_string());
        }

        let source = fields
            .get(title_source.variable())
            .ok_or_else(|| ResolveError::MissingRequiredVariable(title_source.name().to_string()))?;
        variables.insert(TITLE_VARIABLE.to_string(), company_title(source).to_string());

        Ok(ResolvedVariableSet { variables })
    }
}

/// First whitespace-delimited token of `source`.
fn company_title(source: &str) -> &str {
    source.split_whitespace().next().unwrap_or("")
}
