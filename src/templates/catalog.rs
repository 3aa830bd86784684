//! Template catalog - the descriptor set loaded at start-up

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use super::descriptor::{RequiredVariable, TemplateDescriptor};
use crate::config::ConfigError;

/// Read-only mapping of document kind to descriptor.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    kinds: BTreeMap<String, TemplateDescriptor>,
}

impl TemplateCatalog {
    /// Load and validate a catalog file (YAML, or JSON which parses as YAML).
    ///
    /// ```yaml
    /// nda:
    ///   path: templates/nda.docx
    ///   inputs:
    ///     - name: Company Name
    ///       alias: $companyName
    /// ```
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::CatalogRead {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_yaml_str(&content)?;
        catalog.check_template_files()?;
        Ok(catalog)
    }

    /// Parse and validate catalog content without touching the filesystem.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let kinds: BTreeMap<String, TemplateDescriptor> = serde_yaml::from_str(content)?;
        Self::from_descriptors(kinds)
    }

    pub fn from_descriptors(
        kinds: impl IntoIterator<Item = (String, TemplateDescriptor)>,
    ) -> Result<Self, ConfigError> {
        let catalog = Self {
            kinds: kinds.into_iter().collect(),
        };
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.kinds.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        for (kind, descriptor) in &self.kinds {
            let mut seen = HashSet::new();
            for input in &descriptor.inputs {
                let variable = input.variable();
                if variable.is_empty() {
                    return Err(ConfigError::EmptyVariable {
                        kind: kind.clone(),
                        name: input.name.clone(),
                    });
                }
                if !seen.insert(variable.clone()) {
                    return Err(ConfigError::DuplicateVariable {
                        kind: kind.clone(),
                        variable,
                    });
                }
            }
        }
        Ok(())
    }

    fn check_template_files(&self) -> Result<(), ConfigError> {
        for (kind, descriptor) in &self.kinds {
            if !descriptor.path.is_file() {
                return Err(ConfigError::TemplateMissing {
                    kind: kind.clone(),
                    path: descriptor.path.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, kind: &str) -> Option<&TemplateDescriptor> {
        self.kinds.get(kind)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Required inputs of every listed kind, first occurrence of each variable kept.
    pub fn required_variables_for(&self, kinds: &[String]) -> Vec<RequiredVariable> {
        let mut seen = HashSet::new();
        kinds
            .iter()
            .filter_map(|kind| self.kinds.get(kind))
            .flat_map(TemplateDescriptor::required_variables)
            .filter(|required| seen.insert(required.variable.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
nda:
  path: templates/nda.docx
  inputs:
    - name: Company Name
      alias: $companyName
    - name: Signer Name
      alias: $signerName
msa:
  path: templates/msa.docx
  title_source: company_address
  inputs:
    - name: Company Name
      alias: $companyName
    - name: Company Address
      alias: $companyAddress
"#;

    #[test]
    fn test_parses_yaml_catalog() {
        let catalog = TemplateCatalog::from_yaml_str(CATALOG).unwrap();
        assert_eq!(catalog.kinds().collect::<Vec<_>>(), vec!["msa", "nda"]);
        assert_eq!(catalog.get("nda").unwrap().inputs.len(), 2);
        assert!(catalog.contains("msa"));
        assert!(!catalog.contains("sow"));
    }

    #[test]
    fn test_parses_json_catalog() {
        let json = r#"{"nda": {"path": "nda.docx", "inputs": [{"name": "Company Name", "alias": "$companyName"}]}}"#;
        let catalog = TemplateCatalog::from_yaml_str(json).unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_rejects_duplicate_variables() {
        let yaml = r#"
nda:
  path: nda.docx
  inputs:
    - name: Company Name
      alias: $companyName
    - name: Company
      alias: companyName
"#;
        let err = TemplateCatalog::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::DuplicateVariable { ref kind, ref variable } if kind == "nda" && variable == "companyName"
        ));
    }

    #[test]
    fn test_rejects_empty_catalog() {
        let err = TemplateCatalog::from_yaml_str("{}").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyCatalog));
    }

    #[test]
    fn test_from_file_requires_template_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("templates.yaml");
        std::fs::write(&config, CATALOG).unwrap();

        let err = TemplateCatalog::from_file(&config).unwrap_err();
        assert!(matches!(err, ConfigError::TemplateMissing { .. }));
    }

    #[test]
    fn test_required_variables_are_merged_across_kinds() {
        let catalog = TemplateCatalog::from_yaml_str(CATALOG).unwrap();
        let required = catalog.required_variables_for(&["nda".to_string(), "msa".to_string()]);
        let variables: Vec<_> = required.iter().map(|r| r.variable.as_str()).collect();
        assert_eq!(variables, vec!["companyName", "signerName", "companyAddress"]);
    }
}
