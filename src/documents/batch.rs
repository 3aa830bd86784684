//! All-or-nothing generation of one or more document kinds.

use thiserror::Error;

use super::generator::{DocumentGenerator, GenerateError, GeneratedArtifact};
use crate::templates::{RequestFieldMap, ResolveError, TemplateCatalog, VariableResolver};

/// Field whose sanitized value names the generated files.
const COMPANY_NAME_FIELD: &str = "companyName";

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("No document type selected")]
    NothingSelected,

    #[error("Unknown document type: {0}")]
    UnknownKind(String),

    #[error("{source}")]
    Resolve {
        kind: String,
        #[source]
        source: ResolveError,
    },

    #[error("{source}")]
    Generate {
        kind: String,
        #[source]
        source: GenerateError,
    },
}

impl BatchError {
    /// Document kind the failure belongs to, when there is one.
    pub fn kind(&self) -> Option<&str> {
        match self {
            BatchError::NothingSelected => None,
            BatchError::UnknownKind(kind)
            | BatchError::Resolve { kind, .. }
            | BatchError::Generate { kind, .. } => Some(kind.as_str()),
        }
    }
}

/// Resolve every kind first, then render them in order.
///
/// Nothing is rendered unless every kind resolves. If a later render fails,
/// artifacts already written for this batch are discarded.
pub async fn generate_batch(
    catalog: &TemplateCatalog,
    generator: &DocumentGenerator,
    fields: &RequestFieldMap,
    kinds: &[String],
) -> Result<Vec<GeneratedArtifact>, BatchError> {
    if kinds.is_empty() {
        return Err(BatchError::NothingSelected);
    }

    let mut plan = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let descriptor = catalog
            .get(kind)
            .ok_or_else(|| BatchError::UnknownKind(kind.clone()))?;
        let variables = VariableResolver::resolve_descriptor(fields, descriptor).map_err(
            |source| BatchError::Resolve {
                kind: kind.clone(),
                source,
            },
        )?;
        plan.push((kind, descriptor, variables));
    }

    let company_name = fields.get(COMPANY_NAME_FIELD).unwrap_or_default();
    let mut generated: Vec<GeneratedArtifact> = Vec::with_capacity(plan.len());

    for (kind, descriptor, variables) in plan {
        match generator
            .generate(kind, descriptor, &variables, company_name)
            .await
        {
            Ok(artifact) => generated.push(artifact),
            Err(source) => {
                for artifact in &generated {
                    generator.discard(artifact).await;
                }
                return Err(BatchError::Generate {
                    kind: kind.clone(),
                    source,
                });
            }
        }
    }

    Ok(generated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::ArtifactStore;
    use crate::templates::{InputDeclaration, TemplateDescriptor};
    use docx_template::fixture;

    struct Fixture {
        dir: tempfile::TempDir,
        catalog: TemplateCatalog,
        generator: DocumentGenerator,
    }

    fn setup(msa_body: &[&[&str]]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let nda_path = dir.path().join("nda.docx");
        let msa_path = dir.path().join("msa.docx");
        std::fs::write(
            &nda_path,
            fixture::docx_with_paragraphs(&[&["NDA for {companyName}"]]),
        )
        .unwrap();
        std::fs::write(&msa_path, fixture::docx_with_paragraphs(msa_body)).unwrap();

        let catalog = TemplateCatalog::from_descriptors([
            (
                "nda".to_string(),
                TemplateDescriptor::new(
                    nda_path,
                    vec![
                        InputDeclaration::new("Company Name", "$companyName"),
                        InputDeclaration::new("Signer Name", "$signerName"),
                    ],
                ),
            ),
            (
                "msa".to_string(),
                TemplateDescriptor::new(
                    msa_path,
                    vec![
                        InputDeclaration::new("Company Name", "$companyName"),
                        InputDeclaration::new("Service Term", "$serviceTerm"),
                    ],
                ),
            ),
        ])
        .unwrap();

        let generator = DocumentGenerator::new(
            ArtifactStore::new(dir.path().join("output")),
            "http://localhost:3000",
        );
        Fixture {
            dir,
            catalog,
            generator,
        }
    }

    fn output_files(fx: &Fixture) -> Vec<String> {
        match std::fs::read_dir(fx.dir.path().join("output")) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_file())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_generates_every_selected_kind() {
        let fx = setup(&[&["MSA {serviceTerm}"]]);
        let fields: RequestFieldMap = [
            ("companyName", "Acme Corp"),
            ("signerName", "Jane"),
            ("serviceTerm", "12 months"),
        ]
        .into_iter()
        .collect();

        let artifacts = generate_batch(
            &fx.catalog,
            &fx.generator,
            &fields,
            &["nda".to_string(), "msa".to_string()],
        )
        .await
        .unwrap();

        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].kind, "nda");
        assert_eq!(artifacts[1].kind, "msa");
        assert!(artifacts[1].file_name.starts_with("msa-Acme-Corp-"));
        assert_eq!(output_files(&fx).len(), 2);
    }

    #[tokio::test]
    async fn test_resolution_failure_aborts_before_rendering() {
        let fx = setup(&[&["MSA {serviceTerm}"]]);
        let fields: RequestFieldMap = [("companyName", "Acme Corp"), ("signerName", "Jane")]
            .into_iter()
            .collect();

        let err = generate_batch(
            &fx.catalog,
            &fx.generator,
            &fields,
            &["nda".to_string(), "msa".to_string()],
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), Some("msa"));
        assert_eq!(err.to_string(), "Missing required variable: Service Term");
        assert!(output_files(&fx).is_empty());
    }

    #[tokio::test]
    async fn test_render_failure_discards_earlier_artifacts() {
        let fx = setup(&[&["MSA {serviceTerm} {missingTag}"]]);
        let fields: RequestFieldMap = [
            ("companyName", "Acme Corp"),
            ("signerName", "Jane"),
            ("serviceTerm", "12 months"),
        ]
        .into_iter()
        .collect();

        let err = generate_batch(
            &fx.catalog,
            &fx.generator,
            &fields,
            &["nda".to_string(), "msa".to_string()],
        )
        .await
        .unwrap_err();

        assert!(matches!(err, BatchError::Generate { ref kind, .. } if kind == "msa"));
        assert!(err.to_string().contains("{missingTag}"));
        assert!(output_files(&fx).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_and_empty_selection() {
        let fx = setup(&[&["MSA"]]);
        let fields = RequestFieldMap::default();

        let err = generate_batch(&fx.catalog, &fx.generator, &fields, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::NothingSelected));

        let err = generate_batch(&fx.catalog, &fx.generator, &fields, &["sow".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::UnknownKind(ref k) if k == "sow"));
    }
}
