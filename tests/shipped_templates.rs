//! The catalog and templates that ship with the server must agree.
//!
//! Integration tests run from the package root, where the catalog's
//! relative template paths resolve.

use std::collections::BTreeSet;
use std::path::Path;

use docgen::documents::{generate_batch, ArtifactStore, DocumentGenerator};
use docgen::templates::{RequestFieldMap, TemplateCatalog};
use docgen::ServerConfig;
use docx_template::{fixture, DocxTemplate};

fn shipped_catalog() -> TemplateCatalog {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/templates.yaml");
    TemplateCatalog::from_file(path).expect("shipped catalog loads")
}

fn full_form() -> RequestFieldMap {
    [
        ("companyName", "Acme Corp"),
        ("companyAddress", "1 Main St\nSpringfield"),
        ("effectiveDate", "2024-01-15"),
        ("serviceTerm", "12 months"),
        ("signerName", "Jane Doe"),
        ("signerTitle", "CEO"),
    ]
    .into_iter()
    .collect()
}

#[test]
fn test_shipped_templates_use_exactly_their_declared_inputs() {
    let catalog = shipped_catalog();
    assert_eq!(catalog.kinds().collect::<Vec<_>>(), vec!["msa", "nda"]);

    for kind in catalog.kinds() {
        let descriptor = catalog.get(kind).unwrap();
        let bytes = std::fs::read(&descriptor.path).unwrap();
        let tags: BTreeSet<String> = DocxTemplate::from_bytes(&bytes)
            .unwrap()
            .tags()
            .unwrap()
            .into_iter()
            .collect();
        let declared: BTreeSet<String> =
            descriptor.inputs.iter().map(|input| input.variable()).collect();
        assert_eq!(tags, declared, "template tags of {kind} drifted from the catalog");
    }
}

#[test]
fn test_default_kind_is_shipped() {
    let config = ServerConfig::from_lookup(|_| None).unwrap();
    assert!(shipped_catalog().contains(&config.default_kind));
}

#[tokio::test]
async fn test_shipped_templates_render_with_a_full_form() {
    let catalog = shipped_catalog();
    let dir = tempfile::tempdir().unwrap();
    let generator = DocumentGenerator::new(
        ArtifactStore::new(dir.path().join("output")),
        "http://localhost:3000",
    );
    let kinds: Vec<String> = catalog.kinds().map(str::to_string).collect();

    let artifacts = generate_batch(&catalog, &generator, &full_form(), &kinds)
        .await
        .expect("every shipped template renders");
    assert_eq!(artifacts.len(), 2);

    for artifact in &artifacts {
        let text = fixture::paragraph_texts(&std::fs::read(&artifact.path).unwrap()).join("\n");
        assert!(!text.contains('{') && !text.contains('}'), "{}: {text}", artifact.kind);
        assert!(text.contains("Acme Corp (\"Acme\")"), "{}: {text}", artifact.kind);
        assert!(text.contains("1 Main St\nSpringfield"));
        assert!(text.contains("Name: Jane Doe"));
        assert!(text.contains("Title: CEO"));
    }

    let msa = artifacts.iter().find(|a| a.kind == "msa").unwrap();
    let text = fixture::paragraph_texts(&std::fs::read(&msa.path).unwrap()).join("\n");
    assert!(text.contains("continues for 12 months"));
}
