//! Document templates
//!
//! A [`TemplateCatalog`] maps each document kind (`nda`, `msa`, ...) to a
//! [`TemplateDescriptor`]: where the `.docx` lives and which inputs it
//! declares. The catalog is loaded once at start-up and shared read-only.

mod catalog;
mod descriptor;
mod resolver;

pub use catalog::TemplateCatalog;
pub use descriptor::{
    InputDeclaration, RequiredVariable, TemplateDescriptor, TitleSource, ALIAS_MARKER,
    TITLE_NAME, TITLE_VARIABLE,
};
pub use resolver::{RequestFieldMap, ResolveError, ResolvedVariableSet, VariableResolver};
