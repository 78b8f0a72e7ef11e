use log::{debug, warn};
use serde::Serialize;

pub mod catalog;
pub mod core;
pub mod errors;
pub mod markup;
pub mod settings;
pub mod types;
mod tests;

pub use catalog::{
    AccessLevel, EventCatalog, FieldCatalog, FieldMeta, FieldType, ProjectCatalogs, RawRecordRow,
};
pub use crate::core::data::{merge_record, reshape};
pub use crate::core::prune::prune_empty;
pub use crate::core::render::{BasicRenderer, RenderEngine};
pub use crate::core::validation::{
    tokenize, validate_blocks, validate_grammar, validate_references,
};
pub use errors::{
    DataFault, ErrorCategory, ErrorKind, MarkupError, RenderError, TemplateError, ValidationError,
};
pub use settings::Settings;
pub use types::{FieldValue, RenderContext};

use crate::core::validation::{extract_expressions, referenced_chains, validate_region};

/// A document template: three regions sharing one expression language.
#[derive(Debug, Clone, Default)]
pub struct Template {
    name: String,
    header: String,
    footer: String,
    body: String,
    /// Errors found by the last call to [`Template::validate`]
    errors: Vec<ValidationError>,
}

impl Template {
    /// Re-validates every region and keeps the result.
    ///
    /// Errors never block anything: an invalid template can still be saved
    /// and filled.
    pub fn validate(&mut self, catalogs: &ProjectCatalogs) -> &[ValidationError] {
        self.errors = validate_template(self, catalogs);
        if !self.errors.is_empty() {
            warn!("Template '{}' has {} validation errors", self.name, self.errors.len());
        }
        &self.errors
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn footer(&self) -> &str {
        &self.footer
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    fn regions(&self) -> [(ErrorCategory, &str); 3] {
        [
            (ErrorCategory::Header, &self.header),
            (ErrorCategory::Footer, &self.footer),
            (ErrorCategory::Body, &self.body),
        ]
    }
}

pub trait TemplateFactory {
    /// Creates a new empty template
    fn new() -> Self;
    /// Sets the name of the template
    fn set_name(&mut self, name: &str) -> &mut Self;
    fn set_header(&mut self, text: &str) -> &mut Self;
    fn set_footer(&mut self, text: &str) -> &mut Self;
    fn set_body(&mut self, text: &str) -> &mut Self;
    /// Builds the template
    fn build(&self) -> Template;
}

impl TemplateFactory for Template {
    fn new() -> Self {
        Template::default()
    }
    fn set_name(&mut self, name: &str) -> &mut Self {
        self.name = name.to_string();
        self
    }
    fn set_header(&mut self, text: &str) -> &mut Self {
        self.header = text.to_string();
        self
    }
    fn set_footer(&mut self, text: &str) -> &mut Self {
        self.footer = text.to_string();
        self
    }
    fn set_body(&mut self, text: &str) -> &mut Self {
        self.body = text.to_string();
        self
    }
    fn build(&self) -> Template {
        self.clone()
    }
}

/// Validates every region of a template. Errors are tagged with the region
/// they were found in and ordered header, footer, body.
pub fn validate_template(template: &Template, catalogs: &ProjectCatalogs) -> Vec<ValidationError> {
    let errors: Vec<ValidationError> = template
        .regions()
        .into_iter()
        .flat_map(|(category, text)| validate_region(text, category, catalogs))
        .collect();
    debug!("Validated template '{}': {} errors", template.name, errors.len());
    errors
}

/// The rendered, pruned regions of one template for one record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilledDocument {
    pub header: String,
    pub footer: String,
    pub body: String,
}

/// Fills a template with one record's data.
///
/// The rows are merged into a render context, every field the template
/// references must exist in it, then each region is rendered by `engine` and
/// pruned of markup left empty by hidden blocks.
pub fn fill_template<R: RenderEngine + ?Sized>(
    template: &Template,
    rows: &[RawRecordRow],
    catalogs: &ProjectCatalogs,
    access: AccessLevel,
    settings: &Settings,
    engine: &R,
) -> Result<FilledDocument, TemplateError> {
    let context = merge_record(rows, catalogs, access, settings)?;
    for (_, text) in template.regions() {
        check_references(text, &context, catalogs)?;
    }

    let fill = |text: &str| -> Result<String, TemplateError> {
        let rendered = engine.render(text, &context)?;
        Ok(prune_empty(&rendered)?)
    };

    let document = FilledDocument {
        header: fill(&template.header)?,
        footer: fill(&template.footer)?,
        body: fill(&template.body)?,
    };
    debug!("Filled template '{}' from {} rows", template.name, rows.len());
    Ok(document)
}

fn check_references(
    text: &str,
    context: &RenderContext,
    catalogs: &ProjectCatalogs,
) -> Result<(), DataFault> {
    for (index, line) in text.lines().enumerate() {
        let Ok(expressions) = extract_expressions(line, index + 1) else {
            continue;
        };
        for chain in expressions.iter().flat_map(|e| referenced_chains(&e.body)) {
            let (event, field) = match chain.as_slice() {
                [event, field, ..] if catalogs.is_event(event) => (Some(event.as_str()), field),
                [field, ..] => (None, field),
                [] => continue,
            };
            if !context.has_field(event, field) {
                return Err(DataFault::FieldNotInRecord {
                    field: field.clone(),
                    event: event.map(str::to_string),
                });
            }
        }
    }
    Ok(())
}
