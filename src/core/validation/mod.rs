pub mod blocks;
pub mod grammar;
pub mod references;
pub mod tokenizer;

use log::{debug, trace};

pub use blocks::{BlockMarker, MarkerKind, Position, find_markers, validate_blocks};
pub use grammar::{validate_expression_text, validate_grammar};
pub use references::{referenced_chains, validate_references};
pub use tokenizer::{Token, tokenize};

use crate::catalog::ProjectCatalogs;
use crate::errors::{ErrorCategory, ValidationError};

/// One `{...}` body found in a template, entity-decoded and trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub line: usize,
    pub body: String,
}

/// Pulls every `{...}` expression out of one line.
///
/// A line whose `{` and `}` counts differ yields an error and no expressions.
pub fn extract_expressions(text: &str, line: usize) -> Result<Vec<Expression>, ValidationError> {
    let opens = text.matches('{').count();
    let closes = text.matches('}').count();
    if opens != closes {
        return Err(ValidationError::syntax(
            line,
            format!("Unbalanced braces: {} '{{' and {} '}}'", opens, closes),
        ));
    }

    let mut expressions = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            break;
        };
        let body = html_escape::decode_html_entities(&after[..end]);
        expressions.push(Expression {
            line,
            body: body.trim().to_string(),
        });
        rest = &after[end + 1..];
    }
    Ok(expressions)
}

/// Runs every check on one expression.
pub fn validate_expression(
    expression: &Expression,
    catalogs: &ProjectCatalogs,
) -> Vec<ValidationError> {
    let Expression { line, body } = expression;
    trace!("Validating expression {:?} on line {}", body, line);

    let mut errors = validate_expression_text(body, *line);
    let tokens = tokenize(body);
    errors.extend(validate_grammar(&tokens, *line));
    errors.extend(validate_references(body, *line, &catalogs.fields, &catalogs.events));
    errors
}

/// Validates one region of a template: every expression line by line, then
/// one pass over the region's block markers.
pub fn validate_region(
    text: &str,
    category: ErrorCategory,
    catalogs: &ProjectCatalogs,
) -> Vec<ValidationError> {
    let lines: Vec<&str> = text.lines().collect();
    let mut errors = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        match extract_expressions(line, index + 1) {
            Ok(expressions) => {
                for expression in &expressions {
                    errors.extend(validate_expression(expression, catalogs));
                }
            }
            Err(error) => errors.push(error),
        }
    }
    errors.extend(validate_blocks(&lines));

    debug!("{} region: {} lines, {} errors", category, lines.len(), errors.len());
    errors
        .into_iter()
        .map(|e| e.in_category(category))
        .collect()
}
