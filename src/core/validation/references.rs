use log::trace;

use super::tokenizer::{Builtin, Token, tokenize};
use crate::catalog::{EventCatalog, FieldCatalog};
use crate::errors::ValidationError;
use crate::types::ALL_VALUES;

/// A run of `['name']` groups and the token index just past it.
struct Chain {
    names: Vec<String>,
    end: usize,
}

fn collect_chain(
    tokens: &[Token],
    start: usize,
    line: usize,
    errors: &mut Vec<ValidationError>,
) -> Chain {
    let mut names = Vec::new();
    let mut j = start;
    while let Some(Token::OpenBracket { .. }) = tokens.get(j) {
        match tokens.get(j + 1) {
            Some(Token::Str { quote: '\'', content }) => names.push(content.trim().to_string()),
            Some(Token::Str { content, .. }) => {
                errors.push(ValidationError::semantic(
                    line,
                    format!("Reference [\"{}\"] must use single quotes", content),
                ));
                names.push(content.trim().to_string());
            }
            Some(other) => {
                errors.push(ValidationError::semantic(
                    line,
                    format!("Reference [{}] must be single-quoted", other),
                ));
            }
            None => {
                errors.push(ValidationError::semantic(line, "Empty reference '['"));
            }
        }
        if let Some(Token::CloseBracket) = tokens.get(j + 2) {
            j += 3;
        } else {
            j += 2;
            break;
        }
    }
    Chain { names, end: j }
}

/// If the `$redcap` at `index` is the second argument of `in_array(...)`,
/// returns the needle.
fn in_array_needle(tokens: &[Token], index: usize, end: usize) -> Option<&str> {
    let start = index.checked_sub(4)?;
    match (&tokens[start..index], tokens.get(end)) {
        (
            [Token::Function(_), Token::OpenParen, needle @ Token::Str { .. }, Token::Comma],
            Some(Token::CloseParen),
        ) => needle.str_content(),
        _ => None,
    }
}

/// Checks every `$redcap[...]` reference of an expression against the catalogs.
pub fn validate_references(
    expression: &str,
    line: usize,
    fields: &FieldCatalog,
    events: &EventCatalog,
) -> Vec<ValidationError> {
    let tokens = tokenize(expression);
    let mut errors = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i] {
            Token::Builtin(Builtin::Redcap) => {
                let chain = collect_chain(&tokens, i + 1, line, &mut errors);
                let needle = in_array_needle(&tokens, i, chain.end);
                check_chain(&chain.names, needle, line, fields, events, &mut errors);
                i = chain.end.max(i + 1);
            }
            Token::OpenBracket { .. } => {
                // stray reference, grammar reports its position; still check quoting
                let chain = collect_chain(&tokens, i, line, &mut errors);
                i = chain.end.max(i + 1);
            }
            _ => i += 1,
        }
    }

    errors
}

/// Every `$redcap[...]` chain of an expression, as bracket names.
pub fn referenced_chains(expression: &str) -> Vec<Vec<String>> {
    let tokens = tokenize(expression);
    let mut ignored = Vec::new();
    let mut chains = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if let Token::Builtin(Builtin::Redcap) = token {
            let chain = collect_chain(&tokens, i + 1, 0, &mut ignored);
            if !chain.names.is_empty() {
                chains.push(chain.names);
            }
        }
    }
    chains
}

fn check_chain(
    names: &[String],
    needle: Option<&str>,
    line: usize,
    fields: &FieldCatalog,
    events: &EventCatalog,
    errors: &mut Vec<ValidationError>,
) {
    trace!("Checking reference chain {:?}", names);
    let Some(first) = names.first() else {
        return;
    };

    let mut rest = names;
    if events.contains(first) && !(names.len() == 1 && fields.is_known(first)) {
        if names.len() == 1 {
            errors.push(ValidationError::semantic(
                line,
                format!("'{}' is an event; add a field reference after it", first),
            ));
            return;
        }
        rest = &names[1..];
    }

    let field = &rest[0];
    if field == ALL_VALUES {
        return;
    }

    let Some(meta) = fields.get(field) else {
        if !fields.is_synthetic(field) {
            let what = if events.is_longitudinal() && rest.len() == names.len() && names.len() > 1 {
                "event or field"
            } else {
                "field"
            };
            errors.push(ValidationError::semantic(
                line,
                format!("Unknown {} '{}'", what, field),
            ));
        }
        check_trailing(field, &rest[1..], line, errors);
        return;
    };

    if meta.is_checkbox() {
        match (rest.get(1), needle) {
            (Some(next), _) if next == ALL_VALUES => {
                check_trailing(field, &rest[2..], line, errors)
            }
            (None, Some(needle)) => {
                if !meta.has_choice_label(needle) {
                    errors.push(ValidationError::semantic(
                        line,
                        format!("'{}' is not a choice of checkbox field '{}'", needle, field),
                    ));
                }
            }
            _ => errors.push(ValidationError::semantic(
                line,
                format!(
                    "Checkbox field '{}' must be followed by ['allValues'] \
                     or used inside in_array()",
                    field
                ),
            )),
        }
        return;
    }

    if needle.is_some() {
        errors.push(ValidationError::semantic(
            line,
            format!("in_array() can only search checkbox fields; '{}' is not one", field),
        ));
    }
    check_trailing(field, &rest[1..], line, errors);
}

fn check_trailing(
    field: &str,
    trailing: &[String],
    line: usize,
    errors: &mut Vec<ValidationError>,
) {
    for name in trailing.iter().filter(|n| n.as_str() != ALL_VALUES) {
        errors.push(ValidationError::semantic(
            line,
            format!("Unexpected ['{}'] after field '{}'", name, field),
        ));
    }
}
