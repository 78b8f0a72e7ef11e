use log::trace;

use crate::catalog::{AccessLevel, FieldCatalog, FieldMeta, FieldType, RawRecordRow};
use crate::markup::strip_tags;
use crate::settings::Settings;
use crate::types::{FieldMap, FieldValue};

/// Turns one raw row into display values, applying the caller's access level.
///
/// Synthetic `{instrument}_complete`/`{instrument}_timestamp` values pass
/// through verbatim. Fields missing from the catalog are cleaned like text.
pub fn reshape(
    row: &RawRecordRow,
    fields: &FieldCatalog,
    access: AccessLevel,
    settings: &Settings,
) -> FieldMap {
    row.values
        .iter()
        .map(|(name, raw)| {
            let value = match fields.get(name) {
                None if fields.is_synthetic(name) => FieldValue::Text(raw.clone()),
                meta => reshape_value(raw, meta, access, settings),
            };
            (name.clone(), value)
        })
        .collect()
}

fn reshape_value(
    raw: &str,
    meta: Option<&FieldMeta>,
    access: AccessLevel,
    settings: &Settings,
) -> FieldValue {
    let Some(meta) = meta else {
        return FieldValue::Text(clean(raw));
    };

    if meta.is_checkbox() {
        return checkbox_value(raw, meta, access, settings);
    }

    if is_redacted(meta, access) {
        trace!("Redacting value under {:?}", access);
        return FieldValue::Text(settings.redaction_placeholder.clone());
    }

    if meta.field_type == FieldType::Notes {
        return FieldValue::Text(notes_to_markup(raw));
    }

    FieldValue::Text(clean(raw))
}

fn is_redacted(meta: &FieldMeta, access: AccessLevel) -> bool {
    let free_or_dated = meta.is_free_text() || meta.is_temporal();
    (access == AccessLevel::DeIdentified && free_or_dated)
        || (access.hides_identifiers() && meta.identifier)
}

/// Selected choices arrive as a comma separated list of codes (labels are
/// accepted too). Labels come back in choice-list order.
fn checkbox_value(
    raw: &str,
    meta: &FieldMeta,
    access: AccessLevel,
    settings: &Settings,
) -> FieldValue {
    if meta.identifier && access.hides_identifiers() {
        return FieldValue::Checkbox {
            labels: Vec::new(),
            all_values: settings.redaction_placeholder.clone(),
        };
    }

    let selected: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let labels: Vec<String> = meta
        .choices
        .iter()
        .filter(|c| selected.contains(&c.value.as_str()) || selected.contains(&c.label.as_str()))
        .map(|c| c.label.clone())
        .collect();
    let all_values = labels.join(&settings.all_values_separator);

    FieldValue::Checkbox { labels, all_values }
}

fn clean(raw: &str) -> String {
    strip_tags(raw).trim().to_string()
}

fn notes_to_markup(raw: &str) -> String {
    let escaped = html_escape::encode_safe(raw.trim());
    escaped.replace("\r\n", "\n").replace('\n', "<br />\n")
}
