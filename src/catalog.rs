use std::collections::HashMap;

use log::trace;
use serde::{Deserialize, Serialize};

/// Field types as exported by the project's data dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Notes,
    Checkbox,
    Radio,
    Dropdown,
    Yesno,
    Truefalse,
    File,
    Calc,
    Descriptive,
    Slider,
    Sql,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub identifier: bool,
    /// Text validation name such as `date_ymd` or `email`
    #[serde(default)]
    pub validation: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub instrument: Option<String>,
}

impl FieldMeta {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            ..Default::default()
        }
    }

    pub fn identifier(mut self) -> Self {
        self.identifier = true;
        self
    }

    pub fn with_validation(mut self, validation: &str) -> Self {
        self.validation = Some(validation.to_string());
        self
    }

    pub fn with_instrument(mut self, instrument: &str) -> Self {
        self.instrument = Some(instrument.to_string());
        self
    }

    /// Sets the choices from a data-dictionary string such as `1, Yes | 0, No`.
    pub fn with_choices(mut self, raw: &str) -> Self {
        self.choices = parse_choices(raw);
        self
    }

    pub fn is_checkbox(&self) -> bool {
        self.field_type == FieldType::Checkbox
    }

    /// Date, datetime and time validated text fields.
    pub fn is_temporal(&self) -> bool {
        self.field_type == FieldType::Text
            && self
                .validation
                .as_deref()
                .is_some_and(|v| v.starts_with("date") || v.starts_with("time"))
    }

    /// Free text that can carry anything the respondent typed.
    pub fn is_free_text(&self) -> bool {
        match self.field_type {
            FieldType::Notes => true,
            FieldType::Text => self.validation.as_deref().is_none_or(str::is_empty),
            _ => false,
        }
    }

    pub fn has_choice_label(&self, label: &str) -> bool {
        self.choices.iter().any(|c| c.label == label)
    }
}

/// Splits `value, label | value, label` into ordered choices.
pub fn parse_choices(raw: &str) -> Vec<Choice> {
    raw.split('|')
        .filter_map(|entry| {
            let (value, label) = entry.split_once(',')?;
            let value = value.trim();
            if value.is_empty() {
                return None;
            }
            Some(Choice {
                value: value.to_string(),
                label: label.trim().to_string(),
            })
        })
        .collect()
}

/// Read-only snapshot of a project's fields and their instruments.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldCatalog {
    #[serde(default)]
    fields: HashMap<String, FieldMeta>,
    #[serde(default)]
    instruments: Vec<String>,
}

impl FieldCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_field(&mut self, name: &str, meta: FieldMeta) -> &mut Self {
        if let Some(instrument) = &meta.instrument {
            if !self.instruments.contains(instrument) {
                self.instruments.push(instrument.clone());
            }
        }
        self.fields.insert(name.to_string(), meta);
        self
    }

    pub fn insert_instrument(&mut self, name: &str) -> &mut Self {
        if !self.instruments.iter().any(|i| i == name) {
            self.instruments.push(name.to_string());
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.get(name)
    }

    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    /// Returns the instrument behind a `{instrument}_complete` or
    /// `{instrument}_timestamp` field name.
    pub fn synthetic_instrument(&self, name: &str) -> Option<&str> {
        let stem = name
            .strip_suffix("_complete")
            .or_else(|| name.strip_suffix("_timestamp"))?;
        self.instruments
            .iter()
            .find(|i| i.as_str() == stem)
            .map(String::as_str)
    }

    pub fn is_synthetic(&self, name: &str) -> bool {
        self.synthetic_instrument(name).is_some()
    }

    /// True for catalog fields and the synthetic completion/timestamp fields.
    pub fn is_known(&self, name: &str) -> bool {
        self.fields.contains_key(name) || self.is_synthetic(name)
    }

    pub fn instrument_of(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(meta) => meta.instrument.as_deref(),
            None => self.synthetic_instrument(name),
        }
    }
}

/// Ordered event names. Empty for classical projects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventCatalog {
    events: Vec<String>,
}

impl EventCatalog {
    pub fn new(events: Vec<String>) -> Self {
        Self { events }
    }

    pub fn is_longitudinal(&self) -> bool {
        !self.events.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.events.iter().any(|e| e == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.events.iter().position(|e| e == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.events.iter()
    }
}

impl<S: Into<String>> FromIterator<S> for EventCatalog {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// Both catalogs of one project, passed together into every core call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectCatalogs {
    #[serde(default)]
    pub fields: FieldCatalog,
    #[serde(default)]
    pub events: EventCatalog,
}

impl ProjectCatalogs {
    pub fn new(fields: FieldCatalog, events: EventCatalog) -> Self {
        Self { fields, events }
    }

    pub fn is_event(&self, name: &str) -> bool {
        let found = self.events.contains(name);
        trace!("Event lookup '{}': {}", name, found);
        found
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    #[default]
    Full,
    DeIdentified,
    IdentifiersRemoved,
}

impl AccessLevel {
    pub fn hides_identifiers(&self) -> bool {
        matches!(self, AccessLevel::DeIdentified | AccessLevel::IdentifiersRemoved)
    }
}

/// One event/instance slice of a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecordRow {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub repeat_instrument: Option<String>,
    #[serde(default)]
    pub repeat_instance: Option<u32>,
    #[serde(default)]
    pub values: HashMap<String, String>,
}

impl RawRecordRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_event(mut self, event: &str) -> Self {
        self.event = Some(event.to_string());
        self
    }

    pub fn repeating(mut self, instrument: &str, instance: u32) -> Self {
        self.repeat_instrument = Some(instrument.to_string());
        self.repeat_instance = Some(instance);
        self
    }

    /// Marks the row as one instance of a repeating event.
    pub fn event_instance(mut self, instance: u32) -> Self {
        self.repeat_instance = Some(instance);
        self
    }

    pub fn with(mut self, field: &str, value: &str) -> Self {
        self.values.insert(field.to_string(), value.to_string());
        self
    }
}
