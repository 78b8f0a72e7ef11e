use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Key under which a checkbox exposes its comma-joined labels.
pub const ALL_VALUES: &str = "allValues";

/// One reshaped field value as seen by the render engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    /// Selected choice labels, in choice-list order, plus their joined form
    Checkbox {
        labels: Vec<String>,
        all_values: String,
    },
}

impl FieldValue {
    /// Blank values never shadow later writes during a merge.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::Checkbox { labels, all_values } => {
                labels.is_empty() && all_values.trim().is_empty()
            }
        }
    }
}

macro_rules! impl_field_value_conversion {
    ($type:ty) => {
        impl From<$type> for FieldValue {
            fn from(value: $type) -> Self {
                FieldValue::Text(value.into())
            }
        }
    };
}

impl_field_value_conversion!(String);
impl_field_value_conversion!(&str);

impl From<&FieldValue> for Value {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Text(text) => Value::String(text.clone()),
            FieldValue::Checkbox { labels, all_values } => {
                let mut map: Map<String, Value> = labels
                    .iter()
                    .enumerate()
                    .map(|(i, label)| (i.to_string(), Value::String(label.clone())))
                    .collect();
                map.insert(ALL_VALUES.to_string(), Value::String(all_values.clone()));
                Value::Object(map)
            }
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Value::from(self).serialize(serializer)
    }
}

pub type FieldMap = BTreeMap<String, FieldValue>;

/// Result of resolving a `$redcap[...]` chain against a context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup<'a> {
    Value(&'a FieldValue),
    AllValues(&'a str),
}

/// The structure handed to a render engine.
///
/// `fields` always holds the unqualified values: the whole record for a
/// classical project, the first event for a longitudinal one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RenderContext {
    pub fields: FieldMap,
    pub events: BTreeMap<String, FieldMap>,
    pub first_event: Option<String>,
    #[serde(rename = "showLabelAndRow")]
    pub show_label_and_row: bool,
}

impl RenderContext {
    pub fn is_longitudinal(&self) -> bool {
        !self.events.is_empty()
    }

    pub fn has_field(&self, event: Option<&str>, field: &str) -> bool {
        match event {
            Some(event) => self
                .events
                .get(event)
                .is_some_and(|fields| fields.contains_key(field)),
            None => self.fields.contains_key(field),
        }
    }

    /// Resolves a bracket path such as `['event']['field']['allValues']`.
    pub fn lookup(&self, path: &[String]) -> Option<Lookup<'_>> {
        let (fields, rest) = match path.split_first() {
            Some((head, rest)) if !rest.is_empty() && self.events.contains_key(head) => {
                (&self.events[head], rest)
            }
            _ => (&self.fields, path),
        };

        let (name, tail) = rest.split_first()?;
        let value = fields.get(name)?;
        match (tail, value) {
            ([], value) => Some(Lookup::Value(value)),
            ([key], FieldValue::Checkbox { all_values, .. }) if key == ALL_VALUES => {
                Some(Lookup::AllValues(all_values))
            }
            // Any field may carry `allValues`; on a plain field it is the value.
            ([key], FieldValue::Text(text)) if key == ALL_VALUES => Some(Lookup::AllValues(text)),
            _ => None,
        }
    }

    /// JSON form for engines that consume plain data.
    ///
    /// Event maps sit next to the unqualified fields, so `$redcap['field']`
    /// and `$redcap['event']['field']` both resolve.
    pub fn to_json(&self) -> Value {
        let mut map: Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v)))
            .collect();
        for (event, fields) in &self.events {
            let event_map: Map<String, Value> = fields
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v)))
                .collect();
            map.insert(event.clone(), Value::Object(event_map));
        }
        serde_json::json!({
            "redcap": map,
            "showLabelAndRow": self.show_label_and_row,
        })
    }
}

impl From<FieldMap> for RenderContext {
    fn from(fields: FieldMap) -> Self {
        RenderContext {
            fields,
            ..Default::default()
        }
    }
}
