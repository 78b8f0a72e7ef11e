use serde::{Deserialize, Serialize};

use crate::errors::TemplateError;

pub const DEFAULT_REDACTION: &str = "[DE-IDENTIFIED]";

/// Per-project knobs for reshaping and rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Text substituted for values the caller may not see
    pub redaction_placeholder: String,
    /// Separator used to build a checkbox's `allValues`
    pub all_values_separator: String,
    /// Value of the `$showLabelAndRow` builtin
    pub show_label_and_row: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            redaction_placeholder: DEFAULT_REDACTION.to_string(),
            all_values_separator: ", ".to_string(),
            show_label_and_row: false,
        }
    }
}

impl Settings {
    pub fn from_json(raw: &str) -> Result<Self, TemplateError> {
        Ok(serde_json::from_str(raw)?)
    }
}
