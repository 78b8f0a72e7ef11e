use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::markup::Rule;

/// Region of a template a validation error was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Header,
    Footer,
    Body,
    General,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Header => write!(f, "header"),
            ErrorCategory::Footer => write!(f, "footer"),
            ErrorCategory::Body => write!(f, "body"),
            ErrorCategory::General => write!(f, "general"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Unbalanced braces/brackets/quotes or illegal token adjacency
    Syntax,
    /// Unknown field/event or illegal checkbox usage
    Semantic,
    /// Unmatched or misplaced if/elseif/else/endif
    Structural,
}

/// One author-facing problem found while validating a template.
///
/// Validation errors are collected, never raised: a template with errors can
/// still be saved and filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub line: usize,
    pub category: ErrorCategory,
    pub kind: ErrorKind,
    pub message: String,
}

impl ValidationError {
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::new(line, ErrorKind::Syntax, message)
    }

    pub fn semantic(line: usize, message: impl Into<String>) -> Self {
        Self::new(line, ErrorKind::Semantic, message)
    }

    pub fn structural(line: usize, message: impl Into<String>) -> Self {
        Self::new(line, ErrorKind::Structural, message)
    }

    fn new(line: usize, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            line,
            category: ErrorCategory::General,
            kind,
            message: message.into(),
        }
    }

    pub fn in_category(mut self, category: ErrorCategory) -> Self {
        self.category = category;
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} line {}: {}", self.category, self.line, self.message)
    }
}

/// Record data that cannot back a fill attempt. Fatal to that attempt only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataFault {
    #[error("The record has no data rows")]
    EmptyRecord,
    #[error("Repeating row for '{instrument}' has no instance number")]
    MissingInstance { instrument: String },
    #[error("Longitudinal record row has no event name")]
    MissingEvent,
    #[error("Field '{field}' does not exist in the record{}", event_suffix(.event))]
    FieldNotInRecord { field: String, event: Option<String> },
}

fn event_suffix(event: &Option<String>) -> String {
    event
        .as_ref()
        .map(|e| format!(" for event '{}'", e))
        .unwrap_or_default()
}

#[derive(Error, Debug)]
pub enum MarkupError {
    #[error("Malformed markup: {0}")]
    Parse(#[from] Box<pest::error::Error<Rule>>),
    #[error("Unexpected markup rule: {0:?}")]
    InvalidRule(Rule),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Line {line}: '{marker}' has no matching opening block")]
    UnexpectedMarker { line: usize, marker: String },
    #[error("Line {line}: block opened here is never closed")]
    UnclosedBlock { line: usize },
    #[error("Line {line}: invalid condition: {message}")]
    Condition { line: usize, message: String },
    #[error("Undefined reference: {0}")]
    UndefinedReference(String),
    #[error("Undefined function: {0}")]
    UndefinedFunction(String),
    #[error("Invalid arguments for function: {0}")]
    FunctionArgs(String),
}

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Data fault: {0}")]
    DataFault(#[from] DataFault),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    #[error("Markup error: {0}")]
    Markup(#[from] MarkupError),
    #[error("Invalid settings: {0}")]
    Settings(#[from] serde_json::Error),
}
