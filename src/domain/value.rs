//! Typed field values and the conversions applied at input and output
//! boundaries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::field::FieldKind;

pub const DATE_INPUT_FORMAT: &str = "%Y-%m-%d";
pub const DATE_DISPLAY_FORMAT: &str = "%m-%d-%Y";

/// A single entered value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Numeric(f64),
    Text(String),
    Date(NaiveDate),
    #[default]
    Empty,
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Text(text) => text.is_empty(),
            _ => false,
        }
    }

    /// Contribution to subtotals; anything non-numeric counts as zero.
    pub fn as_number(&self) -> f64 {
        match self {
            FieldValue::Numeric(value) => *value,
            _ => 0.0,
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            FieldValue::Numeric(_) => "numeric",
            FieldValue::Text(_) => "text",
            FieldValue::Date(_) => "date",
            FieldValue::Empty => "empty",
        }
    }

    /// Raw text suitable for re-editing the value.
    pub fn to_input_text(&self) -> String {
        match self {
            FieldValue::Numeric(value) => format_number(*value),
            FieldValue::Text(text) => text.clone(),
            FieldValue::Date(date) => date.format(DATE_INPUT_FORMAT).to_string(),
            FieldValue::Empty => String::new(),
        }
    }

    /// Converts a template default (number or string) into a typed value.
    pub fn from_json(kind: &FieldKind, raw: &JsonValue) -> Self {
        match raw {
            JsonValue::Null => FieldValue::Empty,
            JsonValue::Number(number) => match kind {
                FieldKind::Text { .. } => FieldValue::Text(number.to_string()),
                _ => number
                    .as_f64()
                    .map(FieldValue::Numeric)
                    .unwrap_or(FieldValue::Empty),
            },
            JsonValue::String(text) => kind.parse(text).unwrap_or(FieldValue::Empty),
            _ => FieldValue::Empty,
        }
    }

    /// Projection used in submission payloads: empty numeric fields become
    /// `0`, empty text and date fields become `""`.
    pub fn to_wire(&self, kind: &FieldKind) -> JsonValue {
        match self {
            FieldValue::Numeric(value) => serde_json::Number::from_f64(*value)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::from(0)),
            FieldValue::Text(text) => JsonValue::String(text.clone()),
            FieldValue::Date(date) => JsonValue::String(date.format(DATE_INPUT_FORMAT).to_string()),
            FieldValue::Empty => match kind {
                FieldKind::Numeric { .. } => JsonValue::from(0),
                _ => JsonValue::String(String::new()),
            },
        }
    }
}

/// Formats a number without a trailing `.0` for whole values.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}
