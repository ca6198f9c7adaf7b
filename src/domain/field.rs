//! Field templates, field kinds, and the editable rows seeded from them.

use std::fmt;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::common::Frequency;
use crate::domain::value::{format_number, FieldValue, DATE_DISPLAY_FORMAT, DATE_INPUT_FORMAT};
use crate::errors::InputError;

/// Closed set of field kinds. Parsing, validation, and rendering dispatch on
/// this enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    /// Amount entry; `decimals` caps the digits after the point.
    Numeric {
        #[serde(default)]
        decimals: Option<u8>,
    },
    /// Free text, optionally limited in length or to a list of options.
    Text {
        #[serde(default)]
        max_len: Option<usize>,
        #[serde(default)]
        options: Vec<String>,
    },
    Date,
    /// Display-only section heading.
    Header,
}

impl FieldKind {
    pub fn text() -> Self {
        FieldKind::Text {
            max_len: None,
            options: Vec::new(),
        }
    }

    pub fn is_input(&self) -> bool {
        !matches!(self, FieldKind::Header)
    }

    pub fn accepts_frequency(&self) -> bool {
        matches!(self, FieldKind::Numeric { .. })
    }

    pub fn decimals(&self) -> Option<u8> {
        match self {
            FieldKind::Numeric { decimals } => *decimals,
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::Numeric { .. } => "numeric",
            FieldKind::Text { .. } => "text",
            FieldKind::Date => "date",
            FieldKind::Header => "header",
        }
    }

    pub fn placeholder(&self) -> String {
        match self {
            FieldKind::Numeric { decimals: Some(0) } => "Whole number only".into(),
            FieldKind::Numeric {
                decimals: Some(places),
            } => format!("e.g. 0.{}", "0".repeat(*places as usize)),
            FieldKind::Numeric { decimals: None } => "0.00".into(),
            FieldKind::Text { options, .. } if !options.is_empty() => {
                format!("One of: {}", options.join(", "))
            }
            FieldKind::Text { .. } => String::new(),
            FieldKind::Date => "YYYY-MM-DD".into(),
            FieldKind::Header => String::new(),
        }
    }

    /// Parses raw user input. Blank input is always [`FieldValue::Empty`].
    pub fn parse(&self, raw: &str) -> Result<FieldValue, InputError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return match self {
                FieldKind::Header => Err(InputError::KindMismatch("header")),
                _ => Ok(FieldValue::Empty),
            };
        }
        match self {
            FieldKind::Numeric { decimals } => parse_numeric(trimmed, *decimals),
            FieldKind::Text { .. } => {
                let value = FieldValue::Text(canonical_option(self, trimmed));
                self.validate(&value)?;
                Ok(value)
            }
            FieldKind::Date => parse_date(trimmed).map(FieldValue::Date),
            FieldKind::Header => Err(InputError::KindMismatch("header")),
        }
    }

    /// Checks an already-typed value against this kind's constraints.
    pub fn validate(&self, value: &FieldValue) -> Result<(), InputError> {
        match (self, value) {
            (FieldKind::Header, _) => Err(InputError::KindMismatch("header")),
            (_, FieldValue::Empty) => Ok(()),
            (FieldKind::Numeric { decimals }, FieldValue::Numeric(number)) => {
                if !number.is_finite() || *number < 0.0 {
                    return Err(InputError::NotNumeric);
                }
                match decimals {
                    Some(places) if fraction_digits(&format_number(*number)) > *places as usize => {
                        Err(InputError::TooManyDecimals(*places))
                    }
                    _ => Ok(()),
                }
            }
            (FieldKind::Text { max_len, options }, FieldValue::Text(text)) => {
                if let Some(limit) = max_len {
                    if *limit > 0 && text.chars().count() > *limit {
                        return Err(InputError::TooLong(*limit));
                    }
                }
                if !options.is_empty() && !options.iter().any(|option| option == text) {
                    return Err(InputError::NotAnOption(options.join(", ")));
                }
                Ok(())
            }
            (FieldKind::Date, FieldValue::Date(_)) => Ok(()),
            (_, other) => Err(InputError::KindMismatch(other.kind_label())),
        }
    }

    /// Human-facing rendering of a value of this kind.
    pub fn render(&self, value: &FieldValue) -> String {
        match (self, value) {
            (FieldKind::Header, _) => String::new(),
            (_, FieldValue::Empty) => String::new(),
            (FieldKind::Numeric { decimals: Some(places) }, FieldValue::Numeric(number))
                if *places > 0 =>
            {
                format!("{:.*}", *places as usize, number)
            }
            (_, FieldValue::Date(date)) => date.format(DATE_DISPLAY_FORMAT).to_string(),
            (_, other) => other.to_input_text(),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn parse_numeric(input: &str, decimals: Option<u8>) -> Result<FieldValue, InputError> {
    let valid_chars = input.chars().all(|ch| ch.is_ascii_digit() || ch == '.');
    let points = input.chars().filter(|ch| *ch == '.').count();
    if !valid_chars || points > 1 {
        return Err(InputError::NotNumeric);
    }
    if let Some(places) = decimals {
        if (places == 0 && points == 1) || fraction_digits(input) > places as usize {
            return Err(InputError::TooManyDecimals(places));
        }
    }
    if input == "." {
        return Ok(FieldValue::Empty);
    }
    input
        .parse::<f64>()
        .map(FieldValue::Numeric)
        .map_err(|_| InputError::NotNumeric)
}

fn fraction_digits(text: &str) -> usize {
    text.split_once('.')
        .map(|(_, fraction)| fraction.len())
        .unwrap_or(0)
}

fn parse_date(input: &str) -> Result<NaiveDate, InputError> {
    NaiveDate::parse_from_str(input, DATE_INPUT_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(input).map(|stamp| stamp.date_naive()))
        .map_err(|_| InputError::InvalidDate)
}

fn canonical_option(kind: &FieldKind, input: &str) -> String {
    if let FieldKind::Text { options, .. } = kind {
        if let Some(option) = options
            .iter()
            .find(|option| option.eq_ignore_ascii_case(input))
        {
            return option.clone();
        }
    }
    input.to_string()
}

/// Immutable description of one input field within a subcategory.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldTemplate {
    pub id: Option<u32>,
    pub label: String,
    pub kind: FieldKind,
    pub default_value: FieldValue,
    pub default_frequency: Option<Frequency>,
    /// Frequencies offered for selection; only meaningful for numeric fields.
    pub frequencies: Vec<Frequency>,
}

impl FieldTemplate {
    pub fn new(label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            id: None,
            label: label.into(),
            kind,
            default_value: FieldValue::Empty,
            default_frequency: None,
            frequencies: Frequency::ALL.to_vec(),
        }
    }

    pub fn numeric(label: impl Into<String>) -> Self {
        Self::new(label, FieldKind::Numeric { decimals: Some(2) })
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_default(mut self, value: FieldValue) -> Self {
        self.default_value = value;
        self
    }

    pub fn with_frequency(mut self, frequency: Option<Frequency>) -> Self {
        self.default_frequency = frequency;
        self
    }

    /// Builds a fresh row; the template itself is never handed out for edits.
    pub fn seed_row(&self) -> Row {
        Row {
            id: self.id,
            label: self.label.clone(),
            value: self.default_value.clone(),
            frequency: if self.kind.accepts_frequency() {
                self.default_frequency
            } else {
                None
            },
        }
    }
}

/// One editable field instance as persisted in client storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    pub label: String,
    #[serde(default)]
    pub value: FieldValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,
}

impl Row {
    /// The row with its value emptied and its frequency unset.
    pub fn cleared(&self) -> Row {
        Row {
            id: self.id,
            label: self.label.clone(),
            value: FieldValue::Empty,
            frequency: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_parse_enforces_decimal_places() {
        let whole = FieldKind::Numeric { decimals: Some(0) };
        assert_eq!(whole.parse("12"), Ok(FieldValue::Numeric(12.0)));
        assert_eq!(whole.parse("12.5"), Err(InputError::TooManyDecimals(0)));

        let cents = FieldKind::Numeric { decimals: Some(2) };
        assert_eq!(cents.parse("12.50"), Ok(FieldValue::Numeric(12.5)));
        assert_eq!(cents.parse("12.505"), Err(InputError::TooManyDecimals(2)));
        assert_eq!(cents.parse("-4"), Err(InputError::NotNumeric));
        assert_eq!(cents.parse("1.2.3"), Err(InputError::NotNumeric));
        assert_eq!(cents.parse("   "), Ok(FieldValue::Empty));
    }

    #[test]
    fn text_options_are_canonicalized() {
        let kind = FieldKind::Text {
            max_len: Some(5),
            options: vec!["Yes".into(), "No".into()],
        };
        assert_eq!(kind.parse("yes"), Ok(FieldValue::Text("Yes".into())));
        assert_eq!(kind.parse("maybe"), Err(InputError::NotAnOption("Yes, No".into())));

        let short = FieldKind::Text {
            max_len: Some(3),
            options: Vec::new(),
        };
        assert_eq!(short.parse("abcd"), Err(InputError::TooLong(3)));
    }

    #[test]
    fn dates_accept_plain_and_rfc3339_input() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(
            FieldKind::Date.parse("2025-03-09"),
            Ok(FieldValue::Date(expected))
        );
        assert_eq!(
            FieldKind::Date.parse("2025-03-09T10:00:00.000Z"),
            Ok(FieldValue::Date(expected))
        );
        assert_eq!(
            FieldKind::Date.render(&FieldValue::Date(expected)),
            "03-09-2025"
        );
        assert_eq!(FieldKind::Date.parse("09/03/2025"), Err(InputError::InvalidDate));
    }

    #[test]
    fn seed_rows_drop_frequency_for_non_numeric_fields() {
        let template = FieldTemplate::new("Employer", FieldKind::text())
            .with_frequency(Some(Frequency::Monthly));
        assert_eq!(template.seed_row().frequency, None);

        let amount = FieldTemplate::numeric("Rent").with_frequency(Some(Frequency::Monthly));
        assert_eq!(amount.seed_row().frequency, Some(Frequency::Monthly));
    }
}
