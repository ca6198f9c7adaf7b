//! Keystroke-level numeric entry.
//!
//! Characters outside `[0-9.]` never reach the buffer. With zero decimal
//! places a typed `.` marks the entry invalid; while marked, every key except
//! a deletion is ignored.

use crate::domain::FieldValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKey {
    Char(char),
    Backspace,
    /// Wipes the whole buffer, including an invalid mark.
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Accepted,
    Rejected,
    /// The key was refused and the entry is now marked invalid.
    Flagged,
    /// The rejected character was deleted; the entry is valid again.
    Unflagged,
    Deleted,
}

impl KeyOutcome {
    /// Whether the buffer, and therefore the stored value, changed.
    pub fn changed_value(self) -> bool {
        matches!(self, KeyOutcome::Accepted | KeyOutcome::Deleted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericEntry {
    buffer: String,
    decimals: Option<u8>,
    rejected: Option<char>,
}

impl NumericEntry {
    pub fn new(initial: &FieldValue, decimals: Option<u8>) -> Self {
        Self {
            buffer: initial.to_input_text(),
            decimals,
            rejected: None,
        }
    }

    pub fn press(&mut self, key: EntryKey) -> KeyOutcome {
        if self.rejected.is_some() {
            return match key {
                EntryKey::Backspace => {
                    self.rejected = None;
                    KeyOutcome::Unflagged
                }
                EntryKey::Clear => {
                    self.rejected = None;
                    self.buffer.clear();
                    KeyOutcome::Deleted
                }
                EntryKey::Char(_) => KeyOutcome::Rejected,
            };
        }

        match key {
            EntryKey::Backspace => {
                self.buffer.pop();
                KeyOutcome::Deleted
            }
            EntryKey::Clear => {
                self.buffer.clear();
                KeyOutcome::Deleted
            }
            EntryKey::Char('.') => {
                if self.decimals == Some(0) {
                    self.rejected = Some('.');
                    KeyOutcome::Flagged
                } else if self.buffer.contains('.') {
                    KeyOutcome::Rejected
                } else {
                    self.buffer.push('.');
                    KeyOutcome::Accepted
                }
            }
            EntryKey::Char(ch) if ch.is_ascii_digit() => {
                let fraction = self
                    .buffer
                    .split_once('.')
                    .map(|(_, fraction)| fraction.len());
                match (fraction, self.decimals) {
                    (Some(len), Some(places)) if len >= places as usize => KeyOutcome::Rejected,
                    _ => {
                        self.buffer.push(ch);
                        KeyOutcome::Accepted
                    }
                }
            }
            EntryKey::Char(_) => KeyOutcome::Rejected,
        }
    }

    /// Feeds every character of `text` as a keystroke.
    pub fn type_str(&mut self, text: &str) -> Vec<KeyOutcome> {
        text.chars()
            .map(|ch| self.press(EntryKey::Char(ch)))
            .collect()
    }

    pub fn is_flagged(&self) -> bool {
        self.rejected.is_some()
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Text as shown to the user, including a rejected character.
    pub fn display(&self) -> String {
        match self.rejected {
            Some(ch) => format!("{}{}", self.buffer, ch),
            None => self.buffer.clone(),
        }
    }

    /// Value committed to the row. The rejected character never counts.
    pub fn value(&self) -> FieldValue {
        match self.buffer.as_str() {
            "" | "." => FieldValue::Empty,
            text => text
                .parse::<f64>()
                .map(FieldValue::Numeric)
                .unwrap_or(FieldValue::Empty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_number_entry_flags_decimal_point() {
        let mut entry = NumericEntry::new(&FieldValue::Empty, Some(0));
        let outcomes = entry.type_str("12.5");
        assert_eq!(
            outcomes,
            vec![
                KeyOutcome::Accepted,
                KeyOutcome::Accepted,
                KeyOutcome::Flagged,
                KeyOutcome::Rejected,
            ]
        );
        assert!(entry.is_flagged());
        assert_eq!(entry.display(), "12.");
        assert_eq!(entry.value(), FieldValue::Numeric(12.0));

        assert_eq!(entry.press(EntryKey::Backspace), KeyOutcome::Unflagged);
        assert!(!entry.is_flagged());
        assert_eq!(entry.buffer(), "12");
        assert_eq!(entry.press(EntryKey::Char('3')), KeyOutcome::Accepted);
        assert_eq!(entry.value(), FieldValue::Numeric(123.0));
    }

    #[test]
    fn decimal_places_cap_fraction_digits() {
        let mut entry = NumericEntry::new(&FieldValue::Empty, Some(2));
        entry.type_str("3.141");
        assert_eq!(entry.buffer(), "3.14");
        assert_eq!(entry.press(EntryKey::Char('.')), KeyOutcome::Rejected);
        assert_eq!(entry.press(EntryKey::Char('-')), KeyOutcome::Rejected);
        assert_eq!(entry.press(EntryKey::Char('e')), KeyOutcome::Rejected);
    }

    #[test]
    fn emptied_buffer_is_an_empty_value() {
        let mut entry = NumericEntry::new(&FieldValue::Numeric(7.0), None);
        assert_eq!(entry.buffer(), "7");
        entry.press(EntryKey::Backspace);
        assert_eq!(entry.value(), FieldValue::Empty);
        entry.type_str(".");
        assert_eq!(entry.value(), FieldValue::Empty);
    }
}
