//! Shared identifiers and enums used across the wizard model.

use std::{borrow::Borrow, fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Normalized category or subcategory name.
///
/// Names are trimmed and inner whitespace is collapsed once, at load time, so
/// every later comparison and storage lookup works on the canonical form.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(Arc<str>);

impl Name {
    pub fn new(raw: &str) -> Self {
        Self(Arc::from(normalize(raw).as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compares against unnormalized user input.
    pub fn matches(&self, raw: &str) -> bool {
        normalize(raw) == *self.0
    }

    /// Case-insensitive variant of [`Name::matches`] used by the CLI.
    pub fn matches_loose(&self, raw: &str) -> bool {
        normalize(raw).eq_ignore_ascii_case(&self.0)
    }
}

/// Trims and collapses runs of whitespace into single spaces.
pub fn normalize(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(raw: &str) -> Self {
        Name::new(raw)
    }
}

impl Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Name::new(&raw))
    }
}

/// How often an entered amount recurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    Weekly,
    Monthly,
    Quarterly,
    Annually,
}

impl Frequency {
    pub const ALL: [Frequency; 4] = [
        Frequency::Weekly,
        Frequency::Monthly,
        Frequency::Quarterly,
        Frequency::Annually,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Frequency::Weekly => "Weekly",
            Frequency::Monthly => "Monthly",
            Frequency::Quarterly => "Quarterly",
            Frequency::Annually => "Annually",
        }
    }

    /// Parses a label case-insensitively. Blank input and `NA` mean "unset".
    pub fn parse_optional(raw: &str) -> Result<Option<Self>, UnknownFrequency> {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("na")
            || trimmed.eq_ignore_ascii_case("none")
        {
            return Ok(None);
        }
        trimmed.parse().map(Some)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raised when a frequency label is not one of [`Frequency::ALL`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFrequency(pub String);

impl fmt::Display for UnknownFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown frequency `{}`", self.0)
    }
}

impl FromStr for Frequency {
    type Err = UnknownFrequency;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "weekly" | "week" => Ok(Frequency::Weekly),
            "monthly" | "month" => Ok(Frequency::Monthly),
            "quarterly" | "quarter" => Ok(Frequency::Quarterly),
            "annually" | "annual" | "yearly" | "year" => Ok(Frequency::Annually),
            _ => Err(UnknownFrequency(value.trim().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_collapse_whitespace() {
        let name = Name::new("  Other   Income ");
        assert_eq!(name.as_str(), "Other Income");
        assert!(name.matches("Other Income  "));
        assert!(!name.matches("other income"));
        assert!(name.matches_loose("other  INCOME"));
    }

    #[test]
    fn frequency_parsing_accepts_aliases_and_unset() {
        assert_eq!("yearly".parse::<Frequency>(), Ok(Frequency::Annually));
        assert_eq!(Frequency::parse_optional(" "), Ok(None));
        assert_eq!(Frequency::parse_optional("NA"), Ok(None));
        assert_eq!(
            Frequency::parse_optional("Monthly"),
            Ok(Some(Frequency::Monthly))
        );
        assert!(Frequency::parse_optional("fortnightly").is_err());
    }
}
