//! Two-level category taxonomy and the positions a cursor can occupy in it.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::common::Name;
use crate::errors::CatalogError;
use crate::storage::SNAPSHOT_KEY;

/// Main category with its ordered subcategories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: Name,
    pub subcategories: Vec<Name>,
}

impl Category {
    /// A main category without subcategories is a navigation unit of its own.
    pub fn is_leaf(&self) -> bool {
        self.subcategories.is_empty()
    }

    /// Storage keys contributed by this category, in navigation order.
    pub fn steps(&self) -> Vec<StepPosition> {
        if self.is_leaf() {
            return vec![StepPosition::new(self.name.clone(), None)];
        }
        self.subcategories
            .iter()
            .map(|sub| StepPosition::new(self.name.clone(), Some(sub.clone())))
            .collect()
    }

    pub fn subcategory(&self, raw: &str) -> Option<&Name> {
        self.subcategories
            .iter()
            .find(|sub| sub.matches(raw))
            .or_else(|| self.subcategories.iter().find(|sub| sub.matches_loose(raw)))
    }
}

/// Ordered mapping from main category to its subcategories.
///
/// Subcategory names double as storage keys, so they are unique across the
/// whole taxonomy rather than only within their parent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Taxonomy {
    categories: Vec<Category>,
}

impl Taxonomy {
    pub fn new(entries: Vec<(String, Vec<String>)>) -> Result<Self, CatalogError> {
        let mut seen: HashSet<Name> = HashSet::new();
        let mut categories = Vec::with_capacity(entries.len());

        for (raw_main, raw_subs) in entries {
            let name = Name::new(&raw_main);
            if name.is_empty() {
                return Err(CatalogError::Malformed(
                    "category names must not be blank".into(),
                ));
            }
            let mut subcategories = Vec::with_capacity(raw_subs.len());
            for raw_sub in raw_subs {
                let sub = Name::new(&raw_sub);
                if sub.is_empty() {
                    return Err(CatalogError::Malformed(format!(
                        "blank subcategory in `{name}`"
                    )));
                }
                subcategories.push(sub);
            }

            let category = Category {
                name,
                subcategories,
            };
            for step in category.steps() {
                let key = step.key().clone();
                if key.as_str() == SNAPSHOT_KEY || !seen.insert(key.clone()) {
                    return Err(CatalogError::DuplicateKey(key.to_string()));
                }
            }
            if categories
                .iter()
                .any(|existing: &Category| existing.name == category.name)
            {
                return Err(CatalogError::Malformed(format!(
                    "category `{}` is listed twice",
                    category.name
                )));
            }
            categories.push(category);
        }

        Ok(Self { categories })
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn category(&self, name: &Name) -> Option<&Category> {
        self.categories.iter().find(|category| &category.name == name)
    }

    /// Looks a category up from user input, exact match first.
    pub fn find_category(&self, raw: &str) -> Option<&Category> {
        self.categories
            .iter()
            .find(|category| category.name.matches(raw))
            .or_else(|| {
                self.categories
                    .iter()
                    .find(|category| category.name.matches_loose(raw))
            })
    }

    /// Flattened navigation sequence.
    pub fn steps(&self) -> Vec<StepPosition> {
        self.categories
            .iter()
            .flat_map(|category| category.steps())
            .collect()
    }

    pub fn storage_keys(&self) -> Vec<Name> {
        self.steps()
            .into_iter()
            .map(|step| step.key().clone())
            .collect()
    }

    pub fn position_of(&self, key: &Name) -> Option<StepPosition> {
        self.steps().into_iter().find(|step| step.key() == key)
    }
}

/// Active (main category, subcategory) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepPosition {
    pub main: Name,
    #[serde(default)]
    pub sub: Option<Name>,
}

impl StepPosition {
    pub fn new(main: Name, sub: Option<Name>) -> Self {
        Self { main, sub }
    }

    /// Storage key: the subcategory, or the main category when it has none.
    pub fn key(&self) -> &Name {
        self.sub.as_ref().unwrap_or(&self.main)
    }
}

impl fmt::Display for StepPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sub {
            Some(sub) => write!(f, "{} / {}", self.main, sub),
            None => write!(f, "{}", self.main),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(raw: &[(&str, &[&str])]) -> Vec<(String, Vec<String>)> {
        raw.iter()
            .map(|(main, subs)| {
                (
                    main.to_string(),
                    subs.iter().map(|sub| sub.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn empty_main_categories_are_their_own_step() {
        let taxonomy = Taxonomy::new(entries(&[
            ("Income", &["Salary", "Other Income"]),
            ("Savings", &[]),
        ]))
        .unwrap();
        let keys: Vec<_> = taxonomy
            .storage_keys()
            .iter()
            .map(|key| key.to_string())
            .collect();
        assert_eq!(keys, vec!["Salary", "Other Income", "Savings"]);
    }

    #[test]
    fn keys_must_be_unique_across_categories() {
        let err = Taxonomy::new(entries(&[
            ("Income", &["Other"]),
            ("Expenses", &[" Other "]),
        ]))
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateKey(key) if key == "Other"));

        let err = Taxonomy::new(entries(&[("Debt", &[]), ("Loans", &["Debt"])])).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateKey(_)));
    }

    #[test]
    fn lookups_fall_back_to_case_insensitive_matches() {
        let taxonomy = Taxonomy::new(entries(&[("Living Expenses", &["Housing"])])).unwrap();
        let category = taxonomy.find_category("living  expenses").unwrap();
        assert_eq!(category.name.as_str(), "Living Expenses");
        assert_eq!(category.subcategory("HOUSING").unwrap().as_str(), "Housing");
    }
}
