//! Read-only summary of every step with subtotals and totals.

use std::collections::HashSet;

use tracing::debug;

use crate::domain::{FieldKind, FieldValue, Frequency, Name};
use crate::session::FormSession;

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRow {
    pub id: Option<u32>,
    pub label: String,
    pub kind: FieldKind,
    pub value: FieldValue,
    pub frequency: Option<Frequency>,
}

impl ReviewRow {
    pub fn display_value(&self) -> String {
        self.kind.render(&self.value)
    }

    /// Frequency column text; fields without a selection show `NA`.
    pub fn frequency_label(&self) -> &'static str {
        match self.frequency {
            Some(frequency) if self.kind.accepts_frequency() => frequency.label(),
            _ => "NA",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubcategorySummary {
    pub key: Name,
    /// `None` for a main category without subcategories.
    pub name: Option<Name>,
    pub rows: Vec<ReviewRow>,
    pub subtotal: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    pub name: Name,
    pub subcategories: Vec<SubcategorySummary>,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReviewSummary {
    pub categories: Vec<CategorySummary>,
    pub grand_total: f64,
}

impl ReviewSummary {
    pub fn category(&self, name: &str) -> Option<&CategorySummary> {
        self.categories
            .iter()
            .find(|category| category.name.matches(name))
    }

    /// Subtotal of `main.sub`, or of a leaf main category when `sub` is `None`.
    pub fn subtotal(&self, main: &str, sub: Option<&str>) -> Option<f64> {
        let category = self.category(main)?;
        category
            .subcategories
            .iter()
            .find(|summary| match (&summary.name, sub) {
                (Some(name), Some(raw)) => name.matches(raw),
                (None, None) => true,
                _ => false,
            })
            .map(|summary| summary.subtotal)
    }

    pub fn row_count(&self) -> usize {
        self.categories
            .iter()
            .flat_map(|category| &category.subcategories)
            .map(|summary| summary.rows.len())
            .sum()
    }
}

pub struct ReviewAggregator;

impl ReviewAggregator {
    /// Resolves every step with the row-store priority rule. Never writes.
    pub fn build(session: &FormSession) -> ReviewSummary {
        let catalog = session.catalog();
        let mut summary = ReviewSummary::default();

        for category in catalog.taxonomy().categories() {
            let mut category_summary = CategorySummary {
                name: category.name.clone(),
                subcategories: Vec::new(),
                total: 0.0,
            };
            for step in category.steps() {
                let key = step.key().clone();
                let templates = catalog.templates(&key);
                let rows: Vec<ReviewRow> = session
                    .resolve(&key)
                    .into_iter()
                    .zip(templates)
                    .filter(|(_, template)| template.kind.is_input())
                    .map(|(row, template)| ReviewRow {
                        id: row.id.or(template.id),
                        label: row.label,
                        kind: template.kind.clone(),
                        value: row.value,
                        frequency: row.frequency,
                    })
                    .collect();
                let subtotal = rows.iter().map(|row| row.value.as_number()).sum();
                category_summary.total += subtotal;
                category_summary.subcategories.push(SubcategorySummary {
                    key,
                    name: step.sub.clone(),
                    rows,
                    subtotal,
                });
            }
            summary.grand_total += category_summary.total;
            summary.categories.push(category_summary);
        }

        debug!(rows = summary.row_count(), total = summary.grand_total, "review built");
        summary
    }
}

/// Expand/collapse state of the review screen.
#[derive(Debug, Clone, Default)]
pub struct ReviewView {
    collapsed: HashSet<Name>,
}

impl ReviewView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_collapsed(&self, name: &Name) -> bool {
        self.collapsed.contains(name)
    }

    pub fn collapse(&mut self, name: &Name) {
        self.collapsed.insert(name.clone());
    }

    pub fn expand(&mut self, name: &Name) {
        self.collapsed.remove(name);
    }

    pub fn collapse_all(&mut self, summary: &ReviewSummary) {
        for category in &summary.categories {
            self.collapsed.insert(category.name.clone());
        }
    }

    pub fn expand_all(&mut self) {
        self.collapsed.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::catalog::Catalog;
    use crate::storage::{ClientStorage, MemoryStorage};

    #[test]
    fn single_field_scenario_reports_subtotal() {
        let catalog = Arc::new(
            Catalog::from_json(
                r#"{"Income": ["Salary"]}"#,
                r#"{"Salary": [{"label": "Base", "value": 0}]}"#,
            )
            .unwrap(),
        );
        let mut session = FormSession::new(catalog, Arc::new(MemoryStorage::new()));
        session.load(&Name::new("Salary"));
        session.input(0, "1500").unwrap();
        session.commit();

        let summary = ReviewAggregator::build(&session);
        assert_eq!(summary.subtotal("Income", Some("Salary")), Some(1500.0));
        assert_eq!(summary.category("Income").unwrap().total, 1500.0);
        assert_eq!(summary.grand_total, 1500.0);
    }

    #[test]
    fn headers_are_excluded_and_storage_untouched() {
        let catalog = Arc::new(
            Catalog::from_json(
                r#"{"Profile": [], "Income": ["Salary"]}"#,
                r#"{"Profile": [{"label": "Personal", "kind": "header"},
                                {"label": "Age", "decimals": 0, "value": 40}]}"#,
            )
            .unwrap(),
        );
        let storage = MemoryStorage::new();
        let session = FormSession::new(catalog, Arc::new(storage.clone()));
        let summary = ReviewAggregator::build(&session);

        let profile = &summary.category("Profile").unwrap().subcategories[0];
        assert_eq!(profile.rows.len(), 1);
        assert_eq!(profile.rows[0].label, "Age");
        assert_eq!(summary.subtotal("Profile", None), Some(40.0));
        assert_eq!(summary.subtotal("Income", Some("Salary")), Some(0.0));
        assert!(storage.keys().unwrap().is_empty());
    }

    #[test]
    fn view_tracks_collapsed_categories() {
        let mut view = ReviewView::new();
        let income = Name::new("Income");
        view.collapse(&income);
        assert!(view.is_collapsed(&income));
        view.expand(&income);
        assert!(!view.is_collapsed(&income));
    }
}
