//! Cursor over the flattened (main category, subcategory) sequence.

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::domain::{Category, StepPosition, Taxonomy};
use crate::errors::NavigationError;

/// Result of a forward or backward transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMove {
    Moved,
    /// Advance past the final step; the position is unchanged.
    Complete,
    /// Retreat from the first step; the position is unchanged.
    AtStart,
}

#[derive(Debug, Clone)]
pub struct StepCursor {
    catalog: Arc<Catalog>,
    position: StepPosition,
}

fn first_step(category: &Category) -> StepPosition {
    StepPosition::new(category.name.clone(), category.subcategories.first().cloned())
}

fn last_step(category: &Category) -> StepPosition {
    StepPosition::new(category.name.clone(), category.subcategories.last().cloned())
}

impl StepCursor {
    /// Starts at the first subcategory of the first main category.
    pub fn new(catalog: Arc<Catalog>) -> Result<Self, NavigationError> {
        let position = catalog
            .taxonomy()
            .categories()
            .first()
            .map(first_step)
            .ok_or(NavigationError::EmptyTaxonomy)?;
        Ok(Self { catalog, position })
    }

    fn taxonomy(&self) -> &Taxonomy {
        self.catalog.taxonomy()
    }

    pub fn position(&self) -> &StepPosition {
        &self.position
    }

    /// Main index and subcategory index, derived from the current names.
    fn locate(&self) -> (usize, Option<usize>) {
        let categories = self.taxonomy().categories();
        let main = categories
            .iter()
            .position(|category| category.name == self.position.main)
            .unwrap_or(0);
        let sub = self.position.sub.as_ref().and_then(|sub| {
            categories
                .get(main)?
                .subcategories
                .iter()
                .position(|candidate| candidate == sub)
        });
        (main, sub)
    }

    pub fn advance(&mut self) -> CursorMove {
        let (main, sub) = self.locate();
        let categories = self.catalog.taxonomy().categories();
        let category = &categories[main];
        if let Some(sub) = sub {
            if let Some(next) = category.subcategories.get(sub + 1) {
                self.position = StepPosition::new(category.name.clone(), Some(next.clone()));
                return CursorMove::Moved;
            }
        }
        match categories.get(main + 1) {
            Some(next) => {
                self.position = first_step(next);
                CursorMove::Moved
            }
            None => CursorMove::Complete,
        }
    }

    pub fn retreat(&mut self) -> CursorMove {
        let (main, sub) = self.locate();
        let categories = self.catalog.taxonomy().categories();
        let category = &categories[main];
        if let Some(sub) = sub.filter(|sub| *sub > 0) {
            self.position =
                StepPosition::new(category.name.clone(), Some(category.subcategories[sub - 1].clone()));
            return CursorMove::Moved;
        }
        if main == 0 {
            return CursorMove::AtStart;
        }
        self.position = last_step(&categories[main - 1]);
        CursorMove::Moved
    }

    pub fn can_retreat(&self) -> bool {
        self.step_index() > 1
    }

    pub fn is_last(&self) -> bool {
        self.step_index() == self.step_count()
    }

    /// Jumps to the first subcategory of a main category.
    pub fn select_main(&mut self, raw: &str) -> Result<&StepPosition, NavigationError> {
        let category = self
            .taxonomy()
            .find_category(raw)
            .ok_or_else(|| NavigationError::UnknownCategory(raw.trim().to_string()))?;
        self.position = first_step(category);
        Ok(&self.position)
    }

    /// Jumps to a subcategory tab of the current main category.
    pub fn select_sub(&mut self, raw: &str) -> Result<&StepPosition, NavigationError> {
        let main = self.position.main.clone();
        self.jump_to(main.as_str(), Some(raw))
    }

    /// Moves directly to `(main, sub)`; without `sub` the first step of `main`.
    pub fn jump_to(
        &mut self,
        main: &str,
        sub: Option<&str>,
    ) -> Result<&StepPosition, NavigationError> {
        let category = self
            .taxonomy()
            .find_category(main)
            .ok_or_else(|| NavigationError::UnknownCategory(main.trim().to_string()))?;
        let position = match sub {
            None => first_step(category),
            Some(raw) => {
                let sub = category.subcategory(raw).ok_or_else(|| {
                    NavigationError::UnknownSubcategory {
                        main: category.name.to_string(),
                        sub: raw.trim().to_string(),
                    }
                })?;
                StepPosition::new(category.name.clone(), Some(sub.clone()))
            }
        };
        self.position = position;
        Ok(&self.position)
    }

    /// Restores a previously saved position if it still exists.
    pub fn restore(&mut self, position: &StepPosition) -> bool {
        let valid = self.taxonomy().steps().contains(position);
        if valid {
            self.position = position.clone();
        }
        valid
    }

    pub fn reset(&mut self) {
        if let Some(first) = self.taxonomy().categories().first() {
            self.position = first_step(first);
        }
    }

    /// 1-based index of the current step in the flattened sequence.
    pub fn step_index(&self) -> usize {
        self.taxonomy()
            .steps()
            .iter()
            .position(|step| step == &self.position)
            .map(|index| index + 1)
            .unwrap_or(1)
    }

    pub fn step_count(&self) -> usize {
        self.taxonomy().steps().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(menu: &str) -> StepCursor {
        let catalog = Catalog::from_json(menu, "{}").unwrap();
        StepCursor::new(Arc::new(catalog)).unwrap()
    }

    fn visit_all(cursor: &mut StepCursor) -> Vec<String> {
        let mut seen = vec![cursor.position().to_string()];
        while cursor.advance() == CursorMove::Moved {
            seen.push(cursor.position().to_string());
        }
        seen
    }

    #[test]
    fn advance_walks_subcategories_then_main_categories() {
        let mut cursor = cursor(r#"{"Income": ["Salary", "Bonus"], "Savings": [], "Debt": ["Loans"]}"#);
        assert_eq!(
            visit_all(&mut cursor),
            vec!["Income / Salary", "Income / Bonus", "Savings", "Debt / Loans"]
        );
        assert_eq!(cursor.advance(), CursorMove::Complete);
        assert_eq!(cursor.position().to_string(), "Debt / Loans");
    }

    #[test]
    fn retreat_undoes_advance_away_from_the_edges() {
        let mut cursor = cursor(r#"{"Income": ["Salary", "Bonus"], "Savings": [], "Debt": ["Loans", "EMI"]}"#);
        assert!(!cursor.can_retreat());
        assert_eq!(cursor.retreat(), CursorMove::AtStart);

        while cursor.advance() == CursorMove::Moved {
            if cursor.is_last() {
                break;
            }
            let before = cursor.position().clone();
            cursor.advance();
            cursor.retreat();
            assert_eq!(cursor.position(), &before);
        }
    }

    #[test]
    fn retreat_enters_last_subcategory_of_previous_main() {
        let mut cursor = cursor(r#"{"Income": ["Salary", "Bonus"], "Debt": ["Loans"]}"#);
        cursor.select_main("debt").unwrap();
        assert_eq!(cursor.retreat(), CursorMove::Moved);
        assert_eq!(cursor.position().to_string(), "Income / Bonus");
        assert_eq!(cursor.step_index(), 2);
        assert_eq!(cursor.step_count(), 3);
    }

    #[test]
    fn tabs_stay_within_the_current_main_category() {
        let mut cursor = cursor(r#"{"Income": ["Salary", "Bonus"], "Debt": ["Loans"]}"#);
        cursor.select_sub("Bonus").unwrap();
        assert_eq!(cursor.position().to_string(), "Income / Bonus");
        assert_eq!(
            cursor.select_sub("Loans").unwrap_err(),
            NavigationError::UnknownSubcategory {
                main: "Income".into(),
                sub: "Loans".into()
            }
        );
        assert!(matches!(
            cursor.select_main("Assets"),
            Err(NavigationError::UnknownCategory(_))
        ));
    }

    #[test]
    fn empty_taxonomy_has_no_cursor() {
        let catalog = Catalog::from_json("{}", "{}").unwrap();
        assert_eq!(
            StepCursor::new(Arc::new(catalog)).unwrap_err(),
            NavigationError::EmptyTaxonomy
        );
    }
}
