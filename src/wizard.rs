//! Coordinates the step cursor with the row store.
//!
//! Every cursor movement commits the active rows to the aggregate first, then
//! loads the rows of the new step and records the editing snapshot.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::domain::StepPosition;
use crate::errors::Result;
use crate::navigation::{CursorMove, StepCursor};
use crate::review::{ReviewAggregator, ReviewSummary};
use crate::session::FormSession;
use crate::storage::{ClientStorage, SNAPSHOT_KEY};

/// Cross-session record of where the user was editing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditingSnapshot {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub position: StepPosition,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardEvent {
    Moved(StepPosition),
    /// Advanced past the last step.
    Completed,
    /// Retreat requested on the first step.
    AtStart,
}

#[derive(Debug)]
pub struct Wizard {
    session: FormSession,
    cursor: StepCursor,
    session_id: Uuid,
    complete: bool,
}

impl Wizard {
    /// Opens the wizard, resuming the saved editing position when it is
    /// still part of the catalog.
    pub fn new(catalog: Arc<Catalog>, storage: Arc<dyn ClientStorage>) -> Result<Self> {
        let mut cursor = StepCursor::new(Arc::clone(&catalog))?;
        let session = FormSession::new(catalog, Arc::clone(&storage));

        let snapshot = read_snapshot(storage.as_ref());
        let session_id = match snapshot {
            Some(snapshot) if cursor.restore(&snapshot.position) => {
                info!(position = %snapshot.position, "resuming saved editing position");
                snapshot.session_id
            }
            _ => Uuid::new_v4(),
        };

        let mut wizard = Self {
            session,
            cursor,
            session_id,
            complete: false,
        };
        wizard.enter_current()?;
        Ok(wizard)
    }

    pub fn session(&self) -> &FormSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut FormSession {
        &mut self.session
    }

    pub fn cursor(&self) -> &StepCursor {
        &self.cursor
    }

    pub fn position(&self) -> &StepPosition {
        self.cursor.position()
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        self.session.catalog()
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn advance(&mut self) -> Result<WizardEvent> {
        self.session.commit();
        match self.cursor.advance() {
            CursorMove::Moved => {
                self.complete = false;
                self.enter_current()?;
                Ok(WizardEvent::Moved(self.position().clone()))
            }
            CursorMove::Complete | CursorMove::AtStart => {
                self.complete = true;
                info!(session = %self.session_id, "wizard complete");
                Ok(WizardEvent::Completed)
            }
        }
    }

    pub fn retreat(&mut self) -> Result<WizardEvent> {
        self.session.commit();
        match self.cursor.retreat() {
            CursorMove::Moved => {
                self.complete = false;
                self.enter_current()?;
                Ok(WizardEvent::Moved(self.position().clone()))
            }
            CursorMove::AtStart | CursorMove::Complete => Ok(WizardEvent::AtStart),
        }
    }

    pub fn select_main(&mut self, raw: &str) -> Result<StepPosition> {
        self.session.commit();
        self.cursor.select_main(raw)?;
        self.moved_directly()
    }

    pub fn select_sub(&mut self, raw: &str) -> Result<StepPosition> {
        self.session.commit();
        self.cursor.select_sub(raw)?;
        self.moved_directly()
    }

    /// Routes the cursor to a specific step, as the review "edit" link does.
    pub fn jump_to(&mut self, main: &str, sub: Option<&str>) -> Result<StepPosition> {
        self.session.commit();
        self.cursor.jump_to(main, sub)?;
        self.moved_directly()
    }

    fn moved_directly(&mut self) -> Result<StepPosition> {
        self.complete = false;
        self.enter_current()?;
        Ok(self.position().clone())
    }

    fn enter_current(&mut self) -> Result<()> {
        let key = self.cursor.position().key().clone();
        self.session.load(&key);
        self.save_snapshot()
    }

    fn save_snapshot(&self) -> Result<()> {
        let snapshot = EditingSnapshot {
            session_id: self.session_id,
            position: self.position().clone(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&snapshot)?;
        self.session.storage().set(SNAPSHOT_KEY, &json)?;
        debug!(position = %snapshot.position, "editing snapshot saved");
        Ok(())
    }

    /// Commits the active rows and builds the summary of every step.
    pub fn enter_review(&mut self) -> ReviewSummary {
        self.session.commit();
        ReviewAggregator::build(&self.session)
    }

    /// Back to the first step under a fresh session id.
    pub fn restart(&mut self) -> Result<()> {
        self.session_id = Uuid::new_v4();
        self.complete = false;
        self.cursor.reset();
        self.enter_current()
    }

    /// 1-based step index and step count.
    pub fn progress(&self) -> (usize, usize) {
        (self.cursor.step_index(), self.cursor.step_count())
    }
}

fn read_snapshot(storage: &dyn ClientStorage) -> Option<EditingSnapshot> {
    let raw = match storage.get(SNAPSHOT_KEY) {
        Ok(raw) => raw?,
        Err(err) => {
            warn!(error = %err, "could not read editing snapshot");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(snapshot) => Some(snapshot),
        Err(err) => {
            warn!(error = %err, "discarding unreadable editing snapshot");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FieldValue, Name};
    use crate::storage::MemoryStorage;

    fn wizard_with(storage: MemoryStorage) -> Wizard {
        let catalog = Arc::new(Catalog::builtin().unwrap());
        Wizard::new(catalog, Arc::new(storage)).unwrap()
    }

    #[test]
    fn advance_commits_before_moving() {
        let mut wizard = wizard_with(MemoryStorage::new());
        wizard.session_mut().input(0, "3000").unwrap();
        assert_eq!(
            wizard.advance().unwrap(),
            WizardEvent::Moved(StepPosition::new(
                Name::new("Income"),
                Some(Name::new("Freelance"))
            ))
        );
        let committed = &wizard.session().aggregate()[&Name::new("Salary")];
        assert_eq!(committed[0].value, FieldValue::Numeric(3000.0));
    }

    #[test]
    fn revisits_see_edits_made_before_a_jump() {
        let mut wizard = wizard_with(MemoryStorage::new());
        wizard.advance().unwrap();
        wizard.session_mut().input(0, "75").unwrap();
        wizard.select_main("Debt").unwrap();
        wizard.jump_to("Income", Some("Freelance")).unwrap();
        assert_eq!(wizard.session().rows()[0].value, FieldValue::Numeric(75.0));
    }

    #[test]
    fn snapshot_restores_position_across_sessions() {
        let storage = MemoryStorage::new();
        let mut first = wizard_with(storage.clone());
        first.jump_to("Expenses", Some("Food")).unwrap();
        let id = first.session_id();

        let resumed = wizard_with(storage);
        assert_eq!(resumed.position().to_string(), "Expenses / Food");
        assert_eq!(resumed.session_id(), id);
        assert_eq!(resumed.progress(), (6, 10));
    }

    #[test]
    fn single_entry_completes_and_reviews_its_total() {
        let catalog = Catalog::from_json(
            r#"{"Income": ["Salary"]}"#,
            r#"{"Salary": [{"id": 1, "label": "Base", "value": 0, "frequency": "Monthly"}]}"#,
        )
        .unwrap();
        let mut wizard = Wizard::new(Arc::new(catalog), Arc::new(MemoryStorage::new())).unwrap();
        wizard.session_mut().input(0, "1500").unwrap();
        assert_eq!(wizard.advance().unwrap(), WizardEvent::Completed);
        assert!(wizard.is_complete());

        let summary = ReviewAggregator::build(wizard.session());
        assert_eq!(summary.subtotal("Income", Some("Salary")), Some(1500.0));
        assert_eq!(summary.grand_total, 1500.0);
    }

    #[test]
    fn advancing_past_the_last_step_completes() {
        let mut wizard = wizard_with(MemoryStorage::new());
        wizard.jump_to("Debt", Some("EMI")).unwrap();
        assert_eq!(wizard.advance().unwrap(), WizardEvent::Completed);
        assert!(wizard.is_complete());
        assert_eq!(wizard.position().to_string(), "Debt / EMI");

        wizard.restart().unwrap();
        assert_eq!(wizard.progress(), (1, 10));
        assert_eq!(wizard.retreat().unwrap(), WizardEvent::AtStart);
    }
}
