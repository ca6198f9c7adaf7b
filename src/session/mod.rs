//! Row store for the active step plus the cross-step aggregate.

pub mod numeric;

use std::{collections::HashMap, fmt, sync::Arc};

use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::domain::{FieldKind, FieldTemplate, FieldValue, Frequency, Name, Row};
use crate::errors::{InputError, Result};
use crate::storage::{ClientStorage, SNAPSHOT_KEY};

pub use numeric::{EntryKey, KeyOutcome, NumericEntry};

#[derive(Debug, Clone)]
struct ActiveStep {
    key: Name,
    rows: Vec<Row>,
    entries: HashMap<usize, NumericEntry>,
}

/// Filled input rows against the input rows of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub filled: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.filled as f64 / self.total as f64) * 100.0).round() as u32
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} fields ({}%)", self.filled, self.total, self.percent())
    }
}

/// Owns the rows being edited and mirrors committed steps in memory.
///
/// Every mutation of the active rows is persisted under the step's storage
/// key before the call returns.
pub struct FormSession {
    catalog: Arc<Catalog>,
    storage: Arc<dyn ClientStorage>,
    aggregate: HashMap<Name, Vec<Row>>,
    active: Option<ActiveStep>,
}

impl fmt::Debug for FormSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormSession")
            .field("active", &self.active_key())
            .field("aggregate", &self.aggregate.len())
            .finish()
    }
}

impl FormSession {
    pub fn new(catalog: Arc<Catalog>, storage: Arc<dyn ClientStorage>) -> Self {
        Self {
            catalog,
            storage,
            aggregate: HashMap::new(),
            active: None,
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn storage(&self) -> &Arc<dyn ClientStorage> {
        &self.storage
    }

    /// Rows for `key` from the aggregate, then storage, then templates.
    pub fn resolve(&self, key: &Name) -> Vec<Row> {
        if let Some(rows) = self.aggregate.get(key) {
            return rows.clone();
        }
        if let Some(rows) = self.persisted_rows(key) {
            return rows;
        }
        self.seed_rows(key)
    }

    /// Persisted rows, or `None` when absent, unreadable or stale.
    pub fn persisted_rows(&self, key: &Name) -> Option<Vec<Row>> {
        let raw = match self.storage.get(key.as_str()) {
            Ok(raw) => raw?,
            Err(err) => {
                warn!(key = %key, error = %err, "could not read persisted rows");
                return None;
            }
        };
        let rows: Vec<Row> = match serde_json::from_str(&raw) {
            Ok(rows) => rows,
            Err(err) => {
                warn!(key = %key, error = %err, "discarding unreadable persisted rows");
                return None;
            }
        };
        let expected = self.catalog.templates(key).len();
        if rows.len() != expected {
            warn!(
                key = %key,
                persisted = rows.len(),
                expected,
                "discarding stale persisted rows"
            );
            return None;
        }
        Some(rows)
    }

    fn seed_rows(&self, key: &Name) -> Vec<Row> {
        self.catalog
            .templates(key)
            .iter()
            .map(FieldTemplate::seed_row)
            .collect()
    }

    /// Makes `key` the active step. Reloading the active key is a no-op.
    pub fn load(&mut self, key: &Name) -> &[Row] {
        let reuse = matches!(&self.active, Some(step) if &step.key == key);
        if !reuse {
            let rows = self.resolve(key);
            debug!(key = %key, rows = rows.len(), "step loaded");
            self.active = Some(ActiveStep {
                key: key.clone(),
                rows,
                entries: HashMap::new(),
            });
        }
        self.rows()
    }

    pub fn active_key(&self) -> Option<&Name> {
        self.active.as_ref().map(|step| &step.key)
    }

    pub fn rows(&self) -> &[Row] {
        self.active
            .as_ref()
            .map(|step| step.rows.as_slice())
            .unwrap_or(&[])
    }

    /// Templates of the active step, index-aligned with [`FormSession::rows`].
    pub fn templates(&self) -> &[FieldTemplate] {
        match &self.active {
            Some(step) => self.catalog.templates(&step.key),
            None => &[],
        }
    }

    pub fn aggregate(&self) -> &HashMap<Name, Vec<Row>> {
        &self.aggregate
    }

    fn editable(&self, index: usize) -> std::result::Result<&FieldTemplate, InputError> {
        if self.active.is_none() {
            return Err(InputError::NoActiveStep);
        }
        let template = self
            .templates()
            .get(index)
            .ok_or(InputError::RowOutOfRange(index + 1))?;
        if !template.kind.is_input() {
            return Err(InputError::ReadOnly(template.label.clone()));
        }
        Ok(template)
    }

    fn step_mut(&mut self) -> std::result::Result<&mut ActiveStep, InputError> {
        self.active.as_mut().ok_or(InputError::NoActiveStep)
    }

    /// Replaces a row value after validating it against the field kind.
    pub fn set_value(&mut self, index: usize, value: FieldValue) -> Result<()> {
        self.editable(index)?.kind.validate(&value)?;
        let step = self.step_mut()?;
        step.rows[index].value = value;
        step.entries.remove(&index);
        self.persist()
    }

    /// Parses raw text for the row's field kind and stores the result.
    pub fn input(&mut self, index: usize, raw: &str) -> Result<FieldValue> {
        let value = self.editable(index)?.kind.parse(raw)?;
        self.set_value(index, value.clone())?;
        Ok(value)
    }

    /// Applies one keystroke to a numeric row, persisting when the value moved.
    pub fn press_key(&mut self, index: usize, key: EntryKey) -> Result<KeyOutcome> {
        let template = self.editable(index)?;
        let decimals = match template.kind {
            FieldKind::Numeric { decimals } => decimals,
            ref other => return Err(InputError::KindMismatch(other.label()).into()),
        };
        let step = self.step_mut()?;
        let current = step.rows[index].value.clone();
        let entry = step
            .entries
            .entry(index)
            .or_insert_with(|| NumericEntry::new(&current, decimals));
        let outcome = entry.press(key);
        if outcome.changed_value() {
            step.rows[index].value = entry.value();
            self.persist()?;
        }
        Ok(outcome)
    }

    /// Open keystroke buffer of a numeric row, if one was started.
    pub fn entry(&self, index: usize) -> Option<&NumericEntry> {
        self.active.as_ref()?.entries.get(&index)
    }

    /// Drops the keystroke buffer of a row, discarding any invalid mark.
    pub fn close_entry(&mut self, index: usize) {
        if let Some(step) = self.active.as_mut() {
            step.entries.remove(&index);
        }
    }

    pub fn set_frequency(&mut self, index: usize, frequency: Option<Frequency>) -> Result<()> {
        let template = self.editable(index)?;
        if !template.kind.accepts_frequency() {
            return Err(InputError::FrequencyNotApplicable(template.label.clone()).into());
        }
        if let Some(selected) = frequency {
            if !template.frequencies.contains(&selected) {
                return Err(InputError::FrequencyNotOffered(selected.to_string()).into());
            }
        }
        let step = self.step_mut()?;
        step.rows[index].frequency = frequency;
        self.persist()
    }

    /// Empties every value and frequency of the active step and refreshes the
    /// aggregate, so the cleared rows win over any earlier commit.
    pub fn clear(&mut self) -> Result<()> {
        let step = self.step_mut()?;
        step.rows = step.rows.iter().map(Row::cleared).collect();
        step.entries.clear();
        let key = step.key.clone();
        let rows = step.rows.clone();
        self.aggregate.insert(key.clone(), rows);
        info!(key = %key, "step cleared");
        self.persist()
    }

    /// Writes the active rows under their storage key.
    pub fn persist(&self) -> Result<()> {
        let Some(step) = &self.active else {
            return Ok(());
        };
        let json = serde_json::to_string(&step.rows)?;
        self.storage.set(step.key.as_str(), &json)?;
        debug!(key = %step.key, rows = step.rows.len(), "rows persisted");
        Ok(())
    }

    /// Mirrors the active rows into the cross-step aggregate.
    pub fn commit(&mut self) {
        if let Some(step) = &self.active {
            self.aggregate.insert(step.key.clone(), step.rows.clone());
            debug!(key = %step.key, "step committed");
        }
    }

    /// Sum of numeric values in the active step.
    pub fn subtotal(&self) -> f64 {
        subtotal(self.templates(), self.rows())
    }

    pub fn progress(&self) -> Progress {
        let mut progress = Progress::default();
        for (template, row) in self.templates().iter().zip(self.rows()) {
            if !template.kind.is_input() {
                continue;
            }
            progress.total += 1;
            if !row.value.is_empty() {
                progress.filled += 1;
            }
        }
        progress
    }

    /// Removes every persisted step and the editing snapshot, then forgets
    /// all in-memory rows.
    pub fn clear_all_persisted(&mut self) -> Result<()> {
        for key in self.catalog.taxonomy().storage_keys() {
            self.storage.remove(key.as_str())?;
        }
        self.storage.remove(SNAPSHOT_KEY)?;
        self.aggregate.clear();
        self.active = None;
        info!("persisted wizard state cleared");
        Ok(())
    }
}

/// Sum of the numeric rows, skipping headers. Empty values count as zero.
pub fn subtotal(templates: &[FieldTemplate], rows: &[Row]) -> f64 {
    rows.iter()
        .enumerate()
        .filter(|(index, _)| {
            templates
                .get(*index)
                .map(|template| template.kind.is_input())
                .unwrap_or(true)
        })
        .map(|(_, row)| row.value.as_number())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn session() -> (FormSession, MemoryStorage) {
        let storage = MemoryStorage::new();
        let catalog = Arc::new(Catalog::builtin().unwrap());
        (
            FormSession::new(catalog, Arc::new(storage.clone())),
            storage,
        )
    }

    #[test]
    fn persisted_rows_reload_identically() {
        let (mut session, storage) = session();
        let salary = Name::new("Salary");
        session.load(&salary);
        session.input(0, "2500.5").unwrap();
        session.set_frequency(1, Some(Frequency::Annually)).unwrap();
        let before = session.rows().to_vec();

        let mut fresh = FormSession::new(session.catalog().clone(), Arc::new(storage));
        assert_eq!(fresh.load(&salary), before.as_slice());
    }

    #[test]
    fn stale_or_corrupt_entries_fall_back_to_templates() {
        let (mut session, storage) = session();
        let salary = Name::new("Salary");
        storage
            .set("Salary", r#"[{"label": "Only one row"}]"#)
            .unwrap();
        assert_eq!(session.load(&salary)[0].label, "Base Salary");

        storage.set("Freelance", "{not json").unwrap();
        let freelance = Name::new("Freelance");
        assert_eq!(session.load(&freelance).len(), 2);
    }

    #[test]
    fn aggregate_wins_over_storage() {
        let (mut session, storage) = session();
        let salary = Name::new("Salary");
        session.load(&salary);
        session.input(0, "10").unwrap();
        session.commit();
        storage.remove("Salary").unwrap();

        session.load(&Name::new("Food"));
        let rows = session.load(&salary);
        assert_eq!(rows[0].value, FieldValue::Numeric(10.0));
    }

    #[test]
    fn clear_empties_rows_and_is_visible_after_reload() {
        let (mut session, storage) = session();
        let rent = Name::new("Housing");
        session.load(&rent);
        session.input(0, "900").unwrap();
        session.commit();
        session.clear().unwrap();
        assert!(session.rows().iter().all(|row| row.value.is_empty()));
        assert!(session.rows().iter().all(|row| row.frequency.is_none()));
        assert_eq!(session.subtotal(), 0.0);

        let mut fresh = FormSession::new(session.catalog().clone(), Arc::new(storage));
        assert!(fresh.load(&rent).iter().all(|row| row.value.is_empty()));
    }

    #[test]
    fn keystrokes_flag_and_recover_for_whole_numbers() {
        let catalog = Arc::new(
            Catalog::from_json(
                r#"{"Assets": ["Vehicles"]}"#,
                r#"{"Vehicles": [{"label": "Count", "decimals": 0}]}"#,
            )
            .unwrap(),
        );
        let mut session = FormSession::new(catalog, Arc::new(MemoryStorage::new()));
        session.load(&Name::new("Vehicles"));
        for ch in "12.5".chars() {
            session.press_key(0, EntryKey::Char(ch)).unwrap();
        }
        assert!(session.entry(0).unwrap().is_flagged());
        assert_eq!(session.rows()[0].value, FieldValue::Numeric(12.0));
        assert_eq!(
            session.press_key(0, EntryKey::Backspace).unwrap(),
            KeyOutcome::Unflagged
        );
        assert!(!session.entry(0).unwrap().is_flagged());
    }

    #[test]
    fn frequency_rules_follow_the_template() {
        let catalog = Arc::new(
            Catalog::from_json(
                r#"{"Profile": []}"#,
                r#"{"Profile": [
                    {"label": "Employer", "kind": "text"},
                    {"label": "Pay", "frequencies": ["Weekly", "Monthly"]},
                    {"label": "Personal", "kind": "header"}
                ]}"#,
            )
            .unwrap(),
        );
        let mut session = FormSession::new(catalog, Arc::new(MemoryStorage::new()));
        session.load(&Name::new("Profile"));
        assert!(session.set_frequency(0, Some(Frequency::Weekly)).is_err());
        assert!(session.set_frequency(1, Some(Frequency::Annually)).is_err());
        session.set_frequency(1, Some(Frequency::Weekly)).unwrap();
        assert!(session.input(2, "x").is_err());
        assert!(session.input(7, "1").is_err());

        session.input(0, "Acme").unwrap();
        assert_eq!(session.progress(), Progress { filled: 1, total: 2 });
        assert_eq!(session.progress().percent(), 50);
    }

    #[test]
    fn subtotal_ignores_text_and_empty_rows() {
        let (mut session, _) = session();
        session.load(&Name::new("Utilities"));
        assert_eq!(session.subtotal(), 0.0);
        session.input(0, "40").unwrap();
        session.input(2, "59.99").unwrap();
        assert!((session.subtotal() - 99.99).abs() < 1e-9);
    }
}
