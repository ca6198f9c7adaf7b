use crate::cli::ui::formatting::{format_amount, progress_bar};
use crate::cli::ui::table_renderer::{Alignment, Table, TableColumn};
use crate::domain::{FieldTemplate, Row};
use crate::session::NumericEntry;
use crate::wizard::Wizard;

pub const EMPTY_STEP: &str = "No data available for this category.";
const FIELD_WIDTH: usize = 32;

/// The active step: position, tab strip, rows, subtotal and progress.
pub fn render_step(wizard: &Wizard, currency: &str) -> String {
    let session = wizard.session();
    let position = wizard.position();
    let (index, count) = wizard.progress();
    let mut lines = vec![format!("Step {index} of {count}: {position}")];

    if let Some(category) = wizard.catalog().taxonomy().category(&position.main) {
        if !category.is_leaf() {
            let tabs: Vec<String> = category
                .subcategories
                .iter()
                .map(|sub| {
                    if position.sub.as_ref() == Some(sub) {
                        format!("[{sub}]")
                    } else {
                        sub.to_string()
                    }
                })
                .collect();
            lines.push(format!("Tabs: {}", tabs.join("  ")));
        }
    }

    let rows = session.rows();
    if rows.is_empty() {
        lines.push(EMPTY_STEP.to_string());
        return lines.join("\n");
    }

    let mut table = Table::new(vec![
        TableColumn::new("#", Alignment::Right),
        TableColumn::new("Field", Alignment::Left).max_width(FIELD_WIDTH),
        TableColumn::new("Value", Alignment::Right),
        TableColumn::new("Frequency", Alignment::Left),
    ]);
    for (idx, (template, row)) in session.templates().iter().zip(rows).enumerate() {
        table.push(step_row(idx, template, row, session.entry(idx)));
    }
    lines.push(table.render());

    let progress = session.progress();
    lines.push(format!(
        "Subtotal: {}",
        format_amount(currency, session.subtotal())
    ));
    lines.push(format!(
        "Progress: {} {}",
        progress_bar(progress.percent(), 10),
        progress
    ));
    lines.join("\n")
}

fn step_row(
    idx: usize,
    template: &FieldTemplate,
    row: &Row,
    entry: Option<&NumericEntry>,
) -> Vec<String> {
    if !template.kind.is_input() {
        return vec![String::new(), format!("== {} ==", row.label)];
    }
    let frequency = if template.kind.accepts_frequency() {
        row.frequency.map(|f| f.label()).unwrap_or("NA").to_string()
    } else {
        String::new()
    };
    vec![
        (idx + 1).to_string(),
        row.label.clone(),
        value_cell(template, row, entry),
        frequency,
    ]
}

fn value_cell(template: &FieldTemplate, row: &Row, entry: Option<&NumericEntry>) -> String {
    match entry {
        Some(entry) if entry.is_flagged() => format!("{} (invalid)", entry.display()),
        _ if row.value.is_empty() => {
            let placeholder = template.kind.placeholder();
            if placeholder.is_empty() {
                String::new()
            } else {
                format!("({placeholder})")
            }
        }
        _ => template.kind.render(&row.value),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::catalog::Catalog;
    use crate::session::EntryKey;
    use crate::storage::MemoryStorage;

    fn wizard() -> Wizard {
        let catalog = Catalog::from_json(
            r#"{"Income": ["Salary", "Gifts"]}"#,
            r#"{"Salary": [
                {"label": "Base", "value": "", "frequency": "Monthly"},
                {"label": "Units", "value": "", "decimals": 0}
            ]}"#,
        )
        .unwrap();
        Wizard::new(Arc::new(catalog), Arc::new(MemoryStorage::new())).unwrap()
    }

    #[test]
    fn step_shows_tabs_rows_and_subtotal() {
        let mut wizard = wizard();
        wizard.session_mut().input(0, "1500").unwrap();

        let rendered = render_step(&wizard, "$");
        assert!(rendered.starts_with("Step 1 of 2: Income / Salary\nTabs: [Salary]  Gifts"));
        assert!(rendered.contains("1500.00  Monthly"));
        assert!(rendered.contains("(Whole number only)"));
        assert!(rendered.contains("Subtotal: $1500.00"));
        assert!(rendered.contains("1/2 fields (50%)"));
    }

    #[test]
    fn flagged_entry_is_marked_invalid() {
        let mut wizard = wizard();
        for key in ['1', '2', '.'] {
            wizard.session_mut().press_key(1, EntryKey::Char(key)).unwrap();
        }
        assert!(render_step(&wizard, "$").contains("12. (invalid)"));
    }

    #[test]
    fn steps_without_templates_say_so() {
        let mut wizard = wizard();
        wizard.select_sub("Gifts").unwrap();
        assert!(render_step(&wizard, "$").ends_with(EMPTY_STEP));
    }
}
