use crate::cli::ui::formatting::format_amount;
use crate::cli::ui::step_view::EMPTY_STEP;
use crate::cli::ui::table_renderer::{Alignment, Table, TableColumn};
use crate::review::{ReviewSummary, ReviewView};

/// Review screen text. Collapsed categories show only their total line.
pub fn render_review(summary: &ReviewSummary, view: &ReviewView, currency: &str) -> String {
    let mut lines = Vec::new();

    for category in &summary.categories {
        let collapsed = view.is_collapsed(&category.name);
        let marker = if collapsed { "[+]" } else { "[-]" };
        lines.push(format!(
            "{marker} {}  total {}",
            category.name,
            format_amount(currency, category.total)
        ));
        if collapsed {
            continue;
        }

        for step in &category.subcategories {
            let title = step.name.as_ref().unwrap_or(&category.name);
            if step.name.is_some() {
                lines.push(format!("    {title}"));
            }
            if step.rows.is_empty() {
                lines.push(format!("      {EMPTY_STEP}"));
            } else {
                let mut table = Table::new(vec![
                    TableColumn::new("Field", Alignment::Left).max_width(32),
                    TableColumn::new("Value", Alignment::Right),
                    TableColumn::new("Frequency", Alignment::Left),
                ]);
                table.show_headers = false;
                table.indent = 6;
                for row in &step.rows {
                    table.push(vec![
                        row.label.clone(),
                        row.display_value(),
                        row.frequency_label().to_string(),
                    ]);
                }
                lines.push(table.render());
            }
            lines.push(format!(
                "    {title} subtotal: {}",
                format_amount(currency, step.subtotal)
            ));
        }
    }

    lines.push(format!(
        "Grand total: {}",
        format_amount(currency, summary.grand_total)
    ));
    lines.join("\n")
}
