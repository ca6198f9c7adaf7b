use crate::catalog::CatalogSource;
use crate::cli::core::{CliMode, CommandError, CommandResult, ShellContext};
use crate::cli::io;
use crate::cli::output;
use crate::cli::registry::{CommandEntry, CommandGroup};
use crate::cli::ui::formatting::format_amount;
use crate::cli::ui::{prompts, step_view, test_mode};
use crate::domain::{FieldKind, FieldTemplate, Frequency};
use crate::errors::InputError;
use crate::utils::paths;
use crate::wizard::WizardEvent;

use super::review::print_review;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "show",
            "Show the current step",
            "show",
            CommandGroup::Wizard,
            cmd_show,
        ),
        CommandEntry::new(
            "set",
            "Set a field value; no value empties it",
            "set <row> [value]",
            CommandGroup::Wizard,
            cmd_set,
        ),
        CommandEntry::new(
            "enter",
            "Type a numeric value key by key",
            "enter <row>",
            CommandGroup::Wizard,
            cmd_enter,
        ),
        CommandEntry::new(
            "freq",
            "Choose how often a numeric field recurs",
            "freq <row> [weekly|monthly|quarterly|annually|none]",
            CommandGroup::Wizard,
            cmd_freq,
        ),
        CommandEntry::new(
            "clear",
            "Empty every field of the current step",
            "clear",
            CommandGroup::Wizard,
            cmd_clear,
        ),
        CommandEntry::new(
            "next",
            "Save and move to the next step",
            "next",
            CommandGroup::Wizard,
            cmd_next,
        ),
        CommandEntry::new(
            "prev",
            "Save and move to the previous step",
            "prev",
            CommandGroup::Wizard,
            cmd_prev,
        ),
        CommandEntry::new(
            "category",
            "List main categories or switch to one",
            "category [name]",
            CommandGroup::Wizard,
            cmd_category,
        ),
        CommandEntry::new(
            "tab",
            "List subcategory tabs or switch to one",
            "tab [name]",
            CommandGroup::Wizard,
            cmd_tab,
        ),
        CommandEntry::new(
            "status",
            "Show progress and session details",
            "status",
            CommandGroup::Wizard,
            cmd_status,
        ),
    ]
}

pub(crate) fn show_current_step(context: &ShellContext) {
    if let Some(wizard) = &context.wizard {
        println!();
        output::block(&step_view::render_step(wizard, context.currency()));
    }
}

/// 1-based row argument to a row index.
fn parse_row(arg: Option<&&str>, usage: &str) -> Result<usize, CommandError> {
    let raw = arg.ok_or_else(|| CommandError::InvalidArguments(format!("usage: {usage}")))?;
    match raw.parse::<usize>() {
        Ok(row) if row > 0 => Ok(row - 1),
        _ => Err(CommandError::InvalidArguments(format!(
            "`{raw}` is not a row number"
        ))),
    }
}

fn template_at(context: &ShellContext, index: usize) -> Result<FieldTemplate, CommandError> {
    context
        .wizard()?
        .session()
        .templates()
        .get(index)
        .cloned()
        .ok_or_else(|| InputError::RowOutOfRange(index + 1).into())
}

fn cmd_show(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    show_current_step(context);
    Ok(())
}

fn cmd_set(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let index = parse_row(args.first(), "set <row> [value]")?;
    let template = template_at(context, index)?;
    let raw = if args.len() > 1 {
        args[1..].join(" ")
    } else if context.mode() == CliMode::Interactive {
        prompt_value(context, index, &template)?
    } else {
        String::new()
    };

    let wizard = context.wizard_mut()?;
    let value = wizard.session_mut().input(index, &raw)?;
    let subtotal = wizard.session().subtotal();

    if value.is_empty() {
        output::success(format!("{} cleared.", template.label));
    } else {
        output::success(format!(
            "{} = {}",
            template.label,
            template.kind.render(&value)
        ));
    }
    output::info(format!(
        "Subtotal: {}",
        format_amount(context.currency(), subtotal)
    ));
    Ok(())
}

fn prompt_value(
    context: &ShellContext,
    index: usize,
    template: &FieldTemplate,
) -> Result<String, CommandError> {
    let current = context
        .wizard()?
        .session()
        .rows()
        .get(index)
        .map(|row| row.value.to_input_text())
        .unwrap_or_default();

    if let FieldKind::Text { options, .. } = &template.kind {
        if !options.is_empty() {
            let default = options
                .iter()
                .position(|option| *option == current)
                .unwrap_or(0);
            let choice = io::select_item(&context.theme, &template.label, options, default)?;
            return Ok(choice.map(|idx| options[idx].clone()).unwrap_or(current));
        }
    }

    let placeholder = template.kind.placeholder();
    let prompt = if placeholder.is_empty() {
        template.label.clone()
    } else {
        format!("{} ({})", template.label, placeholder)
    };
    io::prompt_text(&context.theme, &prompt, &current)
}

fn cmd_enter(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let index = parse_row(args.first(), "enter <row>")?;
    let template = template_at(context, index)?;
    if !matches!(template.kind, FieldKind::Numeric { .. }) {
        return Err(CommandError::InvalidArguments(format!(
            "Row {} is a {} field; use `set {} <value>`",
            index + 1,
            template.kind,
            index + 1
        )));
    }
    if context.mode() == CliMode::Script && !test_mode::is_enabled() {
        return Err(CommandError::Message(
            "`enter` reads keys from a terminal; use `set <row> <value>` in scripts".into(),
        ));
    }

    let session = context.wizard_mut()?.session_mut();
    prompts::numeric_entry(&template.label, session, index)?;

    let value = session
        .rows()
        .get(index)
        .map(|row| template.kind.render(&row.value))
        .unwrap_or_default();
    match session.entry(index).filter(|entry| entry.is_flagged()) {
        Some(entry) => {
            output::warning(format!(
                "{}: `{}` is invalid; only whole numbers are allowed. Delete the rejected character.",
                template.label,
                entry.display()
            ));
            output::info(format!("Stored value: {}", value_or_empty(&value)));
        }
        None => {
            session.close_entry(index);
            output::success(format!("{} = {}", template.label, value_or_empty(&value)));
        }
    }
    Ok(())
}

fn value_or_empty(value: &str) -> &str {
    if value.is_empty() {
        "(empty)"
    } else {
        value
    }
}

fn cmd_freq(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let usage = "freq <row> [weekly|monthly|quarterly|annually|none]";
    let index = parse_row(args.first(), usage)?;
    let template = template_at(context, index)?;

    let frequency = match args.get(1) {
        Some(raw) => Frequency::parse_optional(raw)
            .map_err(|err| CommandError::InvalidArguments(err.to_string()))?,
        None if context.mode() == CliMode::Interactive => {
            let mut items: Vec<String> = template
                .frequencies
                .iter()
                .map(|frequency| frequency.label().to_string())
                .collect();
            items.push("None".into());
            match io::select_item(&context.theme, &template.label, &items, 0)? {
                Some(idx) => template.frequencies.get(idx).copied(),
                None => return Ok(()),
            }
        }
        None => return Err(CommandError::InvalidArguments(format!("usage: {usage}"))),
    };

    context
        .wizard_mut()?
        .session_mut()
        .set_frequency(index, frequency)?;
    output::success(format!(
        "{} frequency: {}",
        template.label,
        frequency.map(Frequency::label).unwrap_or("NA")
    ));
    Ok(())
}

fn cmd_clear(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let position = context.wizard()?.position().clone();
    if !context.confirm(&format!("Clear every field in {position}?"), false)? {
        output::info("Nothing was cleared.");
        return Ok(());
    }
    context.wizard_mut()?.session_mut().clear()?;
    output::success(format!("Cleared {position}."));
    show_current_step(context);
    Ok(())
}

fn cmd_next(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    match context.wizard_mut()?.advance()? {
        WizardEvent::Completed => {
            output::success("All steps complete. Review your entries before submitting.");
            print_review(context)
        }
        WizardEvent::Moved(_) | WizardEvent::AtStart => {
            show_current_step(context);
            Ok(())
        }
    }
}

fn cmd_prev(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    match context.wizard_mut()?.retreat()? {
        WizardEvent::AtStart => output::warning("Already at the first step."),
        WizardEvent::Moved(_) | WizardEvent::Completed => show_current_step(context),
    }
    Ok(())
}

fn cmd_category(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if args.is_empty() {
        let wizard = context.wizard()?;
        output::section("Categories");
        for category in wizard.catalog().taxonomy().categories() {
            let marker = if category.name == wizard.position().main {
                "*"
            } else {
                " "
            };
            let detail = match category.subcategories.len() {
                0 => String::new(),
                1 => " (1 tab)".into(),
                count => format!(" ({count} tabs)"),
            };
            println!("  {marker} {}{}", category.name, detail);
        }
        return Ok(());
    }

    context.wizard_mut()?.select_main(&args.join(" "))?;
    show_current_step(context);
    Ok(())
}

fn cmd_tab(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if args.is_empty() {
        let wizard = context.wizard()?;
        let position = wizard.position();
        let Some(category) = wizard.catalog().taxonomy().category(&position.main) else {
            return Ok(());
        };
        if category.is_leaf() {
            output::info(format!("`{}` has no tabs.", category.name));
            return Ok(());
        }
        output::section(format!("Tabs of {}", category.name));
        for sub in &category.subcategories {
            let marker = if position.sub.as_ref() == Some(sub) {
                "*"
            } else {
                " "
            };
            println!("  {marker} {sub}");
        }
        return Ok(());
    }

    context.wizard_mut()?.select_sub(&args.join(" "))?;
    show_current_step(context);
    Ok(())
}

fn cmd_status(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let wizard = context.wizard()?;
    let session = wizard.session();
    let (index, count) = wizard.progress();
    let taxonomy = wizard.catalog().taxonomy();
    let mut saved = 0;
    for key in taxonomy.storage_keys() {
        if session.storage().contains(key.as_str())? {
            saved += 1;
        }
    }

    output::section("Status");
    println!("  Step      : {index} of {count} ({})", wizard.position());
    println!("  Fields    : {}", session.progress());
    println!(
        "  Subtotal  : {}",
        format_amount(context.currency(), session.subtotal())
    );
    println!("  Saved     : {saved} of {count} steps");
    println!("  Session   : {}", wizard.session_id());
    println!(
        "  Catalog   : {} ({})",
        CatalogSource::from_config(&context.config),
        wizard.catalog()
    );
    println!(
        "  Storage   : {}",
        paths::storage_dir_in(&context.home).display()
    );
    if wizard.is_complete() {
        println!("  All steps complete; run `review` or `submit`.");
    }
    Ok(())
}
