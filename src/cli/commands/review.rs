use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::{CommandEntry, CommandGroup};
use crate::cli::ui::review_view::render_review;
use crate::domain::Name;
use crate::errors::NavigationError;

use super::wizard::show_current_step;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "review",
            "Show every step with subtotals and the grand total",
            "review",
            CommandGroup::Review,
            cmd_review,
        ),
        CommandEntry::new(
            "expand",
            "Expand a category on the review screen",
            "expand <category|all>",
            CommandGroup::Review,
            cmd_expand,
        ),
        CommandEntry::new(
            "collapse",
            "Collapse a category on the review screen",
            "collapse <category|all>",
            CommandGroup::Review,
            cmd_collapse,
        ),
        CommandEntry::new(
            "edit",
            "Jump from the review back to a step",
            "edit <category> [tab]",
            CommandGroup::Review,
            cmd_edit,
        ),
    ]
}

/// Commits the active step and prints the review screen.
pub(crate) fn print_review(context: &mut ShellContext) -> CommandResult {
    let summary = context.wizard_mut()?.enter_review();
    output::section("Review");
    output::block(&render_review(&summary, &context.review, context.currency()));
    output::hint("Use `edit <category> [tab]` to change a step or `submit` to send.");
    Ok(())
}

fn cmd_review(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    print_review(context)
}

fn category_name(context: &ShellContext, raw: &str) -> Result<Name, CommandError> {
    context
        .wizard()?
        .catalog()
        .taxonomy()
        .find_category(raw)
        .map(|category| category.name.clone())
        .ok_or_else(|| NavigationError::UnknownCategory(raw.to_string()).into())
}

fn cmd_expand(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if args.is_empty() {
        return Err(CommandError::InvalidArguments(
            "usage: expand <category|all>".into(),
        ));
    }
    let raw = args.join(" ");
    if raw.eq_ignore_ascii_case("all") {
        context.review.expand_all();
    } else {
        let name = category_name(context, &raw)?;
        context.review.expand(&name);
    }
    print_review(context)
}

fn cmd_collapse(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if args.is_empty() {
        return Err(CommandError::InvalidArguments(
            "usage: collapse <category|all>".into(),
        ));
    }
    let raw = args.join(" ");
    if raw.eq_ignore_ascii_case("all") {
        let summary = context.wizard_mut()?.enter_review();
        context.review.collapse_all(&summary);
    } else {
        let name = category_name(context, &raw)?;
        context.review.collapse(&name);
    }
    print_review(context)
}

fn cmd_edit(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some(main) = args.first() else {
        return Err(CommandError::InvalidArguments(
            "usage: edit <category> [tab]".into(),
        ));
    };
    let sub = (args.len() > 1).then(|| args[1..].join(" "));
    context.wizard_mut()?.jump_to(main, sub.as_deref())?;
    show_current_step(context);
    Ok(())
}
