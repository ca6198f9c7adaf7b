use std::fs;

use crate::cli::core::{CliMode, CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::{CommandEntry, CommandGroup};
use crate::cli::ui::abort_watch::AbortWatcher;
use crate::cli::ui::formatting::format_amount;
use crate::review::ReviewView;
use crate::submission::{build_payload, PayloadShape};

use super::wizard::show_current_step;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "submit",
            "Send every step to the submission endpoint",
            "submit [aggregate|projection]",
            CommandGroup::Review,
            cmd_submit,
        ),
        CommandEntry::new(
            "export",
            "Print or save the submission payload without sending it",
            "export [aggregate|projection] [file]",
            CommandGroup::Review,
            cmd_export,
        ),
    ]
}

fn parse_shape(raw: &str) -> Result<PayloadShape, CommandError> {
    raw.parse().map_err(CommandError::InvalidArguments)
}

fn cmd_submit(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let shape = match args.first() {
        Some(raw) => parse_shape(raw)?,
        None => context.config.payload_shape,
    };
    let sink = context.submission_sink()?;

    let summary = context.wizard_mut()?.enter_review();
    let prompt = format!(
        "Submit {} fields totalling {}?",
        summary.row_count(),
        format_amount(context.currency(), summary.grand_total)
    );
    if !context.confirm(&prompt, true)? {
        output::info("Submission cancelled; nothing was sent.");
        return Ok(());
    }

    output::info(format!("Submitting {} payload...", shape));
    let watcher = AbortWatcher::start(&sink, context.mode())?;
    if watcher.is_some() && context.mode() == CliMode::Interactive {
        output::hint("Press Esc or Ctrl-C to abort.");
    }
    let outcome = sink.submit(context.wizard_mut()?, shape);
    if let Some(watcher) = watcher {
        watcher.finish();
    }
    let receipt = outcome?;
    context.review = ReviewView::new();
    output::success(format!(
        "Submission accepted (HTTP {}, {} bytes). Saved entries were cleared.",
        receipt.status, receipt.bytes
    ));
    show_current_step(context);
    Ok(())
}

fn cmd_export(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (shape, target) = match args {
        [] => (PayloadShape::Projection, None),
        [first, rest @ ..] => match first.parse::<PayloadShape>() {
            Ok(shape) => (shape, rest.first().copied()),
            Err(_) if rest.is_empty() => (PayloadShape::Projection, Some(*first)),
            Err(message) => return Err(CommandError::InvalidArguments(message)),
        },
    };

    let summary = context.wizard_mut()?.enter_review();
    let body = build_payload(&summary, shape)?;
    match target {
        Some(path) => {
            fs::write(path, &body)?;
            output::success(format!("Wrote {} bytes to {}.", body.len(), path));
        }
        None => println!("{body}"),
    }
    Ok(())
}
