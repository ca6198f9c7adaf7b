use std::{
    borrow::Cow,
    collections::HashMap,
    fmt,
    io::{self, BufRead},
};

use colored::Colorize;
use rustyline::{
    completion::{Completer, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    history::DefaultHistory,
    validate::Validator,
    Cmd, Context as ReadlineContext, Editor, Helper, KeyEvent,
};
use shell_words::split;
use tracing::debug;

use crate::cli::commands::wizard::show_current_step;
use crate::cli::core::{CliError, CliMode, CommandError, LoopControl, ShellContext};
use crate::cli::output;
use crate::utils::paths;

const SCRIPT_ENV: &str = "BUDGET_WIZARD_CLI_SCRIPT";

/// Commands whose first argument names a main category.
const CATEGORY_ARGS: [&str; 4] = ["category", "edit", "expand", "collapse"];

pub fn run_cli() -> Result<(), CliError> {
    let mode = if std::env::var_os(SCRIPT_ENV).is_some() {
        CliMode::Script
    } else {
        CliMode::Interactive
    };

    let mut context = ShellContext::new(mode)?;
    greet(&context);

    match mode {
        CliMode::Interactive => run_interactive(&mut context),
        CliMode::Script => run_script(&mut context),
    }
}

fn greet(context: &ShellContext) {
    if context.mode() == CliMode::Interactive {
        output::section("Budget Wizard");
        output::hint("Type `help` for commands, `show` for the current step.");
    }
    if context.wizard.is_some() {
        show_current_step(context);
    } else {
        context
            .report_error(CommandError::CatalogUnavailable(context.unavailable_reason()))
            .ok();
    }
}

fn run_interactive(context: &mut ShellContext) -> Result<(), CliError> {
    let mut editor = Editor::<WizardHelper, DefaultHistory>::new()?;
    editor.bind_sequence(KeyEvent::from('?'), Cmd::Complete);
    let history = paths::history_file_in(&context.home);
    if editor.load_history(&history).is_err() {
        debug!(path = %history.display(), "no command history yet");
    }

    while context.running {
        // Names change after `reload` and `import`.
        editor.set_helper(Some(WizardHelper::from_context(context)));
        match editor.readline(&context.prompt()) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line).ok();
                if run_line(context, line)? == LoopControl::Exit {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                if context.confirm_exit()? {
                    break;
                }
            }
            Err(ReadlineError::Eof) => {
                output::info("Entries are saved. Bye.");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }

    if let Err(err) = editor.save_history(&history) {
        debug!(error = %err, "could not save command history");
    }
    Ok(())
}

/// Reads commands from stdin, one per line. Blank lines and `#` comments are
/// skipped.
fn run_script(context: &mut ShellContext) -> Result<(), CliError> {
    for line in io::stdin().lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if run_line(context, line)? == LoopControl::Exit || !context.running {
            break;
        }
    }
    Ok(())
}

/// Runs one line; command failures are reported and the shell keeps going.
fn run_line(context: &mut ShellContext, line: &str) -> Result<LoopControl, CliError> {
    match handle_line(context, line) {
        Ok(control) => Ok(control),
        Err(err) => {
            context.report_error(err)?;
            Ok(LoopControl::Continue)
        }
    }
}

fn handle_line(context: &mut ShellContext, line: &str) -> Result<LoopControl, CommandError> {
    let tokens = match parse_command_line(line) {
        Ok(tokens) => tokens,
        Err(err) => {
            output::warning(format!("Could not parse `{line}`: {err}"));
            return Ok(LoopControl::Continue);
        }
    };
    let Some((raw, rest)) = tokens.split_first() else {
        return Ok(LoopControl::Continue);
    };

    let command = raw.to_lowercase();
    let args: Vec<&str> = rest.iter().map(String::as_str).collect();
    context.last_command = Some(line.to_string());

    let control = context.dispatch(&command, raw, &args)?;
    if control == LoopControl::Exit {
        context.running = false;
    }
    Ok(control)
}

/// Line-editor support: completes command names and, for navigation
/// commands, category and tab names; hints the usage of a typed command.
struct WizardHelper {
    commands: Vec<String>,
    usages: HashMap<String, String>,
    categories: Vec<String>,
    tabs: Vec<String>,
}

impl WizardHelper {
    fn from_context(context: &ShellContext) -> Self {
        let mut commands = Vec::new();
        let mut usages = HashMap::new();
        for entry in context.registry.list() {
            commands.push(entry.name.to_string());
            usages.insert(entry.name.to_string(), entry.usage.to_string());
        }
        commands.sort();

        let mut categories = Vec::new();
        let mut tabs = Vec::new();
        if let Some(wizard) = &context.wizard {
            for category in wizard.catalog().taxonomy().categories() {
                categories.push(category.name.to_string());
                tabs.extend(category.subcategories.iter().map(ToString::to_string));
            }
        }

        Self {
            commands,
            usages,
            categories,
            tabs,
        }
    }

    fn arguments_for(&self, command: &str) -> &[String] {
        if CATEGORY_ARGS.contains(&command) {
            &self.categories
        } else if command == "tab" {
            &self.tabs
        } else {
            &[]
        }
    }
}

fn candidates(options: &[String], needle: &str) -> Vec<Pair> {
    let needle = needle.to_lowercase();
    options
        .iter()
        .filter(|option| option.to_lowercase().starts_with(&needle))
        .map(|option| Pair {
            display: option.clone(),
            replacement: if option.contains(' ') {
                format!("\"{option}\"")
            } else {
                option.clone()
            },
        })
        .collect()
}

impl Helper for WizardHelper {}

impl Completer for WizardHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        let leading = prefix.len() - prefix.trim_start().len();
        let body = &prefix[leading..];

        match body.split_once(char::is_whitespace) {
            None => Ok((leading, candidates(&self.commands, body))),
            Some((command, argument)) => {
                let argument = argument.trim_start();
                let start = pos - argument.len();
                let options = self.arguments_for(&command.to_lowercase());
                Ok((start, candidates(options, argument.trim_start_matches('"'))))
            }
        }
    }
}

impl Hinter for WizardHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &ReadlineContext<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        let command = line.strip_suffix(' ')?.trim().to_lowercase();
        let usage = self.usages.get(&command)?;
        usage
            .strip_prefix(command.as_str())
            .map(str::trim_start)
            .filter(|rest| !rest.is_empty())
            .map(str::to_string)
    }
}

impl Highlighter for WizardHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        if output::current_preferences().color {
            Cow::Owned(hint.dimmed().to_string())
        } else {
            Cow::Borrowed(hint)
        }
    }
}

impl Validator for WizardHelper {}

pub(crate) fn parse_command_line(input: &str) -> Result<Vec<String>, ParseError> {
    split(input).map_err(|err| ParseError {
        message: err.to_string(),
    })
}

#[derive(Debug)]
pub(crate) struct ParseError {
    message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
