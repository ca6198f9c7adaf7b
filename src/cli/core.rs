//! Shell context lifecycle, dispatch, and error reporting.

use std::{env, io, path::PathBuf, sync::Arc, time::Duration};

use dialoguer::theme::ColorfulTheme;
use rustyline::error::ReadlineError;
use strsim::levenshtein;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    catalog::{CatalogLoader, LoadState},
    config::{Config, ConfigManager},
    errors::{
        CatalogError, ConfigError, InputError, NavigationError, SubmissionError, WizardError,
    },
    review::ReviewView,
    storage::{ClientStorage, JsonFileStorage},
    submission::{HttpTransport, SubmissionSink},
    utils::paths,
    wizard::Wizard,
};

use super::commands;
use super::io as cli_io;
use super::output::{self, OutputPreferences};
use super::registry::CommandRegistry;
pub use super::shell_context::{CliMode, ShellContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub type CommandResult = Result<(), CommandError>;

/// Failures that end the shell.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Line editor error: {0}")]
    Readline(#[from] ReadlineError),
}

/// Failures of a single command. The shell reports them and keeps going.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Catalog not available: {0}")]
    CatalogUnavailable(String),
    #[error("{0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error(transparent)]
    Dialoguer(#[from] dialoguer::Error),
    #[error("exit requested")]
    ExitRequested,
}

macro_rules! wizard_error_from {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for CommandError {
                fn from(err: $source) -> Self {
                    CommandError::Wizard(err.into())
                }
            }
        )*
    };
}

wizard_error_from!(
    CatalogError,
    ConfigError,
    InputError,
    NavigationError,
    SubmissionError
);

/// Pushes the display settings of `config` into the output helpers.
/// `NO_COLOR` always wins over the configured color flag.
pub(crate) fn apply_config(config: &Config) {
    let color = config.ui_color_enabled && env::var_os("NO_COLOR").is_none();
    output::set_preferences(OutputPreferences { color });
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        Self::with_home(mode, paths::app_data_dir())
    }

    pub fn with_home(mode: CliMode, home: PathBuf) -> Result<Self, CliError> {
        let mut registry = CommandRegistry::new();
        commands::register_all(&mut registry);

        let config_manager = ConfigManager::with_base_dir(home.clone())?;
        let config = config_manager.load()?;
        apply_config(&config);
        let storage: Arc<dyn ClientStorage> =
            Arc::new(JsonFileStorage::new(paths::storage_dir_in(&home))?);

        let mut context = ShellContext {
            mode,
            registry,
            theme: ColorfulTheme::default(),
            home,
            config_manager,
            config,
            storage,
            catalog_state: LoadState::Loading,
            wizard: None,
            review: ReviewView::new(),
            sink: None,
            last_command: None,
            running: true,
        };
        context.reload_catalog();
        Ok(context)
    }

    pub(crate) fn mode(&self) -> CliMode {
        self.mode
    }

    /// Fetches the catalog from the configured source and restarts the
    /// wizard on it. Persisted rows are kept.
    pub(crate) fn reload_catalog(&mut self) -> &LoadState {
        self.wizard = None;
        self.review = ReviewView::new();
        self.catalog_state = LoadState::Loading;

        let loader = CatalogLoader::from_config(&self.config);
        info!(source = %loader.source(), "loading catalog");
        self.catalog_state = match loader.load() {
            LoadState::Ready(catalog) => {
                match Wizard::new(Arc::clone(&catalog), Arc::clone(&self.storage)) {
                    Ok(wizard) => {
                        self.wizard = Some(wizard);
                        LoadState::Ready(catalog)
                    }
                    Err(err) => {
                        warn!(error = %err, "wizard could not start on the loaded catalog");
                        LoadState::Failed(err.to_string())
                    }
                }
            }
            other => other,
        };
        &self.catalog_state
    }

    pub(crate) fn unavailable_reason(&self) -> String {
        match &self.catalog_state {
            LoadState::Loading => "the catalog is still loading".into(),
            LoadState::Failed(reason) => reason.clone(),
            LoadState::Ready(_) => "the wizard is not running".into(),
        }
    }

    pub(crate) fn wizard(&self) -> Result<&Wizard, CommandError> {
        self.wizard
            .as_ref()
            .ok_or_else(|| CommandError::CatalogUnavailable(self.unavailable_reason()))
    }

    pub(crate) fn wizard_mut(&mut self) -> Result<&mut Wizard, CommandError> {
        let reason = self.unavailable_reason();
        self.wizard
            .as_mut()
            .ok_or(CommandError::CatalogUnavailable(reason))
    }

    pub(crate) fn currency(&self) -> &str {
        &self.config.currency_symbol
    }

    pub(crate) fn persist_config(&mut self) -> CommandResult {
        self.config_manager.save(&self.config)?;
        apply_config(&self.config);
        self.sink = None;
        Ok(())
    }

    /// The sink for the configured endpoint, created on first use.
    pub(crate) fn submission_sink(&mut self) -> Result<SubmissionSink, CommandError> {
        if let Some(sink) = &self.sink {
            return Ok(sink.clone());
        }
        let endpoint = self
            .config
            .submission_endpoint
            .clone()
            .ok_or(SubmissionError::NoEndpoint)?;
        let timeout = Duration::from_millis(self.config.submission_timeout_ms);
        let sink = SubmissionSink::new(Arc::new(HttpTransport::new(endpoint, timeout)), timeout);
        self.sink = Some(sink.clone());
        Ok(sink)
    }

    /// Yes/no question; scripts always proceed.
    pub(crate) fn confirm(&self, prompt: &str, default: bool) -> Result<bool, CommandError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        cli_io::confirm_action(&self.theme, prompt, default)
    }

    pub(crate) fn prompt(&self) -> String {
        match &self.wizard {
            Some(wizard) if wizard.is_complete() => "budget-wizard [complete]> ".into(),
            Some(wizard) => {
                let (index, count) = wizard.progress();
                format!("budget-wizard [{} {}/{}]> ", wizard.position(), index, count)
            }
            None => "budget-wizard [no catalog]> ".into(),
        }
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        let Some(entry) = self.registry.get(command) else {
            self.suggest_command(raw);
            return Ok(LoopControl::Continue);
        };
        let (handler, needs_catalog) = (entry.handler, entry.needs_catalog);
        if needs_catalog && self.wizard.is_none() {
            return Err(CommandError::CatalogUnavailable(self.unavailable_reason()));
        }
        debug!(command, context = %self.status(), "dispatching command");

        match handler(self, args) {
            Ok(()) => Ok(LoopControl::Continue),
            Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
            Err(err) => Err(err),
        }
    }

    #[cfg(test)]
    pub(crate) fn process_line(&mut self, line: &str) -> Result<LoopControl, CommandError> {
        let tokens = crate::cli::shell::parse_command_line(line)
            .map_err(|err| CommandError::InvalidArguments(err.to_string()))?;
        if tokens.is_empty() {
            return Ok(LoopControl::Continue);
        }
        let command = tokens[0].to_lowercase();
        let args: Vec<&str> = tokens.iter().skip(1).map(String::as_str).collect();
        self.dispatch(&command, &tokens[0], &args)
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        output::warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));
        if let Some(best) = closest(input, self.registry.names()) {
            output::info(format!("Suggestion: `{}`?", best));
        }
    }

    /// Closest category or tab name to a mistyped one.
    fn suggest_step_name(&self, error: &NavigationError) -> Option<String> {
        let wizard = self.wizard.as_ref()?;
        let taxonomy = wizard.catalog().taxonomy();
        match error {
            NavigationError::UnknownCategory(raw) => closest(
                raw,
                taxonomy
                    .categories()
                    .iter()
                    .map(|category| category.name.as_str()),
            )
            .map(str::to_string),
            NavigationError::UnknownSubcategory { main, sub } => {
                let category = taxonomy.find_category(main)?;
                closest(
                    sub,
                    category.subcategories.iter().map(|name| name.as_str()),
                )
                .map(str::to_string)
            }
            NavigationError::EmptyTaxonomy => None,
        }
    }

    pub(crate) fn confirm_exit(&self) -> Result<bool, CliError> {
        Ok(self.confirm("Exit the wizard?", true)?)
    }

    pub(crate) fn report_error(&self, err: CommandError) -> Result<(), CliError> {
        match err {
            CommandError::ExitRequested => {}
            CommandError::InvalidArguments(message) => {
                output::error(message);
                output::hint("Use `help <command>` for usage details.");
            }
            CommandError::CatalogUnavailable(reason) => {
                output::error(format!("Catalog not available: {reason}"));
                output::hint("Check `config catalog_dir` or the catalog URLs, then run `reload`.");
            }
            CommandError::Wizard(WizardError::Navigation(error)) => {
                output::error(&error);
                if let Some(name) = self.suggest_step_name(&error) {
                    output::info(format!("Suggestion: `{}`?", name));
                }
            }
            CommandError::Wizard(WizardError::Submission(error)) => {
                output::error(&error);
                match error {
                    SubmissionError::NoEndpoint => {
                        output::hint("Set one with `config submission_endpoint <url>`.")
                    }
                    SubmissionError::InFlight => {
                        output::hint("The earlier request has not settled yet. Try again shortly.")
                    }
                    SubmissionError::Encode(_) => {}
                    _ => output::hint("Your entries were kept. Run `submit` again to retry."),
                }
            }
            other => output::error(other),
        }
        Ok(())
    }
}

fn closest<'a>(input: &str, candidates: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let needle = input.to_lowercase();
    candidates
        .map(|candidate| (levenshtein(&candidate.to_lowercase(), &needle), candidate))
        .min_by_key(|(distance, _)| *distance)
        .filter(|(distance, _)| *distance <= 3)
        .map(|(_, candidate)| candidate)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn context(home: &std::path::Path) -> ShellContext {
        ShellContext::with_home(CliMode::Script, home.to_path_buf()).unwrap()
    }

    #[test]
    fn closest_name_is_case_insensitive_and_bounded() {
        let names = ["Income", "Expenses", "Debt"];
        assert_eq!(closest("incme", names.iter().copied()), Some("Income"));
        assert_eq!(closest("Groceries", names.iter().copied()), None);
    }

    #[test]
    fn builtin_catalog_starts_the_wizard() {
        let temp = tempfile::tempdir().unwrap();
        let mut context = context(temp.path());
        assert!(context.catalog_state.is_ready());
        assert!(context.prompt().contains("Income / Salary 1/10"));

        assert_eq!(context.process_line("next").unwrap(), LoopControl::Continue);
        assert_eq!(context.wizard().unwrap().progress(), (2, 10));
        assert_eq!(context.process_line("exit").unwrap(), LoopControl::Exit);
    }

    #[test]
    fn wizard_commands_are_refused_without_a_catalog() {
        let temp = tempfile::tempdir().unwrap();
        let config_dir = paths::config_dir_in(temp.path());
        fs::create_dir_all(&config_dir).unwrap();
        let missing = temp.path().join("missing");
        fs::write(
            paths::config_file_in(temp.path()),
            format!(r#"{{"catalog_dir": {:?}}}"#, missing.display().to_string()),
        )
        .unwrap();

        let mut context = context(temp.path());
        assert!(matches!(context.catalog_state, LoadState::Failed(_)));
        assert!(matches!(
            context.process_line("next"),
            Err(CommandError::CatalogUnavailable(_))
        ));
        assert_eq!(context.process_line("version").unwrap(), LoopControl::Continue);
    }
}
