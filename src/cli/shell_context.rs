use std::{path::PathBuf, sync::Arc};

use dialoguer::theme::ColorfulTheme;

use crate::{
    catalog::LoadState,
    config::{Config, ConfigManager},
    review::ReviewView,
    storage::ClientStorage,
    submission::SubmissionSink,
    wizard::Wizard,
};

use super::registry::CommandRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

pub struct ShellContext {
    pub mode: CliMode,
    pub registry: CommandRegistry,
    pub theme: ColorfulTheme,
    pub home: PathBuf,
    pub config_manager: ConfigManager,
    pub config: Config,
    pub storage: Arc<dyn ClientStorage>,
    pub catalog_state: LoadState,
    pub wizard: Option<Wizard>,
    pub review: ReviewView,
    /// Built on first submit; dropped whenever submission settings change.
    pub sink: Option<SubmissionSink>,
    pub last_command: Option<String>,
    pub running: bool,
}

impl ShellContext {
    pub fn status(&self) -> String {
        format!(
            "ShellContext {{ running: {}, last_command: {:?}, step: {:?} }}",
            self.running,
            self.last_command,
            self.wizard
                .as_ref()
                .map(|wizard| wizard.position().to_string())
        )
    }
}
