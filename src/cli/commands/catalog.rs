use std::fs;

use crate::catalog::{flat::parse_flat, loader::write_directory, LoadState};
use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::{CommandEntry, CommandGroup};
use crate::utils::paths;

use super::wizard::show_current_step;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "import",
            "Import a flat field list and use it as the catalog",
            "import <file>",
            CommandGroup::Catalog,
            cmd_import,
        ),
        CommandEntry::new(
            "reload",
            "Load the catalog again from the configured source",
            "reload",
            CommandGroup::Catalog,
            cmd_reload,
        ),
    ]
}

fn cmd_import(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some(path) = args.first() else {
        return Err(CommandError::InvalidArguments("usage: import <file>".into()));
    };
    let raw = fs::read_to_string(path)?;
    let catalog = parse_flat(&raw)?;
    let target = paths::catalog_dir_in(&context.home);
    write_directory(&catalog, &target)?;
    output::success(format!("Imported {catalog} from {path}."));

    if context.config.taxonomy_url.is_some() || context.config.templates_url.is_some() {
        output::warning("Catalog URLs were set; they are cleared so the import takes effect.");
        context.config.taxonomy_url = None;
        context.config.templates_url = None;
    }
    context.config.catalog_dir = Some(target);
    context.persist_config()?;
    cmd_reload(context, &[])
}

fn cmd_reload(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    match context.reload_catalog().clone() {
        LoadState::Ready(catalog) => {
            output::success(format!("Catalog ready: {catalog}."));
            show_current_step(context);
            Ok(())
        }
        LoadState::Failed(reason) => Err(CommandError::CatalogUnavailable(reason)),
        LoadState::Loading => Err(CommandError::CatalogUnavailable(
            context.unavailable_reason(),
        )),
    }
}
