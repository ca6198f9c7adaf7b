use crate::cli::core::{CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::{CommandEntry, CommandGroup};
use crate::config::Config;

const CATALOG_KEYS: [&str; 4] = [
    "catalog_dir",
    "taxonomy_url",
    "templates_url",
    "catalog_timeout_ms",
];

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "config",
        "Show or change settings",
        "config [key [value|none]]",
        CommandGroup::Catalog,
        cmd_config,
    )]
}

fn cmd_config(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args {
        [] => {
            output::section("Configuration");
            for key in Config::KEYS {
                println!("  {:<22} {}", key, context.config.get(key)?);
            }
            println!("  {:<22} {}", "(file)", context.config_manager.path().display());
            Ok(())
        }
        [key] => {
            println!("{}", context.config.get(key)?);
            Ok(())
        }
        [key, value @ ..] => {
            let key = key.to_ascii_lowercase();
            let value = value.join(" ");
            context.config.set(&key, &value)?;
            context.persist_config()?;
            output::success(format!("{key} = {}", context.config.get(&key)?));
            if CATALOG_KEYS.contains(&key.as_str()) {
                output::hint("Run `reload` to load the catalog from the new source.");
            }
            Ok(())
        }
    }
}

