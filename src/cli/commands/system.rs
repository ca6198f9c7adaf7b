use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::help;
use crate::cli::output::section as output_section;
use crate::cli::registry::{CommandEntry, CommandGroup};
use crate::utils::build_info;

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "version",
            "Show build metadata",
            "version",
            CommandGroup::System,
            cmd_version,
        ),
        CommandEntry::new(
            "help",
            "Show available commands",
            "help [command]",
            CommandGroup::System,
            cmd_help,
        ),
        CommandEntry::new(
            "exit",
            "Leave the wizard; entries stay saved",
            "exit",
            CommandGroup::System,
            cmd_exit,
        ),
    ]
}

fn cmd_version(_context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let meta = build_info::current();
    output_section(format!("Budget Wizard {}", meta.version));
    for (label, value) in meta.entries().into_iter().skip(1) {
        println!("  {:<8}: {}", label, value);
    }
    Ok(())
}

fn cmd_help(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if let Some(command) = args.first().map(|name| name.to_lowercase()) {
        match context.registry.get(&command) {
            Some(entry) => help::print_command(entry),
            None => context.suggest_command(args[0]),
        }
        return Ok(());
    }

    help::print_overview(&context.registry);
    Ok(())
}

fn cmd_exit(_context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    Err(CommandError::ExitRequested)
}
