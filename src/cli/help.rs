use crate::cli::output::{self, section as output_section};
use crate::cli::registry::{CommandEntry, CommandGroup, CommandRegistry};

pub fn print_overview(registry: &CommandRegistry) {
    output_section("Available commands");
    for group in CommandGroup::ALL {
        let entries = registry.in_group(group);
        if entries.is_empty() {
            continue;
        }
        println!("{}:", group.title());
        for entry in entries {
            println!("  {:<12} {}", entry.name, entry.description);
        }
    }
    output::hint("Use `help <command>` for details.");
}

pub fn print_command(entry: &CommandEntry) {
    output_section(format!("Help: {}", entry.name));
    println!("  Description: {}", entry.description);
    println!("  Usage: {}", entry.usage);
    if entry.needs_catalog {
        println!("  Requires a loaded catalog.");
    }
}
