use std::collections::HashMap;

use crate::cli::core::{CommandResult, ShellContext};

pub type CommandHandler = fn(&mut ShellContext, &[&str]) -> CommandResult;

/// Which screen a command belongs to in the help overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandGroup {
    Wizard,
    Review,
    Catalog,
    System,
}

impl CommandGroup {
    pub const ALL: [CommandGroup; 4] = [
        CommandGroup::Wizard,
        CommandGroup::Review,
        CommandGroup::Catalog,
        CommandGroup::System,
    ];

    pub fn title(self) -> &'static str {
        match self {
            CommandGroup::Wizard => "Wizard",
            CommandGroup::Review => "Review & submit",
            CommandGroup::Catalog => "Catalog & settings",
            CommandGroup::System => "System",
        }
    }
}

pub struct CommandEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
    pub group: CommandGroup,
    /// Refused until a catalog is loaded.
    pub needs_catalog: bool,
    pub handler: CommandHandler,
}

impl CommandEntry {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        usage: &'static str,
        group: CommandGroup,
        handler: CommandHandler,
    ) -> Self {
        Self {
            name,
            description,
            usage,
            group,
            needs_catalog: matches!(group, CommandGroup::Wizard | CommandGroup::Review),
            handler,
        }
    }
}

pub struct CommandRegistry {
    commands: HashMap<&'static str, CommandEntry>,
    order: Vec<&'static str>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn register(&mut self, entry: CommandEntry) {
        let name = entry.name;
        if self.commands.insert(name, entry).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.commands.get(name)
    }

    pub fn list(&self) -> Vec<&CommandEntry> {
        self.order
            .iter()
            .filter_map(|name| self.commands.get(name))
            .collect()
    }

    pub fn in_group(&self, group: CommandGroup) -> Vec<&CommandEntry> {
        self.list()
            .into_iter()
            .filter(|entry| entry.group == group)
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.order.iter().copied()
    }
}
