use std::io::{self, Stdout, Write};

use colored::Colorize;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{self, ClearType},
    ExecutableCommand,
};

use crate::cli::core::CommandError;
use crate::cli::ui::test_mode;
use crate::session::{EntryKey, FormSession};

enum KeyAction {
    Entry(EntryKey),
    Finish,
    Ignore,
}

fn map_key(key: KeyEvent) -> KeyAction {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('u') | KeyCode::Char('U') => KeyAction::Entry(EntryKey::Clear),
            KeyCode::Char('c') | KeyCode::Char('C') => KeyAction::Finish,
            _ => KeyAction::Ignore,
        };
    }
    match key.code {
        KeyCode::Enter | KeyCode::Esc | KeyCode::Tab => KeyAction::Finish,
        KeyCode::Backspace | KeyCode::Delete => KeyAction::Entry(EntryKey::Backspace),
        KeyCode::Char(ch) => KeyAction::Entry(EntryKey::Char(ch)),
        _ => KeyAction::Ignore,
    }
}

/// Keystroke entry for a numeric row. Every accepted key is stored
/// immediately; Enter or Esc leaves the prompt.
pub fn numeric_entry(
    label: &str,
    session: &mut FormSession,
    index: usize,
) -> Result<(), CommandError> {
    if let Some(keys) = test_mode::next_key_sequence(label)? {
        for key in keys {
            match map_key(key) {
                KeyAction::Entry(entry_key) => {
                    session.press_key(index, entry_key)?;
                }
                KeyAction::Finish => break,
                KeyAction::Ignore => {}
            }
        }
        return Ok(());
    }

    let mut guard = RawModeGuard::activate()?;
    let mut stdout = io::stdout();
    redraw_entry(&mut stdout, label, &current_text(session, index))?;

    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match map_key(key) {
            KeyAction::Entry(entry_key) => {
                session.press_key(index, entry_key)?;
                redraw_entry(&mut stdout, label, &current_text(session, index))?;
            }
            KeyAction::Finish => break,
            KeyAction::Ignore => {}
        }
    }

    guard.deactivate();
    println!();
    Ok(())
}

fn current_text(session: &FormSession, index: usize) -> String {
    match session.entry(index) {
        Some(entry) if entry.is_flagged() => {
            let shown = entry.display();
            let (kept, rejected) = shown.split_at(entry.buffer().len());
            format!("{}{}  {}", kept, rejected.red().bold(), "(invalid)".red())
        }
        Some(entry) => entry.buffer().to_string(),
        None => session
            .rows()
            .get(index)
            .map(|row| row.value.to_input_text())
            .unwrap_or_default(),
    }
}

fn redraw_entry(stdout: &mut Stdout, label: &str, text: &str) -> io::Result<()> {
    stdout.execute(cursor::MoveToColumn(0))?;
    stdout.execute(terminal::Clear(ClearType::CurrentLine))?;
    write!(stdout, "{label}> {text}")?;
    stdout.flush()
}

pub(crate) struct RawModeGuard {
    active: bool,
}

impl RawModeGuard {
    pub(crate) fn activate() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self { active: true })
    }

    fn deactivate(&mut self) {
        if self.active {
            let _ = terminal::disable_raw_mode();
            self.active = false;
        }
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        self.deactivate();
    }
}
