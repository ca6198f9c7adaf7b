//! Scripted keystrokes for the raw-terminal prompts.
//!
//! `BUDGET_WIZARD_TEST_KEYS` holds one sequence per prompt, separated by
//! `|`. Tokens within a sequence are separated by `,`: named keys (`ENTER`,
//! `ESC`, `BACKSPACE`, `DELETE`, `CLEAR`) or literal text typed one
//! character at a time.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use once_cell::sync::Lazy;
use std::{collections::VecDeque, env, io, sync::Mutex};

pub const KEYS_ENV: &str = "BUDGET_WIZARD_TEST_KEYS";

struct KeySequenceQueue {
    enabled: bool,
    sequences: VecDeque<Vec<KeyEvent>>,
}

impl KeySequenceQueue {
    fn from_env(var: &str) -> Self {
        match env::var(var) {
            Ok(raw) => Self {
                enabled: true,
                sequences: parse_key_sequences(&raw),
            },
            Err(_) => Self {
                enabled: false,
                sequences: VecDeque::new(),
            },
        }
    }
}

static KEY_EVENTS: Lazy<Mutex<KeySequenceQueue>> =
    Lazy::new(|| Mutex::new(KeySequenceQueue::from_env(KEYS_ENV)));

pub fn is_enabled() -> bool {
    KEY_EVENTS
        .lock()
        .map(|guard| guard.enabled)
        .unwrap_or(false)
}

/// Next scripted sequence, or `None` when keys come from the terminal.
pub fn next_key_sequence(label: &str) -> io::Result<Option<Vec<KeyEvent>>> {
    let mut guard = KEY_EVENTS
        .lock()
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "scripted key queue poisoned"))?;
    if !guard.enabled {
        return Ok(None);
    }
    guard.sequences.pop_front().map(Some).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("scripted keys exhausted before the `{label}` prompt"),
        )
    })
}

fn parse_key_sequences(raw: &str) -> VecDeque<Vec<KeyEvent>> {
    raw.split('|')
        .map(|segment| {
            segment
                .split(',')
                .flat_map(|token| parse_token(token.trim()))
                .collect::<Vec<_>>()
        })
        .filter(|events| !events.is_empty())
        .collect()
}

fn parse_token(token: &str) -> Vec<KeyEvent> {
    let named = match token.to_ascii_uppercase().as_str() {
        "ENTER" | "RETURN" => Some(KeyEvent::from(KeyCode::Enter)),
        "ESC" | "ESCAPE" => Some(KeyEvent::from(KeyCode::Esc)),
        "BACKSPACE" | "BS" => Some(KeyEvent::from(KeyCode::Backspace)),
        "DELETE" | "DEL" => Some(KeyEvent::from(KeyCode::Delete)),
        "CLEAR" => Some(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL)),
        _ => None,
    };
    match named {
        Some(event) => vec![event],
        None => token.chars().map(|ch| KeyEvent::from(KeyCode::Char(ch))).collect(),
    }
}
