//! Interactive credential prompts
//!
//! Prompts go to stderr so that stdout carries only portal content.

use anyhow::{bail, Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::{self, BufRead, IsTerminal, Write};

/// Ask for a line of visible input.
pub fn prompt_line(prompt: &str) -> Result<String> {
    eprint!("{}", prompt);
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
}

/// Ask for a password without echoing it.
///
/// Falls back to a plain line read when stdin is not a terminal.
pub fn prompt_password(prompt: &str) -> Result<String> {
    if !io::stdin().is_terminal() {
        return prompt_line(prompt);
    }

    eprint!("{}", prompt);
    io::stderr().flush()?;

    terminal::enable_raw_mode().context("failed to switch terminal to raw mode")?;
    let result = read_hidden_line();
    terminal::disable_raw_mode().context("failed to restore terminal mode")?;
    eprintln!();
    result
}

fn read_hidden_line() -> Result<String> {
    let mut password = String::new();
    loop {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind,
            ..
        }) = event::read()?
        else {
            continue;
        };
        if kind == KeyEventKind::Release {
            continue;
        }
        match code {
            KeyCode::Enter => return Ok(password),
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                bail!("interrupted")
            }
            KeyCode::Esc => bail!("cancelled"),
            KeyCode::Backspace => {
                password.pop();
            }
            KeyCode::Char(c) => password.push(c),
            _ => {}
        }
    }
}
