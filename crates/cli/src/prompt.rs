// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive prompting as an injectable capability.

use std::io::{BufRead, IsTerminal, Write};

use nix::sys::termios;

use crate::error::{Error, Result};

/// Source of interactive answers. Implementations block the calling thread.
pub trait Prompter: Send + Sync {
    /// Ask for a visible line of text. End of input is [`Error::Aborted`].
    fn prompt_text(&self, label: &str) -> Result<String>;

    /// Ask for a secret without echoing it. End of input is [`Error::Aborted`].
    fn prompt_secret(&self, label: &str) -> Result<String>;

    /// Whether a person can answer. Optional prompt rounds are skipped otherwise.
    fn is_interactive(&self) -> bool {
        true
    }
}

/// Prompts on stderr and reads answers from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    fn read_line(label: &str) -> Result<String> {
        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "{label}: ");
        let _ = stderr.flush();

        let mut line = String::new();
        let n = std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| Error::Aborted(format!("{label}: {e}")))?;
        if n == 0 {
            return Err(Error::Aborted(format!("{label}: end of input")));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_owned())
    }
}

impl Prompter for TerminalPrompter {
    fn prompt_text(&self, label: &str) -> Result<String> {
        Self::read_line(label)
    }

    fn prompt_secret(&self, label: &str) -> Result<String> {
        let guard = if std::io::stdin().is_terminal() { EchoGuard::disable().ok() } else { None };
        let answer = Self::read_line(label);
        drop(guard);
        answer
    }
}

/// Never prompts: every required question is answered with [`Error::Aborted`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractive;

impl Prompter for NonInteractive {
    fn prompt_text(&self, label: &str) -> Result<String> {
        Err(Error::Aborted(format!("{label}: prompting disabled")))
    }

    fn prompt_secret(&self, label: &str) -> Result<String> {
        Err(Error::Aborted(format!("{label}: prompting disabled")))
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

/// RAII guard that restores terminal echo on drop.
struct EchoGuard {
    original: termios::Termios,
}

impl EchoGuard {
    fn disable() -> anyhow::Result<Self> {
        let stdin = std::io::stdin();
        let original = termios::tcgetattr(&stdin)?;
        let mut silent = original.clone();
        silent.local_flags.remove(termios::LocalFlags::ECHO);
        silent.local_flags.insert(termios::LocalFlags::ECHONL);
        termios::tcsetattr(&stdin, termios::SetArg::TCSANOW, &silent)?;
        Ok(Self { original })
    }
}

impl Drop for EchoGuard {
    fn drop(&mut self) {
        let _ = termios::tcsetattr(std::io::stdin(), termios::SetArg::TCSANOW, &self.original);
    }
}
