//! Alternate screen handling using crossterm
//!
//! [`AlternateScreen`] switches the terminal to the alternate buffer on
//! creation and back to the primary buffer exactly once, either through an
//! explicit [`AlternateScreen::leave`] or when it is dropped.

use std::io::{self, Write};
use std::ops::{Deref, DerefMut};

use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::{debug, warn};

/// Which screen buffer is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalMode {
    Primary,
    Alternate,
}

/// Scoped switch to the alternate screen buffer
pub struct AlternateScreen<'a, W: Write> {
    out: &'a mut W,
    mode: TerminalMode,
}

impl<'a, W: Write> AlternateScreen<'a, W> {
    /// Enter the alternate screen
    pub fn enter(out: &'a mut W) -> io::Result<Self> {
        execute!(out, EnterAlternateScreen)?;
        debug!("Entered alternate screen");
        Ok(Self {
            out,
            mode: TerminalMode::Alternate,
        })
    }

    pub fn mode(&self) -> TerminalMode {
        self.mode
    }

    /// Return to the primary screen
    pub fn leave(mut self) -> io::Result<()> {
        self.restore()
    }

    fn restore(&mut self) -> io::Result<()> {
        if self.mode == TerminalMode::Primary {
            return Ok(());
        }
        // Marked first so a failed write is never retried from Drop
        self.mode = TerminalMode::Primary;
        execute!(self.out, LeaveAlternateScreen)?;
        debug!("Left alternate screen");
        Ok(())
    }
}

impl<W: Write> Deref for AlternateScreen<'_, W> {
    type Target = W;

    fn deref(&self) -> &W {
        self.out
    }
}

impl<W: Write> DerefMut for AlternateScreen<'_, W> {
    fn deref_mut(&mut self) -> &mut W {
        self.out
    }
}

impl<W: Write> Drop for AlternateScreen<'_, W> {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            warn!("Failed to leave alternate screen: {}", e);
        }
    }
}

/// Restore the primary screen on the real stdout, for exit paths that never
/// see the session's guard (signal handlers).
pub fn force_leave() {
    let mut stdout = io::stdout();
    let _ = execute!(stdout, LeaveAlternateScreen);
    let _ = stdout.flush();
}
