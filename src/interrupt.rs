//! Ctrl+C handling
//!
//! While the child runs it shares our foreground process group, so it gets
//! the SIGINT itself; we keep going, see its pipe close, and restore the
//! screen on the normal path. That window lasts until the primary screen is
//! back, so output already captured is always replayed. Before the child
//! starts there is nothing to wait for, so the handler restores the screen
//! itself and exits.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use tracing::{info, warn};

use crate::ui::screen;

/// Session phase as seen by the signal handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    /// Terminal still on the primary screen
    Idle = 0,
    /// Alternate screen up, command not started yet
    Alternate = 1,
    /// Command started; lasts until the primary screen is back
    Running = 2,
}

impl Phase {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Phase::Alternate,
            2 => Phase::Running,
            _ => Phase::Idle,
        }
    }
}

/// Exit status used when interrupted
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

static PHASE: AtomicU8 = AtomicU8::new(Phase::Idle as u8);
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Installs the Ctrl+C handler.
pub fn init() {
    if let Err(e) = ctrlc::set_handler(on_interrupt) {
        warn!("Failed to install Ctrl+C handler: {}", e);
    }
}

fn on_interrupt() {
    let phase = phase();
    let repeated = INTERRUPTED.swap(true, Ordering::SeqCst);
    info!("Interrupted during {:?}", phase);
    match phase {
        Phase::Idle => std::process::exit(INTERRUPTED_EXIT_CODE),
        Phase::Alternate => {
            screen::force_leave();
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
        // First Ctrl+C belongs to the child; a second one gives up on it
        Phase::Running if repeated => {
            screen::force_leave();
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
        Phase::Running => {}
    }
}

pub fn set_phase(phase: Phase) {
    PHASE.store(phase as u8, Ordering::SeqCst);
}

pub fn phase() -> Phase {
    Phase::from_u8(PHASE.load(Ordering::SeqCst))
}

/// Checks if Ctrl+C was pressed during this run.
pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}
