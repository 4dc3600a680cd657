//! Session management
//!
//! One run of the tool: switch to the alternate screen, ask for extra
//! arguments, run the command while echoing and capturing its output, switch
//! back, and replay what was captured onto the primary screen.

use std::io::{self, BufRead, Write};
use std::process::ExitStatus;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::capture::{CaptureError, CapturedOutput, ShellCommand};
use super::command::{AdditionalArgs, CommandLine, CommandSpec};
use crate::interrupt::Phase;
use crate::ui::screen::AlternateScreen;

/// Prompt shown on the alternate screen
pub const DEFAULT_PROMPT: &str = "Enter additional arguments (or press Enter to use defaults): ";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Terminal I/O failed: {0}")]
    Terminal(#[source] io::Error),

    #[error("Failed to read additional arguments: {0}")]
    Prompt(#[source] io::Error),

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Outcome of a completed session
#[derive(Debug)]
pub struct SessionReport {
    /// Child exit status (informational only)
    pub status: ExitStatus,
    /// Lines captured from the child
    pub lines: usize,
    /// Whether anything was typed at the prompt
    pub had_extra_args: bool,
}

/// Switch/prompt/execute/restore/replay, once
pub struct ScreenSession {
    spec: CommandSpec,
    shell: ShellCommand,
    prompt: String,
    phase_hook: fn(Phase),
}

fn ignore_phase(_: Phase) {}

impl ScreenSession {
    pub fn new(spec: CommandSpec) -> Self {
        Self {
            spec,
            shell: ShellCommand::default(),
            prompt: DEFAULT_PROMPT.to_string(),
            phase_hook: ignore_phase,
        }
    }

    pub fn with_shell(mut self, shell: ShellCommand) -> Self {
        self.shell = shell;
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Called whenever the session moves between phases
    pub fn on_phase(mut self, hook: fn(Phase)) -> Self {
        self.phase_hook = hook;
        self
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    /// Run the whole session against `input` (the prompt) and `out` (the terminal).
    ///
    /// The primary screen is restored and the capture replayed before any
    /// error from prompting or execution is returned.
    pub fn run<R: BufRead, W: Write>(&self, input: R, out: &mut W) -> Result<SessionReport> {
        let mut captured = CapturedOutput::new();

        let outcome = {
            let mut screen = AlternateScreen::enter(out).map_err(SessionError::Terminal)?;
            (self.phase_hook)(Phase::Alternate);
            debug!("Terminal mode: {:?}", screen.mode());

            let outcome = self.prompt_and_execute(input, &mut *screen, &mut captured);

            let left = screen.leave().map_err(SessionError::Terminal);
            (self.phase_hook)(Phase::Idle);
            outcome.and_then(|report| left.map(|()| report))
        };

        debug!("Replaying {} captured lines", captured.len());
        let replayed = captured.replay(out).map_err(SessionError::Terminal);

        let report = outcome?;
        replayed?;
        Ok(report)
    }

    fn prompt_and_execute<R: BufRead, W: Write>(
        &self,
        input: R,
        display: &mut W,
        captured: &mut CapturedOutput,
    ) -> Result<SessionReport> {
        let extra = self.read_extra_args(input, display)?;
        let line = self.spec.with_additional(&extra);
        // The typed text is what the user is hiding; never log it
        info!(
            "Running {} with {} default args{}",
            self.spec.target(),
            line.argv().len() - 1,
            if line.raw_suffix().is_some() { " and extra input" } else { "" }
        );

        // Stays Running until the screen is restored, so a late Ctrl+C
        // still goes through restore and replay
        (self.phase_hook)(Phase::Running);
        let result = self.execute(&line, display, captured);

        let (status, lines) = result?;
        Ok(SessionReport {
            status,
            lines,
            had_extra_args: !extra.is_empty(),
        })
    }

    /// Read one line from `input`; end of input counts as an empty line
    fn read_extra_args<R: BufRead, W: Write>(
        &self,
        mut input: R,
        display: &mut W,
    ) -> Result<AdditionalArgs> {
        display
            .write_all(self.prompt.as_bytes())
            .and_then(|()| display.flush())
            .map_err(SessionError::Terminal)?;

        let mut line = String::new();
        let n = input.read_line(&mut line).map_err(SessionError::Prompt)?;
        if n == 0 {
            debug!("End of input at prompt, using defaults");
            // No Enter was echoed, so start the output on a fresh line
            display
                .write_all(b"\n")
                .and_then(|()| display.flush())
                .map_err(SessionError::Terminal)?;
        }
        Ok(AdditionalArgs::new(&line))
    }

    fn execute<W: Write>(
        &self,
        line: &CommandLine,
        display: &mut W,
        captured: &mut CapturedOutput,
    ) -> Result<(ExitStatus, usize)> {
        let mut running = self.shell.spawn(line)?;
        let streamed = running.stream_into(display, captured);
        let status = running.wait();

        let lines = streamed?;
        let status = status?;
        if status.success() {
            info!("Command finished ({} lines)", lines);
        } else {
            warn!("Command exited with {} ({} lines)", status, lines);
        }
        Ok((status, lines))
    }
}
