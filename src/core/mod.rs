//! Core session components.
//!
//! - **command**: CommandSpec and command line composition (shell quoting)
//! - **capture**: shell spawning with merged stdout/stderr and line capture
//! - **session**: `ScreenSession`, the switch/prompt/execute/restore/replay run
//!
//! # Architecture
//!
//! ```text
//! ScreenSession
//! ├── CommandSpec + AdditionalArgs -> CommandLine
//! ├── AlternateScreen guard (ui::screen)
//! └── ShellCommand -> RunningCommand -> CapturedOutput
//! ```

pub mod capture;
pub mod command;
pub mod session;
