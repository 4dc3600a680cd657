//! Shell execution with merged output capture
//!
//! The composed command line runs under a shell with stdout and stderr both
//! attached to the write end of one anonymous pipe. The read end is consumed
//! line by line; every line goes to the live display and into
//! [`CapturedOutput`].

use std::io::{self, BufRead, BufReader, PipeReader, Write};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};

use thiserror::Error;
use tracing::{debug, info};

use super::command::CommandLine;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to create output pipe: {0}")]
    Pipe(#[source] io::Error),

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read command output: {0}")]
    Read(#[source] io::Error),

    #[error("Failed to write command output to terminal: {0}")]
    Display(#[source] io::Error),

    #[error("Failed to wait for command: {0}")]
    Wait(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, CaptureError>;

/// Everything the child wrote, one entry per line (terminators kept)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    lines: Vec<String>,
}

impl CapturedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: String) {
        self.lines.push(line);
    }

    #[cfg(test)]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Concatenated text, byte-for-byte what the child emitted (modulo lossy UTF-8)
    pub fn text(&self) -> String {
        self.lines.concat()
    }

    /// Print the whole capture as one block followed by a newline
    pub fn replay<W: Write>(self, out: &mut W) -> io::Result<()> {
        out.write_all(self.text().as_bytes())?;
        out.write_all(b"\n")?;
        out.flush()
    }
}

/// Raw lines of a byte stream, each including its trailing `\n` if present
pub struct OutputLines<R> {
    reader: R,
}

impl<R: BufRead> OutputLines<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> Iterator for OutputLines<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buf = Vec::new();
        match self.reader.read_until(b'\n', &mut buf) {
            Ok(0) => None,
            Ok(_) => Some(Ok(buf)),
            Err(e) => Some(Err(e)),
        }
    }
}

/// Fan each line of `reader` out to `display` (flushed per line) and `captured`.
///
/// Returns the number of lines seen. A line is captured before it is
/// displayed, so a failing display never loses it from the replay.
pub fn tee_lines<R: BufRead, W: Write>(
    reader: R,
    display: &mut W,
    captured: &mut CapturedOutput,
) -> Result<usize> {
    let mut count = 0;
    for line in OutputLines::new(reader) {
        let line = line.map_err(CaptureError::Read)?;
        captured.push(String::from_utf8_lossy(&line).into_owned());
        display.write_all(&line).map_err(CaptureError::Display)?;
        display.flush().map_err(CaptureError::Display)?;
        count += 1;
    }
    Ok(count)
}

/// Shell interpreter used to run the composed line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    program: String,
    flag: String,
}

impl Default for ShellCommand {
    fn default() -> Self {
        #[cfg(windows)]
        let program = "cmd.exe";
        #[cfg(not(windows))]
        let program = "sh";
        Self::new(program)
    }
}

impl ShellCommand {
    /// Shell by program name; the "run this string" flag is picked from the name
    pub fn new(program: &str) -> Self {
        let stem = Path::new(program)
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let flag = match stem.as_str() {
            "cmd" => "/C",
            "powershell" | "pwsh" => "-Command",
            _ => "-c",
        };
        Self {
            program: program.to_string(),
            flag: flag.to_string(),
        }
    }

    /// Configured shell, or the platform default
    pub fn from_config(shell: Option<&str>) -> Self {
        match shell {
            Some(program) if !program.trim().is_empty() => Self::new(program.trim()),
            _ => Self::default(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn flag(&self) -> &str {
        &self.flag
    }

    /// Start `line` under this shell with stdout and stderr merged into one pipe
    pub fn spawn(&self, line: &CommandLine) -> Result<RunningCommand> {
        let script = line.to_shell_string();
        let (reader, writer) = io::pipe().map_err(CaptureError::Pipe)?;
        let stderr = writer.try_clone().map_err(CaptureError::Pipe)?;

        let mut cmd = Command::new(&self.program);
        cmd.arg(&self.flag);
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            cmd.raw_arg(&script);
        }
        #[cfg(not(windows))]
        {
            cmd.arg(&script);
        }
        cmd.stdin(Stdio::inherit()).stdout(writer).stderr(stderr);

        debug!("Spawning via {} {}", self.program, self.flag);
        let child = cmd.spawn().map_err(|source| CaptureError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        // The Command still holds both write ends; the reader only sees EOF
        // once every copy outside the child is closed.
        drop(cmd);
        info!("Spawned pid {}", child.id());

        Ok(RunningCommand {
            child,
            output: Some(BufReader::new(reader)),
        })
    }
}

/// A spawned child together with the read end of its merged output
pub struct RunningCommand {
    child: Child,
    output: Option<BufReader<PipeReader>>,
}

impl RunningCommand {
    /// Stream the child's output until it closes the pipe
    pub fn stream_into<W: Write>(
        &mut self,
        display: &mut W,
        captured: &mut CapturedOutput,
    ) -> Result<usize> {
        match self.output.as_mut() {
            Some(reader) => tee_lines(reader, display, captured),
            None => Ok(0),
        }
    }

    /// Close our end of the pipe and block until the child exits
    pub fn wait(mut self) -> Result<ExitStatus> {
        self.output.take();
        self.child.wait().map_err(CaptureError::Wait)
    }
}
