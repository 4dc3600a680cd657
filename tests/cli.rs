#![cfg(unix)]

//! End-to-end tests for the ephemeral binary.
//!
//! Each test runs the real binary with piped stdin/stdout and a private HOME
//! so config and log files never touch the developer's own.

use std::fs;
use std::io::{Read, Write};
use std::os::unix::process::CommandExt;
use std::process::{Child, ChildStdout, Command, Output, Stdio};

use tempfile::TempDir;

const ENTER: &[u8] = b"\x1b[?1049h";
const LEAVE: &[u8] = b"\x1b[?1049l";
const PROMPT: &str = "Enter additional arguments (or press Enter to use defaults): ";

/// Run ephemeral with `args`, feeding `input` at the prompt
fn run(home: &TempDir, args: &[&str], input: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_ephemeral"))
        .args(args)
        .env("HOME", home.path())
        .env_remove("EPHEMERAL_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn ephemeral");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();

    child.wait_with_output().unwrap()
}

fn write_config(home: &TempDir, content: &str) {
    let dir = home.path().join(".ephemeral");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), content).unwrap();
}

fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

/// Everything printed after returning to the primary screen
fn replayed(stdout: &[u8]) -> &[u8] {
    let at = stdout
        .windows(LEAVE.len())
        .position(|w| w == LEAVE)
        .expect("no leave sequence");
    &stdout[at + LEAVE.len()..]
}

// =============================================================================
// Usage
// =============================================================================

#[test]
fn no_arguments_is_usage_error() {
    let home = TempDir::new().unwrap();
    let output = run(&home, &[], "");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage: ephemeral"));
    assert_eq!(count(&output.stdout, ENTER), 0);
}

#[test]
fn version_flag() {
    let home = TempDir::new().unwrap();
    let output = run(&home, &["--version"], "");

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains(env!("CARGO_PKG_VERSION")));
    assert!(output.stdout.is_empty());
}

// =============================================================================
// Sessions
// =============================================================================

#[test]
fn defaults_only_full_transcript() {
    let home = TempDir::new().unwrap();
    let output = run(&home, &["echo", "hello"], "\n");

    assert!(output.status.success());
    let mut expected = ENTER.to_vec();
    expected.extend_from_slice(PROMPT.as_bytes());
    expected.extend_from_slice(b"hello\n");
    expected.extend_from_slice(LEAVE);
    expected.extend_from_slice(b"hello\n\n");
    assert_eq!(output.stdout, expected);
}

#[test]
fn prompt_input_is_shell_syntax() {
    let home = TempDir::new().unwrap();
    let output = run(&home, &["printf", "%s\\n", "ax", "b", "cx"], "| grep x\n");

    assert!(output.status.success());
    assert_eq!(replayed(&output.stdout), b"ax\ncx\n\n");
}

#[test]
fn default_arguments_are_quoted() {
    let home = TempDir::new().unwrap();
    let output = run(&home, &["echo", "a  b", "$HOME", "it's"], "\n");

    assert_eq!(replayed(&output.stdout), b"a  b $HOME it's\n\n");
}

#[test]
fn child_failure_still_succeeds() {
    let home = TempDir::new().unwrap();
    let output = run(&home, &["sh", "-c", "echo before; echo err >&2; exit 3"], "\n");

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(count(&output.stdout, ENTER), 1);
    assert_eq!(count(&output.stdout, LEAVE), 1);
    assert_eq!(replayed(&output.stdout), b"before\nerr\n\n");
}

#[test]
fn closed_stdin_uses_defaults() {
    let home = TempDir::new().unwrap();
    let output = run(&home, &["echo", "ok"], "");

    assert!(output.status.success());
    assert_eq!(replayed(&output.stdout), b"ok\n\n");
}

// =============================================================================
// Config and logging
// =============================================================================

#[test]
fn config_overrides_prompt() {
    let home = TempDir::new().unwrap();
    write_config(&home, "prompt = \"args> \"\n");
    let output = run(&home, &["true"], "\n");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("args> "));
    assert!(!stdout.contains(PROMPT));
}

#[test]
fn spawn_failure_restores_screen() {
    let home = TempDir::new().unwrap();
    write_config(&home, "shell = \"/nonexistent/ephemeral-shell\"\n");
    let output = run(&home, &["true"], "\n");

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(count(&output.stdout, ENTER), 1);
    assert_eq!(count(&output.stdout, LEAVE), 1);
    assert_eq!(replayed(&output.stdout), b"\n");
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to spawn"));
}

#[test]
fn malformed_config_warns_and_runs() {
    let home = TempDir::new().unwrap();
    write_config(&home, "prompt = [\n");
    let output = run(&home, &["echo", "still"], "\n");

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ignoring"));
    assert_eq!(replayed(&output.stdout), b"still\n\n");
}

#[test]
fn log_never_contains_prompt_input() {
    let home = TempDir::new().unwrap();
    write_config(&home, "log_level = \"trace\"\n");
    let output = run(&home, &["true"], "secret-token-123\n");

    // `true secret-token-123` still exits 0
    assert!(output.status.success());
    let log = fs::read_to_string(home.path().join(".ephemeral").join("ephemeral.log")).unwrap();
    assert!(log.contains("Session complete"));
    assert!(!log.contains("secret-token-123"));
}

// =============================================================================
// Ctrl+C
// =============================================================================

/// Start ephemeral in its own process group, like a foreground job
fn spawn_job(home: &TempDir, args: &[&str]) -> Child {
    Command::new(env!("CARGO_BIN_EXE_ephemeral"))
        .args(args)
        .env("HOME", home.path())
        .env_remove("EPHEMERAL_LOG")
        .process_group(0)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn ephemeral")
}

/// Read stdout until `needle` shows up, returning everything read so far
fn read_until_contains(stdout: &mut ChildStdout, needle: &[u8]) -> Vec<u8> {
    let mut seen = Vec::new();
    let mut buf = [0u8; 256];
    while count(&seen, needle) == 0 {
        let n = stdout.read(&mut buf).unwrap();
        assert!(
            n > 0,
            "stdout closed before {:?} appeared: {:?}",
            String::from_utf8_lossy(needle),
            String::from_utf8_lossy(&seen)
        );
        seen.extend_from_slice(&buf[..n]);
    }
    seen
}

/// Send SIGINT to the whole process group, as a terminal's Ctrl+C does
fn ctrl_c(job: &Child) {
    let status = Command::new("kill")
        .args(["-INT", "--", &format!("-{}", job.id())])
        .status()
        .unwrap();
    assert!(status.success());
}

#[test]
fn ctrl_c_at_prompt_restores_screen() {
    let home = TempDir::new().unwrap();
    let mut job = spawn_job(&home, &["echo", "x"]);
    // Held open so the prompt keeps waiting
    let _stdin = job.stdin.take().unwrap();
    let mut stdout = job.stdout.take().unwrap();

    let mut seen = read_until_contains(&mut stdout, PROMPT.as_bytes());
    ctrl_c(&job);
    stdout.read_to_end(&mut seen).unwrap();
    let status = job.wait().unwrap();

    assert_eq!(status.code(), Some(130));
    assert_eq!(count(&seen, ENTER), 1);
    assert_eq!(count(&seen, LEAVE), 1);
    let mut expected = ENTER.to_vec();
    expected.extend_from_slice(PROMPT.as_bytes());
    expected.extend_from_slice(LEAVE);
    assert_eq!(seen, expected);
}

#[test]
fn ctrl_c_while_running_still_replays() {
    let home = TempDir::new().unwrap();
    let mut job = spawn_job(&home, &["sh", "-c", "echo started; sleep 5; echo never"]);
    let mut stdin = job.stdin.take().unwrap();
    stdin.write_all(b"\n").unwrap();
    let mut stdout = job.stdout.take().unwrap();

    let mut seen = read_until_contains(&mut stdout, b"started\n");
    ctrl_c(&job);
    stdout.read_to_end(&mut seen).unwrap();
    let status = job.wait().unwrap();

    assert_eq!(status.code(), Some(0));
    assert_eq!(count(&seen, ENTER), 1);
    assert_eq!(count(&seen, LEAVE), 1);
    assert_eq!(replayed(&seen), b"started\n\n");
}
