//! External tool execution.
//!
//! Every hardware reader funnels subprocess calls through here. Failures of
//! any kind (missing binary, non-zero exit, undecodable output) collapse to
//! an empty string so callers can fall through to their next source.

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// Upper bound for tools that can hang on broken hardware or busy buses.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Run a command to completion and return its trimmed stdout, or an empty
/// string on any failure.
pub fn run(program: &str, args: &[&str]) -> String {
    let output = match Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
    {
        Ok(output) => output,
        Err(err) => {
            debug!(program, %err, "command failed to start");
            return String::new();
        }
    };
    if !output.status.success() {
        debug!(program, status = %output.status, "command exited non-zero");
        return String::new();
    }
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Like [`run`], but kills the child if it exceeds `timeout`. Used for the
/// display-stack tools, which can block indefinitely without an X session.
pub fn run_with_timeout(program: &str, args: &[&str], timeout: Duration) -> String {
    let mut child = match Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => child,
        Err(err) => {
            debug!(program, %err, "command failed to start");
            return String::new();
        }
    };

    // Drain stdout from a separate thread while the child runs. Waiting
    // until exit before reading would block any child whose output exceeds
    // the pipe buffer, turning it into a spurious timeout.
    let reader = child.stdout.take().map(|mut stdout| {
        thread::spawn(move || {
            let mut output = String::new();
            let _ = stdout.read_to_string(&mut output);
            output
        })
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {
                if Instant::now() >= deadline {
                    debug!(program, ?timeout, "command timed out, killing");
                    let _ = child.kill();
                    let _ = child.wait();
                    break None;
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(err) => {
                debug!(program, %err, "wait failed");
                let _ = child.kill();
                let _ = child.wait();
                break None;
            }
        }
    };

    // Killing the child closed the pipe, so the reader always finishes.
    let output = reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();

    match status {
        Some(status) if status.success() => output.trim().to_string(),
        Some(status) => {
            debug!(program, %status, "command exited non-zero");
            String::new()
        }
        None => String::new(),
    }
}

/// Whether `name` resolves to a runnable binary. Spawn success is the
/// signal; the exit status of `--version` does not matter.
pub fn command_available(name: &str) -> bool {
    Command::new(name)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}
