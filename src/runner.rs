//! Bounded capture of a generator's output.
//!
//! The generator is any command (typically a container run wrapped by the
//! operator). Its stdout is the text that gets decoded; stderr is kept for
//! diagnostics. The wait is bounded: one deadline covers both the command's
//! exit and the draining of its pipes. A command still running when it
//! expires is killed, and either way the result is `Error::Timeout`.
//! Background processes the command leaves behind are not killed, but
//! capture stops waiting for them.

use crate::error::{Error, Result};
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

type PipeOutput = Receiver<std::io::Result<Vec<u8>>>;

/// Output of a command that exited on its own.
#[derive(Debug)]
pub struct Captured {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
}

/// Runs `program` with `args`, collecting its output.
///
/// A non-zero exit status is not an error; it is logged and returned in
/// `Captured::status`, since the output may still be worth decoding.
/// Stderr is decoded lossily.
///
/// # Errors
///
/// * `Error::Spawn` when the program cannot be started
/// * `Error::Timeout` when it does not exit, or its pipes are not closed,
///   within `timeout`
/// * `Error::Utf8` when stdout is not valid UTF-8
pub fn capture(program: &str, args: &[String], timeout: Duration) -> Result<Captured> {
    let command_line = render_command(program, args);
    debug!(command = %command_line, timeout_secs = timeout.as_secs_f64(), "starting command");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| Error::Spawn {
            command: command_line.clone(),
            source,
        })?;

    // Drain both pipes concurrently so a chatty child cannot block on a full pipe
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(err) => {
                reap(&mut child);
                return Err(err.into());
            }
        }
        if Instant::now() >= deadline {
            warn!(command = %command_line, "command timed out, killing it");
            reap(&mut child);
            return Err(Error::Timeout {
                command: command_line,
                timeout,
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    let (Some(stdout), Some(stderr)) = (collect(stdout, deadline)?, collect(stderr, deadline)?)
    else {
        warn!(
            command = %command_line,
            "command exited but its output stayed open past the timeout"
        );
        return Err(Error::Timeout {
            command: command_line,
            timeout,
        });
    };

    let stdout = String::from_utf8(stdout).map_err(|source| Error::Utf8 {
        origin: format!("stdout of `{}`", command_line),
        source,
    })?;
    let stderr = String::from_utf8_lossy(&stderr).into_owned();

    if !status.success() {
        warn!(command = %command_line, %status, "command exited unsuccessfully");
    }
    debug!(
        command = %command_line,
        stdout_bytes = stdout.len(),
        stderr_bytes = stderr.len(),
        "command finished"
    );

    Ok(Captured {
        stdout,
        stderr,
        status,
    })
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn drain<R>(pipe: Option<R>) -> Option<PipeOutput>
where
    R: Read + Send + 'static,
{
    pipe.map(|mut pipe| {
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let result = pipe.read_to_end(&mut buffer).map(|_| buffer);
            // Nobody is listening once capture has given up
            let _ = sender.send(result);
        });
        receiver
    })
}

/// Waits for a reader until `deadline`. `None` means the pipe was still open.
fn collect(output: Option<PipeOutput>, deadline: Instant) -> Result<Option<Vec<u8>>> {
    let Some(receiver) = output else {
        return Ok(Some(Vec::new()));
    };
    match receiver.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(bytes) => Ok(Some(bytes?)),
        Err(RecvTimeoutError::Timeout) => Ok(None),
        Err(RecvTimeoutError::Disconnected) => {
            Err(std::io::Error::other("output reader thread panicked").into())
        }
    }
}

fn render_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_capture_stdout_and_stderr() {
        let captured = capture(
            "sh",
            &args(&["-c", "echo 'azepi: {}'; echo warning >&2"]),
            Duration::from_secs(10),
        )
        .unwrap();
        assert!(captured.status.success());
        assert_eq!(captured.stdout, "azepi: {}\n");
        assert_eq!(captured.stderr, "warning\n");
    }

    #[test]
    fn test_nonzero_exit_is_returned() {
        let captured = capture("sh", &args(&["-c", "exit 3"]), Duration::from_secs(10)).unwrap();
        assert_eq!(captured.status.code(), Some(3));
    }

    #[test]
    fn test_timeout_kills_command() {
        let started = Instant::now();
        let err = capture("sleep", &args(&["5"]), Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_timeout_covers_output_held_by_background_process() {
        let started = Instant::now();
        let err = capture(
            "sh",
            &args(&["-c", "sleep 6 & echo 'azepi: {}'"]),
            Duration::from_millis(500),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_invalid_utf8_stdout_is_rejected() {
        let err = capture(
            "sh",
            &args(&["-c", "printf '\\377'"]),
            Duration::from_secs(10),
        )
        .unwrap_err();
        match err {
            Error::Utf8 { origin, .. } => assert!(origin.starts_with("stdout of `sh")),
            other => panic!("Expected UTF-8 error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_utf8_stderr_is_tolerated() {
        let captured = capture(
            "sh",
            &args(&["-c", "echo ok; printf '\\377' >&2"]),
            Duration::from_secs(10),
        )
        .unwrap();
        assert_eq!(captured.stdout, "ok\n");
        assert_eq!(captured.stderr, "\u{fffd}");
    }

    #[test]
    fn test_missing_program() {
        let err = capture(
            "docquery-definitely-missing-binary",
            &[],
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }

    #[test]
    fn test_render_command() {
        assert_eq!(
            render_command("docker", &args(&["run", "image", "init"])),
            "docker run image init"
        );
    }
}
