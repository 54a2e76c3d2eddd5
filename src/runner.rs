//! Subprocess execution.
//!
//! Every toolchain call goes through the [`CommandRunner`] trait so the
//! operations can be exercised without starting real processes.
//! [`ProcessRunner`] is the production implementation; [`RecordingRunner`]
//! records invocations and replies with scripted results.
//!
//! A nonzero exit is a normal [`CommandResult`]; only a program that cannot
//! be started is an error ([`ActionError::Launch`]).

use std::cell::RefCell;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{ActionError, Result};

/// One program invocation: argv, working directory, environment overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub argv: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    /// Forward output to the console while capturing it
    pub stream: bool,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            argv: vec![program.into()],
            cwd: None,
            env: Vec::new(),
            stream: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.argv.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// First argv element, empty when argv is empty.
    pub fn program(&self) -> &str {
        self.argv.first().map_or("", String::as_str)
    }

    /// Space-joined argv, for display.
    pub fn display(&self) -> String {
        self.argv.join(" ")
    }
}

/// Outcome of an invocation that was started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    /// False only for placeholders built with [`CommandResult::not_launched`]
    pub launched: bool,
}

impl CommandResult {
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
            duration: Duration::ZERO,
            launched: true,
        }
    }

    /// Placeholder for a probe whose program could not be started.
    pub fn not_launched() -> Self {
        Self {
            exit_code: -1,
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::ZERO,
            launched: false,
        }
    }

    pub fn success(&self) -> bool {
        self.launched && self.exit_code == 0
    }

    /// Captured stdout followed by stderr.
    pub fn combined_output(&self) -> String {
        let mut out = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&self.stderr);
        }
        out
    }
}

/// Capability to run external programs.
pub trait CommandRunner {
    fn execute(&self, invocation: &Invocation) -> Result<CommandResult>;
}

/// Runs invocations as real child processes, blocking until they exit.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn execute(&self, invocation: &Invocation) -> Result<CommandResult> {
        tracing::debug!(
            argv = ?invocation.argv,
            cwd = ?invocation.cwd,
            env = ?invocation.env,
            stream = invocation.stream,
            "executing"
        );

        let Some((program, args)) = invocation.argv.split_first() else {
            return Err(ActionError::Launch {
                program: String::new(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "empty argv"),
            });
        };

        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }
        for (key, value) in &invocation.env {
            cmd.env(key, value);
        }

        let start = Instant::now();
        let launch_err = |source: io::Error| ActionError::Launch {
            program: invocation.program().to_string(),
            source,
        };

        let (status, stdout, stderr) = if invocation.stream {
            let mut child = cmd
                .stdin(Stdio::inherit())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()
                .map_err(launch_err)?;

            let child_stdout = child.stdout.take();
            let child_stderr = child.stderr.take();

            // std has no non-blocking pipe reads; a second reader keeps a
            // full stderr pipe from stalling the child while stdout drains.
            let stderr_handle = thread::spawn(move || match child_stderr {
                Some(pipe) => tee(pipe, io::stderr()),
                None => Vec::new(),
            });
            let stdout = match child_stdout {
                Some(pipe) => tee(pipe, io::stdout()),
                None => Vec::new(),
            };
            let stderr = stderr_handle.join().unwrap_or_default();
            let status = child.wait()?;
            (status, stdout, stderr)
        } else {
            let output = cmd.output().map_err(launch_err)?;
            (output.status, output.stdout, output.stderr)
        };

        let result = CommandResult {
            exit_code: exit_code(status),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            duration: start.elapsed(),
            launched: true,
        };
        tracing::debug!(
            program = invocation.program(),
            exit_code = result.exit_code,
            elapsed = ?result.duration,
            "finished"
        );
        Ok(result)
    }
}

/// Copy `source` into `sink` chunk by chunk as it arrives, keeping a copy.
fn tee(mut source: impl Read, mut sink: impl Write) -> Vec<u8> {
    let mut captured = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                captured.extend_from_slice(&buf[..n]);
                let _ = sink.write_all(&buf[..n]);
                let _ = sink.flush();
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
    captured
}

/// Exit code of a finished child; a signal death maps to `128 + signal`.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

/// Scripted reply for [`RecordingRunner`].
#[derive(Debug, Clone)]
pub enum Reply {
    Exit {
        code: i32,
        stdout: String,
        stderr: String,
    },
    LaunchFailure,
}

impl Reply {
    pub fn exit(code: i32) -> Self {
        Reply::Exit {
            code,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn stdout(code: i32, stdout: impl Into<String>) -> Self {
        Reply::Exit {
            code,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }
}

type Matcher = Box<dyn Fn(&Invocation) -> bool>;

/// Records every invocation and answers from a list of rules.
///
/// The first matching rule wins; without a match the reply is exit code 0
/// with empty output.
#[derive(Default)]
pub struct RecordingRunner {
    calls: RefCell<Vec<Invocation>>,
    rules: Vec<(Matcher, Reply)>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, matches: impl Fn(&Invocation) -> bool + 'static, reply: Reply) -> Self {
        self.rules.push((Box::new(matches), reply));
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    /// Recorded invocations whose argv contains `needle`.
    pub fn calls_with(&self, needle: &str) -> Vec<Invocation> {
        self.calls
            .borrow()
            .iter()
            .filter(|inv| inv.argv.iter().any(|a| a == needle))
            .cloned()
            .collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn execute(&self, invocation: &Invocation) -> Result<CommandResult> {
        self.calls.borrow_mut().push(invocation.clone());
        let reply = self
            .rules
            .iter()
            .find(|(matches, _)| matches(invocation))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| Reply::exit(0));

        match reply {
            Reply::Exit {
                code,
                stdout,
                stderr,
            } => Ok(CommandResult::new(code, stdout, stderr)),
            Reply::LaunchFailure => Err(ActionError::Launch {
                program: invocation.program().to_string(),
                source: io::Error::from(io::ErrorKind::NotFound),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_launch_error() {
        let inv = Invocation::new("/definitely/not/a/real/binary-actionman");
        let err = ProcessRunner.execute(&inv).unwrap_err();
        assert!(matches!(err, ActionError::Launch { .. }));

        let streamed = inv.stream(true);
        assert!(matches!(
            ProcessRunner.execute(&streamed),
            Err(ActionError::Launch { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_empty_argv_is_launch_error() {
        let inv = Invocation {
            argv: Vec::new(),
            cwd: None,
            env: Vec::new(),
            stream: false,
        };
        assert_eq!(inv.program(), "");
        let err = ProcessRunner.execute(&inv).unwrap_err();
        assert!(matches!(
            err,
            ActionError::Launch { ref source, .. } if source.kind() == io::ErrorKind::InvalidInput
        ));
    }

    #[test]
    fn test_nonzero_exit_is_a_result() {
        let inv = Invocation::new("sh").args(["-c", "echo out; echo err >&2; exit 7"]);
        let result = ProcessRunner.execute(&inv).unwrap();
        assert_eq!(result.exit_code, 7);
        assert_eq!(result.stdout, "out\n");
        assert_eq!(result.stderr, "err\n");
        assert!(result.launched);
        assert!(!result.success());
    }

    #[cfg(unix)]
    #[test]
    fn test_streaming_still_captures_in_order() {
        let inv = Invocation::new("sh")
            .args(["-c", "for i in 1 2 3 4 5; do echo line$i; done; echo warn >&2"])
            .stream(true);
        let result = ProcessRunner.execute(&inv).unwrap();
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout, "line1\nline2\nline3\nline4\nline5\n");
        assert_eq!(result.stderr, "warn\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_cwd_and_env_are_applied() {
        let dir = tempfile::tempdir().unwrap();
        let inv = Invocation::new("sh")
            .args(["-c", "pwd; echo $ACTIONMAN_TEST_VAR"])
            .current_dir(dir.path())
            .env("ACTIONMAN_TEST_VAR", "hello");
        let result = ProcessRunner.execute(&inv).unwrap();
        let mut lines = result.stdout.lines();
        let pwd = std::fs::canonicalize(lines.next().unwrap()).unwrap();
        assert_eq!(pwd, std::fs::canonicalize(dir.path()).unwrap());
        assert_eq!(lines.next(), Some("hello"));
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_death_maps_above_128() {
        let inv = Invocation::new("sh").args(["-c", "kill -TERM $$"]);
        let result = ProcessRunner.execute(&inv).unwrap();
        assert_eq!(result.exit_code, 128 + 15);
    }

    #[test]
    fn test_recording_runner_rules() {
        let runner = RecordingRunner::new()
            .on(|inv| inv.argv.contains(&"--fail".to_string()), Reply::exit(3))
            .on(|inv| inv.program() == "missing", Reply::LaunchFailure);

        let ok = runner.execute(&Invocation::new("cmake")).unwrap();
        assert!(ok.success());
        let failed = runner
            .execute(&Invocation::new("cmake").arg("--fail"))
            .unwrap();
        assert_eq!(failed.exit_code, 3);
        assert!(runner.execute(&Invocation::new("missing")).is_err());
        assert_eq!(runner.calls().len(), 3);
        assert_eq!(runner.calls_with("--fail").len(), 1);
    }

    #[test]
    fn test_not_launched_is_never_success() {
        let placeholder = CommandResult::not_launched();
        assert!(!placeholder.launched);
        assert!(!placeholder.success());
    }

    #[test]
    fn test_combined_output() {
        let result = CommandResult::new(1, "a", "b");
        assert_eq!(result.combined_output(), "a\nb");
    }
}
