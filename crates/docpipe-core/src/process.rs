//! External process capability
//!
//! Plugins that shell out (version probes, revision lookups, converters) go
//! through [`ProcessRunner`] so tests can substitute a scripted runner.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}

/// Request to run one external command
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<Vec<u8>>,
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Build from an argv list; the first element is the program
    pub fn from_argv(argv: &[String]) -> Result<Self> {
        let (program, args) = argv
            .split_first()
            .context("Command line is empty")?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            ..Default::default()
        })
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Human-readable command line, for logs and errors
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs external commands. Blocks until the process exits; no timeout.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// Run and return stdout, failing on a non-zero exit
    fn output(&self, spec: &CommandSpec) -> Result<String> {
        let out = self.run(spec)?;
        if !out.success {
            anyhow::bail!(
                "{} exited with {}: {}",
                spec.display(),
                out.code.map_or("signal".to_string(), |c| c.to_string()),
                out.stderr_lossy().trim()
            );
        }
        String::from_utf8(out.stdout)
            .with_context(|| format!("Invalid UTF-8 in output of {}", spec.display()))
    }
}

/// Runs commands on the host system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let program = which::which(&spec.program)
            .with_context(|| format!("Command not found: {}", spec.program))?;

        let mut cmd = Command::new(program);
        cmd.args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k, v)))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to run {}", spec.display()))?;

        let stdin_pipe = child.stdin.take();
        // Feed stdin from a helper thread so a chatty child cannot fill its
        // stdout pipe while we are still writing.
        let output = std::thread::scope(|scope| {
            let writer = match (&spec.stdin, stdin_pipe) {
                (Some(input), Some(mut pipe)) => {
                    Some(scope.spawn(move || pipe.write_all(input)))
                }
                _ => None,
            };
            let output = child.wait_with_output();
            if let Some(handle) = writer {
                match handle.join() {
                    Ok(Err(e)) if e.kind() != std::io::ErrorKind::BrokenPipe => {
                        tracing::warn!("Failed to write stdin of {}: {}", spec.display(), e);
                    }
                    _ => {}
                }
            }
            output
        })
        .with_context(|| format!("Failed to wait for {}", spec.display()))?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
