//! # Sequential Task Runner
//!
//! Runs tasks one after another, each to completion, and records what
//! happened in submission order.
//!
//! - A child exiting non-zero is data, not an error. The runner moves on.
//! - A malformed task is rejected before anything is launched for it.
//! - A program that cannot be started is reported as `SpawnFailed`.
//!
//! Either way, results recorded before the failure stay in the runner.

use crate::error::{self, Error, ErrorKind, Result};
use crate::task::{CommandSpec, Task};
use serde::Serialize;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use tracing::{debug, error, info, instrument, warn};

/// Raw outcome of one child process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Starts a command and waits for it. The seam tests stub out.
pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, command: &CommandSpec) -> Result<ProcessOutput>;
}

/// Launches real child processes with `std::process::Command`.
///
/// stdin is closed, stdout and stderr are captured. No shell is involved.
#[derive(Debug, Clone, Default)]
pub struct SystemLauncher {
    working_dir: Option<PathBuf>,
}

impl SystemLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl ProcessLauncher for SystemLauncher {
    fn launch(&self, command: &CommandSpec) -> Result<ProcessOutput> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        debug!(program = %command.program, args = command.args.len(), "spawning child process");
        let child = cmd.spawn().map_err(|e| {
            error!(program = %command.program, err = %e, "failed to spawn command");
            error::spawn_failed(&command.program, e).with_operation("SystemLauncher::launch")
        })?;

        // drains stdout and stderr concurrently with the wait
        let output = child.wait_with_output().map_err(|e| {
            Error::new(ErrorKind::ProcessFailed, format!("failed to wait for {}", command.program))
                .with_operation("SystemLauncher::launch")
                .set_source(e)
        })?;

        Ok(ProcessOutput {
            code: exit_code(output.status),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Exit code of a finished child; a signal death maps to `128 + signal`.
#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// The recorded outcome of one task. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskResult {
    task: String,
    returncode: i32,
    stdout: String,
    stderr: String,
}

impl TaskResult {
    pub(crate) fn new(task: &Task, output: ProcessOutput) -> Self {
        Self {
            task: task.line().to_string(),
            returncode: output.code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    /// The task line exactly as submitted
    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn returncode(&self) -> i32 {
        self.returncode
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn success(&self) -> bool {
        self.returncode == 0
    }
}

/// Runs one parsed task through a launcher and logs the outcome
pub(crate) fn execute<L: ProcessLauncher>(launcher: &L, task: &Task) -> Result<TaskResult> {
    let output = launcher.launch(task.command())?;
    let result = TaskResult::new(task, output);
    if result.success() {
        info!(task = %result.task(), "task finished");
    } else {
        warn!(task = %result.task(), returncode = result.returncode(), "task exited non-zero");
    }
    Ok(result)
}

/// Parses a submitted line, tagging failures with its position
pub(crate) fn parse_task(index: usize, line: &str) -> Result<Task> {
    Task::parse(line).map_err(|e| {
        error::invalid_task(index, e.to_string())
            .with_context("task", line)
            .set_source(e)
    })
}

/// Strictly sequential task runner.
pub struct TaskRunner<L = SystemLauncher> {
    launcher: L,
    results: Vec<TaskResult>,
}

impl TaskRunner<SystemLauncher> {
    /// Runner that launches real processes
    pub fn system() -> Self {
        Self::new(SystemLauncher::new())
    }
}

impl<L: ProcessLauncher> TaskRunner<L> {
    pub fn new(launcher: L) -> Self {
        Self {
            launcher,
            results: Vec::new(),
        }
    }

    /// Validate, parse and run one task, waiting for it to finish.
    #[instrument(skip_all, fields(index = self.results.len()))]
    pub fn submit(&mut self, line: &str) -> Result<&TaskResult> {
        let index = self.results.len();
        let task = parse_task(index, line).map_err(|e| e.with_operation("TaskRunner::submit"))?;
        self.submit_task(task)
    }

    /// Run an already parsed task
    pub fn submit_task(&mut self, task: Task) -> Result<&TaskResult> {
        let index = self.results.len();
        let result = execute(&self.launcher, &task).map_err(|e| {
            e.with_operation("TaskRunner::submit")
                .with_context("index", index.to_string())
        })?;
        self.results.push(result);
        Ok(&self.results[index])
    }

    /// Run every task in order. Stops at the first invalid task or spawn
    /// failure; a non-zero exit does not stop anything.
    #[instrument(skip_all)]
    pub fn run_all<I, S>(&mut self, tasks: I) -> Result<&[TaskResult]>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for task in tasks {
            self.submit(task.as_ref())?;
        }
        Ok(&self.results)
    }

    /// Results so far, in submission order
    pub fn results(&self) -> &[TaskResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<TaskResult> {
        self.results
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }
}

/// Convenience: run `tasks` with real processes and return all results.
pub fn run_tasks<I, S>(tasks: I) -> Result<Vec<TaskResult>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut runner = TaskRunner::system();
    runner.run_all(tasks)?;
    Ok(runner.into_results())
}
