//! Copy tasks and their lifecycle
//!
//! A [`CopyTask`] is an immutable description of one timed copy. Running it
//! goes through a [`TaskRun`], which owns the opened streams and walks the
//! lifecycle `Created -> Prepared -> Running -> Done`, or into `Failed` from
//! any step. A run is single-shot; timing the same task again means starting
//! a new run, which reopens both streams.

use crate::core::{CopyStats, Copier, Interrupt, Strategy};
use crate::error::{retain_first, CopyBenchError, Result};
use crate::fs::{AssetResolver, InputHandle, OutputHandle};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a task run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Nothing opened yet
    Created,
    /// Streams open, ready to copy
    Prepared,
    /// Copy in progress
    Running,
    /// Copy finished and streams released
    Done,
    /// Preparation or copy failed; streams released
    Failed,
}

impl TaskState {
    /// Check if the run can make no further progress
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Prepared => "prepared",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A single timed copy: strategy plus input and output names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyTask {
    name: String,
    description: String,
    strategy: Strategy,
    input_name: String,
    output_name: String,
}

impl CopyTask {
    /// Start building a task
    pub fn builder() -> CopyTaskBuilder {
        CopyTaskBuilder::default()
    }

    /// Short identifier, defaults to the strategy label
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Bound strategy
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Input resource name
    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    /// Output path
    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    /// Begin a fresh run in the `Created` state
    pub fn start(&self) -> TaskRun<'_> {
        TaskRun::new(self)
    }

    /// Prepare and run in one go
    pub fn execute(&self, resolver: &AssetResolver, interrupt: &Interrupt) -> Result<CopyStats> {
        let mut run = self.start();
        run.prepare(resolver)?;
        run.run(interrupt)
    }
}

impl fmt::Display for CopyTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Builder for [`CopyTask`]
#[derive(Debug, Clone, Default)]
pub struct CopyTaskBuilder {
    name: Option<String>,
    description: Option<String>,
    strategy: Option<Strategy>,
    input_name: Option<String>,
    output_name: Option<String>,
}

impl CopyTaskBuilder {
    /// Set the task name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Override the description derived from the strategy
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the strategy
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Set the input resource name
    pub fn input(mut self, name: impl Into<String>) -> Self {
        self.input_name = Some(name.into());
        self
    }

    /// Set the output path
    pub fn output(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    /// Build the task.
    ///
    /// Strategy parameters are validated when the task is prepared, so an
    /// out-of-range block size becomes a failed run rather than a build error.
    pub fn build(self) -> Result<CopyTask> {
        let strategy = self
            .strategy
            .ok_or_else(|| CopyBenchError::config("task needs a strategy"))?;
        let input_name = self
            .input_name
            .ok_or_else(|| CopyBenchError::config("task needs an input name"))?;
        let output_name = self
            .output_name
            .ok_or_else(|| CopyBenchError::config("task needs an output name"))?;

        Ok(CopyTask {
            name: self.name.unwrap_or_else(|| strategy.to_string()),
            description: self.description.unwrap_or_else(|| strategy.description()),
            strategy,
            input_name,
            output_name,
        })
    }
}

/// One pass of a task through its lifecycle
#[derive(Debug)]
pub struct TaskRun<'a> {
    task: &'a CopyTask,
    state: TaskState,
    streams: Option<(InputHandle, OutputHandle)>,
}

impl<'a> TaskRun<'a> {
    fn new(task: &'a CopyTask) -> Self {
        Self {
            task,
            state: TaskState::Created,
            streams: None,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// The task being run
    pub fn task(&self) -> &CopyTask {
        self.task
    }

    /// Created -> Prepared: validate parameters and open both streams.
    ///
    /// The input is opened first, so a missing input never creates the
    /// output file.
    pub fn prepare(&mut self, resolver: &AssetResolver) -> Result<()> {
        self.expect_state(TaskState::Created, "prepare")?;

        match self.open_streams(resolver) {
            Ok(streams) => {
                self.streams = Some(streams);
                self.state = TaskState::Prepared;
                tracing::debug!("Task '{}' prepared", self.task.name);
                Ok(())
            }
            Err(e) => {
                self.state = TaskState::Failed;
                tracing::warn!("Task '{}' failed to prepare: {}", self.task.name, e);
                Err(e)
            }
        }
    }

    /// Prepared -> Running -> Done, or Failed. Streams are released either way.
    pub fn run(&mut self, interrupt: &Interrupt) -> Result<CopyStats> {
        self.expect_state(TaskState::Prepared, "run")?;
        let (input, output) = self.streams.take().ok_or_else(|| self.invalid_state("run"))?;

        self.state = TaskState::Running;
        tracing::debug!(
            "Task '{}' copying {:?} -> {:?}",
            self.task.name,
            input.path(),
            output.path()
        );

        let copier = Copier::new(self.task.strategy).with_interrupt(interrupt.clone());
        match copier.copy_handles(input, output) {
            Ok(stats) => {
                self.state = TaskState::Done;
                tracing::debug!("Task '{}' copied {} bytes", self.task.name, stats.bytes_read);
                Ok(stats)
            }
            Err(e) => {
                self.state = TaskState::Failed;
                tracing::warn!("Task '{}' failed: {}", self.task.name, e);
                Err(e)
            }
        }
    }

    fn open_streams(&self, resolver: &AssetResolver) -> Result<(InputHandle, OutputHandle)> {
        self.task.strategy.validate()?;

        let input = resolver.open_input(&self.task.input_name)?;
        match resolver.open_output(&self.task.output_name) {
            Ok(output) => Ok((input, output)),
            Err(e) => retain_first(Err(e), input.close()),
        }
    }

    fn expect_state(&self, expected: TaskState, action: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.invalid_state(action))
        }
    }

    fn invalid_state(&self, action: &'static str) -> CopyBenchError {
        CopyBenchError::InvalidState {
            task: self.task.name.clone(),
            action,
            state: self.state,
        }
    }
}
