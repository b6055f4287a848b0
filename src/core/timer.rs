//! Task timing harness
//!
//! [`TaskTimer`] runs tasks one after another, brackets each run with two
//! reads of a monotonic clock and writes one report entry per task to its
//! sink. A failing task becomes a failed sample; only a sink that refuses
//! output stops the harness.

use crate::config::OutputFormat;
use crate::core::{CopyTask, Interrupt};
use crate::error::{CopyBenchError, Result};
use crate::fs::AssetResolver;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::time::{Duration, Instant};

/// Outcome of one timed task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Outcome {
    /// Copy completed
    Ok,
    /// Copy failed
    Failed {
        /// Error kind label
        kind: String,
        /// Short cause
        cause: String,
    },
}

impl Outcome {
    fn from_error(error: &CopyBenchError) -> Self {
        Self::Failed {
            kind: error.kind().to_string(),
            cause: error.to_string(),
        }
    }
}

/// One measured task
#[derive(Debug, Clone, Serialize)]
pub struct TimingSample {
    /// Round the sample belongs to, starting at 1
    pub round: usize,
    /// Task name
    pub name: String,
    /// Task description
    pub description: String,
    /// Wall-clock time the task started (reporting only)
    pub started_at: DateTime<Utc>,
    /// Monotonic elapsed time in nanoseconds
    pub elapsed_ns: u64,
    /// Success or failure
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Bytes consumed from the input
    pub bytes_copied: u64,
}

impl TimingSample {
    /// Elapsed time as a duration
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_ns)
    }

    /// Check if the task succeeded
    pub fn is_ok(&self) -> bool {
        self.outcome == Outcome::Ok
    }
}

/// Totals over a harness run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Tasks timed
    pub tasks: usize,
    /// Tasks that succeeded
    pub succeeded: usize,
    /// Tasks that failed
    pub failed: usize,
    /// Sum of per-task elapsed time
    pub elapsed: Duration,
    /// Sum of bytes copied
    pub bytes_copied: u64,
}

impl RunSummary {
    fn record(&mut self, sample: &TimingSample) {
        self.tasks += 1;
        if sample.is_ok() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.elapsed += sample.elapsed();
        self.bytes_copied += sample.bytes_copied;
    }
}

/// Format elapsed time in milliseconds below one second, seconds above
pub fn format_elapsed(elapsed: Duration) -> String {
    if elapsed < Duration::from_secs(1) {
        format!("{:.3} ms", elapsed.as_secs_f64() * 1000.0)
    } else {
        format!("{:.6} s", elapsed.as_secs_f64())
    }
}

/// Drives tasks and reports their timings
pub struct TaskTimer<W: Write> {
    sink: W,
    format: OutputFormat,
    resolver: AssetResolver,
    interrupt: Interrupt,
    csv_header_written: bool,
}

impl<W: Write> TaskTimer<W> {
    /// Create a timer writing text reports to `sink`
    pub fn new(sink: W, resolver: AssetResolver) -> Self {
        Self {
            sink,
            format: OutputFormat::Text,
            resolver,
            interrupt: Interrupt::new(),
            csv_header_written: false,
        }
    }

    /// Set the report format
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Share an interrupt flag with the caller
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Handle for interrupting the run from elsewhere
    pub fn interrupt(&self) -> Interrupt {
        self.interrupt.clone()
    }

    /// Give back the sink
    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Time one task without reporting it
    pub fn measure(&self, task: &CopyTask, round: usize) -> TimingSample {
        let started_at = Utc::now();
        let start = Instant::now();

        let result = if self.interrupt.is_raised() {
            Err(CopyBenchError::Interrupted)
        } else {
            task.execute(&self.resolver, &self.interrupt)
        };

        let elapsed = start.elapsed();
        let elapsed_ns = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);

        let (outcome, bytes_copied) = match &result {
            Ok(stats) => (Outcome::Ok, stats.bytes_read),
            Err(e) => (Outcome::from_error(e), 0),
        };

        TimingSample {
            round,
            name: task.name().to_string(),
            description: task.description().to_string(),
            started_at,
            elapsed_ns,
            outcome,
            bytes_copied,
        }
    }

    /// Time one task and write its report entry
    pub fn measure_and_print(&mut self, task: &CopyTask, round: usize) -> Result<TimingSample> {
        let sample = self.measure(task, round);
        self.emit(&sample).map_err(CopyBenchError::Report)?;
        Ok(sample)
    }

    /// Time every task, `rounds` times over, in submission order
    pub fn run(&mut self, tasks: &[CopyTask], rounds: usize) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for round in 1..=rounds {
            if rounds > 1 && self.format == OutputFormat::Text {
                writeln!(self.sink, "== round {} ==", round).map_err(CopyBenchError::Report)?;
            }

            for task in tasks {
                let sample = self.measure_and_print(task, round)?;
                tracing::info!(
                    task = %sample.name,
                    round,
                    elapsed_ns = sample.elapsed_ns,
                    ok = sample.is_ok(),
                    "Task timed"
                );
                summary.record(&sample);
            }
        }

        if self.format == OutputFormat::Text {
            self.write_summary(&summary).map_err(CopyBenchError::Report)?;
        }
        self.sink.flush().map_err(CopyBenchError::Report)?;

        Ok(summary)
    }

    fn emit(&mut self, sample: &TimingSample) -> std::io::Result<()> {
        match self.format {
            OutputFormat::Text => self.write_text(sample),
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.sink, sample)?;
                writeln!(self.sink)
            }
            OutputFormat::Csv => self.write_csv(sample),
        }
    }

    fn write_text(&mut self, sample: &TimingSample) -> std::io::Result<()> {
        writeln!(self.sink, "{}", sample.description)?;
        write!(
            self.sink,
            "elapsed: {} ns ({})",
            sample.elapsed_ns,
            format_elapsed(sample.elapsed())
        )?;
        match &sample.outcome {
            Outcome::Ok => writeln!(
                self.sink,
                " ok, {} copied",
                humansize::format_size(sample.bytes_copied, humansize::BINARY)
            ),
            Outcome::Failed { kind, cause } => writeln!(self.sink, " failed [{}]: {}", kind, cause),
        }
    }

    fn write_csv(&mut self, sample: &TimingSample) -> std::io::Result<()> {
        if !self.csv_header_written {
            writeln!(
                self.sink,
                "round,name,description,started_at,elapsed_ns,outcome,bytes_copied,error_kind,error_cause"
            )?;
            self.csv_header_written = true;
        }

        let (outcome, kind, cause) = match &sample.outcome {
            Outcome::Ok => ("ok", "", ""),
            Outcome::Failed { kind, cause } => ("failed", kind.as_str(), cause.as_str()),
        };
        writeln!(
            self.sink,
            "{},{},{},{},{},{},{},{},{}",
            sample.round,
            csv_field(&sample.name),
            csv_field(&sample.description),
            sample.started_at.to_rfc3339(),
            sample.elapsed_ns,
            outcome,
            sample.bytes_copied,
            kind,
            csv_field(cause)
        )
    }

    fn write_summary(&mut self, summary: &RunSummary) -> std::io::Result<()> {
        writeln!(self.sink, "--")?;
        writeln!(
            self.sink,
            "{} tasks: {} ok, {} failed; total {} ({}), {} copied",
            summary.tasks,
            summary.succeeded,
            summary.failed,
            format_elapsed(summary.elapsed),
            summary.elapsed.as_nanos(),
            humansize::format_size(summary.bytes_copied, humansize::BINARY)
        )
    }
}

/// Quote a CSV field when it needs it
fn csv_field(value: &str) -> String {
    if value.contains(|c| matches!(c, ',' | '"' | '\n' | '\r')) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
