//! Per-run execution context of a pipe.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use jiff::Zoned;
use sluice_core::{Datum, Operator, Result};
use tracing::Span;

use super::config::FileLogLevel;
use super::log::RunLog;
use crate::TRACING_TARGET_PIPE;

/// Format of run timestamps, also used in checkpoint file names.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H.%M.%S";

/// Context of a single [`Pipe`](super::Pipe) invocation.
///
/// Carries the pipe name and the local wall-clock time the run started at,
/// and owns the tracing span every step of the run is logged in. Step
/// progress is also written to the run log, if one is attached.
#[derive(Debug)]
pub struct PipeRun<'a> {
    pipe: &'a str,
    timestamp: String,
    span: Span,
    log: Option<RunLog>,
}

impl<'a> PipeRun<'a> {
    /// Starts a run of the named pipe.
    pub fn start(pipe: &'a str) -> Self {
        let timestamp = Zoned::now().strftime(TIMESTAMP_FORMAT).to_string();
        let span = tracing::info_span!(
            target: TRACING_TARGET_PIPE,
            "pipe",
            pipe = pipe,
            run = %timestamp,
        );
        Self {
            pipe,
            timestamp,
            span,
            log: None,
        }
    }

    /// Opens the run log `<dir>/<tag>.txt` at `level`.
    ///
    /// # Errors
    ///
    /// Returns [`sluice_core::Error::Io`] if the log file cannot be created.
    pub fn with_log(mut self, dir: &Path, level: FileLogLevel) -> Result<Self> {
        self.log = Some(RunLog::create(dir, self.tag(), level)?);
        Ok(self)
    }

    /// Returns the name of the running pipe.
    #[inline]
    pub fn pipe(&self) -> &str {
        self.pipe
    }

    /// Returns the run timestamp, formatted with [`TIMESTAMP_FORMAT`].
    #[inline]
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Returns the span the run is logged in.
    #[inline]
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Returns `<timestamp> - <pipe>`, naming the run in its log.
    pub fn tag(&self) -> String {
        format!("{} - {}", self.timestamp, self.pipe)
    }

    /// Returns the attached run log.
    #[inline]
    pub fn run_log(&self) -> Option<&RunLog> {
        self.log.as_ref()
    }

    /// Writes a line to the run log, if one is attached.
    pub fn record(&self, level: FileLogLevel, source: &str, message: impl Display) {
        if let Some(log) = &self.log {
            log.write(level, source, message);
        }
    }

    /// Returns the path of the automatic checkpoint for a step.
    pub fn checkpoint_path(&self, dir: &Path, ordinal: usize) -> PathBuf {
        dir.join(format!("{}_{ordinal}.csv", self.timestamp))
    }

    /// Applies one step, logging its start, end and failure.
    ///
    /// Errors are returned unchanged.
    pub fn apply_step(&self, ordinal: usize, step: &dyn Operator, input: Datum) -> Result<Datum> {
        tracing::debug!(
            target: TRACING_TARGET_PIPE,
            step = step.name(),
            ordinal,
            input = %input.kind(),
            "Applying step"
        );
        self.record(FileLogLevel::Info, step.name(), "Applying step");
        self.record(FileLogLevel::Debug, step.name(), format_args!("Input is {}", input.kind()));

        match step.apply(input) {
            Ok(output) => {
                tracing::debug!(
                    target: TRACING_TARGET_PIPE,
                    step = step.name(),
                    ordinal,
                    output = %output.kind(),
                    "Step completed"
                );
                self.record(FileLogLevel::Info, step.name(), "Step completed");
                self.record(FileLogLevel::Debug, step.name(), format_args!("Output is {}", output.kind()));
                Ok(output)
            }
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET_PIPE,
                    step = step.name(),
                    ordinal,
                    error = %error,
                    "Step failed"
                );
                self.record(FileLogLevel::Error, step.name(), format_args!("Step failed: {error}"));
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use sluice_core::prelude::*;

    use super::*;

    #[test]
    fn test_timestamp_format() {
        let run = PipeRun::start("Load");
        let timestamp = run.timestamp();

        // 2024-01-31_09.05.00
        assert_eq!(timestamp.len(), 19);
        assert_eq!(&timestamp[10..11], "_");
        assert_eq!(timestamp.matches('.').count(), 2);
        assert_eq!(run.pipe(), "Load");
    }

    #[test]
    fn test_checkpoint_path() {
        let run = PipeRun::start("Load");
        let path = run.checkpoint_path(Path::new("out"), 2);
        assert_eq!(path, Path::new("out").join(format!("{}_2.csv", run.timestamp())));
    }

    #[test]
    fn test_tag() {
        let run = PipeRun::start("Load");
        assert_eq!(run.tag(), format!("{} - Load", run.timestamp()));
        assert!(run.run_log().is_none());
    }

    #[test]
    fn test_run_log_records_steps() {
        let dir = tempfile::tempdir().unwrap();
        let run = PipeRun::start("Load")
            .with_log(dir.path(), FileLogLevel::Info)
            .unwrap();
        let path = run.run_log().unwrap().path().to_path_buf();
        assert_eq!(path, dir.path().join(format!("{}.txt", run.tag())));

        run.apply_step(0, &from_fn("Keep", |input| Ok(input)), Datum::Null).unwrap();
        run.apply_step(1, &from_fn("Explode", |_| Err(Error::failed("Explode", "boom"))), Datum::Null)
            .unwrap_err();

        let text = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with("- Keep: Applying step"));
        assert!(lines[0].contains(" INFO "));
        assert!(lines[1].ends_with("- Keep: Step completed"));
        assert!(lines[2].ends_with("- Explode: Applying step"));
        assert!(lines[3].ends_with("- Explode: Step failed: Explode failed: boom"));
        assert!(!text.contains("Input is"));
    }

    #[test]
    fn test_apply_step_returns_errors_unchanged() {
        let run = PipeRun::start("Load");
        let failing = from_fn("Explode", |_| Err(Error::failed("Explode", "boom")));

        let error = run.apply_step(0, &failing, Datum::Null).unwrap_err();
        assert!(matches!(error, Error::Failed { ref operator, .. } if operator == "Explode"));
    }
}
