//! Pipes: ordered chains of operators.
//!
//! A [`Pipe`] applies its steps in sequence, handing each step the previous
//! step's output. A pipe is itself an [`Operator`], so pipes nest.
//!
//! ```rust
//! use sluice_core::prelude::*;
//! use sluice_runtime::pipe::Pipe;
//!
//! let increment = || from_fn("Increment", |input: Datum| {
//!     Ok(Datum::Int(input.as_int().unwrap_or_default() + 1))
//! });
//!
//! let pipe = Pipe::named("Counter").then(increment()).then(increment());
//! assert_eq!(pipe.apply(Datum::Int(1)).unwrap(), Datum::Int(3));
//! ```

mod config;
mod log;
mod run;

use std::fmt;

pub use config::{
    DEFAULT_PIPE_NAME, FileLogLevel, PipeConfig, PipeConfigBuilder, PipeConfigBuilderError,
};
pub use log::RunLog;
pub use run::{PipeRun, TIMESTAMP_FORMAT};
use sluice_core::{Datum, Operator, Result};

use crate::TRACING_TARGET_PIPE;
use crate::operator::{Checkpoint, Compare};

/// An ordered chain of operators applied as one.
///
/// With `autocompare` enabled, every step whose input is a table holding the
/// configured uid column is followed by a [`Compare`] against that input.
/// With `autocheckpoint` enabled, every tabular step result is written by a
/// [`Checkpoint`] to `<checkpoint_dir>/<run timestamp>_<step ordinal>.csv`.
/// With a `file_log_level`, every run also writes
/// `<log_dir>/<run timestamp> - <pipe name>.txt`.
pub struct Pipe {
    config: PipeConfig,
    steps: Vec<Box<dyn Operator>>,
}

impl Pipe {
    /// Creates a pipe with the default configuration.
    pub fn new(steps: Vec<Box<dyn Operator>>) -> Self {
        Self::from_parts(PipeConfig::default(), steps)
    }

    /// Creates an empty pipe with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self::from_parts(PipeConfig::named(name), Vec::new())
    }

    /// Creates a pipe with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`sluice_core::Error::Configuration`] if the configuration is
    /// inconsistent.
    pub fn with_config(config: PipeConfig, steps: Vec<Box<dyn Operator>>) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(config, steps))
    }

    fn from_parts(config: PipeConfig, steps: Vec<Box<dyn Operator>>) -> Self {
        let pipe = Self { config, steps };
        tracing::debug!(
            target: TRACING_TARGET_PIPE,
            pipe = %pipe.config.name,
            steps = ?pipe.step_names(),
            "Pipe created"
        );
        pipe
    }

    /// Appends a step.
    pub fn then(mut self, step: impl Operator + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Appends an already boxed step.
    pub fn push(&mut self, step: Box<dyn Operator>) {
        self.steps.push(step);
    }

    /// Returns the configuration.
    #[inline]
    pub fn config(&self) -> &PipeConfig {
        &self.config
    }

    /// Returns the steps in application order.
    #[inline]
    pub fn steps(&self) -> &[Box<dyn Operator>] {
        &self.steps
    }

    /// Returns the names of the steps in application order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Returns the number of steps.
    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns whether the pipe has no steps.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Builds the comparison to run after a step, if autocompare applies.
    fn comparison_for(&self, input: &Datum) -> Option<Compare> {
        if !self.config.autocompare {
            return None;
        }
        let uid_column = self.config.uid_column.as_deref()?;
        let table = input.as_table().filter(|table| table.has_column(uid_column))?;
        Some(Compare::new(table.clone(), uid_column))
    }
}

impl Operator for Pipe {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn apply(&self, input: Datum) -> Result<Datum> {
        let mut run = PipeRun::start(&self.config.name);
        if let (Some(level), Some(dir)) = (self.config.file_log_level, self.config.log_dir.as_deref()) {
            run = run.with_log(dir, level)?;
        }
        let _entered = run.span().enter();
        run.record(
            FileLogLevel::Info,
            self.name(),
            format_args!("Starting execution of pipe with steps {:?}", self.step_names()),
        );

        tracing::info!(
            target: TRACING_TARGET_PIPE,
            steps = self.steps.len(),
            input = %input.kind(),
            "Running pipe"
        );

        let mut value = input;
        for (ordinal, step) in self.steps.iter().enumerate() {
            let comparison = self.comparison_for(&value);

            value = run.apply_step(ordinal, step.as_ref(), value)?;

            if let Some(comparison) = comparison {
                value = run.apply_step(ordinal, &comparison, value)?;
            }

            if let (true, true, Some(dir)) = (
                self.config.autocheckpoint,
                value.is_table(),
                self.config.checkpoint_dir.as_deref(),
            ) {
                let checkpoint = Checkpoint::new(run.checkpoint_path(dir, ordinal));
                value = run.apply_step(ordinal, &checkpoint, value)?;
            }
        }

        tracing::info!(
            target: TRACING_TARGET_PIPE,
            output = %value.kind(),
            "Pipe completed"
        );
        run.record(FileLogLevel::Info, self.name(), "Ended execution of pipe");
        Ok(value)
    }
}

impl fmt::Debug for Pipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipe")
            .field("config", &self.config)
            .field("steps", &self.step_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use sluice_core::prelude::*;

    use super::*;

    fn increment() -> impl Operator {
        from_fn("Increment", |input: Datum| {
            Ok(Datum::Int(input.as_int().unwrap_or_default() + 1))
        })
    }

    fn table() -> Table {
        Table::from_rows(
            ["uid", "value"],
            vec![
                vec![Datum::from("a"), Datum::Int(1)],
                vec![Datum::from("b"), Datum::Int(2)],
            ],
        )
        .unwrap()
    }

    fn double_values() -> impl Operator {
        from_fn("DoubleValues", |input: Datum| {
            let mut table = input
                .into_table()
                .map_err(|_| Error::failed("DoubleValues", "expected a table"))?;
            table.map_column("value", |cell| {
                Ok(Datum::Int(cell.as_int().unwrap_or_default() * 2))
            })?;
            Ok(Datum::Table(table))
        })
    }

    #[test]
    fn test_applies_steps_in_order() {
        let pipe = Pipe::named("Arithmetic")
            .then(increment())
            .then(from_fn("Square", |input: Datum| {
                let value = input.as_int().unwrap_or_default();
                Ok(Datum::Int(value * value))
            }));

        assert_eq!(pipe.apply(Datum::Int(2)).unwrap(), Datum::Int(9));
        assert_eq!(pipe.step_names(), vec!["Increment", "Square"]);
        assert_eq!(pipe.len(), 2);
    }

    #[test]
    fn test_empty_pipe_returns_input() {
        let pipe = Pipe::new(Vec::new());
        assert!(pipe.is_empty());
        assert_eq!(pipe.name(), DEFAULT_PIPE_NAME);
        assert_eq!(pipe.apply(Datum::from("x")).unwrap(), Datum::from("x"));
    }

    #[test]
    fn test_pipe_of_pipes_equals_inlined_steps() {
        let inner = Pipe::named("Inner").then(increment()).then(increment());
        let nested = Pipe::named("Outer").then(inner).then(increment());
        let inlined = Pipe::named("Flat")
            .then(increment())
            .then(increment())
            .then(increment());

        assert_eq!(
            nested.apply(Datum::Int(3)).unwrap(),
            inlined.apply(Datum::Int(3)).unwrap()
        );
    }

    #[test]
    fn test_step_failure_propagates_unchanged() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);

        let pipe = Pipe::named("Failing")
            .then(from_fn("Explode", |_| Err(Error::failed("Explode", "boom"))))
            .then(from_fn("Never", move |input| {
                counted.fetch_add(1, Ordering::SeqCst);
                Ok(input)
            }));

        let error = pipe.apply(Datum::Null).unwrap_err();
        assert_eq!(error.to_string(), "Explode failed: boom");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_with_config_rejects_checkpoint_without_dir() {
        let config = PipeConfig {
            autocheckpoint: true,
            ..PipeConfig::named("Load")
        };
        assert!(matches!(
            Pipe::with_config(config, Vec::new()),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_autocheckpoint_writes_one_file_per_tabular_step() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipeConfigBuilder::default()
            .name("Checkpointed")
            .autocheckpoint(true)
            .checkpoint_dir(dir.path())
            .build()
            .unwrap();

        let pipe = Pipe::with_config(
            config,
            vec![
                double_values().boxed(),
                from_fn("Summarize", |input: Datum| {
                    Ok(Datum::Int(input.as_table().map_or(0, Table::num_rows) as i64))
                })
                .boxed(),
            ],
        )
        .unwrap();

        let output = pipe.apply(Datum::Table(table())).unwrap();
        assert_eq!(output, Datum::Int(2));

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("_0.csv"));

        let written = std::fs::read_to_string(dir.path().join(&files[0])).unwrap();
        assert_eq!(written, "uid,value\na,2\nb,4\n");
    }

    fn compared(uid_column: Option<&str>, autocompare: bool) -> Pipe {
        let config = PipeConfig {
            uid_column: uid_column.map(str::to_owned),
            autocompare,
            ..PipeConfig::named("Compared")
        };
        Pipe::with_config(config, vec![double_values().boxed()]).unwrap()
    }

    #[test]
    fn test_comparison_references_step_input() {
        let pipe = compared(Some("uid"), true);
        let input = Datum::Table(table());

        let comparison = pipe.comparison_for(&input).unwrap();
        assert_eq!(comparison.reference(), &table());

        // The step output differs from the pre-step table in every value cell.
        let output = double_values().apply(input).unwrap();
        let diff = comparison.diff(output.as_table().unwrap());
        assert_eq!(diff.mismatches.len(), 2);
        assert!(diff.mismatches.iter().all(|mismatch| mismatch.column == "value"));
        assert_eq!(diff.mismatches[0].reference, Datum::Int(1));
        assert_eq!(diff.mismatches[0].input, Datum::Int(2));
    }

    #[test]
    fn test_no_comparison_without_uid_column_in_table() {
        let pipe = compared(Some("id"), true);
        assert!(pipe.comparison_for(&Datum::Table(table())).is_none());
    }

    #[test]
    fn test_no_comparison_for_non_table_input() {
        let pipe = compared(Some("uid"), true);
        assert!(pipe.comparison_for(&Datum::Int(3)).is_none());
        assert!(pipe.comparison_for(&Datum::from("uid")).is_none());
    }

    #[test]
    fn test_no_comparison_when_disabled() {
        assert!(compared(Some("uid"), false).comparison_for(&Datum::Table(table())).is_none());
        assert!(compared(None, true).comparison_for(&Datum::Table(table())).is_none());
    }

    #[test]
    fn test_file_log_written_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipeConfigBuilder::default()
            .name("Logged")
            .file_log_level(FileLogLevel::Info)
            .log_dir(dir.path())
            .build()
            .unwrap();
        let pipe = Pipe::with_config(config, vec![increment().boxed()]).unwrap();

        assert_eq!(pipe.apply(Datum::Int(1)).unwrap(), Datum::Int(2));

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].to_string_lossy().ends_with(" - Logged.txt"));

        let text = std::fs::read_to_string(&files[0]).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with("- Logged: Starting execution of pipe with steps [\"Increment\"]"));
        assert!(lines[1].ends_with("- Increment: Applying step"));
        assert!(lines[2].ends_with("- Increment: Step completed"));
        assert!(lines[3].ends_with("- Logged: Ended execution of pipe"));
    }

    #[test]
    fn test_autocompare_never_alters_values() {
        let config = PipeConfigBuilder::default()
            .name("Compared")
            .uid_column("uid")
            .autocompare(true)
            .build()
            .unwrap();
        let pipe = Pipe::with_config(config, vec![double_values().boxed()]).unwrap();

        let mut expected = table();
        expected
            .map_column("value", |cell| {
                Ok(Datum::Int(cell.as_int().unwrap_or_default() * 2))
            })
            .unwrap();

        assert_eq!(
            pipe.apply(Datum::Table(table())).unwrap(),
            Datum::Table(expected)
        );
    }
}
