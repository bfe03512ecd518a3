//! Pipe configuration.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use sluice_core::{Error, Result};
use strum::{AsRefStr, Display, EnumString};

/// Name given to pipes constructed without one.
pub const DEFAULT_PIPE_NAME: &str = "Pipe";

fn default_pipe_name() -> String {
    DEFAULT_PIPE_NAME.to_owned()
}

/// Most verbose level written to a pipe's run log.
///
/// Levels are ordered from least to most verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Display, AsRefStr, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum FileLogLevel {
    /// Step failures only.
    Error,
    /// Failures and warnings.
    Warn,
    /// Pipe and step progress.
    Info,
    /// Progress plus value kinds.
    Debug,
    /// Everything.
    Trace,
}

impl FileLogLevel {
    /// Returns whether a line at `level` is written under this threshold.
    #[inline]
    pub fn enables(self, level: Self) -> bool {
        level <= self
    }
}

/// Configuration of a [`Pipe`](super::Pipe).
///
/// ```rust
/// use sluice_runtime::pipe::PipeConfigBuilder;
///
/// let config = PipeConfigBuilder::default()
///     .name("Cleaning")
///     .uid_column("uid")
///     .autocompare(true)
///     .build()
///     .unwrap();
///
/// assert_eq!(config.name, "Cleaning");
/// assert!(PipeConfigBuilder::default().autocheckpoint(true).build().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[builder(pattern = "owned", setter(into), build_fn(validate = "Self::validate"))]
pub struct PipeConfig {
    /// Name used in logs and diagrams.
    #[builder(default = "default_pipe_name()")]
    #[serde(default = "default_pipe_name")]
    pub name: String,

    /// Column identifying rows when comparing tables between steps.
    #[builder(default, setter(into, strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid_column: Option<String>,

    /// Compares each tabular step result against the step's input.
    #[builder(default)]
    #[serde(default)]
    pub autocompare: bool,

    /// Writes each tabular step result to `checkpoint_dir`.
    #[builder(default)]
    #[serde(default)]
    pub autocheckpoint: bool,

    /// Directory receiving automatic checkpoints.
    #[builder(default, setter(into, strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_dir: Option<PathBuf>,

    /// Writes a log file per run to `log_dir` at this level.
    #[builder(default, setter(strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_log_level: Option<FileLogLevel>,

    /// Directory receiving run logs.
    #[builder(default, setter(into, strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl PipeConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.autocheckpoint == Some(true) && !matches!(self.checkpoint_dir, Some(Some(_))) {
            return Err("autocheckpoint requires a checkpoint_dir".into());
        }
        if matches!(self.file_log_level, Some(Some(_))) && !matches!(self.log_dir, Some(Some(_))) {
            return Err("file_log_level requires a log_dir".into());
        }
        if let Some(Some(column)) = &self.uid_column {
            if column.is_empty() {
                return Err("uid_column must not be empty".into());
            }
        }
        Ok(())
    }
}

impl PipeConfig {
    /// Creates a default configuration with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Checks the configuration for inconsistencies.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `autocheckpoint` is enabled without
    /// a `checkpoint_dir`, `file_log_level` is set without a `log_dir`, or
    /// `uid_column` is empty.
    pub fn validate(&self) -> Result<()> {
        if self.autocheckpoint && self.checkpoint_dir.is_none() {
            return Err(Error::configuration(format!(
                "pipe {} enables autocheckpoint without a checkpoint_dir",
                self.name
            )));
        }
        if self.file_log_level.is_some() && self.log_dir.is_none() {
            return Err(Error::configuration(format!(
                "pipe {} sets file_log_level without a log_dir",
                self.name
            )));
        }
        if self.uid_column.as_deref() == Some("") {
            return Err(Error::configuration(format!(
                "pipe {} has an empty uid_column",
                self.name
            )));
        }
        Ok(())
    }
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            name: default_pipe_name(),
            uid_column: None,
            autocompare: false,
            autocheckpoint: false,
            checkpoint_dir: None,
            file_log_level: None,
            log_dir: None,
        }
    }
}
