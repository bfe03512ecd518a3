//! Command-line configuration.
//!
//! Every option can also be supplied through a `SLUICE_*` environment variable.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use strum::{Display, IntoStaticStr};

/// Runs tabular ETL pipelines described by JSON definitions.
#[derive(Debug, Clone, Parser)]
#[command(name = "sluice", about, version)]
pub struct Cli {
    /// Logging configuration.
    #[clap(flatten)]
    pub log: LogConfig,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Logging configuration.
#[derive(Debug, Clone, Args)]
pub struct LogConfig {
    /// Log filter directive, e.g. `debug` or `sluice_runtime=trace`.
    ///
    /// Overrides `RUST_LOG` when set.
    #[arg(long, env = "SLUICE_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Log output format.
    #[arg(
        long,
        env = "SLUICE_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Pretty,
        global = true
    )]
    pub log_format: LogFormat,

    /// Also appends log records to this file, without colors.
    #[arg(long, env = "SLUICE_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Filter directive for `--log-file`; defaults to the stderr filter.
    #[arg(long, env = "SLUICE_LOG_FILE_LEVEL", global = true, requires = "log_file")]
    pub log_file_level: Option<String>,
}

/// Output format of log records written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Display)]
#[strum(serialize_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Available commands.
#[derive(Debug, Clone, Subcommand, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Command {
    /// Runs a pipeline and prints its final outputs as JSON.
    Run(RunArgs),
    /// Checks a pipeline definition without running it.
    Validate(DefinitionArgs),
    /// Prints the codename and pipe diagram in Graphviz DOT format.
    Graph(DefinitionArgs),
}

impl Command {
    /// Returns the command name used in logs.
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Returns the path of the pipeline definition the command operates on.
    pub fn definition(&self) -> &Path {
        match self {
            Self::Run(args) => &args.source.definition,
            Self::Validate(args) | Self::Graph(args) => &args.definition,
        }
    }
}

/// Arguments shared by every command.
#[derive(Debug, Clone, Args)]
pub struct DefinitionArgs {
    /// Path to the pipeline definition (JSON).
    pub definition: PathBuf,
}

/// Arguments of the `run` command.
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[clap(flatten)]
    pub source: DefinitionArgs,

    /// Directory for pipes that enable autocheckpoint without declaring one.
    #[arg(long, env = "SLUICE_CHECKPOINT_DIR")]
    pub checkpoint_dir: Option<PathBuf>,

    /// Directory for run logs of pipes that set a file log level without
    /// declaring one.
    #[arg(long, env = "SLUICE_PIPE_LOG_DIR")]
    pub pipe_log_dir: Option<PathBuf>,

    /// Prints the outputs on a single line.
    #[arg(long)]
    pub compact: bool,
}
