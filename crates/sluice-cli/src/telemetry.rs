//! Tracing initialization.

use std::fs::{self, File};
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogConfig, LogFormat};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initializes the tracing subscriber.
///
/// Records are written to stderr so command output on stdout stays clean.
/// The filter comes from `--log-level` when given, otherwise from `RUST_LOG`,
/// falling back to `info`. With `--log-file`, records are also appended to
/// that file under their own filter.
///
/// # Errors
///
/// Returns an error if a filter is invalid, the log file cannot be opened, or
/// a subscriber is already set.
pub fn init_tracing(config: &LogConfig) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(create_layers(config)?)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    Ok(())
}

/// Creates the stderr layer and, if configured, the file layer.
fn create_layers(config: &LogConfig) -> anyhow::Result<Vec<BoxedLayer>> {
    let stderr_filter = create_env_filter(config.log_level.as_deref())?;
    let stderr_layer = create_fmt_layer(config.log_format, io::stderr, io::stderr().is_terminal());
    let mut layers = vec![stderr_layer.with_filter(stderr_filter).boxed()];

    if let Some(path) = &config.log_file {
        let directive = config.log_file_level.as_deref().or(config.log_level.as_deref());
        let file_filter = create_env_filter(directive)?;
        let file_layer = create_fmt_layer(config.log_format, open_log_file(path)?, false);
        layers.push(file_layer.with_filter(file_filter).boxed());
    }

    Ok(layers)
}

/// Creates an environment filter for tracing.
fn create_env_filter(directive: Option<&str>) -> anyhow::Result<EnvFilter> {
    match directive {
        Some(directive) => EnvFilter::try_new(directive),
        None => EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info")),
    }
    .map_err(|e| anyhow::anyhow!("Failed to create env filter: {e}"))
}

/// Opens the log file for appending, creating missing parent directories.
fn open_log_file(path: &Path) -> anyhow::Result<Mutex<File>> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }

    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    Ok(Mutex::new(file))
}

/// Creates a formatted tracing layer.
fn create_fmt_layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true);

    match format {
        LogFormat::Pretty => layer.with_ansi(ansi).boxed(),
        LogFormat::Json => layer.json().with_ansi(false).boxed(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn log_config(log_file: Option<PathBuf>, log_file_level: Option<&str>) -> LogConfig {
        LogConfig {
            log_level: Some("info".to_owned()),
            log_format: LogFormat::Pretty,
            log_file,
            log_file_level: log_file_level.map(str::to_owned),
        }
    }

    #[test]
    fn test_explicit_directive_is_used() {
        let filter = create_env_filter(Some("sluice_runtime=debug")).unwrap();
        assert!(filter.to_string().contains("sluice_runtime=debug"));
    }

    #[test]
    fn test_invalid_directive_is_rejected() {
        assert!(create_env_filter(Some("sluice_runtime=loud")).is_err());
    }

    #[test]
    fn test_stderr_only_without_log_file() {
        assert_eq!(create_layers(&log_config(None, None)).unwrap().len(), 1);
    }

    #[test]
    fn test_log_file_receives_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("sluice.log");
        let layers = create_layers(&log_config(Some(path.clone()), Some("warn"))).unwrap();
        assert_eq!(layers.len(), 2);

        let subscriber = tracing_subscriber::registry().with(layers);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("below the file threshold");
            tracing::warn!("pipeline drifted");
        });

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("pipeline drifted"));
        assert!(!text.contains("below the file threshold"));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn test_invalid_file_directive_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = log_config(Some(dir.path().join("sluice.log")), Some("sluice=loud"));
        assert!(create_layers(&config).is_err());
    }
}
