//! Per-run log files of a pipe.

use std::cell::RefCell;
use std::fmt::Display;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use jiff::Zoned;
use sluice_core::{Error, Result};

use super::config::FileLogLevel;
use crate::TRACING_TARGET_PIPE;

/// Log file written during one pipe run.
///
/// Lines read `<time> <LEVEL> <run tag> - <source>: <message>`, and lines more
/// verbose than the threshold are dropped. Write failures are reported
/// through tracing and never fail the run.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    tag: String,
    level: FileLogLevel,
    writer: RefCell<BufWriter<File>>,
}

impl RunLog {
    /// Creates `<dir>/<tag>.txt`, creating `dir` if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directory or file cannot be created.
    pub fn create(dir: &Path, tag: impl Into<String>, level: FileLogLevel) -> Result<Self> {
        let tag = tag.into();
        fs::create_dir_all(dir).map_err(|error| Error::io(dir, error))?;

        let path = dir.join(format!("{tag}.txt"));
        let file = File::create(&path).map_err(|error| Error::io(&path, error))?;
        Ok(Self {
            path,
            tag,
            level,
            writer: RefCell::new(BufWriter::new(file)),
        })
    }

    /// Returns the path of the log file.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the threshold.
    #[inline]
    pub fn level(&self) -> FileLogLevel {
        self.level
    }

    /// Writes one line if `level` passes the threshold.
    pub fn write(&self, level: FileLogLevel, source: &str, message: impl Display) {
        if !self.level.enables(level) {
            return;
        }

        let time = Zoned::now().strftime("%H:%M:%S");
        let mut writer = self.writer.borrow_mut();
        let written = writeln!(writer, "{time} {level} {} - {source}: {message}", self.tag)
            .and_then(|()| writer.flush());

        if let Err(error) = written {
            tracing::warn!(
                target: TRACING_TARGET_PIPE,
                path = %self.path.display(),
                error = %error,
                "Failed to write run log"
            );
        }
    }
}
