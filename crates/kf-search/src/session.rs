//! Human-readable session message log.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use kf_types::KfResult;
use tracing::info;

/// Append-only log of progress messages meant for people, not for replay.
#[derive(Debug)]
pub struct SessionLog {
    path: PathBuf,
    file: File,
}

impl SessionLog {
    pub fn open<P: AsRef<Path>>(path: P) -> KfResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one timestamped line and mirror it to the tracing output.
    pub fn log(&mut self, message: &str) -> KfResult<()> {
        let message = message.trim_end();
        info!("{}", message);
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        writeln!(self.file, "[{timestamp}] {message}")?;
        self.file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_timestamped_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions");

        let mut log = SessionLog::open(&path).unwrap();
        log.log("Creating the best features set\n").unwrap();
        drop(log);

        let mut log = SessionLog::open(&path).unwrap();
        log.log("The best feature subset is: age").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] Creating the best features set"));
        assert!(lines[1].ends_with("The best feature subset is: age"));
    }
}
