//! Per-iteration progress CSV.

use std::fs::File;
use std::path::Path;

use csv::WriterBuilder;
use kf_types::{KfError, KfResult};

pub const FEATURES_LOG: &str = "features_sets.csv";
pub const NODES_LOG: &str = "nodes_sets.csv";

/// One row of the progress log.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRow {
    pub step: usize,
    /// The configuration column: a 0/1 state vector or a node threshold.
    pub configuration: String,
    pub score: f64,
    pub metric_value: f64,
    pub best_score: f64,
}

/// Writes progress rows, flushing after each so a crash loses at most the
/// row in flight.
#[derive(Debug)]
pub struct ProgressWriter {
    writer: csv::Writer<File>,
}

impl ProgressWriter {
    /// Progress log for the feature search (`state` column).
    pub fn features<P: AsRef<Path>>(path: P) -> KfResult<Self> {
        Self::create(path, "state")
    }

    /// Progress log for the node-threshold sweep (`node_threshold` column).
    pub fn nodes<P: AsRef<Path>>(path: P) -> KfResult<Self> {
        Self::create(path, "node_threshold")
    }

    fn create<P: AsRef<Path>>(path: P, configuration_column: &str) -> KfResult<Self> {
        let file = File::create(path)?;
        let mut writer = WriterBuilder::new().from_writer(file);
        writer
            .write_record([
                "step",
                configuration_column,
                "score",
                "metric_value",
                "best_score",
            ])
            .map_err(progress_error)?;
        writer.flush()?;
        Ok(Self { writer })
    }

    pub fn write(&mut self, row: &ProgressRow) -> KfResult<()> {
        self.writer
            .write_record([
                row.step.to_string(),
                row.configuration.clone(),
                row.score.to_string(),
                row.metric_value.to_string(),
                row.best_score.to_string(),
            ])
            .map_err(progress_error)?;
        self.writer.flush()?;
        Ok(())
    }
}

fn progress_error(err: csv::Error) -> KfError {
    KfError::Progress(err.to_string())
}
