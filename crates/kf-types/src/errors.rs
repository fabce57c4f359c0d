use std::path::PathBuf;

use thiserror::Error;

/// Main error type for k-fold search runs
#[derive(Error, Debug)]
pub enum KfError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Metric error: {0}")]
    Metric(#[from] MetricError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Progress log error: {0}")]
    Progress(String),
}

/// Caller or setup mistakes that would recur identically on retry
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Unknown field: {name}")]
    UnknownField { name: String },

    #[error("Objective field could not be resolved: {name}")]
    UnknownObjective { name: String },

    #[error("Unknown metric: {name}")]
    UnknownMetric { name: String },

    #[error("Empty node threshold range: min {min} is above max {max}")]
    EmptyThresholdRange { min: u64, max: u64 },

    #[error("Node threshold step must be positive")]
    ZeroStep,

    #[error("Staleness must be at least 1")]
    ZeroStaleness,

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Failures of the external evaluation oracle
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Evaluation call failed: {message}")]
    ExecutionFailed { message: String },

    #[error("Failed to retrieve evaluation from {}: {message}", path.display())]
    EvaluationUnreadable { path: PathBuf, message: String },

    #[error("Malformed evaluation: {message}")]
    MalformedEvaluation { message: String },
}

/// Failures of the execution ledger; any of these breaks future resumability
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Could not write ledger {}: {message}", path.display())]
    WriteFailed { path: PathBuf, message: String },

    #[error("Corrupt ledger entry at line {line}: {message}")]
    Corrupt { line: usize, message: String },
}

/// The evaluation has no usable objective
#[derive(Error, Debug, PartialEq)]
pub enum MetricError {
    #[error("Failed to find {requested} or r-squared in the evaluation")]
    Unresolved { requested: String },
}

/// Result type alias for k-fold search operations
pub type KfResult<T> = Result<T, KfError>;
