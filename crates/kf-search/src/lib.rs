//! # kf-search
//!
//! Search-and-score engine for k-fold model analysis.
//!
//! Provides the scorer that turns raw evaluations into comparable objectives,
//! the execution ledger that makes long runs resumable, a best-first search
//! over feature subsets and a linear sweep over node thresholds. Evaluations
//! are delegated to an [`Oracle`].

mod features;
mod ledger;
mod nodes;
mod oracle;
mod progress;
mod run;
mod scorer;
mod session;
mod staleness;

#[cfg(test)]
mod testing;

pub use features::{FeatureSearch, FeatureSearchOutcome, FeatureUniverse, ScoredState, State};
pub use ledger::{ExecutionLedger, InvokeOutcome, LedgerMode, LEDGER_FILE, SESSION_FILE};
pub use nodes::{SweepOutcome, ThresholdRun, ThresholdSweep};
pub use oracle::{Evaluator, Oracle};
pub use progress::{ProgressRow, ProgressWriter, FEATURES_LOG, NODES_LOG};
pub use run::{
    run_cross_validation, run_feature_search, run_threshold_sweep, CrossValidationOutcome,
};
pub use scorer::{Score, Scorer};
pub use session::SessionLog;
pub use staleness::{BestTracker, EPSILON};
