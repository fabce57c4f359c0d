//! Linear sweep over the node threshold.

use kf_types::{Invocation, KfResult, Metric, ThresholdSweepConfig};
use tracing::info;

use crate::oracle::{Evaluator, Oracle};
use crate::progress::{ProgressRow, ProgressWriter};
use crate::staleness::BestTracker;

/// One evaluated threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdRun {
    pub threshold: u64,
    pub score: f64,
    pub metric_value: f64,
}

/// Result of a completed sweep. `best` is `None` only when no evaluated
/// threshold produced a finite improvement.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepOutcome {
    pub best: Option<ThresholdRun>,
    pub metric: Metric,
    pub runs: Vec<ThresholdRun>,
}

impl SweepOutcome {
    pub fn best_threshold(&self) -> Option<u64> {
        self.best.map(|run| run.threshold)
    }

    pub fn best_metric_value(&self) -> Option<f64> {
        self.best.map(|run| run.metric_value)
    }
}

/// Scans thresholds upward from `min_threshold` in `step` increments.
///
/// Only ever moves up the threshold axis and stops at the first stale
/// stretch, so it finds the best threshold only when the metric is roughly
/// unimodal in that direction.
#[derive(Debug)]
pub struct ThresholdSweep {
    config: ThresholdSweepConfig,
    base_name: String,
    /// Next threshold to evaluate; `None` once stepping past `u64::MAX`.
    next: Option<u64>,
    tracker: BestTracker,
    best: Option<ThresholdRun>,
    runs: Vec<ThresholdRun>,
}

impl ThresholdSweep {
    pub fn new(config: ThresholdSweepConfig, base_name: &str) -> KfResult<Self> {
        config.validate()?;
        Ok(Self {
            next: Some(config.min_threshold),
            tracker: BestTracker::new(config.staleness),
            config,
            base_name: base_name.to_string(),
            best: None,
            runs: Vec::new(),
        })
    }

    pub fn is_finished(&self) -> bool {
        self.tracker.is_stale()
            || self
                .next
                .map_or(true, |threshold| threshold > self.config.max_threshold)
    }

    /// Evaluate the next threshold. Returns `false` once the sweep has
    /// finished.
    pub fn step<O: Oracle + ?Sized>(
        &mut self,
        evaluator: &mut Evaluator<'_, O>,
        progress: &mut ProgressWriter,
    ) -> KfResult<bool> {
        let Some(threshold) = self.next.filter(|_| !self.is_finished()) else {
            return Ok(false);
        };

        let score = evaluator.evaluate(Invocation::node_threshold(&self.base_name, threshold))?;
        let run = ThresholdRun {
            threshold,
            score: score.score,
            metric_value: score.metric_value,
        };
        self.runs.push(run);

        progress.write(&ProgressRow {
            step: self.runs.len(),
            configuration: threshold.to_string(),
            score: run.score,
            metric_value: run.metric_value,
            best_score: self.tracker.best_score(),
        })?;

        if self.tracker.observe(run.score) {
            self.best = Some(run);
            evaluator.log_message(&format!("New best node threshold: {threshold}"))?;
            evaluator.log_message(&format!(
                "{} (score = {})",
                score.metric.describe(run.metric_value),
                run.score
            ))?;
        }

        self.next = threshold.checked_add(self.config.step);
        Ok(true)
    }

    pub fn run<O: Oracle + ?Sized>(
        mut self,
        evaluator: &mut Evaluator<'_, O>,
        progress: &mut ProgressWriter,
    ) -> KfResult<SweepOutcome> {
        info!(
            "Starting node threshold sweep from {} to {} in steps of {}",
            self.config.min_threshold, self.config.max_threshold, self.config.step
        );
        while self.step(evaluator, progress)? {}

        let outcome = SweepOutcome {
            best: self.best,
            metric: evaluator.metric(),
            runs: self.runs,
        };
        match outcome.best {
            Some(best) => {
                evaluator.log_message(&format!(
                    "The best node threshold is: {}",
                    best.threshold
                ))?;
                evaluator.log_message(&outcome.metric.describe(best.metric_value))?;
            }
            None => evaluator.log_message("No node threshold improved the score")?,
        }
        Ok(outcome)
    }
}
