//! Best-first search over feature subsets.
//!
//! States are boolean inclusion masks over a [`FeatureUniverse`]. Each
//! iteration closes the best open state and opens every unseen state that
//! differs from it by one feature, evaluating each new state once. The search
//! stops when `staleness` consecutive closed states fail to beat the best by
//! more than [`EPSILON`](crate::EPSILON), or when every subset has been seen.

use std::collections::HashSet;
use std::fmt;

use kf_types::{ConfigError, FeatureSearchConfig, Invocation, KfResult, Metric};
use tracing::{debug, info};

use crate::oracle::{Evaluator, Oracle};
use crate::progress::{ProgressRow, ProgressWriter};
use crate::staleness::BestTracker;

/// Ordered candidate features, objective and exclusions removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureUniverse {
    features: Vec<String>,
}

impl FeatureUniverse {
    /// Build the universe from the available fields in dataset order.
    pub fn new(available: &[String], objective: &str, excluded: &[String]) -> KfResult<Self> {
        if !available.iter().any(|field| field == objective) {
            return Err(ConfigError::UnknownObjective {
                name: objective.to_string(),
            }
            .into());
        }
        if let Some(unknown) = excluded
            .iter()
            .find(|name| !available.iter().any(|field| field == *name))
        {
            return Err(ConfigError::UnknownField {
                name: unknown.clone(),
            }
            .into());
        }

        let features = available
            .iter()
            .filter(|field| field.as_str() != objective && !excluded.contains(*field))
            .cloned()
            .collect();
        Ok(Self { features })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Names of the features included in `state`.
    pub fn select(&self, state: &State) -> Vec<String> {
        self.features
            .iter()
            .zip(state.mask())
            .filter(|(_, included)| **included)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Number of non-empty subsets, `2^n - 1`.
    pub fn subset_count(&self) -> f64 {
        2f64.powi(self.features.len() as i32) - 1.0
    }
}

/// Feature inclusion mask; compared by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct State(Vec<bool>);

impl State {
    pub fn empty(len: usize) -> Self {
        Self(vec![false; len])
    }

    pub fn from_mask(mask: Vec<bool>) -> Self {
        Self(mask)
    }

    pub fn mask(&self) -> &[bool] {
        &self.0
    }

    pub fn included(&self) -> usize {
        self.0.iter().filter(|included| **included).count()
    }

    /// Every state reachable by toggling exactly one feature.
    pub fn neighbors(&self) -> impl Iterator<Item = State> + '_ {
        (0..self.0.len()).map(move |index| {
            let mut child = self.0.clone();
            child[index] = !child[index];
            State(child)
        })
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (index, included) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", u8::from(*included))?;
        }
        f.write_str("]")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredState {
    pub state: State,
    pub score: f64,
    pub metric_value: f64,
}

/// Result of a completed feature search.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSearchOutcome {
    pub best_features: Vec<String>,
    pub best_score: f64,
    pub best_metric_value: f64,
    /// Metric the values refer to.
    pub metric: Metric,
    /// Non-empty subsets evaluated.
    pub evaluated: usize,
    /// Size of the non-empty subset space.
    pub subset_count: f64,
    pub iterations: usize,
}

/// Best-first search state: open frontier, closed states and the best so far.
#[derive(Debug)]
pub struct FeatureSearch {
    universe: FeatureUniverse,
    base_name: String,
    open: Vec<ScoredState>,
    closed: Vec<ScoredState>,
    /// Every state in `open` or `closed`.
    seen: HashSet<State>,
    best: ScoredState,
    tracker: BestTracker,
    iterations: usize,
    counter: usize,
}

impl FeatureSearch {
    /// `base_name` prefixes the resource name of every evaluation.
    pub fn new(universe: FeatureUniverse, config: &FeatureSearchConfig, base_name: &str) -> Self {
        let initial = ScoredState {
            state: State::empty(universe.len()),
            score: f64::NEG_INFINITY,
            metric_value: f64::NEG_INFINITY,
        };
        let mut seen = HashSet::new();
        seen.insert(initial.state.clone());

        Self {
            tracker: BestTracker::starting_at(initial.score, config.staleness),
            universe,
            base_name: base_name.to_string(),
            open: vec![initial.clone()],
            closed: Vec::new(),
            seen,
            best: initial,
            iterations: 0,
            counter: 0,
        }
    }

    pub fn open(&self) -> &[ScoredState] {
        &self.open
    }

    pub fn closed(&self) -> &[ScoredState] {
        &self.closed
    }

    pub fn is_finished(&self) -> bool {
        self.tracker.is_stale() || self.open.is_empty()
    }

    /// Index of the highest-scoring open state; the earliest wins ties.
    fn select_max(&self) -> Option<usize> {
        let mut selected: Option<usize> = None;
        for (index, candidate) in self.open.iter().enumerate() {
            let better = match selected {
                None => true,
                Some(current) => candidate.score > self.open[current].score,
            };
            if better {
                selected = Some(index);
            }
        }
        selected
    }

    /// Close the best open state and expand it. Returns `false` once the
    /// search has finished.
    pub fn step<O: Oracle + ?Sized>(
        &mut self,
        evaluator: &mut Evaluator<'_, O>,
        progress: &mut ProgressWriter,
    ) -> KfResult<bool> {
        if self.is_finished() {
            return Ok(false);
        }
        let Some(index) = self.select_max() else {
            return Ok(false);
        };

        self.iterations += 1;
        let current = self.open.remove(index);
        progress.write(&ProgressRow {
            step: self.iterations,
            configuration: current.state.to_string(),
            score: current.score,
            metric_value: current.metric_value,
            best_score: self.best.score,
        })?;
        self.closed.push(current.clone());

        if self.tracker.observe(current.score) {
            self.best = current.clone();
            let features = self.universe.select(&current.state);
            if !features.is_empty() {
                let metric = evaluator.metric();
                evaluator.log_message(&format!("New best state: {}", features.join(", ")))?;
                evaluator.log_message(&format!(
                    "{} (score = {})",
                    metric.describe(current.metric_value),
                    current.score
                ))?;
            }
        } else {
            debug!(
                "Iteration {} did not improve ({} unchanged)",
                self.iterations,
                self.tracker.unchanged()
            );
        }

        let children: Vec<State> = current
            .state
            .neighbors()
            .filter(|child| !self.seen.contains(child))
            .collect();
        for child in children {
            self.counter += 1;
            let invocation =
                Invocation::features(&self.base_name, self.counter, self.universe.select(&child));
            let score = evaluator.evaluate(invocation)?;
            self.seen.insert(child.clone());
            self.open.push(ScoredState {
                state: child,
                score: score.score,
                metric_value: score.metric_value,
            });
        }
        Ok(true)
    }

    /// Run to completion and report the best subset.
    pub fn run<O: Oracle + ?Sized>(
        mut self,
        evaluator: &mut Evaluator<'_, O>,
        progress: &mut ProgressWriter,
    ) -> KfResult<FeatureSearchOutcome> {
        info!(
            "Starting best-first feature search over {} features",
            self.universe.len()
        );
        while self.step(evaluator, progress)? {}

        let outcome = FeatureSearchOutcome {
            best_features: self.universe.select(&self.best.state),
            best_score: self.best.score,
            best_metric_value: self.best.metric_value,
            metric: evaluator.metric(),
            evaluated: self.open.len() + self.closed.len() - 1,
            subset_count: self.universe.subset_count(),
            iterations: self.iterations,
        };

        evaluator.log_message(&format!(
            "The best feature subset is: {}",
            outcome.best_features.join(", ")
        ))?;
        evaluator.log_message(&outcome.metric.describe(outcome.best_metric_value))?;
        evaluator.log_message(&format!(
            "Evaluated {}/{} feature subsets",
            outcome.evaluated, outcome.subset_count
        ))?;
        Ok(outcome)
    }
}
