//! Conversion of raw evaluations into a single comparable objective.

use kf_types::{EvaluationResult, KfResult, Metric, MetricError};

/// Objective computed for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    /// Penalized objective; higher is always better.
    pub score: f64,
    /// Unmodified fold-averaged metric, for reporting.
    pub metric_value: f64,
    /// Metric actually read: the requested one or the r-squared fallback.
    pub metric: Metric,
}

/// Scores evaluations against a fixed category filter and complexity penalty.
#[derive(Debug, Clone, PartialEq)]
pub struct Scorer {
    category: Option<String>,
    penalty: f64,
}

impl Scorer {
    pub fn new(penalty: f64) -> Self {
        Self {
            category: None,
            penalty,
        }
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }

    /// Score `evaluation` for `metric`, charging `penalty` per unit of
    /// `complexity`.
    ///
    /// Complexity always lowers the score: maximized metrics lose
    /// `penalty * complexity` directly and minimized metrics are negated
    /// before the same deduction.
    pub fn score(
        &self,
        evaluation: &EvaluationResult,
        metric: Metric,
        complexity: f64,
    ) -> KfResult<Score> {
        let view = evaluation.view(self.category.as_deref());
        let (resolved, metric_value) = match view.average(metric) {
            Some(value) => (metric, value),
            None => match view.average(Metric::RSquared) {
                Some(value) => (Metric::RSquared, value),
                None => {
                    return Err(MetricError::Unresolved {
                        requested: metric.to_string(),
                    }
                    .into())
                }
            },
        };

        let invert = metric.direction().sign();
        let score = invert * (metric_value - invert * self.penalty * complexity);

        Ok(Score {
            score,
            metric_value,
            metric: resolved,
        })
    }
}
