//! The evaluation oracle seam and the ledger-aware evaluator built on it.

use kf_types::{EvaluationResult, Invocation, KfResult, Metric};
use tracing::{debug, warn};

use crate::ledger::ExecutionLedger;
use crate::scorer::{Score, Scorer};

/// External, expensive evaluation service.
///
/// Calls are blocking and strictly sequential; the searches never have more
/// than one outstanding.
pub trait Oracle {
    /// Train and evaluate the invocation's configuration.
    fn execute(&mut self, invocation: &Invocation) -> KfResult<()>;

    /// Finish whatever an interrupted run left half done. Called once, when a
    /// replay consumes the last recorded call.
    fn reconcile(&mut self) -> KfResult<()>;

    /// Read the result of an executed or replayed invocation.
    fn evaluation(&mut self, invocation: &Invocation) -> KfResult<EvaluationResult>;
}

/// Routes every evaluation through the ledger and the scorer.
pub struct Evaluator<'a, O: Oracle + ?Sized> {
    oracle: &'a mut O,
    ledger: &'a mut ExecutionLedger,
    scorer: Scorer,
    metric: Metric,
}

impl<'a, O: Oracle + ?Sized> Evaluator<'a, O> {
    pub fn new(
        oracle: &'a mut O,
        ledger: &'a mut ExecutionLedger,
        scorer: Scorer,
        metric: Metric,
    ) -> Self {
        Self {
            oracle,
            ledger,
            scorer,
            metric,
        }
    }

    /// Metric currently requested. Switches to r-squared for the rest of the
    /// run once an evaluation lacks the requested one.
    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn log_message(&mut self, message: &str) -> KfResult<()> {
        self.ledger.log_message(message)
    }

    pub fn evaluate(&mut self, invocation: Invocation) -> KfResult<Score> {
        let complexity = invocation.configuration.complexity();
        let outcome = self.ledger.invoke(invocation, &mut *self.oracle)?;

        let evaluation = self.oracle.evaluation(outcome.invocation())?;
        let score = self.scorer.score(&evaluation, self.metric, complexity)?;
        debug!(
            "{} -> score {} ({} = {})",
            outcome.invocation().configuration,
            score.score,
            score.metric,
            score.metric_value
        );

        if score.metric != self.metric {
            warn!(
                "Evaluation has no {}; optimizing {} instead",
                self.metric, score.metric
            );
            self.metric = score.metric;
        }
        Ok(score)
    }
}
