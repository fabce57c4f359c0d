//! Scripted oracle for unit tests.

use kf_types::{
    Configuration, EvaluationResult, Invocation, KfResult, Metric, OracleError,
};

use crate::oracle::Oracle;

type Script = Box<dyn FnMut(&Configuration) -> EvaluationResult>;

/// Answers every evaluation from a closure and records what was asked.
pub(crate) struct FakeOracle {
    script: Script,
    pub executed: Vec<Configuration>,
    pub reconciles: usize,
    pub fetched: usize,
    /// Fail the call after this many successful executions.
    pub fail_after: Option<usize>,
}

impl FakeOracle {
    pub fn new(script: impl FnMut(&Configuration) -> EvaluationResult + 'static) -> Self {
        Self {
            script: Box::new(script),
            executed: Vec::new(),
            reconciles: 0,
            fetched: 0,
            fail_after: None,
        }
    }

    /// Accuracy computed from the configuration.
    pub fn accuracy(mut metric: impl FnMut(&Configuration) -> f64 + 'static) -> Self {
        Self::new(move |configuration| averages(Metric::Accuracy, metric(configuration)))
    }

    pub fn constant(accuracy: f64) -> Self {
        Self::accuracy(move |_| accuracy)
    }
}

pub(crate) fn averages(metric: Metric, value: f64) -> EvaluationResult {
    EvaluationResult::from_averages([(metric.average_key().as_str(), value)])
}

impl Oracle for FakeOracle {
    fn execute(&mut self, invocation: &Invocation) -> KfResult<()> {
        if self.fail_after == Some(self.executed.len()) {
            return Err(OracleError::ExecutionFailed {
                message: format!("interrupted at {}", invocation.configuration),
            }
            .into());
        }
        self.executed.push(invocation.configuration.clone());
        Ok(())
    }

    fn reconcile(&mut self) -> KfResult<()> {
        self.reconciles += 1;
        Ok(())
    }

    fn evaluation(&mut self, invocation: &Invocation) -> KfResult<EvaluationResult> {
        self.fetched += 1;
        Ok((self.script)(&invocation.configuration))
    }
}
