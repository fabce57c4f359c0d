//! Evaluation payloads returned by the oracle.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::metric::Metric;

/// A cross-validated evaluation as written by the evaluator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    #[serde(default)]
    pub model: MetricSet,
}

/// Aggregate metrics plus optional per-class breakdowns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSet {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub per_class_statistics: Vec<ClassMetrics>,
    /// Every other field; non-numeric ones (confusion matrices etc.) are
    /// kept but never read as metrics.
    #[serde(flatten)]
    pub values: HashMap<String, serde_json::Value>,
}

/// Metrics restricted to one objective class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub class_name: String,
    #[serde(flatten)]
    pub values: HashMap<String, serde_json::Value>,
}

impl MetricSet {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).and_then(serde_json::Value::as_f64)
    }

    pub fn average(&self, metric: Metric) -> Option<f64> {
        self.get(&metric.average_key())
    }
}

impl ClassMetrics {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).and_then(serde_json::Value::as_f64)
    }
}

/// Either the aggregate block or a single class breakdown.
#[derive(Debug, Clone, Copy)]
pub enum MetricView<'a> {
    Aggregate(&'a MetricSet),
    Class(&'a ClassMetrics),
}

impl MetricView<'_> {
    pub fn get(&self, key: &str) -> Option<f64> {
        match self {
            Self::Aggregate(set) => set.get(key),
            Self::Class(class) => class.get(key),
        }
    }

    pub fn average(&self, metric: Metric) -> Option<f64> {
        self.get(&metric.average_key())
    }
}

impl EvaluationResult {
    /// Pick the per-class breakdown for `category` if the evaluation has one,
    /// otherwise fall back to the aggregate metrics.
    pub fn view(&self, category: Option<&str>) -> MetricView<'_> {
        category
            .and_then(|name| {
                self.model
                    .per_class_statistics
                    .iter()
                    .find(|class| class.class_name == name)
            })
            .map(MetricView::Class)
            .unwrap_or(MetricView::Aggregate(&self.model))
    }

    /// Build an aggregate-only evaluation from `(average key, value)` pairs.
    pub fn from_averages<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        let values = pairs
            .into_iter()
            .map(|(key, value)| (key.to_string(), serde_json::json!(value)))
            .collect();
        Self {
            model: MetricSet {
                per_class_statistics: Vec::new(),
                values,
            },
        }
    }
}
