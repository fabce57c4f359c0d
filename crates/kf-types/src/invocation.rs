//! Oracle invocations and their canonical ledger form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::KfResult;

/// Maximum length of a resource name accepted by the evaluator.
pub const NAME_MAX_LENGTH: usize = 127;

/// The configuration under evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Configuration {
    /// Named feature subset, in feature-universe order.
    Features(Vec<String>),
    /// Scalar node threshold.
    NodeThreshold(u64),
}

impl Configuration {
    /// Complexity charged by the scoring penalty.
    pub fn complexity(&self) -> f64 {
        match self {
            Self::Features(features) => features.len() as f64,
            Self::NodeThreshold(threshold) => *threshold as f64,
        }
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Features(features) => write!(f, "features [{}]", features.join(", ")),
            Self::NodeThreshold(threshold) => write!(f, "node threshold {threshold}"),
        }
    }
}

/// One call to the oracle.
///
/// `label` names the output slot the evaluator writes into, `name` is the
/// resource name handed to it and `issued_at` is when the call was first
/// made. None of those take part in [`Invocation::same_call`]: two runs of
/// the same search produce the same configurations in the same order but
/// generated names and timestamps differ between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub label: String,
    pub name: String,
    pub configuration: Configuration,
    pub issued_at: DateTime<Utc>,
}

impl Invocation {
    /// A feature-subset evaluation; `counter` numbers the subsets in the order
    /// the search issues them.
    pub fn features(base_name: &str, counter: usize, features: Vec<String>) -> Self {
        let suffix = format!("_subset_{counter}");
        let keep = NAME_MAX_LENGTH.saturating_sub(suffix.len());
        let base: String = base_name.chars().take(keep).collect();
        Self {
            label: format!("kfold{counter}"),
            name: format!("{base}{suffix}"),
            configuration: Configuration::Features(features),
            issued_at: Utc::now(),
        }
    }

    pub fn node_threshold(base_name: &str, threshold: u64) -> Self {
        Self {
            label: format!("node_th{threshold}"),
            name: base_name.chars().take(NAME_MAX_LENGTH).collect(),
            configuration: Configuration::NodeThreshold(threshold),
            issued_at: Utc::now(),
        }
    }

    /// Whether `other` asks the oracle for the same evaluation.
    pub fn same_call(&self, other: &Invocation) -> bool {
        self.configuration == other.configuration
    }

    /// Single-line form stored in the ledger.
    pub fn canonical(&self) -> KfResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_canonical(line: &str) -> KfResult<Self> {
        Ok(serde_json::from_str(line)?)
    }
}
