//! Evaluation metrics the searches can optimize.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ConfigError;

/// Whether lower or higher raw metric values are better.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveDirection {
    Maximize,
    Minimize,
}

impl ObjectiveDirection {
    /// Sign applied to raw metric values so that higher scores are always better.
    pub fn sign(self) -> f64 {
        match self {
            Self::Maximize => 1.0,
            Self::Minimize => -1.0,
        }
    }
}

/// A named evaluation metric, averaged across folds by the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Accuracy,
    Precision,
    Recall,
    Phi,
    FMeasure,
    MeanSquaredError,
    MeanAbsoluteError,
    RSquared,
}

impl Default for Metric {
    fn default() -> Self {
        Self::Accuracy
    }
}

impl Metric {
    pub const ALL: [Metric; 8] = [
        Metric::Accuracy,
        Metric::Precision,
        Metric::Recall,
        Metric::Phi,
        Metric::FMeasure,
        Metric::MeanSquaredError,
        Metric::MeanAbsoluteError,
        Metric::RSquared,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Accuracy => "accuracy",
            Self::Precision => "precision",
            Self::Recall => "recall",
            Self::Phi => "phi",
            Self::FMeasure => "f_measure",
            Self::MeanSquaredError => "mean_squared_error",
            Self::MeanAbsoluteError => "mean_absolute_error",
            Self::RSquared => "r_squared",
        }
    }

    /// Key of the fold-averaged value in an evaluation payload.
    pub fn average_key(self) -> String {
        format!("average_{}", self.name())
    }

    /// Error measures are minimized, everything else is maximized.
    pub fn direction(self) -> ObjectiveDirection {
        match self {
            Self::MeanSquaredError | Self::MeanAbsoluteError => ObjectiveDirection::Minimize,
            _ => ObjectiveDirection::Maximize,
        }
    }

    pub fn is_percentage(self) -> bool {
        matches!(self, Self::Accuracy | Self::Precision | Self::Recall)
    }

    /// Human-readable rendering of a raw value, e.g. `Accuracy = 93.50%`.
    pub fn describe(self, value: f64) -> String {
        let label = capitalize(self.name());
        if self.is_percentage() {
            format!("{label} = {:.2}%", value * 100.0)
        } else {
            format!("{label} = {value:.6}")
        }
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|metric| metric.name() == s)
            .ok_or_else(|| ConfigError::UnknownMetric {
                name: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_measures_are_minimized() {
        assert_eq!(
            Metric::MeanSquaredError.direction(),
            ObjectiveDirection::Minimize
        );
        assert_eq!(
            Metric::MeanAbsoluteError.direction(),
            ObjectiveDirection::Minimize
        );
        assert_eq!(Metric::Accuracy.direction(), ObjectiveDirection::Maximize);
        assert_eq!(Metric::RSquared.direction(), ObjectiveDirection::Maximize);
    }

    #[test]
    fn parses_snake_case_names() {
        assert_eq!("f_measure".parse::<Metric>(), Ok(Metric::FMeasure));
        assert_eq!("r_squared".parse::<Metric>(), Ok(Metric::RSquared));
        assert_eq!(
            "auc".parse::<Metric>(),
            Err(ConfigError::UnknownMetric {
                name: "auc".to_string()
            })
        );
    }

    #[test]
    fn serde_matches_display_name() {
        for metric in Metric::ALL {
            let json = serde_json::to_string(&metric).unwrap();
            assert_eq!(json, format!("\"{}\"", metric.name()));
        }
    }

    #[test]
    fn describe_uses_percentages_for_rates() {
        assert_eq!(Metric::Accuracy.describe(0.935), "Accuracy = 93.50%");
        assert_eq!(Metric::Phi.describe(0.412), "Phi = 0.412000");
        assert_eq!(
            Metric::MeanSquaredError.describe(1.5),
            "Mean_squared_error = 1.500000"
        );
    }

    #[test]
    fn average_key_prefixes_name() {
        assert_eq!(Metric::Accuracy.average_key(), "average_accuracy");
        assert_eq!(Metric::RSquared.average_key(), "average_r_squared");
    }
}
