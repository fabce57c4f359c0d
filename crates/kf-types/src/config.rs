//! Run configuration for feature searches and node-threshold sweeps.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::errors::ConfigError;
use crate::metric::Metric;

pub const DEFAULT_STALENESS: usize = 5;
/// Per-feature score penalty.
pub const DEFAULT_PENALTY: f64 = 0.001;
/// Per-node score penalty.
pub const DEFAULT_NODES_PENALTY: f64 = 0.0;
pub const DEFAULT_MIN_NODES: u64 = 3;
pub const DEFAULT_NODES_STEP: u64 = 100;

/// Generated resource name used when the caller does not supply one.
pub fn default_run_name() -> String {
    format!("KFold_{}", Utc::now().format("%Y%m%d%H%M%S"))
}

/// Model-family options forwarded unchanged to every evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelOptions {
    pub balance: bool,
    pub missing_splits: bool,
    pub pruning: Option<String>,
    pub weight_field: Option<String>,
    pub objective_weights: Option<String>,
    pub tlp: Option<u32>,
    pub model_attributes: Option<String>,
    pub number_of_models: u32,
    /// Ensemble-only options, ignored for a single model.
    pub sample_rate: f64,
    pub replacement: bool,
    pub randomize: bool,
    pub ensemble_attributes: Option<String>,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            balance: false,
            missing_splits: false,
            pruning: None,
            weight_field: None,
            objective_weights: None,
            tlp: None,
            model_attributes: None,
            number_of_models: 1,
            sample_rate: 1.0,
            replacement: false,
            randomize: false,
            ensemble_attributes: None,
        }
    }
}

impl ModelOptions {
    pub fn is_ensemble(&self) -> bool {
        self.number_of_models > 1
    }
}

/// Settings shared by every evaluation of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    pub objective_field: String,
    /// Reference to the k-fold datasets the evaluator trains on.
    pub datasets: PathBuf,
    #[serde(default = "default_run_name")]
    pub name: String,
    #[serde(default)]
    pub optimize: Metric,
    /// Restrict the metric to one objective class.
    #[serde(default)]
    pub optimize_category: Option<String>,
    #[serde(default)]
    pub model_options: ModelOptions,
}

impl PipelineSettings {
    pub fn new(objective_field: impl Into<String>, datasets: impl Into<PathBuf>) -> Self {
        Self {
            objective_field: objective_field.into(),
            datasets: datasets.into(),
            name: default_run_name(),
            optimize: Metric::default(),
            optimize_category: None,
            model_options: ModelOptions::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.optimize = metric;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.optimize_category = Some(category.into());
        self
    }

    pub fn with_model_options(mut self, options: ModelOptions) -> Self {
        self.model_options = options;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.objective_field.trim().is_empty() {
            return Err(ConfigError::UnknownObjective {
                name: self.objective_field.clone(),
            });
        }
        if !(self.model_options.sample_rate > 0.0 && self.model_options.sample_rate <= 1.0) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "sample rate must be in (0, 1], got {}",
                    self.model_options.sample_rate
                ),
            });
        }
        Ok(())
    }
}

/// Parameters of the best-first feature search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSearchConfig {
    /// Consecutive non-improving iterations tolerated before stopping.
    pub staleness: usize,
    /// Score deduction per included feature.
    pub penalty: f64,
    pub excluded_features: Vec<String>,
}

impl Default for FeatureSearchConfig {
    fn default() -> Self {
        Self {
            staleness: DEFAULT_STALENESS,
            penalty: DEFAULT_PENALTY,
            excluded_features: Vec::new(),
        }
    }
}

impl FeatureSearchConfig {
    pub fn with_staleness(mut self, staleness: usize) -> Self {
        self.staleness = staleness;
        self
    }

    pub fn with_penalty(mut self, penalty: f64) -> Self {
        self.penalty = penalty;
        self
    }

    pub fn with_excluded(mut self, excluded: Vec<String>) -> Self {
        self.excluded_features = excluded;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.staleness == 0 {
            return Err(ConfigError::ZeroStaleness);
        }
        Ok(())
    }
}

/// Parameters of the linear node-threshold sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSweepConfig {
    #[serde(default = "default_min_nodes")]
    pub min_threshold: u64,
    pub max_threshold: u64,
    #[serde(default = "default_nodes_step")]
    pub step: u64,
    #[serde(default = "default_staleness")]
    pub staleness: usize,
    /// Score deduction per node of threshold.
    #[serde(default)]
    pub penalty: f64,
}

fn default_min_nodes() -> u64 {
    DEFAULT_MIN_NODES
}

fn default_nodes_step() -> u64 {
    DEFAULT_NODES_STEP
}

fn default_staleness() -> usize {
    DEFAULT_STALENESS
}

impl ThresholdSweepConfig {
    pub fn new(max_threshold: u64) -> Self {
        Self {
            min_threshold: DEFAULT_MIN_NODES,
            max_threshold,
            step: DEFAULT_NODES_STEP,
            staleness: DEFAULT_STALENESS,
            penalty: DEFAULT_NODES_PENALTY,
        }
    }

    pub fn with_range(mut self, min_threshold: u64, max_threshold: u64, step: u64) -> Self {
        self.min_threshold = min_threshold;
        self.max_threshold = max_threshold;
        self.step = step;
        self
    }

    pub fn with_staleness(mut self, staleness: usize) -> Self {
        self.staleness = staleness;
        self
    }

    pub fn with_penalty(mut self, penalty: f64) -> Self {
        self.penalty = penalty;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.staleness == 0 {
            return Err(ConfigError::ZeroStaleness);
        }
        if self.step == 0 {
            return Err(ConfigError::ZeroStep);
        }
        if self.min_threshold > self.max_threshold {
            return Err(ConfigError::EmptyThresholdRange {
                min: self.min_threshold,
                max: self.max_threshold,
            });
        }
        Ok(())
    }
}

/// Which search a run performs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchMode {
    /// A single cross-validation; empty `model_fields` means every field.
    CrossValidation {
        #[serde(default)]
        model_fields: Vec<String>,
    },
    Features {
        /// Candidate field names in dataset order, objective included.
        fields: Vec<String>,
        #[serde(default)]
        config: FeatureSearchConfig,
    },
    NodeThreshold(ThresholdSweepConfig),
}

/// A complete run description, as loaded from a JSON run file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub output_dir: PathBuf,
    #[serde(default)]
    pub resume: bool,
    /// Program invoked once per evaluation.
    pub evaluator: PathBuf,
    pub pipeline: PipelineSettings,
    pub search: SearchMode,
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pipeline.validate()?;
        match &self.search {
            SearchMode::CrossValidation { .. } => Ok(()),
            SearchMode::Features { config, .. } => config.validate(),
            SearchMode::NodeThreshold(config) => config.validate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_defaults() {
        let config = FeatureSearchConfig::default();
        assert_eq!(config.staleness, 5);
        assert_eq!(config.penalty, 0.001);
        assert!(config.excluded_features.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn sweep_validation() {
        assert_eq!(
            ThresholdSweepConfig::new(1000).with_range(5, 3, 1).validate(),
            Err(ConfigError::EmptyThresholdRange { min: 5, max: 3 })
        );
        assert_eq!(
            ThresholdSweepConfig::new(1000).with_range(3, 10, 0).validate(),
            Err(ConfigError::ZeroStep)
        );
        assert_eq!(
            ThresholdSweepConfig::new(1000).with_staleness(0).validate(),
            Err(ConfigError::ZeroStaleness)
        );
        assert!(ThresholdSweepConfig::new(3).validate().is_ok());
    }

    #[test]
    fn generated_name_has_prefix() {
        let settings = PipelineSettings::new("class", "datasets/kfold");
        assert!(settings.name.starts_with("KFold_"));
        assert_eq!(settings.optimize, Metric::Accuracy);
    }

    #[test]
    fn run_file_with_defaults() {
        let json = r#"{
            "output_dir": "out",
            "evaluator": "/usr/local/bin/evaluate",
            "pipeline": {
                "objective_field": "species",
                "datasets": "out/test/dataset_gen",
                "optimize": "phi"
            },
            "search": {
                "kind": "features",
                "fields": ["sepal length", "petal width", "species"],
                "config": {"staleness": 3}
            }
        }"#;
        let config: RunConfig = serde_json::from_str(json).unwrap();
        assert!(!config.resume);
        assert_eq!(config.pipeline.optimize, Metric::Phi);
        assert!(config.pipeline.name.starts_with("KFold_"));
        assert_eq!(config.pipeline.model_options.number_of_models, 1);
        match &config.search {
            SearchMode::Features { fields, config } => {
                assert_eq!(fields.len(), 3);
                assert_eq!(config.staleness, 3);
                assert_eq!(config.penalty, DEFAULT_PENALTY);
            }
            other => panic!("unexpected search mode: {other:?}"),
        }
        assert!(config.validate().is_ok());
    }

    #[test]
    fn cross_validation_run_file() {
        let json = r#"{
            "output_dir": "out",
            "resume": true,
            "evaluator": "evaluate",
            "pipeline": {"objective_field": "churn", "datasets": "out/test/dataset_gen"},
            "search": {"kind": "cross_validation"}
        }"#;
        let config: RunConfig = serde_json::from_str(json).unwrap();
        assert!(config.resume);
        assert_eq!(
            config.search,
            SearchMode::CrossValidation {
                model_fields: Vec::new()
            }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn run_file_for_sweep() {
        let json = r#"{
            "output_dir": "out",
            "resume": true,
            "evaluator": "evaluate",
            "pipeline": {"objective_field": "price", "datasets": "d"},
            "search": {"kind": "node_threshold", "max_threshold": 2000}
        }"#;
        let config: RunConfig = serde_json::from_str(json).unwrap();
        match &config.search {
            SearchMode::NodeThreshold(sweep) => {
                assert_eq!(sweep.min_threshold, DEFAULT_MIN_NODES);
                assert_eq!(sweep.step, DEFAULT_NODES_STEP);
                assert_eq!(sweep.penalty, DEFAULT_NODES_PENALTY);
            }
            other => panic!("unexpected search mode: {other:?}"),
        }
    }

    #[test]
    fn invalid_sample_rate_rejected() {
        let mut options = ModelOptions::default();
        options.sample_rate = 0.0;
        let settings = PipelineSettings::new("class", "d").with_model_options(options);
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
