//! Entry points that wire a search to its ledger, progress log and scorer.

use std::path::Path;

use kf_types::{
    FeatureSearchConfig, Invocation, KfResult, Metric, PipelineSettings, ThresholdSweepConfig,
};

use crate::features::{FeatureSearch, FeatureSearchOutcome, FeatureUniverse};
use crate::ledger::ExecutionLedger;
use crate::nodes::{SweepOutcome, ThresholdSweep};
use crate::oracle::{Evaluator, Oracle};
use crate::progress::{ProgressWriter, FEATURES_LOG, NODES_LOG};
use crate::scorer::Scorer;

/// Result of a single cross-validation.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossValidationOutcome {
    pub model_fields: Vec<String>,
    pub metric: Metric,
    pub metric_value: f64,
}

/// Evaluate one model configuration across the folds. An empty
/// `model_fields` lets the evaluator use every input field.
pub fn run_cross_validation<O: Oracle + ?Sized>(
    output_dir: &Path,
    oracle: &mut O,
    settings: &PipelineSettings,
    model_fields: &[String],
    resume: bool,
) -> KfResult<CrossValidationOutcome> {
    settings.validate()?;

    let mut ledger = ExecutionLedger::open(output_dir, resume)?;
    ledger.log_message("Creating the kfold evaluations")?;

    let scorer = Scorer::new(0.0).with_category(settings.optimize_category.clone());
    let mut evaluator = Evaluator::new(oracle, &mut ledger, scorer, settings.optimize);
    let invocation = Invocation::features(&settings.name, 0, model_fields.to_vec());
    let score = evaluator.evaluate(invocation)?;
    evaluator.log_message(&score.metric.describe(score.metric_value))?;

    Ok(CrossValidationOutcome {
        model_fields: model_fields.to_vec(),
        metric: score.metric,
        metric_value: score.metric_value,
    })
}

/// Find the feature subset of `available_fields` that maximizes the
/// penalized score. With `resume`, calls recorded in `output_dir` by an
/// earlier run are replayed instead of executed.
pub fn run_feature_search<O: Oracle + ?Sized>(
    output_dir: &Path,
    oracle: &mut O,
    available_fields: &[String],
    settings: &PipelineSettings,
    config: &FeatureSearchConfig,
    resume: bool,
) -> KfResult<FeatureSearchOutcome> {
    settings.validate()?;
    config.validate()?;
    let universe = FeatureUniverse::new(
        available_fields,
        &settings.objective_field,
        &config.excluded_features,
    )?;

    let mut ledger = ExecutionLedger::open(output_dir, resume)?;
    ledger.log_message("Creating the best features set")?;
    let mut progress = ProgressWriter::features(output_dir.join(FEATURES_LOG))?;

    let scorer = Scorer::new(config.penalty).with_category(settings.optimize_category.clone());
    let mut evaluator = Evaluator::new(oracle, &mut ledger, scorer, settings.optimize);
    FeatureSearch::new(universe, config, &settings.name).run(&mut evaluator, &mut progress)
}

/// Sweep node thresholds upward and report the best one.
pub fn run_threshold_sweep<O: Oracle + ?Sized>(
    output_dir: &Path,
    oracle: &mut O,
    settings: &PipelineSettings,
    config: &ThresholdSweepConfig,
    resume: bool,
) -> KfResult<SweepOutcome> {
    settings.validate()?;
    let sweep = ThresholdSweep::new(config.clone(), &settings.name)?;

    let mut ledger = ExecutionLedger::open(output_dir, resume)?;
    ledger.log_message("Creating the node threshold set")?;
    let mut progress = ProgressWriter::nodes(output_dir.join(NODES_LOG))?;

    let scorer = Scorer::new(config.penalty).with_category(settings.optimize_category.clone());
    let mut evaluator = Evaluator::new(oracle, &mut ledger, scorer, settings.optimize);
    sweep.run(&mut evaluator, &mut progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LEDGER_FILE;
    use crate::testing::FakeOracle;
    use kf_types::{ConfigError, Configuration, KfError, Metric, OracleError};

    fn fields() -> Vec<String> {
        ["age", "income", "tenure", "plan", "churn"]
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    fn settings() -> PipelineSettings {
        PipelineSettings::new("churn", "out/test/dataset_gen").with_metric(Metric::Accuracy)
    }

    fn churn_oracle() -> FakeOracle {
        FakeOracle::accuracy(|configuration| match configuration {
            Configuration::Features(features) => {
                let mut accuracy = 0.6;
                for feature in features {
                    accuracy += match feature.as_str() {
                        "tenure" => 0.15,
                        "plan" => 0.05,
                        _ => -0.02,
                    };
                }
                accuracy
            }
            Configuration::NodeThreshold(threshold) => {
                0.9 - ((*threshold as f64 - 203.0) / 1000.0).abs()
            }
        })
    }

    #[test]
    fn replaying_a_completed_search_issues_no_calls() {
        let dir = tempfile::tempdir().unwrap();
        let config = FeatureSearchConfig::default();

        let mut first = churn_oracle();
        let expected =
            run_feature_search(dir.path(), &mut first, &fields(), &settings(), &config, false)
                .unwrap();
        assert_eq!(expected.best_features, vec!["tenure", "plan"]);
        assert!(!first.executed.is_empty());

        let mut second = churn_oracle();
        let replayed = run_feature_search(
            dir.path(),
            &mut second,
            &fields(),
            &settings().with_name("KFold_later"),
            &config,
            true,
        )
        .unwrap();
        assert!(second.executed.is_empty());
        assert_eq!(second.reconciles, 1);
        assert_eq!(second.fetched, first.fetched);
        assert_eq!(replayed, expected);
    }

    #[test]
    fn interrupted_search_resumes_where_it_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let config = FeatureSearchConfig::default();

        let reference_dir = tempfile::tempdir().unwrap();
        let mut reference = churn_oracle();
        let expected = run_feature_search(
            reference_dir.path(),
            &mut reference,
            &fields(),
            &settings(),
            &config,
            false,
        )
        .unwrap();

        let mut crashing = churn_oracle();
        crashing.fail_after = Some(3);
        let err = run_feature_search(
            dir.path(),
            &mut crashing,
            &fields(),
            &settings(),
            &config,
            false,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            KfError::Oracle(OracleError::ExecutionFailed { .. })
        ));
        let recorded = std::fs::read_to_string(dir.path().join(LEDGER_FILE)).unwrap();
        assert_eq!(recorded.lines().count(), 4);

        let mut resumed = churn_oracle();
        let outcome =
            run_feature_search(dir.path(), &mut resumed, &fields(), &settings(), &config, true)
                .unwrap();
        assert_eq!(resumed.reconciles, 1);
        assert_eq!(resumed.executed.len(), reference.executed.len() - 4);
        assert_eq!(resumed.executed[..], reference.executed[4..]);
        assert_eq!(outcome, expected);
    }

    #[test]
    fn replaying_a_completed_sweep_issues_no_calls() {
        let dir = tempfile::tempdir().unwrap();
        let config = ThresholdSweepConfig::new(2000).with_range(3, 2000, 100);

        let mut first = churn_oracle();
        let expected = run_threshold_sweep(dir.path(), &mut first, &settings(), &config, false)
            .unwrap();
        assert_eq!(expected.best_threshold(), Some(203));

        let mut second = churn_oracle();
        let replayed = run_threshold_sweep(dir.path(), &mut second, &settings(), &config, true)
            .unwrap();
        assert!(second.executed.is_empty());
        assert_eq!(second.reconciles, 1);
        assert_eq!(replayed, expected);
    }

    #[test]
    fn cross_validation_is_a_single_recorded_call() {
        let dir = tempfile::tempdir().unwrap();
        let model_fields = vec!["tenure".to_string(), "plan".to_string()];

        let mut first = churn_oracle();
        let outcome =
            run_cross_validation(dir.path(), &mut first, &settings(), &model_fields, false)
                .unwrap();
        assert_eq!(first.executed, vec![Configuration::Features(model_fields.clone())]);
        assert_eq!(outcome.metric, Metric::Accuracy);
        assert!((outcome.metric_value - 0.8).abs() < 1e-9);

        let session =
            std::fs::read_to_string(dir.path().join(crate::ledger::SESSION_FILE)).unwrap();
        assert!(session.contains("Creating the kfold evaluations"));
        assert!(session.contains("Accuracy = 80.00%"));

        let mut second = churn_oracle();
        let replayed =
            run_cross_validation(dir.path(), &mut second, &settings(), &model_fields, true)
                .unwrap();
        assert!(second.executed.is_empty());
        assert_eq!(second.reconciles, 1);
        assert_eq!(replayed, outcome);
    }

    #[test]
    fn configuration_errors_leave_the_ledger_alone() {
        let dir = tempfile::tempdir().unwrap();
        let config = FeatureSearchConfig::default().with_excluded(vec!["height".to_string()]);
        let mut oracle = churn_oracle();

        let err = run_feature_search(
            dir.path(),
            &mut oracle,
            &fields(),
            &settings(),
            &config,
            false,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            KfError::Config(ConfigError::UnknownField { .. })
        ));
        assert!(!dir.path().join(LEDGER_FILE).exists());
        assert!(oracle.executed.is_empty());
    }

    #[test]
    fn session_log_reports_the_result() {
        let dir = tempfile::tempdir().unwrap();
        let mut oracle = churn_oracle();
        run_feature_search(
            dir.path(),
            &mut oracle,
            &fields(),
            &settings(),
            &FeatureSearchConfig::default(),
            false,
        )
        .unwrap();

        let session =
            std::fs::read_to_string(dir.path().join(crate::ledger::SESSION_FILE)).unwrap();
        assert!(session.contains("Creating the best features set"));
        assert!(session.contains("New best state: tenure"));
        assert!(session.contains("The best feature subset is: tenure, plan"));
        assert!(session.contains("Accuracy = 80.00%"));
        assert!(session.contains("feature subsets"));
    }
}
