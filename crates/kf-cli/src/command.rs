//! Oracle backed by an external evaluator program.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use kf_search::Oracle;
use kf_types::{
    Configuration, EvaluationResult, Invocation, KfResult, ModelOptions, OracleError,
    PipelineSettings,
};
use tracing::{debug, info};

/// File the evaluator writes into each invocation's output directory.
pub const EVALUATION_FILE: &str = "evaluation.json";

/// Spawns the evaluator once per invocation and reads back the
/// `evaluation.json` it leaves in `<output_root>/<label>`.
#[derive(Debug, Clone)]
pub struct CommandOracle {
    program: PathBuf,
    settings: PipelineSettings,
    output_root: PathBuf,
}

impl CommandOracle {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        program: P,
        settings: PipelineSettings,
        output_root: Q,
    ) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            settings,
            output_root: output_root.as_ref().to_path_buf(),
        }
    }

    pub fn output_dir(&self, invocation: &Invocation) -> PathBuf {
        self.output_root.join(&invocation.label)
    }

    /// Evaluator arguments for `invocation`.
    pub fn arguments(&self, invocation: &Invocation) -> Vec<String> {
        let datasets = self.settings.datasets.display().to_string();
        let output_dir = self.output_dir(invocation).display().to_string();

        match &invocation.configuration {
            Configuration::Features(features) => {
                let mut args = vec![
                    "--datasets".to_string(),
                    datasets,
                    "--output-dir".to_string(),
                    output_dir,
                    "--dataset-off".to_string(),
                    "--evaluate".to_string(),
                    "--name".to_string(),
                    invocation.name.clone(),
                ];
                if !features.is_empty() {
                    args.push("--model-fields".to_string());
                    args.push(features.join(","));
                }
                args.push("--objective".to_string());
                args.push(self.settings.objective_field.clone());
                args.extend(model_option_args(&self.settings.model_options));
                args
            }
            Configuration::NodeThreshold(threshold) => vec![
                "--datasets".to_string(),
                datasets,
                "--node-threshold".to_string(),
                threshold.to_string(),
                "--output-dir".to_string(),
                output_dir,
                "--dataset-off".to_string(),
                "--evaluate".to_string(),
                "--objective".to_string(),
                self.settings.objective_field.clone(),
            ],
        }
    }

    fn run(&self, args: &[String]) -> KfResult<()> {
        debug!("Running {} {}", self.program.display(), args.join(" "));
        let status = Command::new(&self.program)
            .args(args)
            .status()
            .map_err(|err| OracleError::ExecutionFailed {
                message: format!("could not start {}: {err}", self.program.display()),
            })?;
        if !status.success() {
            return Err(OracleError::ExecutionFailed {
                message: format!("{} exited with {status}", self.program.display()),
            }
            .into());
        }
        Ok(())
    }
}

impl Oracle for CommandOracle {
    fn execute(&mut self, invocation: &Invocation) -> KfResult<()> {
        info!("Evaluating {}", invocation.configuration);
        let args = self.arguments(invocation);
        self.run(&args)
    }

    fn reconcile(&mut self) -> KfResult<()> {
        info!("Asking the evaluator to finish interrupted work");
        self.run(&["--resume".to_string()])
    }

    fn evaluation(&mut self, invocation: &Invocation) -> KfResult<EvaluationResult> {
        let path = self.output_dir(invocation).join(EVALUATION_FILE);
        let contents =
            fs::read_to_string(&path).map_err(|err| OracleError::EvaluationUnreadable {
                path: path.clone(),
                message: err.to_string(),
            })?;
        let evaluation =
            serde_json::from_str(&contents).map_err(|err| OracleError::MalformedEvaluation {
                message: format!("{}: {err}", path.display()),
            })?;
        Ok(evaluation)
    }
}

/// Model-family flags. Ensemble options are only emitted for ensembles.
pub fn model_option_args(options: &ModelOptions) -> Vec<String> {
    let mut args = Vec::new();
    let mut push = |flag: &str, value: Option<String>| {
        args.push(flag.to_string());
        args.extend(value);
    };

    if options.balance {
        push("--balance", None);
    }
    if options.missing_splits {
        push("--missing-splits", None);
    }
    if let Some(pruning) = &options.pruning {
        push("--pruning", Some(pruning.clone()));
    }
    if let Some(weight_field) = &options.weight_field {
        push("--weight-field", Some(weight_field.clone()));
    }
    if let Some(objective_weights) = &options.objective_weights {
        push("--objective-weights", Some(objective_weights.clone()));
    }
    if let Some(tlp) = options.tlp {
        push("--tlp", Some(tlp.to_string()));
    }
    if let Some(model_attributes) = &options.model_attributes {
        push("--model-attributes", Some(model_attributes.clone()));
    }
    if options.is_ensemble() {
        push(
            "--number-of-models",
            Some(options.number_of_models.to_string()),
        );
        if options.sample_rate < 1.0 {
            push("--sample-rate", Some(options.sample_rate.to_string()));
        }
        if options.replacement {
            push("--replacement", None);
        }
        if options.randomize {
            push("--randomize", None);
        }
        if let Some(ensemble_attributes) = &options.ensemble_attributes {
            push("--ensemble-attributes", Some(ensemble_attributes.clone()));
        }
    }
    args
}
