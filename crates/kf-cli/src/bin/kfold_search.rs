use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use kf_cli::CommandOracle;
use kf_search::{run_cross_validation, run_feature_search, run_threshold_sweep};
use kf_types::{RunConfig, SearchMode};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let run_file = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("KFOLD_RUN_FILE").ok())
        .map(PathBuf::from)
        .context("usage: kfold-search <run.json> (or set KFOLD_RUN_FILE)")?;

    let contents = fs::read_to_string(&run_file)
        .with_context(|| format!("failed to read run file {}", run_file.display()))?;
    let run: RunConfig = serde_json::from_str(&contents)
        .with_context(|| format!("invalid run file {}", run_file.display()))?;
    run.validate()?;
    info!("Loaded run {} from {}", run.pipeline.name, run_file.display());

    match &run.search {
        SearchMode::CrossValidation { model_fields } => {
            let mut oracle = CommandOracle::new(
                &run.evaluator,
                run.pipeline.clone(),
                run.output_dir.join("kfold"),
            );
            let outcome = run_cross_validation(
                &run.output_dir,
                &mut oracle,
                &run.pipeline,
                model_fields,
                run.resume,
            )?;
            println!("{}", outcome.metric.describe(outcome.metric_value));
        }
        SearchMode::Features { fields, config } => {
            let mut oracle = CommandOracle::new(
                &run.evaluator,
                run.pipeline.clone(),
                run.output_dir.join("kfold"),
            );
            let outcome = run_feature_search(
                &run.output_dir,
                &mut oracle,
                fields,
                &run.pipeline,
                config,
                run.resume,
            )?;
            println!("The best feature subset is: {}", outcome.best_features.join(", "));
            println!("{}", outcome.metric.describe(outcome.best_metric_value));
            println!(
                "Evaluated {}/{} feature subsets",
                outcome.evaluated, outcome.subset_count
            );
        }
        SearchMode::NodeThreshold(sweep) => {
            let mut oracle = CommandOracle::new(
                &run.evaluator,
                run.pipeline.clone(),
                run.output_dir.join("node_th"),
            );
            let outcome = run_threshold_sweep(
                &run.output_dir,
                &mut oracle,
                &run.pipeline,
                sweep,
                run.resume,
            )?;
            match outcome.best {
                Some(best) => {
                    println!("The best node threshold is: {}", best.threshold);
                    println!("{}", outcome.metric.describe(best.metric_value));
                }
                None => println!("No node threshold improved the score"),
            }
        }
    }

    Ok(())
}
