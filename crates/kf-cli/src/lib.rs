//! # kf-cli
//!
//! Runs k-fold searches against an external evaluator program.

mod command;

pub use command::{model_option_args, CommandOracle, EVALUATION_FILE};
