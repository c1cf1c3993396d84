//! Command line argument parsing for the intent-router CLI using clap.

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// intent-router - Hybrid rule-based and statistical intent classification
#[derive(Parser, Debug, Clone)]
#[command(name = "intent-router")]
#[command(about = "Train, inspect and query hybrid intent routers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct IntentRouterArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl IntentRouterArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Train a router from an intents file and save the artifact
    Train(TrainArgs),

    /// Route one or more utterances through a saved router
    Route(RouteArgs),

    /// Show what a saved artifact contains
    Inspect(InspectArgs),
}

/// Arguments for training
#[derive(Parser, Debug, Clone)]
pub struct TrainArgs {
    /// Intents file (JSON)
    #[arg(short, long, value_name = "INTENTS_FILE")]
    pub intents: PathBuf,

    /// Router configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Where to write the trained artifact
    #[arg(short, long, value_name = "ARTIFACT")]
    pub output: PathBuf,

    /// Overwrite an existing artifact
    #[arg(long)]
    pub force: bool,
}

/// Arguments for routing
#[derive(Parser, Debug, Clone)]
pub struct RouteArgs {
    /// Saved router artifact
    #[arg(short, long, value_name = "ARTIFACT")]
    pub model: PathBuf,

    /// Intents file providing handler responses and the fallback
    #[arg(short, long, value_name = "INTENTS_FILE")]
    pub intents: Option<PathBuf>,

    /// Router configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Override the minimum calibrated probability
    #[arg(long)]
    pub proba_min: Option<f64>,

    /// Override the minimum similarity
    #[arg(long)]
    pub sim_min: Option<f64>,

    /// Override the minimum decision margin
    #[arg(long, allow_hyphen_values = true)]
    pub margin_min: Option<f64>,

    /// Include classifier signals in human output
    #[arg(long)]
    pub explain: bool,

    /// Utterances to route
    #[arg(value_name = "TEXT", required = true)]
    pub texts: Vec<String>,
}

/// Arguments for artifact inspection
#[derive(Parser, Debug, Clone)]
pub struct InspectArgs {
    /// Saved router artifact
    #[arg(short, long, value_name = "ARTIFACT")]
    pub model: PathBuf,

    /// List the rules as well
    #[arg(short, long)]
    pub rules: bool,
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_train_command() {
        let args = IntentRouterArgs::try_parse_from([
            "intent-router",
            "train",
            "--intents",
            "intents.json",
            "--output",
            "router.bin",
            "--force",
        ])
        .unwrap();

        if let Command::Train(train_args) = args.command {
            assert_eq!(train_args.intents, PathBuf::from("intents.json"));
            assert_eq!(train_args.output, PathBuf::from("router.bin"));
            assert!(train_args.config.is_none());
            assert!(train_args.force);
        } else {
            panic!("Expected Train command");
        }
    }

    #[test]
    fn test_route_command() {
        let args = IntentRouterArgs::try_parse_from([
            "intent-router",
            "route",
            "--model",
            "router.bin",
            "--proba-min",
            "0.7",
            "--margin-min",
            "-0.2",
            "hola",
            "cuanto cuesta",
        ])
        .unwrap();

        if let Command::Route(route_args) = args.command {
            assert_eq!(route_args.model, PathBuf::from("router.bin"));
            assert_eq!(route_args.proba_min, Some(0.7));
            assert_eq!(route_args.margin_min, Some(-0.2));
            assert_eq!(route_args.sim_min, None);
            assert_eq!(route_args.texts, vec!["hola", "cuanto cuesta"]);
        } else {
            panic!("Expected Route command");
        }
    }

    #[test]
    fn test_route_requires_text() {
        assert!(
            IntentRouterArgs::try_parse_from(["intent-router", "route", "--model", "r.bin"])
                .is_err()
        );
    }

    #[test]
    fn test_verbosity_levels() {
        let inspect = ["inspect", "--model", "r.bin"];

        // Default verbosity
        let args = IntentRouterArgs::try_parse_from(
            std::iter::once("intent-router").chain(inspect),
        )
        .unwrap();
        assert_eq!(args.verbosity(), 1);

        // Multiple verbose flags
        let args = IntentRouterArgs::try_parse_from(
            ["intent-router", "-vv"].into_iter().chain(inspect),
        )
        .unwrap();
        assert_eq!(args.verbosity(), 2);

        // Quiet flag
        let args = IntentRouterArgs::try_parse_from(
            ["intent-router", "--quiet"].into_iter().chain(inspect),
        )
        .unwrap();
        assert_eq!(args.verbosity(), 0);
    }

    #[test]
    fn test_output_format() {
        let args = IntentRouterArgs::try_parse_from([
            "intent-router",
            "--format",
            "json",
            "inspect",
            "--model",
            "r.bin",
        ])
        .unwrap();
        assert_eq!(args.output_format, OutputFormat::Json);
    }
}
