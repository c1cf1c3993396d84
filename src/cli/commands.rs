//! Command implementations for the intent-router CLI.

use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use log::info;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::router::persist;
use crate::router::training_data::echo_intent;
use crate::router::{GateOverrides, IntentsFile, Router, RouterConfig};

/// Execute a CLI command.
pub fn execute_command(args: IntentRouterArgs) -> Result<()> {
    match &args.command {
        Command::Train(train_args) => train_router(train_args, &args),
        Command::Route(route_args) => route_texts(route_args, &args),
        Command::Inspect(inspect_args) => inspect_artifact(inspect_args, &args),
    }
}

fn load_config(path: Option<&Path>) -> Result<RouterConfig> {
    match path {
        Some(path) => RouterConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(RouterConfig::default()),
    }
}

fn load_intents(path: &Path) -> Result<IntentsFile> {
    IntentsFile::from_file(path)
        .with_context(|| format!("failed to read intents file {}", path.display()))
}

/// Train a router from an intents file and save it.
fn train_router(args: &TrainArgs, cli_args: &IntentRouterArgs) -> Result<()> {
    if args.output.exists() && !args.force {
        bail!(
            "{} already exists. Use --force to overwrite.",
            args.output.display()
        );
    }

    let config = load_config(args.config.as_deref())?;
    let intents = load_intents(&args.intents)?;

    let start_time = Instant::now();
    let mut router = Router::with_config(config);
    intents.apply(&mut router)?;
    router.train().context("training failed")?;
    router
        .save(&args.output)
        .with_context(|| format!("failed to save {}", args.output.display()))?;
    let duration = start_time.elapsed();

    let size_bytes = fs::metadata(&args.output)?.len();
    info!("wrote {size_bytes} bytes in {}ms", duration.as_millis());

    output_result(
        "Router trained successfully",
        &TrainingSummary {
            artifact: args.output.to_string_lossy().to_string(),
            examples: router.examples().len(),
            classes: router.classes(),
            rules: router.rules().len(),
            size_bytes,
            duration_ms: duration.as_millis() as u64,
        },
        cli_args,
    )?;

    Ok(())
}

/// Route utterances through a saved router.
fn route_texts(args: &RouteArgs, cli_args: &IntentRouterArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let mut router = Router::from_artifact(&args.model, config)
        .with_context(|| format!("failed to load {}", args.model.display()))?;

    let intents = match &args.intents {
        Some(path) => load_intents(path)?,
        None => IntentsFile::default(),
    };
    intents.apply_handlers(&mut router);
    for class in router.classes() {
        if !router.has_handler(&class) {
            router.register_handler(class, echo_intent);
        }
    }
    for rule in router.rules() {
        if !router.has_handler(&rule.intent) {
            router.register_handler(rule.intent, echo_intent);
        }
    }

    let overrides = GateOverrides {
        proba_min: args.proba_min,
        sim_min: args.sim_min,
        margin_min: args.margin_min,
    };

    let routes = args
        .texts
        .iter()
        .map(|text| {
            router
                .route_with(text, &overrides)
                .map(|result| RouteReport {
                    text: text.clone(),
                    result,
                })
                .with_context(|| format!("failed to route '{text}'"))
        })
        .collect::<Result<Vec<_>>>()?;

    output_result(
        "Routing results",
        &RouteReports {
            routes,
            explain: args.explain,
        },
        cli_args,
    )?;

    Ok(())
}

/// Show the summary of a saved artifact.
fn inspect_artifact(args: &InspectArgs, cli_args: &IntentRouterArgs) -> Result<()> {
    let size_bytes = fs::metadata(&args.model)
        .with_context(|| format!("cannot access {}", args.model.display()))?
        .len();

    let (info, rule_list) = if args.rules {
        let artifact = persist::read_artifact(&args.model)?;
        (artifact.info, Some(artifact.rules))
    } else {
        (persist::read_info(&args.model)?, None)
    };

    output_result(
        "Artifact information",
        &InspectReport {
            artifact: args.model.to_string_lossy().to_string(),
            size_bytes,
            info,
            rule_list,
        },
        cli_args,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::Parser;
    use tempfile::{NamedTempFile, TempDir};

    use super::*;

    const INTENTS: &str = r#"{
        "intents": [
            {"name": "saludo", "examples": ["hola", "buenas tardes", "buenos dias", "que tal"]},
            {"name": "precio", "examples": ["cuanto cuesta", "que precio tiene", "el precio del plan", "cuanto vale"]}
        ],
        "rules": [{"pattern": "\\bhola\\b", "intent": "saludo"}]
    }"#;

    fn intents_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(INTENTS.as_bytes()).unwrap();
        file
    }

    fn run(argv: &[&str]) -> Result<()> {
        execute_command(IntentRouterArgs::try_parse_from(argv.iter().copied())?)
    }

    #[test]
    fn test_train_route_inspect() {
        let dir = TempDir::new().unwrap();
        let artifact = dir.path().join("router.bin");
        let artifact = artifact.to_str().unwrap();
        let intents = intents_file();
        let intents = intents.path().to_str().unwrap();

        run(&["intent-router", "-q", "train", "--intents", intents, "--output", artifact])
            .unwrap();
        assert!(Path::new(artifact).exists());

        // Refuses to overwrite without --force.
        assert!(
            run(&["intent-router", "-q", "train", "--intents", intents, "--output", artifact])
                .is_err()
        );

        run(&["intent-router", "-f", "json", "route", "--model", artifact, "hola"]).unwrap();
        run(&["intent-router", "-q", "inspect", "--model", artifact, "--rules"]).unwrap();
    }

    #[test]
    fn test_missing_artifact() {
        assert!(run(&["intent-router", "inspect", "--model", "/nonexistent/router.bin"]).is_err());
    }
}
