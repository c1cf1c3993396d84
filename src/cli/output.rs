//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::cli::args::{IntentRouterArgs, OutputFormat};
use crate::error::Result;
use crate::router::{ArtifactInfo, RouteResult, RuleSource};

/// Result structure for training.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub artifact: String,
    pub examples: usize,
    pub classes: Vec<String>,
    pub rules: usize,
    pub size_bytes: u64,
    pub duration_ms: u64,
}

/// One routed utterance.
#[derive(Debug, Serialize, Deserialize)]
pub struct RouteReport {
    pub text: String,
    #[serde(flatten)]
    pub result: RouteResult,
}

/// Result structure for routing.
#[derive(Debug, Serialize, Deserialize)]
pub struct RouteReports {
    pub routes: Vec<RouteReport>,
    /// Print classifier signals in human output.
    #[serde(skip)]
    pub explain: bool,
}

/// Result structure for artifact inspection.
#[derive(Debug, Serialize, Deserialize)]
pub struct InspectReport {
    pub artifact: String,
    pub size_bytes: u64,
    #[serde(flatten)]
    pub info: ArtifactInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_list: Option<Vec<RuleSource>>,
}

/// Human-readable rendering of a command result.
pub trait HumanOutput {
    fn print_human(&self, args: &IntentRouterArgs);
}

impl HumanOutput for TrainingSummary {
    fn print_human(&self, _args: &IntentRouterArgs) {
        println!("Artifact: {}", self.artifact);
        println!("Examples: {}", self.examples);
        println!("Intents: {}", self.classes.join(", "));
        println!("Rules: {}", self.rules);
        println!("Size: {}", format_bytes(self.size_bytes));
        println!("Training time: {}ms", self.duration_ms);
    }
}

impl HumanOutput for RouteReports {
    fn print_human(&self, _args: &IntentRouterArgs) {
        for report in &self.routes {
            let result = &report.result;
            println!("> {}", report.text);
            println!("  intent: {} ({:.3})", result.intent, result.score);
            if let Some(reason) = &result.reason {
                println!("  reason: {reason}");
            }
            println!("  output: {}", result.output);

            if self.explain
                && let Some(signals) = &result.signals
            {
                let margin = signals
                    .margin
                    .map(|m| format!("{m:.3}"))
                    .unwrap_or_else(|| "n/a".to_string());
                println!(
                    "  signals: p={:.3} margin={} sim={:.3} class_sim={:.3}",
                    signals.probability,
                    margin,
                    signals.similarity.global,
                    signals.similarity.same_class
                );
            }
        }
    }
}

impl HumanOutput for InspectReport {
    fn print_human(&self, _args: &IntentRouterArgs) {
        let info = &self.info;
        println!("Artifact: {} ({})", self.artifact, format_bytes(self.size_bytes));
        println!("Created: {}", info.created_at.to_rfc3339());
        println!("Written by: intent-router {}", info.crate_version);
        println!("Intents ({}): {}", info.classes.len(), info.classes.join(", "));
        println!("Examples: {}", info.examples);
        println!("Vocabulary: {} terms", info.vocabulary_size);
        println!("Rules: {}", info.rules);

        if let Some(rules) = &self.rule_list {
            for (i, rule) in rules.iter().enumerate() {
                let flags = if rule.case_insensitive { " (i)" } else { "" };
                println!("  {}. /{}/{} -> {}", i + 1, rule.pattern, flags, rule.intent);
            }
        }
    }
}

/// Output a result in the specified format.
pub fn output_result<T>(message: &str, result: &T, args: &IntentRouterArgs) -> Result<()>
where
    T: Serialize + HumanOutput,
{
    match args.output_format {
        OutputFormat::Human => {
            if args.verbosity() > 1 {
                println!("{message}");
                println!();
            }
            result.print_human(args);
            Ok(())
        }
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &IntentRouterArgs) -> Result<()> {
    println!("{}", to_json(result, args.pretty)?);
    Ok(())
}

fn to_json<T: Serialize>(result: &T, pretty: bool) -> Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    })
}

/// Format bytes into human-readable format.
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    let unit = UNITS[unit_index];
    if unit_index == 0 {
        format!("{bytes} {unit}")
    } else {
        format!("{size:.1} {unit}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1048576), "1.0 MB");
    }

    #[test]
    fn test_route_report_json_is_flat() {
        let report = RouteReport {
            text: "hola".to_string(),
            result: RouteResult {
                intent: "saludo".to_string(),
                score: 1.0,
                output: "¡Hola!".to_string(),
                reason: None,
                signals: None,
            },
        };

        let json = to_json(&report, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["text"], "hola");
        assert_eq!(value["intent"], "saludo");
        assert_eq!(value["score"], 1.0);
    }

    #[test]
    fn test_explain_flag_not_serialized() {
        let reports = RouteReports {
            routes: Vec::new(),
            explain: true,
        };
        let json = to_json(&reports, true).unwrap();
        assert!(!json.contains("explain"));
        assert!(json.contains("routes"));
    }
}
