//! Result rendering for the steward CLI.

use colored::Colorize;
use serde::Serialize;

use steward_core::Outcome;

/// Output format selected on the command line.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unserializable: {e}>"))
}

/// Prints a reconcile outcome.
pub fn print_outcome<T: Serialize>(outcome: &Outcome<T>, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", pretty(outcome)),
        OutputFormat::Text => {
            let marker = if outcome.changed {
                "changed".yellow().bold()
            } else {
                "ok".green().bold()
            };
            println!("{}: {}", marker, outcome.message);
            if outcome.changed {
                if let Some(before) = &outcome.before {
                    println!("{}\n{}", "--- before".dimmed(), pretty(before));
                }
                if let Some(after) = &outcome.after {
                    println!("{}\n{}", "+++ after".dimmed(), pretty(after));
                }
            }
        }
    }
}

/// Prints an arbitrary serializable result (info listings, execution
/// outcomes).
pub fn print_value<T: Serialize>(value: &T, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Text => println!("{}", pretty(value)),
    }
}

/// Prints a listing with a count header in text mode.
pub fn print_list<T: Serialize>(items: &[T], noun: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", pretty(&items)),
        OutputFormat::Text => {
            println!("{}", format!("{} {}(s)", items.len(), noun).bold());
            println!("{}", pretty(&items));
        }
    }
}
