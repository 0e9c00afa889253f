//! Steward CLI
//!
//! Declarative state management for Splunk Enterprise Security: findings,
//! investigations, investigation types, notes, response plans, and
//! response-plan executions, reconciled through the Splunk REST API.

use anyhow::{bail, Context, Result};
use clap::builder::PossibleValuesParser;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod config;
mod output;

use config::AppConfig;
use output::{print_list, print_outcome, print_value, OutputFormat};
use steward_client::{
    ExecutionOutcome, ExecutionsApi, FindingFilter, FindingsApi, InvestigationFilter,
    InvestigationTypesApi, InvestigationsApi, NotesApi, ResponsePlansApi, SplunkClient,
};
use steward_core::mapping;
use steward_core::models::finding::{CustomField, Finding};
use steward_core::models::investigation::Investigation;
use steward_core::models::investigation_type::InvestigationTypeSpec;
use steward_core::models::note::NoteTarget;
use steward_core::models::plan::ResponsePlan;
use steward_core::TaskRequest;

#[derive(Parser)]
#[command(name = "steward")]
#[command(version)]
#[command(about = "Declarative state management for Splunk Enterprise Security", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "STEWARD_CONFIG", default_value = "steward.yaml")]
    config: PathBuf,

    /// Report what would change without performing any mutating call
    #[arg(long)]
    dry_run: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage findings
    Finding {
        #[command(subcommand)]
        action: FindingCommands,
    },
    /// Manage investigations
    Investigation {
        #[command(subcommand)]
        action: InvestigationCommands,
    },
    /// Manage investigation types
    InvestigationType {
        #[command(subcommand)]
        action: InvestigationTypeCommands,
    },
    /// Manage notes on findings, investigations, and plan tasks
    Note {
        #[command(subcommand)]
        action: NoteCommands,
    },
    /// Manage response plan templates
    ResponsePlan {
        #[command(subcommand)]
        action: ResponsePlanCommands,
    },
    /// Apply response plans to investigations and progress their tasks
    Execution {
        #[command(subcommand)]
        action: ExecutionCommands,
    },
}

#[derive(Subcommand)]
enum FindingCommands {
    /// Create a finding, or update one addressed by reference id
    Apply(FindingApplyArgs),
    /// Fetch one finding by reference id
    Get {
        #[arg(long)]
        ref_id: String,
    },
    /// List findings
    List {
        /// Exact-title filter
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        earliest: Option<String>,
        #[arg(long)]
        latest: Option<String>,
        #[arg(long)]
        limit: Option<u64>,
    },
}

#[derive(Args)]
struct FindingApplyArgs {
    /// Reference id of an existing finding; omit to create a new one
    #[arg(long)]
    ref_id: Option<String>,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    security_domain: Option<String>,
    #[arg(long)]
    entity: Option<String>,
    #[arg(long)]
    entity_type: Option<String>,
    #[arg(long)]
    finding_score: Option<i64>,
    #[arg(long)]
    owner: Option<String>,
    #[arg(long, value_parser = PossibleValuesParser::new(mapping::STATUS_VALUES.iter().copied()))]
    status: Option<String>,
    #[arg(long, value_parser = PossibleValuesParser::new(mapping::URGENCY_VALUES.iter().copied()))]
    urgency: Option<String>,
    #[arg(long, value_parser = PossibleValuesParser::new(mapping::DISPOSITION_VALUES.iter().copied()))]
    disposition: Option<String>,
    /// Custom field as name=value; repeatable
    #[arg(long = "field", value_name = "NAME=VALUE")]
    fields: Vec<String>,
}

#[derive(Subcommand)]
enum InvestigationCommands {
    /// Create an investigation, or update one addressed by GUID
    Apply(InvestigationApplyArgs),
    /// Fetch one investigation by GUID
    Get {
        #[arg(long)]
        ref_id: String,
    },
    /// List investigations
    List {
        /// Exact-name filter
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        create_time_min: Option<String>,
        #[arg(long)]
        create_time_max: Option<String>,
        #[arg(long)]
        limit: Option<u64>,
    },
}

#[derive(Args)]
struct InvestigationApplyArgs {
    /// GUID of an existing investigation; omit to create a new one
    #[arg(long)]
    ref_id: Option<String>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long, value_parser = PossibleValuesParser::new(mapping::STATUS_VALUES.iter().copied()))]
    status: Option<String>,
    #[arg(long, value_parser = PossibleValuesParser::new(mapping::DISPOSITION_VALUES.iter().copied()))]
    disposition: Option<String>,
    #[arg(long)]
    owner: Option<String>,
    #[arg(long, value_parser = PossibleValuesParser::new(mapping::URGENCY_VALUES.iter().copied()))]
    urgency: Option<String>,
    #[arg(long, value_parser = PossibleValuesParser::new(mapping::SENSITIVITY_VALUES.iter().copied()))]
    sensitivity: Option<String>,
    #[arg(long)]
    investigation_type: Option<String>,
    /// Finding to attach; repeatable, attachment is additive
    #[arg(long = "finding-id")]
    finding_ids: Vec<String>,
}

#[derive(Subcommand)]
enum InvestigationTypeCommands {
    /// Create or update an investigation type by name
    Apply {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Response plan to associate; repeatable
        #[arg(long = "response-plan-id")]
        response_plan_ids: Vec<String>,
        /// Remove all response plan associations
        #[arg(long, conflicts_with = "response_plan_ids")]
        clear_response_plans: bool,
    },
    /// Fetch one investigation type by name
    Get {
        #[arg(long)]
        name: String,
    },
    /// List investigation types
    List,
}

/// Kind of object a note is attached to.
#[derive(Clone, Copy, ValueEnum)]
enum TargetKind {
    Finding,
    Investigation,
    ResponsePlanTask,
}

#[derive(Args)]
struct NoteTargetArgs {
    /// What the note is attached to
    #[arg(long, value_enum)]
    target_type: TargetKind,
    /// Finding reference id (finding targets)
    #[arg(long)]
    finding_ref_id: Option<String>,
    /// Investigation GUID (investigation and task targets)
    #[arg(long)]
    investigation_ref_id: Option<String>,
    /// Applied response plan id (task targets)
    #[arg(long)]
    response_plan_id: Option<String>,
    /// Phase id (task targets)
    #[arg(long)]
    phase_id: Option<String>,
    /// Task id (task targets)
    #[arg(long)]
    task_id: Option<String>,
}

impl NoteTargetArgs {
    fn build(&self) -> Result<NoteTarget> {
        fn require(value: &Option<String>, name: &str, kind: &str) -> Result<String> {
            value
                .clone()
                .with_context(|| format!("missing required parameter for target '{kind}': {name}"))
        }
        Ok(match self.target_type {
            TargetKind::Finding => NoteTarget::Finding {
                finding_ref_id: require(&self.finding_ref_id, "finding-ref-id", "finding")?,
            },
            TargetKind::Investigation => NoteTarget::Investigation {
                investigation_ref_id: require(
                    &self.investigation_ref_id,
                    "investigation-ref-id",
                    "investigation",
                )?,
            },
            TargetKind::ResponsePlanTask => {
                let kind = "response-plan-task";
                NoteTarget::ResponsePlanTask {
                    investigation_ref_id: require(
                        &self.investigation_ref_id,
                        "investigation-ref-id",
                        kind,
                    )?,
                    response_plan_id: require(&self.response_plan_id, "response-plan-id", kind)?,
                    phase_id: require(&self.phase_id, "phase-id", kind)?,
                    task_id: require(&self.task_id, "task-id", kind)?,
                }
            }
        })
    }
}

#[derive(Subcommand)]
enum NoteCommands {
    /// Create a note, or update one addressed by id
    Apply {
        #[command(flatten)]
        target: NoteTargetArgs,
        #[arg(long)]
        note_id: Option<String>,
        #[arg(long)]
        content: String,
    },
    /// Delete a note
    Remove {
        #[command(flatten)]
        target: NoteTargetArgs,
        #[arg(long)]
        note_id: String,
    },
    /// List notes on a target
    List {
        #[command(flatten)]
        target: NoteTargetArgs,
    },
}

#[derive(Subcommand)]
enum ResponsePlanCommands {
    /// Create or fully replace a response plan from a YAML document
    Apply {
        /// Desired-state file (name, description, template_status, phases)
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Delete a response plan by name
    Remove {
        #[arg(long)]
        name: String,
    },
    /// Fetch one response plan by name, with server ids
    Get {
        #[arg(long)]
        name: String,
    },
    /// List response plans
    List {
        #[arg(long)]
        limit: Option<u64>,
    },
}

#[derive(Subcommand)]
enum ExecutionCommands {
    /// Apply a response plan to an investigation and progress tasks
    Apply {
        #[arg(long)]
        investigation_ref_id: String,
        /// Response plan template, by name or UUID
        #[arg(long)]
        response_plan: String,
        /// YAML file with task progressions (phase_name, task_name, status, owner)
        #[arg(long)]
        tasks_file: Option<PathBuf>,
    },
    /// Remove an applied response plan from an investigation
    Remove {
        #[arg(long)]
        investigation_ref_id: String,
        /// Response plan template, by name or UUID
        #[arg(long)]
        response_plan: String,
    },
    /// List response plans applied to an investigation
    List {
        #[arg(long)]
        investigation_ref_id: String,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {what} file: {}", path.display()))?;
    serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse {what} file: {}", path.display()))
}

fn parse_custom_fields(raw: &[String]) -> Result<Vec<CustomField>> {
    raw.iter()
        .map(|entry| match entry.split_once('=') {
            Some((name, value)) if !name.is_empty() => Ok(CustomField {
                name: name.to_string(),
                value: value.to_string(),
            }),
            _ => bail!("invalid custom field '{entry}'; expected NAME=VALUE"),
        })
        .collect()
}

fn print_execution(outcome: &ExecutionOutcome, format: OutputFormat) {
    if format == OutputFormat::Text {
        let marker = if outcome.changed {
            "changed".yellow().bold()
        } else {
            "ok".green().bold()
        };
        println!("{}: {}", marker, outcome.message);
    }
    print_value(outcome, OutputFormat::Json);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = AppConfig::load(&cli.config)?;
    let client = SplunkClient::new(config.splunk.clone())?;
    let dry_run = cli.dry_run;
    let format = cli.format;

    match cli.command {
        Commands::Finding { action } => {
            let api = FindingsApi::with_context(&client, config.findings_context());
            match action {
                FindingCommands::Apply(args) => {
                    let desired = Finding {
                        ref_id: args.ref_id,
                        title: args.title,
                        description: args.description,
                        security_domain: args.security_domain,
                        entity: args.entity,
                        entity_type: args.entity_type,
                        finding_score: args.finding_score,
                        owner: args.owner,
                        status: args.status,
                        urgency: args.urgency,
                        disposition: args.disposition,
                        fields: parse_custom_fields(&args.fields)?,
                    };
                    let outcome = api.apply(&desired, dry_run).await?;
                    print_outcome(&outcome, format);
                }
                FindingCommands::Get { ref_id } => {
                    let findings: Vec<Finding> =
                        api.get(&ref_id).await?.into_iter().collect();
                    print_list(&findings, "finding", format);
                }
                FindingCommands::List {
                    title,
                    earliest,
                    latest,
                    limit,
                } => {
                    let filter = FindingFilter {
                        title,
                        earliest,
                        latest,
                        limit,
                    };
                    let findings = api.list(&filter).await?;
                    print_list(&findings, "finding", format);
                }
            }
        }

        Commands::Investigation { action } => {
            let api = InvestigationsApi::with_context(&client, config.context());
            match action {
                InvestigationCommands::Apply(args) => {
                    let desired = Investigation {
                        ref_id: args.ref_id,
                        name: args.name,
                        description: args.description,
                        status: args.status,
                        disposition: args.disposition,
                        owner: args.owner,
                        urgency: args.urgency,
                        sensitivity: args.sensitivity,
                        investigation_type: args.investigation_type,
                        finding_ids: args.finding_ids,
                    };
                    let outcome = api.apply(&desired, dry_run).await?;
                    print_outcome(&outcome, format);
                }
                InvestigationCommands::Get { ref_id } => {
                    let investigations: Vec<Investigation> =
                        api.get(&ref_id).await?.into_iter().collect();
                    print_list(&investigations, "investigation", format);
                }
                InvestigationCommands::List {
                    name,
                    create_time_min,
                    create_time_max,
                    limit,
                } => {
                    let filter = InvestigationFilter {
                        name,
                        create_time_min,
                        create_time_max,
                        limit,
                    };
                    let investigations = api.list(&filter).await?;
                    print_list(&investigations, "investigation", format);
                }
            }
        }

        Commands::InvestigationType { action } => {
            let api = InvestigationTypesApi::with_context(&client, config.context());
            match action {
                InvestigationTypeCommands::Apply {
                    name,
                    description,
                    response_plan_ids,
                    clear_response_plans,
                } => {
                    let response_plan_ids = if clear_response_plans {
                        Some(Vec::new())
                    } else if response_plan_ids.is_empty() {
                        None
                    } else {
                        Some(response_plan_ids)
                    };
                    let spec = InvestigationTypeSpec {
                        name,
                        description,
                        response_plan_ids,
                    };
                    let outcome = api.apply(&spec, dry_run).await?;
                    print_outcome(&outcome, format);
                }
                InvestigationTypeCommands::Get { name } => {
                    let types: Vec<_> = api.get(&name).await?.into_iter().collect();
                    print_list(&types, "investigation type", format);
                }
                InvestigationTypeCommands::List => {
                    let types = api.list().await?;
                    print_list(&types, "investigation type", format);
                }
            }
        }

        Commands::Note { action } => {
            let api = NotesApi::with_context(&client, config.context());
            match action {
                NoteCommands::Apply {
                    target,
                    note_id,
                    content,
                } => {
                    let target = target.build()?;
                    let outcome = api
                        .apply(&target, note_id.as_deref(), &content, dry_run)
                        .await?;
                    print_outcome(&outcome, format);
                }
                NoteCommands::Remove { target, note_id } => {
                    let target = target.build()?;
                    let outcome = api.remove(&target, &note_id, dry_run).await?;
                    print_outcome(&outcome, format);
                }
                NoteCommands::List { target } => {
                    let target = target.build()?;
                    let notes = api.list(&target).await?;
                    print_list(&notes, "note", format);
                }
            }
        }

        Commands::ResponsePlan { action } => {
            let api = ResponsePlansApi::with_context(&client, config.context());
            match action {
                ResponsePlanCommands::Apply { file } => {
                    let desired: ResponsePlan = load_yaml(&file, "response plan")?;
                    let outcome = api.apply(&desired, dry_run).await?;
                    print_outcome(&outcome, format);
                }
                ResponsePlanCommands::Remove { name } => {
                    let outcome = api.remove(&name, dry_run).await?;
                    print_outcome(&outcome, format);
                }
                ResponsePlanCommands::Get { name } => {
                    let plans: Vec<_> = api.get(&name).await?.into_iter().collect();
                    print_list(&plans, "response plan", format);
                }
                ResponsePlanCommands::List { limit } => {
                    let plans = api.list(limit).await?;
                    print_list(&plans, "response plan", format);
                }
            }
        }

        Commands::Execution { action } => {
            let api = ExecutionsApi::with_context(&client, config.context());
            match action {
                ExecutionCommands::Apply {
                    investigation_ref_id,
                    response_plan,
                    tasks_file,
                } => {
                    let tasks: Vec<TaskRequest> = match tasks_file {
                        Some(path) => load_yaml(&path, "tasks")?,
                        None => Vec::new(),
                    };
                    let outcome = api
                        .apply(&investigation_ref_id, &response_plan, &tasks, dry_run)
                        .await?;
                    print_execution(&outcome, format);
                }
                ExecutionCommands::Remove {
                    investigation_ref_id,
                    response_plan,
                } => {
                    let outcome = api
                        .remove(&investigation_ref_id, &response_plan, dry_run)
                        .await?;
                    print_execution(&outcome, format);
                }
                ExecutionCommands::List {
                    investigation_ref_id,
                } => {
                    let plans = api.list(&investigation_ref_id).await?;
                    print_list(&plans, "applied response plan", format);
                }
            }
        }
    }

    Ok(())
}
