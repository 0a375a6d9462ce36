//! approvalctl - operator tool for approval flows
//!
//! Works offline against flow definition files:
//! - Evaluate gate expressions against a JSON context
//! - Show which flow a business document routes to
//! - List and inspect flow definitions
//! - Check whether an exported instance is overdue
//! - Dry-run an instance through a scripted sequence of decisions

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error;
mod flow_file;

use approval_engine::EngineConfig;
use approval_types::UserId;
use commands::{parse_object, Simulation, Step};
use error::CliResult;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain text
    #[default]
    Text,
    /// JSON format
    Json,
}

/// approvalctl application
#[derive(Parser)]
#[command(name = "approvalctl")]
#[command(about = "Approval workflow operator tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "APPROVAL_CONFIG")]
    config: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    output: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Evaluate a gate expression
    Eval {
        /// Expression, e.g. `entity.estimated_cost > 10000`
        expression: String,

        /// Context as a JSON object, or `@file.json`
        #[arg(long)]
        context: Option<String>,
    },

    /// Show the flow a business document routes to
    Route {
        /// Business type, e.g. SALES_INVOICE
        business_type: String,

        /// Document payload as a JSON object, or `@file.json`
        #[arg(long)]
        payload: Option<String>,

        /// Flow definition file used for module lookups
        #[arg(long)]
        flows: Option<PathBuf>,
    },

    /// List flow definitions
    Flows {
        /// Flow definition file (.toml or .json)
        #[arg(short, long)]
        file: PathBuf,

        /// Show the nodes of one flow, by code or module name
        #[arg(long)]
        show: Option<String>,
    },

    /// Check whether an instance is past its due date
    Expired {
        /// Instance exported as JSON
        #[arg(long)]
        instance: PathBuf,

        /// Flow definition file
        #[arg(long)]
        flows: Option<PathBuf>,

        /// Reference time (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Dry-run an instance through a sequence of decisions
    Simulate {
        /// Flow definition file (.toml or .json)
        #[arg(long)]
        flows: PathBuf,

        /// Flow code or module name
        #[arg(long)]
        flow: String,

        #[arg(long, default_value = "DOCUMENT")]
        business_type: String,

        #[arg(long, default_value = "doc-1")]
        business_id: String,

        /// Entity snapshot as a JSON object, or `@file.json`
        #[arg(long)]
        entity: Option<String>,

        /// Form data as a JSON object, or `@file.json`
        #[arg(long)]
        form: Option<String>,

        #[arg(long, default_value = "submitter")]
        submitter: String,

        #[arg(long, default_value = "approver")]
        approver: String,

        /// Decisions to apply in order (repeatable)
        #[arg(long = "step", value_enum)]
        steps: Vec<Step>,
    },

    /// Show configuration
    Config,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
        .init();

    // Load config
    let config = match cli.config.as_deref() {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Eval {
            expression,
            context,
        } => commands::eval(
            &expression,
            parse_object(context.as_deref())?,
            &config.condition,
            cli.output,
        ),
        Commands::Route {
            business_type,
            payload,
            flows,
        } => commands::route(
            &business_type,
            parse_object(payload.as_deref())?,
            flows.as_deref(),
            cli.output,
        ),
        Commands::Flows { file, show } => commands::flows(&file, show.as_deref(), cli.output),
        Commands::Expired {
            instance,
            flows,
            at,
        } => commands::expired(&instance, flows.as_deref(), at, config, cli.output),
        Commands::Simulate {
            flows,
            flow,
            business_type,
            business_id,
            entity,
            form,
            submitter,
            approver,
            steps,
        } => {
            let sim = Simulation {
                flows: &flows,
                flow: &flow,
                business_type: &business_type,
                business_id: &business_id,
                entity: parse_object(entity.as_deref())?,
                form: parse_object(form.as_deref())?,
                submitter: UserId::new(submitter),
                approver: UserId::new(approver),
                steps: &steps,
            };
            commands::simulate(sim, config, cli.output)
        }
        Commands::Config => {
            match cli.output {
                OutputFormat::Text => print!("{}", toml::to_string_pretty(&config)?),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
            }
            Ok(())
        }
    }
}
