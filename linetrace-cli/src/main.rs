//! linetrace - Production-line lookups against a MongoDB deployment
//!
//! Answers two questions about the factory data model: which active plan
//! schedules a given machine on a given line and process, and which
//! production records embed a given process.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use linetrace_core::Page;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::plan::PlanMachineArgs;
use config::{ConnectionOverrides, LinetraceConfig};
use output::{OutputConfig, OutputFormat};

/// Production-line lookups against MongoDB.
#[derive(Parser)]
#[command(name = "linetrace")]
#[command(author, version)]
#[command(about = "Production-line lookups against MongoDB")]
#[command(propagate_version = true)]
#[command(after_help = "Examples:
  linetrace ping
  linetrace plan-machine --plan-id 584533a47d89971ad460daa1 \\
      --line-id 584533d07d89971ad460daa2 --process-id 584533d07d89971ad460daa4 \\
      --machine machine_one
  linetrace pp --process-embed-id 5840e6ac61016e2814fee5a2 --format json
  linetrace pp --process-embed-id 5840e6ac61016e2814fee5a2 --explain")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format (overrides config default)
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,

    /// Config file (default: ./.linetrace.toml if present)
    #[arg(short, long, global = true, env = "LINETRACE_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    connection: ConnectionArgs,
}

/// Connection flags, each overriding the `[mongo]` config section.
#[derive(Args, Debug, Default)]
struct ConnectionArgs {
    /// MongoDB connection string (replaces --host)
    #[arg(long, global = true, env = "LINETRACE_URI", hide_env_values = true)]
    uri: Option<String>,

    /// Server address as host:port (repeatable)
    #[arg(long = "host", global = true, env = "LINETRACE_HOSTS", value_delimiter = ',')]
    hosts: Vec<String>,

    /// Database holding the plan and production collections
    #[arg(long, global = true, env = "LINETRACE_DATABASE")]
    database: Option<String>,

    /// Username (enables authentication)
    #[arg(long, global = true, env = "LINETRACE_USERNAME")]
    username: Option<String>,

    /// Password
    #[arg(long, global = true, env = "LINETRACE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Connect and server-selection timeout in seconds
    #[arg(
        long = "timeout",
        global = true,
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout_secs: Option<u64>,
}

impl From<ConnectionArgs> for ConnectionOverrides {
    fn from(args: ConnectionArgs) -> Self {
        Self {
            uri: args.uri,
            hosts: args.hosts,
            database: args.database,
            username: args.username,
            password: args.password,
            timeout_secs: args.timeout_secs,
        }
    }
}

/// Pagination flags shared by the lookups.
#[derive(Args, Debug, Clone, Copy)]
struct PageArgs {
    /// Skip the first N results
    #[arg(long)]
    skip: Option<u64>,

    /// Return at most N results
    #[arg(short = 'n', long)]
    limit: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the active plan that schedules a machine on a line and process
    #[command(visible_alias = "pm")]
    PlanMachine {
        /// Plan document id (24 hex characters)
        #[arg(long)]
        plan_id: String,

        /// Line id inside the plan
        #[arg(long)]
        line_id: String,

        /// Process id inside the line
        #[arg(long)]
        process_id: String,

        /// Machine name inside the process
        #[arg(long = "machine")]
        machine: String,

        #[command(flatten)]
        page: PageArgs,

        /// Print the aggregation pipeline instead of running it
        #[arg(long)]
        explain: bool,
    },

    /// Find production records embedding a process
    #[command(visible_alias = "pp")]
    ProductionProcess {
        /// Embedded process id (24 hex characters)
        #[arg(long)]
        process_embed_id: String,

        /// Only search this production document
        #[arg(long)]
        production_id: Option<String>,

        #[command(flatten)]
        page: PageArgs,

        /// Print the aggregation pipeline instead of running it
        #[arg(long)]
        explain: bool,
    },

    /// Check that the configured server answers
    Ping,
}

/// Setup logging based on verbosity flags
fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug,mongodb=info"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

fn page(args: PageArgs) -> anyhow::Result<Page> {
    Page::new(args.skip, args.limit).context("Invalid pagination")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    // An explicit config file must load; the implicit one falls back to defaults
    let config = match &cli.config {
        Some(path) => LinetraceConfig::load_file(path)?,
        None => LinetraceConfig::load(Path::new(".")),
    };

    // Resolve output format: CLI flag > config default > Table
    let format = cli.format.unwrap_or_else(|| {
        config
            .default_format()
            .and_then(|f| f.parse().ok())
            .unwrap_or(OutputFormat::Table)
    });

    if let Some(use_color) = config.use_color() {
        colored::control::set_override(use_color);
    }
    let output = OutputConfig::auto_detect_with_color_override(format, config.use_color());

    let settings = config.resolve(cli.connection.into());
    tracing::debug!(mongo = ?settings.mongo, collections = ?settings.collections, "Resolved settings");

    match cli.command {
        Commands::PlanMachine {
            plan_id,
            line_id,
            process_id,
            machine,
            page: page_args,
            explain,
        } => {
            let args = PlanMachineArgs {
                plan_id,
                line_id,
                process_id,
                machine,
            };
            commands::plan::run(&settings, &args, page(page_args)?, explain, &output).await
        }
        Commands::ProductionProcess {
            process_embed_id,
            production_id,
            page: page_args,
            explain,
        } => {
            commands::production::run(
                &settings,
                &process_embed_id,
                production_id.as_deref(),
                page(page_args)?,
                explain,
                &output,
            )
            .await
        }
        Commands::Ping => commands::ping::run(&settings, &output).await,
    }
}
