//! Stratus CLI
//!
//! Command-line tools for exercising the provider engine offline.
//!
//! # Commands
//!
//! - `tags diff` - Show the tag changes needed to move between two tag sets
//! - `wait simulate` - Run the status poller over a scripted status sequence
//! - `domain-name simulate` - Run a domain name lifecycle against the simulator

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Stratus provider engine tools.
#[derive(Parser)]
#[command(name = "stratus")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tag reconciliation tools
    Tags {
        #[command(subcommand)]
        command: TagsCommand,
    },

    /// State-change waiter tools
    Wait {
        #[command(subcommand)]
        command: WaitCommand,
    },

    /// Domain name resource tools
    DomainName {
        #[command(subcommand)]
        command: DomainNameCommand,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum TagsCommand {
    /// Print the create/update/delete sets between two JSON tag maps
    ///
    /// Keys under the reserved `aws:` prefix are never part of the diff.
    Diff {
        /// File holding the current tags as a JSON object
        old: PathBuf,

        /// File holding the desired tags as a JSON object
        new: PathBuf,

        /// Ignore keys starting with this prefix (repeatable)
        #[arg(long = "ignore-prefix")]
        ignore_prefixes: Vec<String>,

        /// Ignore this exact key (repeatable)
        #[arg(long = "ignore-key")]
        ignore_keys: Vec<String>,
    },
}

#[derive(Subcommand)]
enum WaitCommand {
    /// Poll a scripted sequence of statuses (`-` means the object is absent)
    Simulate {
        /// Statuses returned by successive refreshes
        #[arg(required = true, value_delimiter = ',')]
        statuses: Vec<String>,

        /// Pending statuses
        #[arg(short, long, value_delimiter = ',', default_value = "PENDING")]
        pending: Vec<String>,

        /// Target statuses
        #[arg(short, long, value_delimiter = ',', default_value = "AVAILABLE")]
        target: Vec<String>,

        /// Overall timeout in milliseconds
        #[arg(long, default_value = "10000")]
        timeout_ms: u64,

        /// First delay between refreshes in milliseconds
        #[arg(long, default_value = "10")]
        min_delay_ms: u64,

        /// Maximum delay between refreshes in milliseconds
        #[arg(long, default_value = "200")]
        max_delay_ms: u64,

        /// Consecutive absent observations tolerated
        #[arg(long, default_value = "0")]
        not_found_checks: u32,

        /// Consecutive target observations required
        #[arg(long, default_value = "1")]
        occurrences: u32,
    },
}

#[derive(Subcommand)]
enum DomainNameCommand {
    /// Create, optionally update, then delete a domain name in memory
    Simulate {
        /// Domain name resource configuration (JSON)
        resource: PathBuf,

        /// Replacement configuration applied as an update (JSON)
        #[arg(short, long)]
        update: Option<PathBuf>,

        /// Provider configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Reads reporting UPDATING after each create or update
        #[arg(long, default_value = "2")]
        updating_reads: u32,

        /// Keep the domain instead of deleting it at the end
        #[arg(long)]
        keep: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Tags {
            command:
                TagsCommand::Diff {
                    old,
                    new,
                    ignore_prefixes,
                    ignore_keys,
                },
        } => {
            let filters = commands::tags_diff::Filters {
                prefixes: ignore_prefixes,
                keys: ignore_keys,
            };
            commands::tags_diff::run(&old, &new, &filters)?;
        }
        Commands::Wait {
            command:
                WaitCommand::Simulate {
                    statuses,
                    pending,
                    target,
                    timeout_ms,
                    min_delay_ms,
                    max_delay_ms,
                    not_found_checks,
                    occurrences,
                },
        } => {
            let options = commands::wait_simulate::Options {
                pending,
                target,
                timeout_ms,
                min_delay_ms,
                max_delay_ms,
                not_found_checks,
                occurrences,
            };
            commands::wait_simulate::run(&statuses, &options)?;
        }
        Commands::DomainName {
            command:
                DomainNameCommand::Simulate {
                    resource,
                    update,
                    config,
                    updating_reads,
                    keep,
                },
        } => {
            commands::domain_name::run(
                &resource,
                update.as_deref(),
                config.as_deref(),
                updating_reads,
                keep,
            )?;
        }
        Commands::Version => {
            println!("Stratus CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
