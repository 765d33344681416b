//! Bounty Ledger CLI
//!
//! Command-line interface for the Bounty Ledger.

mod client;
mod commands;
mod style;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use style::*;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "bounty-ledger")]
#[command(author = "CortexLM")]
#[command(version)]
#[command(about = "Bounty Ledger - Staked vulnerability reports", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Ledger server URL
    #[arg(
        short,
        long,
        env = "LEDGER_URL",
        default_value = "http://127.0.0.1:8080",
        global = true
    )]
    url: String,

    /// Signing key: SURI (//Alice), mnemonic or 64-char hex seed
    #[arg(long, env = "LEDGER_SURI", global = true, hide_env_values = true)]
    suri: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the ledger server
    #[command(visible_alias = "s")]
    Server {
        /// Configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },

    /// Submit a vulnerability report, staking the current fee
    Submit {
        /// Address of the affected contract or system
        target: String,

        /// File holding the full write-up; only its SHA-256 goes on the ledger
        #[arg(short, long, conflicts_with = "hash")]
        file: Option<PathBuf>,

        /// Precomputed description hash (hex)
        #[arg(long)]
        hash: Option<String>,
    },

    /// Finalize a report as the AI auditor
    Finalize {
        report_id: u64,
        /// critical, high, medium or low
        severity: String,
        /// Confidence score, 0-100
        score: u64,
    },

    /// Appeal a finalized report
    Appeal {
        report_id: u64,

        /// File holding the appeal rationale
        #[arg(short, long, conflicts_with = "reason_hash")]
        reason: Option<PathBuf>,

        /// Precomputed rationale hash (hex)
        #[arg(long)]
        reason_hash: Option<String>,
    },

    /// Resolve an open appeal (governance)
    Resolve {
        report_id: u64,
        /// "overturned" overturns; anything else upholds
        decision: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Governance administration
    Admin {
        #[command(subcommand)]
        action: commands::admin::AdminAction,
        /// Skip confirmation
        #[arg(short, long, global = true)]
        yes: bool,
    },

    /// Show a report and its appeal
    #[command(visible_alias = "r")]
    Report { report_id: u64 },

    /// Show a reporter's reputation and balance
    #[command(visible_alias = "st")]
    Stats {
        /// Reporter address (defaults to the --suri address)
        address: Option<String>,
    },

    /// Page through the event log
    Events {
        #[arg(long, default_value = "0")]
        since: u64,
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Print the SS58 address of the signing key
    Address,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt().with_env_filter("info").init();
    }

    let url = cli.url.as_str();
    let suri = cli.suri.as_deref();

    let result = match cli.command {
        Commands::Server { config } => {
            print_banner();
            commands::server::run(&config).await
        }
        Commands::Submit { target, file, hash } => {
            commands::submit::run(url, suri, &target, file.as_deref(), hash.as_deref()).await
        }
        Commands::Finalize {
            report_id,
            severity,
            score,
        } => commands::finalize::run(url, suri, report_id, &severity, score).await,
        Commands::Appeal {
            report_id,
            reason,
            reason_hash,
        } => {
            commands::appeal::run(url, suri, report_id, reason.as_deref(), reason_hash.as_deref())
                .await
        }
        Commands::Resolve {
            report_id,
            decision,
            yes,
        } => commands::resolve::run(url, suri, report_id, &decision, yes).await,
        Commands::Admin { action, yes } => commands::admin::run(url, suri, action, yes).await,
        Commands::Report { report_id } => commands::report::run(url, report_id).await,
        Commands::Stats { address } => commands::stats::run(url, suri, address).await,
        Commands::Events { since, limit } => commands::events::run(url, since, limit).await,
        Commands::Address => commands::address::run(suri),
    };

    if let Err(e) = result {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

pub fn print_banner() {
    println!();
    println!("  {}", style_cyan("bounty-ledger"));
    println!("  {}", style_dim(&format!("v{}", VERSION)));
    println!();
}
