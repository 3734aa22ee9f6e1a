// Copyright 2026 Journey Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use journey_runtime::cli;
use journey_runtime::cli::crawl_cmd::CrawlOptions;
use journey_runtime::live::DEFAULT_CONCURRENCY;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "journey",
    about = "Journey: autonomous crawler for interactive, stateful web experiences",
    version,
    after_help = "Run 'journey <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by `crawl` and `batch`.
#[derive(Args)]
struct CrawlFlags {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Maximum number of committed steps
    #[arg(long)]
    max_steps: Option<usize>,
    /// Attempts per driver call before giving up on it
    #[arg(long)]
    retries: Option<u32>,
    /// Settle timeout after each click, in milliseconds
    #[arg(long)]
    settle_timeout: Option<u64>,
    /// Navigation timeout in milliseconds
    #[arg(long)]
    navigation_timeout: Option<u64>,
    /// Pause before each step, in milliseconds
    #[arg(long)]
    step_delay: Option<u64>,
    /// Append journey events to this JSONL journal
    #[arg(long)]
    journal: Option<PathBuf>,
    /// Show the browser window
    #[arg(long)]
    headful: bool,
}

impl From<CrawlFlags> for CrawlOptions {
    fn from(f: CrawlFlags) -> Self {
        CrawlOptions {
            config: f.config,
            max_steps: f.max_steps,
            retries: f.retries,
            settle_timeout_ms: f.settle_timeout,
            navigation_timeout_ms: f.navigation_timeout,
            step_delay_ms: f.step_delay,
            journal: f.journal,
            headful: f.headful,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl one journey from a start URL
    Crawl {
        /// Start URL
        url: String,
        /// Write the trace here instead of printing it
        #[arg(long, short)]
        out: Option<PathBuf>,
        /// Store arrival HTML and screenshots in this directory
        #[arg(long)]
        snapshots: Option<PathBuf>,
        #[command(flatten)]
        flags: CrawlFlags,
    },
    /// Crawl several start URLs concurrently
    Batch {
        /// Start URLs
        #[arg(required = true)]
        urls: Vec<String>,
        /// Journeys running at once
        #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,
        /// Write one trace file per journey into this directory
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[command(flatten)]
        flags: CrawlFlags,
    },
    /// Check environment and diagnose issues
    Doctor {
        /// Also validate this configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global flags via environment variables so all modules can check them
    if cli.json {
        std::env::set_var(cli::output::ENV_JSON, "1");
    }
    if cli.quiet {
        std::env::set_var(cli::output::ENV_QUIET, "1");
    }
    if cli.verbose {
        std::env::set_var(cli::output::ENV_VERBOSE, "1");
    }
    if cli.no_color {
        std::env::set_var(cli::output::ENV_NO_COLOR, "1");
    }

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("journey_runtime={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!cli::output::no_color())
        .init();

    let result = match cli.command {
        Commands::Crawl {
            url,
            out,
            snapshots,
            flags,
        } => {
            let options = CrawlOptions::from(flags);
            cli::crawl_cmd::run(&url, &options, out.as_deref(), snapshots.as_deref()).await
        }
        Commands::Batch {
            urls,
            concurrency,
            out_dir,
            flags,
        } => {
            let options = CrawlOptions::from(flags);
            cli::batch_cmd::run(&urls, &options, concurrency, out_dir.as_deref()).await
        }
        Commands::Doctor { config } => cli::doctor::run(config.as_deref()).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "journey", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if !cli::output::is_quiet() && !cli::output::is_json() {
            eprintln!("  Error: {e:#}");
        }
        if cli::output::is_json() {
            cli::output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        }
        std::process::exit(1);
    }

    result
}
