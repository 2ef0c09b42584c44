//! graphward demo CLI
//!
//! Runs one or all of the access-control scenarios. Each scenario wires the
//! real components (reference evaluator, decision scope, secured graph,
//! query rewriter) over an in-memory store.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- query
//!   cargo run -p demo -- iterate
//!   cargo run -p demo -- bulk
//!   cargo run -p demo -- listener
//!   cargo run -p demo -- --policy my-policy.toml --config security.toml run-all

mod scenarios;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use graphward_contracts::error::SecurityResult;

use scenarios::{bulk, iterate, listener, query, DemoContext};

// ── CLI definition ────────────────────────────────────────────────────────────

/// graphward: fine-grained access control for RDF graphs.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "graphward access-control demo",
    long_about = "Runs graphward scenarios showing query rewriting, filtered iteration,\n\
                  fail-fast bulk authorization and identity capture for listeners."
)]
struct Cli {
    /// Policy TOML for the reference evaluator (defaults to the built-in one).
    #[arg(long, global = true)]
    policy: Option<PathBuf>,

    /// Security config TOML (cache capacity, silent fail).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every scenario in sequence.
    RunAll,
    /// Rewrite a query plan and execute it with partial read rights.
    Query,
    /// Iterate a graph as a principal who may not see everything.
    Iterate,
    /// Bulk add that stops at the first denied statement.
    Bulk,
    /// Listener notifications filtered by the registrant's identity.
    Listener,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug to see every decision.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = DemoContext::load(cli.policy.as_deref(), cli.config.as_deref())
        .and_then(|ctx| run(&cli.command, &ctx));

    match result {
        Ok(()) => {
            println!("All selected scenarios completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

// ── Scenario dispatch ─────────────────────────────────────────────────────────

fn run(command: &Command, ctx: &DemoContext) -> SecurityResult<()> {
    match command {
        Command::RunAll => {
            query::run_scenario(ctx)?;
            iterate::run_scenario(ctx)?;
            bulk::run_scenario(ctx)?;
            listener::run_scenario(ctx)
        }
        Command::Query => query::run_scenario(ctx),
        Command::Iterate => iterate::run_scenario(ctx),
        Command::Bulk => bulk::run_scenario(ctx),
        Command::Listener => listener::run_scenario(ctx),
    }
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("graphward: fine-grained access control for RDF graphs");
    println!("======================================================");
    println!();
    println!("Enforcement order per operation:");
    println!("  [1] Open a unit of work (decision cache shared for its duration)");
    println!("  [2] Graph-level check: may the principal touch this graph at all?");
    println!("  [3] Blanket probe over ANY: can per-triple checks be skipped?");
    println!("  [4] Per-triple checks, fail-fast for writes, silent filtering for reads");
    println!("  [5] Only then does the store see the operation");
    println!();
}
