use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

mod script;

use script::Session;

/// Contract emulator: run contracts in-process against an in-memory ledger
#[derive(Parser)]
#[command(name = "emulator", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a JSON batch script of emulator steps
    Run {
        /// Path to the script
        script: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the contract and function symbols this build can load
    Contracts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

fn main() {
    setup_logging();
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Run { script, json } => run_script(&script, json),
        Commands::Contracts { json } => list_symbols(json),
        Commands::Version => {
            println!(
                "emulator {} (emulator-core {})",
                env!("CARGO_PKG_VERSION"),
                env!("CARGO_PKG_VERSION")
            );
            0
        }
    };

    process::exit(exit_code);
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`)
fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();
}

/// Exit 0 when every step succeeds, 1 on the first failing step, 2 when the
/// script cannot be loaded
fn run_script(path: &Path, json: bool) -> i32 {
    let steps = match script::load(path) {
        Ok(steps) => steps,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            return 2;
        }
    };

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut session = Session::new(base_dir);
    let mut report = Vec::with_capacity(steps.len());
    let mut exit_code = 0;

    for (index, step) in steps.iter().enumerate() {
        match session.run(step) {
            Ok(output) => {
                if !json {
                    println!("{} {}", "✓".green(), step.label());
                    if let Some(output) = &output {
                        println!("{}", pretty(output));
                    }
                }
                report.push(json!({
                    "step": index,
                    "command": step.command(),
                    "ok": true,
                    "output": output,
                }));
            }
            Err(e) => {
                if !json {
                    println!("{} {}", "✗".red(), step.label());
                    eprintln!("{} {:#}", "error:".red().bold(), e);
                }
                report.push(json!({
                    "step": index,
                    "command": step.command(),
                    "ok": false,
                    "error": format!("{:#}", e),
                }));
                exit_code = 1;
                break;
            }
        }
    }

    if json {
        println!("{}", pretty(&Value::Array(report)));
    } else if exit_code == 0 {
        println!("{} {} step(s) passed", "ok:".green().bold(), steps.len());
    }
    exit_code
}

fn list_symbols(json: bool) -> i32 {
    let emulator = emulator_core::Emulator::with_builtins();
    let contracts = emulator.loadable_contracts();
    let functions = emulator.loadable_functions();

    if json {
        let listing = json!({
            "contracts": contracts,
            "functions": functions,
        });
        println!("{}", pretty(&listing));
        return 0;
    }

    println!("{}", "Contracts".bold());
    for symbol in &contracts {
        println!("  {}", symbol);
    }
    println!("{}", "Functions".bold());
    for symbol in &functions {
        println!("  {}", symbol);
    }
    0
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
