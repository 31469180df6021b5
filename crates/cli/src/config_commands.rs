use std::path::PathBuf;

use {anyhow::Result, clap::Subcommand};

use courier_config::validate::{self, Severity};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Print the effective configuration, with defaults filled in.
    Show,
}

pub fn handle_config(action: ConfigAction, path: Option<PathBuf>) -> Result<()> {
    match action {
        ConfigAction::Check { verbose } => check(path, verbose),
        ConfigAction::Show => show(path),
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(path: Option<PathBuf>, verbose: bool) -> Result<()> {
    let result = validate::validate(path.as_deref());

    if let Some(ref path) = result.config_path {
        eprintln!("Checking {}\n", path.display());
    } else {
        eprintln!("No config file found; checking defaults.\n");
    }

    let mut shown = 0;
    for d in &result.diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }

        let (color, label) = match d.severity {
            Severity::Error => (RED, "error"),
            Severity::Warning => (YELLOW, "warning"),
            Severity::Info => (CYAN, "info"),
        };

        if d.path.is_empty() {
            eprintln!("  {BOLD}{color}{label}{RESET} {}", d.message);
        } else {
            eprintln!("  {BOLD}{color}{label}{RESET} {}: {}", d.path, d.message);
        }
        shown += 1;
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if shown > 0 {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn show(path: Option<PathBuf>) -> Result<()> {
    let mut config = crate::load(path.as_deref())?;
    // Tokens stay out of terminal output.
    for account in config.telegram.values_mut() {
        if let Some(token) = account.get_mut("token") {
            *token = serde_json::Value::String("[REDACTED]".into());
        }
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
