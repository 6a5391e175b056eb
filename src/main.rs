// Command-line front end for the read-only SQL guard.
//
// Reads SQL from the first positional argument, or from stdin when none is
// given, validates it, and prints the referenced tables as JSON.
//
// OPTIONAL: SQLGUARD_DIALECT (default postgres), SQLGUARD_ALLOWED_TABLES.

use anyhow::{Context, Result};
use clap::Parser;
use sqlguard::{GuardConfig, Validator};
use std::io::Read;
use std::process::ExitCode;

// ============================================================================
// ARGUMENT PARSING
// ============================================================================

/// sqlguard - Read-only SQL validation and table extraction
#[derive(Parser, Debug, PartialEq, Eq)]
#[command(name = "sqlguard")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// SQL dialect (overrides SQLGUARD_DIALECT)
    #[arg(short, long)]
    dialect: Option<String>,

    /// SQL to validate; read from stdin when omitted
    sql: Option<String>,
}

fn read_sql(arg: Option<String>) -> Result<String> {
    if let Some(sql) = arg {
        return Ok(sql);
    }
    let mut sql = String::new();
    std::io::stdin()
        .read_to_string(&mut sql)
        .context("failed to read SQL from stdin")?;
    Ok(sql)
}

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

fn run() -> Result<()> {
    let args = Args::parse();
    let config = GuardConfig::from_env().context("invalid sqlguard environment")?;

    let dialect = args.dialect.unwrap_or_else(|| config.dialect.clone());
    let sql = read_sql(args.sql)?;
    let allow_list = config.allow_list();

    if let Some(allow_list) = &allow_list {
        log::info!("Authorizing against {} allowed table(s)", allow_list.len());
    }

    let report = Validator::new().report(&sql, &dialect, allow_list.as_ref())?;
    let json = serde_json::to_string_pretty(&report).context("failed to encode report")?;
    println!("{}", json);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
