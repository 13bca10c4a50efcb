//! Tally CLI - track shared expenses from the command line

mod cli;
mod commands;
mod error;

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tally_core::db::Database;
use tally_core::AccountId;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use error::{CliError, Result};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let account = resolve_account(cli.account)?;
    let mut db = open_database(cli.db_path)?;

    match cli.command {
        Commands::Debt { command } => commands::debt::run(&mut db, &account, command),
        Commands::Receipt { command } => commands::receipt::run(&db, &account, command),
        Commands::Settle { receipt } => commands::sync::settle_receipt(&mut db, &account, &receipt),
        Commands::Status { debt } => commands::sync::show_status(&db, &account, &debt),
        Commands::Accept { debt } => commands::sync::accept_intention(&mut db, &account, &debt),
        Commands::Balances { json } => commands::sync::show_balances(&db, &account, json),
    }
}

/// The acting account comes from --account or TALLY_ACCOUNT; the CLI
/// stands in for the identity provider and trusts the value as given
fn resolve_account(flag: Option<String>) -> Result<AccountId> {
    flag.or_else(|| env::var("TALLY_ACCOUNT").ok())
        .filter(|value| !value.trim().is_empty())
        .map(AccountId::from)
        .ok_or(CliError::MissingAccount)
}

fn open_database(path: Option<PathBuf>) -> Result<Database> {
    let path = match path {
        Some(path) => path,
        None => {
            let mut path = dirs::data_dir().ok_or(CliError::NoDataDir)?;
            path.push("tally");
            std::fs::create_dir_all(&path)?;
            path.push("tally.db");
            path
        }
    };
    Ok(Database::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_account_prefers_flag() {
        let account = resolve_account(Some("alice".to_string())).unwrap();
        assert_eq!(account.as_str(), "alice");
    }

    #[test]
    fn test_resolve_account_rejects_blank() {
        assert!(resolve_account(Some("  ".to_string())).is_err());
    }
}
