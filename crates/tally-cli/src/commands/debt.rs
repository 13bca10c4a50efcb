//! Debt subcommands

use tally_core::db::Database;
use tally_core::ledger;
use tally_core::models::{DebtMutation, UserId};
use tally_core::AccountId;

use super::{format_amount, parse_id};
use crate::cli::DebtCommands;
use crate::error::Result;

pub fn run(db: &mut Database, account: &AccountId, command: DebtCommands) -> Result<()> {
    match command {
        DebtCommands::Add {
            to,
            amount,
            currency,
            note,
        } => {
            let record = ledger::record_debt(
                db.connection(),
                account,
                UserId::from(to),
                amount,
                &currency,
                &note,
            )?;
            println!(
                "Recorded debt {} with {}: {}",
                record.id,
                record.counterparty_user_id,
                format_amount(record.amount_subunits, &record.currency_code)
            );
        }
        DebtCommands::Edit {
            id,
            amount,
            timestamp,
            note,
            currency,
        } => {
            let mut mutations = Vec::new();
            if let Some(amount) = amount {
                mutations.push(DebtMutation::AmountChanged(amount));
            }
            if let Some(timestamp) = timestamp {
                mutations.push(DebtMutation::TimestampChanged(timestamp));
            }
            if let Some(note) = note {
                mutations.push(DebtMutation::NoteChanged(note));
            }
            if let Some(currency) = currency {
                mutations.push(DebtMutation::CurrencyChanged(currency));
            }

            let record =
                ledger::update_debt(db.connection_mut(), account, parse_id(&id)?, mutations)?;
            println!(
                "Updated debt {}: {}",
                record.id,
                format_amount(record.amount_subunits, &record.currency_code)
            );
        }
        DebtCommands::List { json } => {
            let records = ledger::list_debts(db.connection(), account)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for record in records {
                    let lock = record
                        .locked_timestamp
                        .map_or_else(|| "unlocked".to_string(), |ts| format!("locked@{ts}"));
                    println!(
                        "{}  {}  {}  {}  {}",
                        record.id,
                        record.counterparty_user_id,
                        format_amount(record.amount_subunits, &record.currency_code),
                        lock,
                        record.note
                    );
                }
            }
        }
    }
    Ok(())
}
