//! Receipt subcommands

use tally_core::db::Database;
use tally_core::ledger;
use tally_core::models::UserId;
use tally_core::AccountId;

use super::parse_id;
use crate::cli::ReceiptCommands;
use crate::error::Result;

pub fn run(db: &Database, account: &AccountId, command: ReceiptCommands) -> Result<()> {
    match command {
        ReceiptCommands::Create { currency } => {
            let receipt = ledger::create_receipt(db.connection(), account, &currency)?;
            println!("Created receipt {} ({})", receipt.id, receipt.currency_code);
        }
        ReceiptCommands::AddItem {
            receipt,
            price,
            quantity,
        } => {
            let item =
                ledger::add_item(db.connection(), account, parse_id(&receipt)?, price, quantity)?;
            println!("Added item {} ({price} x {quantity})", item.id);
        }
        ReceiptCommands::Consume {
            receipt,
            item,
            user,
            part,
        } => {
            ledger::set_consumer(
                db.connection(),
                account,
                parse_id(&receipt)?,
                parse_id(&item)?,
                UserId::from(user.as_str()),
                part,
            )?;
            println!("Set {user} to {part} part(s)");
        }
        ReceiptCommands::Participant {
            receipt,
            user,
            role,
        } => {
            ledger::add_participant(
                db.connection(),
                account,
                parse_id(&receipt)?,
                UserId::from(user.as_str()),
                role.into(),
            )?;
            println!("Attached {user}");
        }
        ReceiptCommands::Lock { receipt } => {
            let receipt = ledger::lock_receipt(db.connection(), account, parse_id(&receipt)?)?;
            println!(
                "Locked receipt {} at {}",
                receipt.id,
                receipt.locked_timestamp.unwrap_or_default()
            );
        }
        ReceiptCommands::Resolve { receipt } => {
            ledger::mark_resolved(db.connection(), account, parse_id(&receipt)?)?;
            println!("Marked resolved");
        }
    }
    Ok(())
}
