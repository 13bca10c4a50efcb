use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tally_core::models::ParticipantRole;

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Track who owes whom, without a central ledger")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Acting account id (stands in for the identity provider)
    #[arg(long, global = true, value_name = "ACCOUNT")]
    pub account: Option<String>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage debts on your own ledger
    Debt {
        #[command(subcommand)]
        command: DebtCommands,
    },
    /// Manage shared receipts
    Receipt {
        #[command(subcommand)]
        command: ReceiptCommands,
    },
    /// Settle a locked receipt into debts and sync proposals
    Settle {
        /// Receipt id
        receipt: String,
    },
    /// Show the reconciliation state of a debt
    Status {
        /// Debt id
        debt: String,
    },
    /// Accept the counterparty's pending proposal for a debt
    Accept {
        /// Debt id
        debt: String,
    },
    /// Show net balances per counterparty and currency
    Balances {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum DebtCommands {
    /// Record a new debt
    Add {
        /// Counterparty user id
        #[arg(long)]
        to: String,
        /// Signed amount in currency subunits (positive: they owe you)
        #[arg(long)]
        amount: i64,
        /// Currency code
        #[arg(long, default_value = "EUR")]
        currency: String,
        /// Free-form note
        #[arg(long, default_value = "")]
        note: String,
    },
    /// Edit an existing debt
    Edit {
        /// Debt id
        id: String,
        /// New amount in subunits
        #[arg(long)]
        amount: Option<i64>,
        /// New business date (unix ms)
        #[arg(long)]
        timestamp: Option<i64>,
        /// New note
        #[arg(long)]
        note: Option<String>,
        /// New currency code
        #[arg(long)]
        currency: Option<String>,
    },
    /// List your ledger, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ReceiptCommands {
    /// Create a new receipt
    Create {
        /// Currency code
        #[arg(long, default_value = "EUR")]
        currency: String,
    },
    /// Add an item to an unlocked receipt
    AddItem {
        /// Receipt id
        receipt: String,
        /// Unit price in subunits
        #[arg(long)]
        price: i64,
        /// Quantity
        #[arg(long, default_value = "1")]
        quantity: i64,
    },
    /// Set a user's part weight on an item
    Consume {
        /// Receipt id
        receipt: String,
        /// Item id
        item: String,
        /// Consuming user id
        #[arg(long)]
        user: String,
        /// Part weight
        #[arg(long, default_value = "1")]
        part: i64,
    },
    /// Attach a participant
    Participant {
        /// Receipt id
        receipt: String,
        /// User id
        #[arg(long)]
        user: String,
        /// Access role
        #[arg(long, value_enum, default_value_t = RoleArg::Viewer)]
        role: RoleArg,
    },
    /// Freeze the receipt's shares for settlement
    Lock {
        /// Receipt id
        receipt: String,
    },
    /// Acknowledge the settlement as a participant
    Resolve {
        /// Receipt id
        receipt: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoleArg {
    Owner,
    Editor,
    Viewer,
}

impl From<RoleArg> for ParticipantRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Owner => Self::Owner,
            RoleArg::Editor => Self::Editor,
            RoleArg::Viewer => Self::Viewer,
        }
    }
}
