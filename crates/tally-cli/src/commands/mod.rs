//! Command handlers

pub mod debt;
pub mod receipt;
pub mod sync;

use std::str::FromStr;

use crate::error::{CliError, Result};

/// Parse a uuid-backed id argument, mapping failures to a user-facing error
pub fn parse_id<T: FromStr>(raw: &str) -> Result<T> {
    raw.parse().map_err(|_| CliError::InvalidId(raw.to_string()))
}

/// Render subunits as a fixed-point amount, e.g. 1234 -> "12.34"
pub fn format_amount(subunits: i64, currency: &str) -> String {
    let sign = if subunits < 0 { "-" } else { "" };
    let abs = subunits.unsigned_abs();
    format!("{sign}{}.{:02} {currency}", abs / 100, abs % 100)
}
