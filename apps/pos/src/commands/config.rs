//! # Config Commands
//!
//! Commands for retrieving application configuration.

use serde::Serialize;
use tracing::debug;

use crate::state::ConfigState;

/// Gets the current application configuration.
///
/// ## When Used
/// - App startup (store name, seller on the counter screen)
/// - Currency formatting
///
/// ## Returns
/// Complete configuration state (read-only)
pub fn get_config(config: &ConfigState) -> ConfigState {
    debug!("get_config command");
    config.clone()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedAmount {
    pub cents: i64,
    pub formatted: String,
}

/// Formats a centavo amount with the configured currency symbol.
pub fn format_currency(config: &ConfigState, cents: i64) -> FormattedAmount {
    FormattedAmount {
        cents,
        formatted: config.format_currency(cents),
    }
}
