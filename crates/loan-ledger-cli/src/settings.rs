use loan_ledger_core::LedgerConfig;

use crate::input;

/// Build the ledger configuration: file first, then flag/env overrides.
pub fn load(
    path: Option<&str>,
    utc_offset_minutes: Option<i32>,
) -> Result<LedgerConfig, Box<dyn std::error::Error>> {
    let mut config: LedgerConfig = match path {
        Some(path) => input::file::read_yaml(path)?,
        None => LedgerConfig::default(),
    };

    if let Some(offset) = utc_offset_minutes {
        config.utc_offset_minutes = offset;
    }

    config.validate()?;
    tracing::debug!(?config, "ledger configuration loaded");
    Ok(config)
}
