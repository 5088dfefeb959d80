//! Centralized path management for userdeck

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Get the main userdeck config directory
pub fn userdeck_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join("userdeck");

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("creating config directory at {}", config_dir.display()))?;

    Ok(config_dir)
}

/// Get the main userdeck data directory
pub fn userdeck_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("userdeck");

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data directory at {}", data_dir.display()))?;

    Ok(data_dir)
}

pub fn config_file() -> Result<PathBuf> {
    Ok(userdeck_config_dir()?.join("config.toml"))
}

/// Directory holding the debug request log
pub fn logs_dir() -> Result<PathBuf> {
    let logs_dir = userdeck_data_dir()?.join("logs");
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("creating logs directory at {}", logs_dir.display()))?;
    Ok(logs_dir)
}
