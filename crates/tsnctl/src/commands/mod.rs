//! Command handlers.

pub mod check;
pub mod config_cmd;
pub mod gcl;

use std::path::Path;

use tsnctl_config::Config;
use tsnctl_core::Project;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Load the config from `--config` or the platform path.
pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let config = match &global.config {
        Some(path) => tsnctl_config::load_config_from(path)?,
        None => tsnctl_config::load_config()?,
    };
    Ok(config)
}

/// Read one project from a JSON file.
pub fn load_project(path: &Path) -> Result<Project, CliError> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|source| CliError::ProjectFile {
        path: path.to_path_buf(),
        source,
    })
}
