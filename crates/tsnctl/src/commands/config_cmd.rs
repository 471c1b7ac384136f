//! `tsnctl config` handlers.

use tsnctl_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub fn handle(
    args: ConfigArgs,
    global: &GlobalOpts,
    config: Result<Config, CliError>,
) -> Result<(), CliError> {
    let path = global
        .config
        .clone()
        .unwrap_or_else(tsnctl_config::config_path);

    match args.command {
        ConfigCommand::Show => {
            let text = toml::to_string_pretty(&config?)
                .map_err(|e| CliError::Render(e.to_string()))?;
            output::print_output(text.trim_end(), global.quiet);
        }
        ConfigCommand::Path => output::print_output(&path.display().to_string(), global.quiet),
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::ConfigExists { path });
            }
            tsnctl_config::save_config_to(&Config::default(), &path)?;
            tracing::info!(path = %path.display(), "config written");
            output::print_output(&format!("Wrote {}", path.display()), global.quiet);
        }
    }
    Ok(())
}
