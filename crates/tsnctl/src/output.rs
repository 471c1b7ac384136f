//! Output formatting: table or JSON.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Outcome label for a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    Rejected,
    Infeasible,
}

impl Verdict {
    pub fn label(self, color: bool) -> String {
        let text = match self {
            Self::Ok => "ok",
            Self::Rejected => "rejected",
            Self::Infeasible => "infeasible",
        };
        if !color {
            return text.to_owned();
        }
        match self {
            Self::Ok => text.green().to_string(),
            Self::Rejected => text.red().to_string(),
            Self::Infeasible => text.yellow().to_string(),
        }
    }
}

/// Render rows as a table, or the original data as JSON.
pub fn render<T, R>(format: OutputFormat, data: &T, rows: impl FnOnce() -> Vec<R>) -> Result<String, CliError>
where
    T: serde::Serialize + ?Sized,
    R: Tabled,
{
    match format {
        OutputFormat::Table => Ok(Table::new(rows()).with(Style::rounded()).to_string()),
        OutputFormat::Json => {
            serde_json::to_string_pretty(data).map_err(|e| CliError::Render(e.to_string()))
        }
        OutputFormat::JsonCompact => {
            serde_json::to_string(data).map_err(|e| CliError::Render(e.to_string()))
        }
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}
