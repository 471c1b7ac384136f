//! CLI error types with miette diagnostics.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use tsnctl_config::ConfigError;
use tsnctl_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const REJECTED: i32 = 10;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Project checks ───────────────────────────────────────────────

    #[error("{rejected} of {total} checks failed")]
    #[diagnostic(
        code(tsnctl::check_failed),
        help("Fix the items marked above and run the check again.")
    )]
    CheckFailed { rejected: usize, total: usize },

    #[error("{message}")]
    #[diagnostic(
        code(tsnctl::infeasible),
        help("The stream timing conflicts with the schedule. Widen its transmit window or move it to another port.")
    )]
    Infeasible { message: String },

    #[error("{message}")]
    #[diagnostic(code(tsnctl::rejected))]
    Rejected { message: String },

    #[error("{entity} not found: {identifier}")]
    #[diagnostic(code(tsnctl::not_found))]
    NotFound { entity: String, identifier: String },

    #[error("{0}")]
    #[diagnostic(code(tsnctl::internal))]
    Internal(String),

    // ── Input files ──────────────────────────────────────────────────

    #[error("Could not parse project file {}", path.display())]
    #[diagnostic(
        code(tsnctl::project_file),
        help("The file must hold one project as JSON.")
    )]
    ProjectFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(
        code(tsnctl::config),
        help("Check the config file or the TSNCTL_* environment variables.")
    )]
    Config(#[from] ConfigError),

    #[error("Configuration file already exists at {}", path.display())]
    #[diagnostic(
        code(tsnctl::config_exists),
        help("Use --force to overwrite it.")
    )]
    ConfigExists { path: PathBuf },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render output: {0}")]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CheckFailed { .. } | Self::Infeasible { .. } | Self::Rejected { .. } => {
                exit_code::REJECTED
            }
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Config(_) | Self::ConfigExists { .. } | Self::ProjectFile { .. } => {
                exit_code::USAGE
            }
            Self::Internal(_) | Self::Io(_) | Self::Render(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::FeasibilityCheckFailed { message } => Self::Infeasible { message },
            CoreError::BadRequest { message } => Self::Rejected { message },
            CoreError::NotFound {
                entity_type,
                identifier,
            } => Self::NotFound {
                entity: entity_type,
                identifier,
            },
            other @ (CoreError::Stopped { .. }
            | CoreError::ControllerShutdown
            | CoreError::Internal(_)) => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_keep_their_category() {
        let err: CliError = CoreError::infeasible("window overlap").into();
        assert!(matches!(err, CliError::Infeasible { .. }));
        assert_eq!(err.exit_code(), exit_code::REJECTED);

        let err: CliError = CoreError::not_found("Stream", 7).into();
        assert_eq!(err.to_string(), "Stream not found: 7");
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);

        let err: CliError = CoreError::ControllerShutdown.into();
        assert_eq!(err.exit_code(), exit_code::GENERAL);
    }
}
