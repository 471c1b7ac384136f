// ── Core error types ──
//
// Every fallible core operation returns `CoreError`. Validation failures
// are reported synchronously and never reach listeners; job-thread
// failures are captured as values and forwarded as error messages.

use thiserror::Error;

/// Legacy numeric status codes carried in listener messages.
pub mod status_code {
    pub const SUCCESS: i64 = 200;
    pub const BAD_REQUEST: i64 = 400;
    pub const NOT_FOUND: i64 = 404;
    pub const INTERNAL_ERROR: i64 = 500;
    pub const RUNNING: i64 = 1003;
    pub const STOP: i64 = 1004;
    pub const FINISHED: i64 = 1005;
    pub const FAILED: i64 = 1006;
    pub const FEASIBILITY_CHECK_FAILED: i64 = 2101;
}

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // ── Request errors ───────────────────────────────────────────────
    #[error("{message}")]
    BadRequest { message: String },

    /// Timing or scheduling conflict. Reported apart from plain form
    /// errors so clients can render it as a schedule problem.
    #[error("{message}")]
    FeasibilityCheckFailed { message: String },

    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    // ── Job errors ───────────────────────────────────────────────────
    #[error("Job stopped: {message}")]
    Stopped { message: String },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Controller is shut down")]
    ControllerShutdown,

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn infeasible(message: impl Into<String>) -> Self {
        Self::FeasibilityCheckFailed {
            message: message.into(),
        }
    }

    pub fn not_found(entity_type: impl Into<String>, identifier: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            identifier: identifier.to_string(),
        }
    }

    /// True for plain validation failures and their feasibility subtype.
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            Self::BadRequest { .. } | Self::FeasibilityCheckFailed { .. }
        )
    }

    pub fn status_code(&self) -> i64 {
        match self {
            Self::BadRequest { .. } => status_code::BAD_REQUEST,
            Self::FeasibilityCheckFailed { .. } => status_code::FEASIBILITY_CHECK_FAILED,
            Self::NotFound { .. } => status_code::NOT_FOUND,
            Self::Stopped { .. } => status_code::STOP,
            Self::ControllerShutdown | Self::Internal(_) => status_code::INTERNAL_ERROR,
        }
    }
}

// ── Persistence errors ───────────────────────────────────────────────

/// Failure reported by a [`ProjectRepository`](crate::store::ProjectRepository).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("persistence failed: {0}")]
pub struct PersistError(pub String);

impl From<PersistError> for CoreError {
    fn from(err: PersistError) -> Self {
        Self::Internal(err.to_string())
    }
}
