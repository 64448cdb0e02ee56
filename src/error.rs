use std::process::ExitCode;

/// Errors that cause whatsmyip to exit with a specific code.
#[derive(Debug, thiserror::Error)]
pub enum ExitError {
    #[error("config error: {0}")]
    Config(String),

    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    #[error("{tool} failed (exit {code}): {message}")]
    ToolFailed {
        tool: String,
        code: i32,
        message: String,
    },

    #[error("{tool} timed out after {timeout_secs}s")]
    Timeout { tool: String, timeout_secs: u64 },

    #[error("no match for pattern {pattern:?}")]
    NoMatch { pattern: String },

    #[error("doctor found {0} issue(s)")]
    DoctorFailed(usize),

    #[error("{0}")]
    Other(String),
}

impl ExitError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            ExitError::Config(_) => ExitCode::from(2),
            ExitError::ToolNotFound { .. } => ExitCode::from(3),
            ExitError::ToolFailed { .. } => ExitCode::from(4),
            ExitError::Timeout { .. } => ExitCode::from(5),
            ExitError::DoctorFailed(_) => ExitCode::from(6),
            ExitError::NoMatch { .. } | ExitError::Other(_) => ExitCode::from(1),
        }
    }
}

/// The configured extraction pattern failed to compile.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid pattern {pattern:?}: {message}")]
pub struct PatternError {
    pub pattern: String,
    pub message: String,
}

/// A fetch failed at the transport level. The display text is what the
/// user sees as the reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct FetchError(pub String);

impl From<ureq::Error> for FetchError {
    fn from(e: ureq::Error) -> Self {
        Self(e.to_string())
    }
}
