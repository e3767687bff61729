use thiserror::Error;

pub const RATE_LIMITED_STATUSES: [u16; 2] = [420, 429];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// Blank search text. Never surfaced to the user.
    #[error("empty query")]
    InvalidInput,
    #[error("Too many requests - please wait a moment before trying again.")]
    RateLimited,
    #[error("Request failed with status {status}{}", reason_suffix(.reason))]
    RequestFailed { status: u16, reason: String },
    #[error("{0}")]
    Unexpected(String),
}

impl LookupError {
    pub fn from_status(status: u16, reason: &str) -> Self {
        if RATE_LIMITED_STATUSES.contains(&status) {
            return LookupError::RateLimited;
        }
        LookupError::RequestFailed {
            status,
            reason: reason.trim().to_string(),
        }
    }

    pub fn unexpected(err: &anyhow::Error) -> Self {
        LookupError::Unexpected(format!("{err:#}"))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, LookupError::RateLimited)
    }
}

fn reason_suffix(reason: &str) -> String {
    if reason.is_empty() {
        String::new()
    } else {
        format!(" {reason}")
    }
}

/// Lookup stages in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Search,
    Categories,
    Leaderboard,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Search => "games",
            Stage::Categories => "categories",
            Stage::Leaderboard => "leaderboard",
        }
    }
}

fn stage_text(stage: &Stage) -> &'static str {
    stage.label()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to fetch {}: {error}", stage_text(.stage))]
pub struct StageError {
    pub stage: Stage,
    pub error: LookupError,
}
