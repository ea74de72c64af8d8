use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StatsError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Player,
    Team,
    Game,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Player => write!(f, "player"),
            EntityKind::Team => write!(f, "team"),
            EntityKind::Game => write!(f, "game"),
        }
    }
}

/// Failures raised by a [`crate::store::RecordStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store call exceeded {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("store connection lock poisoned")]
    Poisoned,

    #[error("cannot prepare store directory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store returned malformed row: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum StatsError {
    /// Unrecognised period string. Not retried.
    #[error("invalid window policy {period:?}")]
    InvalidWindowPolicy { period: String },

    /// Unknown player/team/game id. Public entry points turn this into a default result.
    #[error("{kind} {id:?} not found")]
    EntityNotFound { kind: EntityKind, id: String },

    #[error("record store unavailable ({context}): {source}")]
    StoreUnavailable {
        context: String,
        #[source]
        source: StoreError,
    },

    #[error("malformed input: {0}")]
    MalformedInput(String),
}

impl StatsError {
    pub fn store(source: StoreError, context: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            context: context.into(),
            source,
        }
    }

    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::EntityNotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedInput(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StatsError::EntityNotFound { .. })
    }
}

/// Turns an `EntityNotFound` into `Ok(fallback)`, leaving every other error untouched.
pub fn or_default_on_missing<T>(res: Result<T>, fallback: impl FnOnce() -> T) -> Result<T> {
    match res {
        Err(err) if err.is_not_found() => {
            tracing::warn!(error = %err, "entity missing, using default result");
            Ok(fallback())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::{EntityKind, StatsError, StoreError, or_default_on_missing};

    #[test]
    fn not_found_falls_back_to_default() {
        let res: super::Result<f64> = Err(StatsError::not_found(EntityKind::Player, "p1"));
        assert_eq!(or_default_on_missing(res, || 0.0).unwrap(), 0.0);
    }

    #[test]
    fn store_errors_are_not_swallowed() {
        let res: super::Result<f64> = Err(StatsError::store(
            StoreError::Timeout { timeout_ms: 50 },
            "team t1 season as of 2019w5",
        ));
        let err = or_default_on_missing(res, || 0.0).unwrap_err();
        assert!(err.to_string().contains("team t1 season as of 2019w5"));
    }
}
