use thiserror::Error;

use crate::models::notifiable::{NotifiableKind, UnknownNotifiable};

/// Everything an engine operation can fail with. The dispatcher maps each
/// class to a retry decision: missing entities are successful no-ops,
/// invalid arguments are fatal, infrastructure errors are retried.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{kind} {id} not found")]
    MissingEntity { kind: &'static str, id: i64 },

    #[error("operation not supported for notifiable type {0}")]
    UnsupportedNotifiable(NotifiableKind),

    #[error(transparent)]
    UnknownNotifiable(#[from] UnknownNotifiable),

    /// A non-idempotent operation failed after some of its writes landed.
    /// Re-running would duplicate the completed portion, so this is never
    /// retried.
    #[error("{op} partially completed before failing: {source}")]
    PartialCompletion {
        op: &'static str,
        #[source]
        source: Box<EngineError>,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl EngineError {
    pub fn missing(kind: &'static str, id: i64) -> Self {
        Self::MissingEntity { kind, id }
    }

    pub fn partial(op: &'static str, source: EngineError) -> Self {
        Self::PartialCompletion {
            op,
            source: Box::new(source),
        }
    }

    /// The referenced entity vanished between enqueue and execution.
    /// Treated as success: logged at low severity, never retried.
    pub fn is_missing_entity(&self) -> bool {
        matches!(self, Self::MissingEntity { .. })
    }

    /// Fails fast; retrying cannot help (caller misconfiguration) or would
    /// actively make things worse (partial completion).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedNotifiable(_)
                | Self::UnknownNotifiable(_)
                | Self::PartialCompletion { .. }
        )
    }

    /// Infrastructure failure worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Internal(_))
    }
}
