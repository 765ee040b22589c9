use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::notifiable::NotifiableKind;

/// The party a notification is routed to. Exactly one of the two columns
/// (`recipient_user_id`, `recipient_organization_id`) is set per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recipient {
    User(i64),
    Organization(i64),
}

impl Recipient {
    pub fn user_id(self) -> Option<i64> {
        match self {
            Self::User(id) => Some(id),
            Self::Organization(_) => None,
        }
    }

    pub fn organization_id(self) -> Option<i64> {
        match self {
            Self::User(_) => None,
            Self::Organization(id) => Some(id),
        }
    }
}

/// Natural key of a notification row. At most one row exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NotificationKey {
    pub recipient: Recipient,
    pub notifiable_type: NotifiableKind,
    pub notifiable_id: i64,
    pub action: Option<String>,
}

/// Attributes written on upsert. `read` only applies when the row is
/// created; an existing row keeps its read state.
#[derive(Debug, Clone)]
pub struct NotificationWrite {
    pub json_data: serde_json::Value,
    pub notified_at: DateTime<Utc>,
    pub read: bool,
}

/// Computed state of a follow aggregate. The aggregate is keyed on
/// (recipient, kind, action) only; `notifiable_id` tracks the most recent
/// event and is rewritten in place on every recomputation.
#[derive(Debug, Clone)]
pub struct AggregateState {
    pub notifiable_id: i64,
    pub json_data: serde_json::Value,
    pub notified_at: DateTime<Utc>,
    pub read: bool,
}

/// Outcome of a reconcile call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// A row was created or rewritten.
    Written,
    /// The row existed and was deleted.
    Deleted,
    /// Nothing matched and nothing was requested; no row exists.
    Absent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub recipient: Recipient,
    pub notifiable_type: NotifiableKind,
    pub notifiable_id: i64,
    pub action: Option<String>,
    pub json_data: serde_json::Value,
    pub notified_at: DateTime<Utc>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Notification {
    pub fn key(&self) -> NotificationKey {
        NotificationKey {
            recipient: self.recipient,
            notifiable_type: self.notifiable_type,
            notifiable_id: self.notifiable_id,
            action: self.action.clone(),
        }
    }
}
