//! Store and collaborator seams. The engine only ever touches the
//! notification table through `NotificationStore`'s natural-key contract;
//! everything else it reads comes in through the collaborator traits so
//! the Postgres adapters and the in-memory test world are interchangeable.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::EngineError;
use crate::models::{
    AggregateState, Follow, FollowableRef, Moderator, NotifiableKind, Notification,
    NotificationKey, NotificationWrite, Recipient, Reconciled, SpamFootprint,
};

/// Natural-key contract over the notification table. All writes are
/// single-row and key-based; callers never issue ad hoc queries that
/// bypass the key.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Insert or update the row for `key`. On conflict only `json_data`,
    /// `notified_at` and `updated_at` change; `read` keeps its stored value.
    async fn upsert_by_natural_key(
        &self,
        key: &NotificationKey,
        write: NotificationWrite,
    ) -> Result<Notification, EngineError>;

    /// Returns whether a row existed.
    async fn delete_by_natural_key(&self, key: &NotificationKey) -> Result<bool, EngineError>;

    /// Atomic upsert-or-destroy for an aggregate row keyed on
    /// (recipient, kind, action). `Some(state)` writes the computed state
    /// (rewriting `notifiable_id` in place), `None` deletes whatever is
    /// there. Single operation so concurrent recomputations for the same
    /// key cannot interleave a find with a stale write.
    async fn reconcile_aggregate(
        &self,
        recipient: Recipient,
        kind: NotifiableKind,
        action: Option<&str>,
        state: Option<AggregateState>,
    ) -> Result<Reconciled, EngineError>;

    async fn find_by_notifiable(
        &self,
        kind: NotifiableKind,
        ids: &[i64],
    ) -> Result<Vec<Notification>, EngineError>;

    async fn delete_by_notifiable(
        &self,
        kind: NotifiableKind,
        ids: &[i64],
    ) -> Result<u64, EngineError>;

    async fn delete_by_action(
        &self,
        kind: NotifiableKind,
        ids: &[i64],
        action: &str,
    ) -> Result<u64, EngineError>;

    /// Bulk `json_data` rewrite for every row matching (kind, id, action).
    /// `None` matches rows whose action is NULL, not rows with any action.
    /// Returns the number of rows touched.
    async fn update_json_by_notifiable(
        &self,
        kind: NotifiableKind,
        id: i64,
        action: Option<&str>,
        json_data: serde_json::Value,
    ) -> Result<u64, EngineError>;
}

/// Rolling-window reader over follow events, most recent first.
#[async_trait]
pub trait FollowWindow: Send + Sync {
    async fn follows_for(
        &self,
        followable: FollowableRef,
        since: DateTime<Utc>,
    ) -> Result<Vec<Follow>, EngineError>;
}

/// Read-only access to source entities. `None` means the entity vanished
/// between enqueue and execution; callers decide whether that is a no-op.
#[async_trait]
pub trait EntityReader: Send + Sync {
    async fn follow(&self, id: i64) -> Result<Option<Follow>, EngineError>;
    async fn user(&self, id: i64) -> Result<Option<crate::models::User>, EngineError>;
    async fn organization(
        &self,
        id: i64,
    ) -> Result<Option<crate::models::Organization>, EngineError>;
    async fn article(&self, id: i64) -> Result<Option<crate::models::Article>, EngineError>;
    async fn comment(&self, id: i64) -> Result<Option<crate::models::Comment>, EngineError>;

    /// Ids of everything the user authored that carries notifications.
    async fn spam_footprint(&self, user_id: i64) -> Result<SpamFootprint, EngineError>;
}

/// Moderator eligibility view plus the cooldown bookkeeping that keeps
/// assignment fair.
#[async_trait]
pub trait ModeratorDirectory: Send + Sync {
    /// Trusted, non-limited users whose last moderation notification is
    /// older than `cooled_before`.
    async fn eligible(&self, cooled_before: DateTime<Utc>) -> Result<Vec<Moderator>, EngineError>;

    /// Advance `last_moderation_notification` for the selected moderators.
    async fn record_assignment(&self, user_ids: &[i64], at: DateTime<Utc>)
        -> Result<(), EngineError>;
}

/// Downstream cache sink. Invoked after successful removals; internals are
/// somebody else's problem.
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    async fn invalidate(&self, kind: NotifiableKind, id: i64);
}

/// Default sink for deployments without a cache layer wired in: records
/// the invalidation in the log stream and nothing else.
#[derive(Debug, Clone, Default)]
pub struct LogCacheInvalidator;

#[async_trait]
impl CacheInvalidator for LogCacheInvalidator {
    async fn invalidate(&self, kind: NotifiableKind, id: i64) {
        tracing::debug!(kind = %kind, id, "cache invalidation requested");
    }
}
