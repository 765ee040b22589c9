//! Bulk removal: entity deletion cascades, action-scoped retraction and
//! spammer cleanup. Every public path is guarded by the removal allow-list
//! and treats an empty id list as a no-op, so a malformed caller cannot
//! turn a cascade into a full-table delete.

use tracing::{debug, info};

use super::{Engine, ACTION_PUBLISHED};
use crate::errors::EngineError;
use crate::models::NotifiableKind;

impl Engine {
    /// Delete every notification pointing at the given notifiables.
    /// Returns the number of rows removed.
    pub async fn remove_all(
        &self,
        kind: NotifiableKind,
        ids: &[i64],
    ) -> Result<u64, EngineError> {
        if ids.is_empty() {
            debug!(kind = %kind, "remove_all called with no ids, skipping");
            return Ok(0);
        }
        if !kind.bulk_removable() {
            return Err(EngineError::UnsupportedNotifiable(kind));
        }
        let removed = self.store.delete_by_notifiable(kind, ids).await?;
        self.invalidate_all(kind, ids).await;
        info!(kind = %kind, ids = ids.len(), removed, "bulk removal complete");
        Ok(removed)
    }

    /// Delete only rows carrying `action`, e.g. retracting "Published"
    /// notifications when articles are unpublished.
    pub async fn remove_all_by_action(
        &self,
        kind: NotifiableKind,
        ids: &[i64],
        action: &str,
    ) -> Result<u64, EngineError> {
        if ids.is_empty() {
            debug!(kind = %kind, action, "remove_all_by_action called with no ids, skipping");
            return Ok(0);
        }
        if !kind.bulk_removable() {
            return Err(EngineError::UnsupportedNotifiable(kind));
        }
        let removed = self.store.delete_by_action(kind, ids, action).await?;
        self.invalidate_all(kind, ids).await;
        info!(kind = %kind, action, ids = ids.len(), removed, "action-scoped removal complete");
        Ok(removed)
    }

    /// Compound cleanup for one spamming user: their follow aggregates,
    /// comment notifications, and article "Published" notifications.
    /// Internal path; the Follow leg is deliberately outside the public
    /// allow-list.
    pub async fn remove_by_spammer(&self, user_id: i64) -> Result<u64, EngineError> {
        if self.entities.user(user_id).await?.is_none() {
            return Err(EngineError::missing("User", user_id));
        }
        let footprint = self.entities.spam_footprint(user_id).await?;

        let mut removed = 0;
        removed += self
            .store
            .delete_by_notifiable(NotifiableKind::Follow, &footprint.follow_ids)
            .await?;
        removed += self
            .store
            .delete_by_notifiable(NotifiableKind::Comment, &footprint.comment_ids)
            .await?;
        removed += self
            .store
            .delete_by_action(NotifiableKind::Article, &footprint.article_ids, ACTION_PUBLISHED)
            .await?;

        self.invalidate_all(NotifiableKind::Follow, &footprint.follow_ids).await;
        self.invalidate_all(NotifiableKind::Comment, &footprint.comment_ids).await;
        self.invalidate_all(NotifiableKind::Article, &footprint.article_ids).await;

        info!(user_id, removed, "spammer notifications removed");
        Ok(removed)
    }

    async fn invalidate_all(&self, kind: NotifiableKind, ids: &[i64]) {
        for id in ids {
            self.cache.invalidate(kind, *id).await;
        }
    }
}
