//! Snapshot synchronizer: when an article or comment changes, the
//! denormalized copy embedded in every matching notification is rebuilt.
//! Routing fields and notifiable identity are never touched.

use serde_json::json;
use tracing::debug;

use super::Engine;
use crate::errors::EngineError;
use crate::models::NotifiableKind;
use crate::snapshot::{article_snapshot, comment_snapshot, organization_snapshot, user_snapshot};

impl Engine {
    /// Rebuild `json_data` for every notification matching
    /// (kind, notifiable_id, action). `action = None` targets rows created
    /// without an action discriminator. Zero matching rows is a clean
    /// no-op: an edit does not imply notifications exist.
    pub async fn resync_notifications(
        &self,
        kind: NotifiableKind,
        notifiable_id: i64,
        action: Option<&str>,
    ) -> Result<(), EngineError> {
        if !kind.resyncable() {
            return Err(EngineError::UnsupportedNotifiable(kind));
        }

        let json_data = match kind {
            NotifiableKind::Article => {
                let article = self
                    .entities
                    .article(notifiable_id)
                    .await?
                    .ok_or_else(|| EngineError::missing("Article", notifiable_id))?;
                let author = self
                    .entities
                    .user(article.user_id)
                    .await?
                    .ok_or_else(|| EngineError::missing("User", article.user_id))?;
                let mut json = json!({
                    "article": article_snapshot(&article),
                    "user": user_snapshot(&author),
                });
                if let Some(org_id) = article.organization_id {
                    if let Some(org) = self.entities.organization(org_id).await? {
                        json["organization"] = organization_snapshot(&org);
                    }
                }
                json
            }
            NotifiableKind::Comment => {
                let comment = self
                    .entities
                    .comment(notifiable_id)
                    .await?
                    .ok_or_else(|| EngineError::missing("Comment", notifiable_id))?;
                let author = self
                    .entities
                    .user(comment.user_id)
                    .await?
                    .ok_or_else(|| EngineError::missing("User", comment.user_id))?;
                json!({
                    "comment": comment_snapshot(&comment),
                    "user": user_snapshot(&author),
                })
            }
            _ => unreachable!("guarded by resyncable()"),
        };

        let touched = self
            .store
            .update_json_by_notifiable(kind, notifiable_id, action, json_data)
            .await?;
        debug!(kind = %kind, notifiable_id, ?action, touched, "snapshots resynced");
        Ok(())
    }
}
