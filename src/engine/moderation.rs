//! Moderator assignment for freshly created or flagged content.
//!
//! Selection is a uniform shuffle of the eligible pool followed by a
//! bounded take. Eligibility already excludes moderators inside their
//! cooldown window, so rapid bursts of flagged content spread across the
//! pool instead of piling onto whoever sorts first.

use chrono::Utc;
use rand::seq::SliceRandom;
use rand::thread_rng;
use serde_json::json;
use tracing::debug;

use super::{Engine, ACTION_MODERATION};
use crate::errors::EngineError;
use crate::models::{NotifiableKind, NotificationKey, NotificationWrite, Recipient};
use crate::snapshot::{article_snapshot, comment_snapshot, user_snapshot};

impl Engine {
    /// Notify up to `sample_size` randomly chosen moderators about a
    /// Comment or Article needing review.
    ///
    /// Not idempotent: a second run for the same content draws a fresh
    /// sample. Failures before the first write surface as-is and may be
    /// retried; once any notification has landed, later failures are
    /// wrapped as `PartialCompletion` so the dispatcher dead-letters the
    /// job instead of re-running it and over-assigning.
    pub async fn assign_moderators(
        &self,
        kind: NotifiableKind,
        notifiable_id: i64,
        sample_size: usize,
    ) -> Result<(), EngineError> {
        if !kind.moderatable() {
            return Err(EngineError::UnsupportedNotifiable(kind));
        }

        let now = Utc::now();
        let cooled_before = now - self.moderation_cooldown;
        let mut pool = self.moderators.eligible(cooled_before).await?;
        if pool.is_empty() {
            debug!(kind = %kind, notifiable_id, "no eligible moderators, skipping");
            return Ok(());
        }

        let (entity_json, author_id) = match kind {
            NotifiableKind::Article => {
                let article = self
                    .entities
                    .article(notifiable_id)
                    .await?
                    .ok_or_else(|| EngineError::missing("Article", notifiable_id))?;
                (article_snapshot(&article), article.user_id)
            }
            NotifiableKind::Comment => {
                let comment = self
                    .entities
                    .comment(notifiable_id)
                    .await?
                    .ok_or_else(|| EngineError::missing("Comment", notifiable_id))?;
                (comment_snapshot(&comment), comment.user_id)
            }
            _ => unreachable!("guarded by moderatable()"),
        };

        let author = self
            .entities
            .user(author_id)
            .await?
            .ok_or_else(|| EngineError::missing("User", author_id))?;
        if author.limited {
            debug!(kind = %kind, notifiable_id, author_id, "author restricted, skipping review");
            return Ok(());
        }

        pool.shuffle(&mut thread_rng());
        let selected: Vec<i64> = pool
            .iter()
            .map(|m| m.user_id)
            .filter(|id| *id != author_id)
            .take(sample_size)
            .collect();
        if selected.is_empty() {
            return Ok(());
        }

        let json_data = json!({
            kind.json_key(): entity_json,
            "user": user_snapshot(&author),
        });

        let mut written = 0usize;
        for moderator_id in &selected {
            let key = NotificationKey {
                recipient: Recipient::User(*moderator_id),
                notifiable_type: kind,
                notifiable_id,
                action: Some(ACTION_MODERATION.to_string()),
            };
            let result = self
                .store
                .upsert_by_natural_key(
                    &key,
                    NotificationWrite {
                        json_data: json_data.clone(),
                        notified_at: now,
                        read: false,
                    },
                )
                .await;
            if let Err(e) = result {
                if written > 0 {
                    return Err(EngineError::partial("moderator assignment", e));
                }
                return Err(e);
            }
            written += 1;
        }
        // Same rule for the cooldown bookkeeping: rows exist by now, so a
        // re-run would draw and notify a fresh sample.
        if let Err(e) = self.moderators.record_assignment(&selected, now).await {
            return Err(EngineError::partial("moderator assignment", e));
        }

        debug!(
            kind = %kind,
            notifiable_id,
            assigned = selected.len(),
            "moderators assigned"
        );
        Ok(())
    }
}
