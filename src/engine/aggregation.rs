//! Follow-burst aggregation.
//!
//! Every incoming follow event triggers a full recomputation of the 24h
//! window for its target, rather than an incremental append. That keeps the
//! aggregate correct under out-of-order delivery and under unfollows, at
//! the cost of a bounded re-scan (one followable's window, never global).

use std::collections::HashSet;

use chrono::Utc;
use serde_json::json;
use tracing::debug;

use super::{Engine, ACTION_FOLLOW};
use crate::errors::EngineError;
use crate::models::{AggregateState, NotifiableKind, Reconciled};
use crate::snapshot::user_snapshot;

impl Engine {
    /// Recompute the "who recently followed X" notification for the target
    /// of `follow_id`.
    ///
    /// `read` is carried onto the row as supplied; the unfollow path passes
    /// `true` so a retracted burst never resurfaces as unread.
    pub async fn refresh_follow_aggregate(
        &self,
        follow_id: i64,
        read: bool,
    ) -> Result<(), EngineError> {
        let follow = self
            .entities
            .follow(follow_id)
            .await?
            .ok_or_else(|| EngineError::missing("Follow", follow_id))?;

        let now = Utc::now();
        let window_start = now - Self::aggregation_window();
        let recent = self.follows.follows_for(follow.followable, window_start).await?;

        // One slot per distinct follower, most recent first. A refollow
        // inside the window counts once, under its latest timestamp.
        let mut seen = HashSet::new();
        let mut siblings = Vec::new();
        for entry in &recent {
            if !seen.insert(entry.follower_id) {
                continue;
            }
            if let Some(user) = self.entities.user(entry.follower_id).await? {
                siblings.push(user_snapshot(&user));
            }
        }

        let recipient = follow.followable.owner();
        let state = match (siblings.first(), recent.first()) {
            (Some(latest), Some(newest_follow)) => Some(AggregateState {
                notifiable_id: newest_follow.id,
                json_data: json!({
                    "user": latest,
                    "aggregated_siblings": siblings,
                }),
                notified_at: now,
                read,
            }),
            // Burst emptied out (expired or unfollowed): drop the row.
            _ => None,
        };

        let outcome = self
            .store
            .reconcile_aggregate(recipient, NotifiableKind::Follow, Some(ACTION_FOLLOW), state)
            .await?;

        match outcome {
            Reconciled::Written => debug!(
                follow_id,
                followers = seen.len(),
                "follow aggregate recomputed"
            ),
            Reconciled::Deleted => debug!(follow_id, "follow aggregate emptied, row removed"),
            Reconciled::Absent => debug!(follow_id, "follow aggregate already absent"),
        }
        Ok(())
    }
}
