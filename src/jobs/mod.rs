//! Asynchronous job layer decoupling event producers from the engine.
//!
//! Jobs carry scalar identifiers only — never whole domain objects — so
//! they serialize cleanly across a queue boundary; each job re-resolves
//! its entities at execution time and treats a vanished entity as a
//! successful no-op.

pub mod dispatcher;

use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::errors::EngineError;
use crate::models::NotifiableKind;

/// Moderators drawn for a standard review notification.
pub const MODERATION_SAMPLE_SIZE: usize = 2;
/// Moderators drawn by the round-robin variant (wider spread for
/// high-volume surfaces).
pub const MODERATION_ROUND_ROBIN_SAMPLE_SIZE: usize = 4;

/// Priority queue a job lands on. Reflects user-visible latency
/// sensitivity, not importance: cleanup can wait, review cannot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Queue {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "job", rename_all = "snake_case")]
pub enum Job {
    NotifyNewFollower {
        follow_id: i64,
        #[serde(default)]
        read: bool,
    },
    NotifyModeration {
        notifiable_id: i64,
        notifiable_type: NotifiableKind,
    },
    NotifyModerationRoundRobin {
        notifiable_id: i64,
        notifiable_type: NotifiableKind,
    },
    ResyncNotifications {
        notifiable_id: i64,
        notifiable_type: NotifiableKind,
        #[serde(default)]
        action: Option<String>,
    },
    RemoveAll {
        notifiable_ids: Vec<i64>,
        notifiable_type: NotifiableKind,
    },
    RemoveAllByAction {
        notifiable_ids: Vec<i64>,
        notifiable_type: NotifiableKind,
        action: String,
    },
    RemoveBySpammer {
        user_id: i64,
    },
}

impl Job {
    pub fn queue(&self) -> Queue {
        match self {
            Job::NotifyModeration { .. } | Job::NotifyModerationRoundRobin { .. } => Queue::High,
            Job::NotifyNewFollower { .. } | Job::ResyncNotifications { .. } => Queue::Medium,
            Job::RemoveAll { .. } | Job::RemoveAllByAction { .. } | Job::RemoveBySpammer { .. } => {
                Queue::Low
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Job::NotifyNewFollower { .. } => "notify_new_follower",
            Job::NotifyModeration { .. } => "notify_moderation",
            Job::NotifyModerationRoundRobin { .. } => "notify_moderation_round_robin",
            Job::ResyncNotifications { .. } => "resync_notifications",
            Job::RemoveAll { .. } => "remove_all",
            Job::RemoveAllByAction { .. } => "remove_all_by_action",
            Job::RemoveBySpammer { .. } => "remove_by_spammer",
        }
    }

    pub async fn run(&self, engine: &Engine) -> Result<(), EngineError> {
        match self {
            Job::NotifyNewFollower { follow_id, read } => {
                engine.refresh_follow_aggregate(*follow_id, *read).await
            }
            Job::NotifyModeration {
                notifiable_id,
                notifiable_type,
            } => {
                engine
                    .assign_moderators(*notifiable_type, *notifiable_id, MODERATION_SAMPLE_SIZE)
                    .await
            }
            Job::NotifyModerationRoundRobin {
                notifiable_id,
                notifiable_type,
            } => {
                engine
                    .assign_moderators(
                        *notifiable_type,
                        *notifiable_id,
                        MODERATION_ROUND_ROBIN_SAMPLE_SIZE,
                    )
                    .await
            }
            Job::ResyncNotifications {
                notifiable_id,
                notifiable_type,
                action,
            } => {
                engine
                    .resync_notifications(*notifiable_type, *notifiable_id, action.as_deref())
                    .await
            }
            Job::RemoveAll {
                notifiable_ids,
                notifiable_type,
            } => engine
                .remove_all(*notifiable_type, notifiable_ids)
                .await
                .map(|_| ()),
            Job::RemoveAllByAction {
                notifiable_ids,
                notifiable_type,
                action,
            } => engine
                .remove_all_by_action(*notifiable_type, notifiable_ids, action)
                .await
                .map(|_| ()),
            Job::RemoveBySpammer { user_id } => {
                engine.remove_by_spammer(*user_id).await.map(|_| ())
            }
        }
    }
}
