//! The fan-out engine proper: aggregation, moderator assignment, snapshot
//! resync and bulk removal. Each component is an `impl Engine` block in its
//! own module; all of them reach the notification table exclusively through
//! the natural-key store contract.

mod aggregation;
mod moderation;
mod removal;
mod resync;

use std::sync::Arc;

use chrono::Duration;

use crate::store::{
    CacheInvalidator, EntityReader, FollowWindow, ModeratorDirectory, NotificationStore,
};

/// Action discriminator for follow aggregates.
pub const ACTION_FOLLOW: &str = "Follow";
/// Action discriminator for moderation assignments.
pub const ACTION_MODERATION: &str = "Moderation";
/// Action discriminator for publish notifications, targeted by
/// action-scoped removal.
pub const ACTION_PUBLISHED: &str = "Published";

pub struct Engine {
    store: Arc<dyn NotificationStore>,
    follows: Arc<dyn FollowWindow>,
    entities: Arc<dyn EntityReader>,
    moderators: Arc<dyn ModeratorDirectory>,
    cache: Arc<dyn CacheInvalidator>,
    moderation_cooldown: Duration,
}

impl Engine {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        follows: Arc<dyn FollowWindow>,
        entities: Arc<dyn EntityReader>,
        moderators: Arc<dyn ModeratorDirectory>,
        cache: Arc<dyn CacheInvalidator>,
        moderation_cooldown: Duration,
    ) -> Self {
        Self {
            store,
            follows,
            entities,
            moderators,
            cache,
            moderation_cooldown,
        }
    }

    /// Rolling lookback over which repeated follow events collapse into a
    /// single notification.
    pub(crate) fn aggregation_window() -> Duration {
        Duration::hours(24)
    }
}
