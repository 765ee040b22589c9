use chrono::{DateTime, Utc};

/// One row of the moderator eligibility view. The view itself already
/// filters to trusted, non-limited users; the cooldown cut is applied by
/// the reader.
#[derive(Debug, Clone)]
pub struct Moderator {
    pub user_id: i64,
    pub last_moderation_notification: DateTime<Utc>,
}
