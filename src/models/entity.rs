//! Read models for the source entities notifications embed snapshots of.
//! All of these are owned by the upstream application and consumed
//! read-only through the `EntityReader` seam.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub profile_image_url: String,
    pub comments_count: i64,
    /// Restricted accounts do not receive moderation assignments for their
    /// own content, and their content is not routed to moderators.
    pub limited: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn path(&self) -> String {
        format!("/{}", self.username)
    }
}

#[derive(Debug, Clone)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub profile_image_url: String,
}

impl Organization {
    pub fn path(&self) -> String {
        format!("/{}", self.slug)
    }
}

#[derive(Debug, Clone)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub path: String,
    pub description: String,
    pub user_id: i64,
    pub organization_id: Option<i64>,
    pub published: bool,
}

#[derive(Debug, Clone)]
pub struct Comment {
    pub id: i64,
    /// Rendered snippet used as the display title.
    pub title: String,
    pub path: String,
    pub user_id: i64,
    pub article_id: i64,
}

/// Ids of everything a single user authored that carries notifications.
/// Input to spammer cleanup.
#[derive(Debug, Clone, Default)]
pub struct SpamFootprint {
    pub follow_ids: Vec<i64>,
    pub comment_ids: Vec<i64>,
    pub article_ids: Vec<i64>,
}
