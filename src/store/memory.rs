//! In-memory implementation of the store and collaborator seams.
//!
//! One `MemoryStore` holds a whole world: notification rows plus the
//! read-only entities the engine consumes. Integration tests and local
//! development run the entire engine against it; semantics mirror the
//! Postgres adapter (natural-key upserts, NULL-action matching, cooldown
//! filtering).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::EngineError;
use crate::models::{
    AggregateState, Article, Comment, Follow, FollowableRef, Moderator, NotifiableKind,
    Notification, NotificationKey, NotificationWrite, Organization, Recipient, Reconciled,
    SpamFootprint, User,
};
use crate::store::{
    CacheInvalidator, EntityReader, FollowWindow, ModeratorDirectory, NotificationStore,
};

#[derive(Default)]
struct World {
    next_notification_id: i64,
    next_follow_id: i64,
    notifications: HashMap<NotificationKey, Notification>,
    follows: Vec<Follow>,
    users: HashMap<i64, User>,
    organizations: HashMap<i64, Organization>,
    articles: HashMap<i64, Article>,
    comments: HashMap<i64, Comment>,
    moderators: HashMap<i64, DateTime<Utc>>,
    invalidations: Vec<(NotifiableKind, i64)>,
}

#[derive(Default)]
pub struct MemoryStore {
    world: Mutex<World>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Seeding ──────────────────────────────────────────────

    pub fn add_user(&self, user: User) {
        self.world.lock().unwrap().users.insert(user.id, user);
    }

    pub fn add_organization(&self, org: Organization) {
        self.world.lock().unwrap().organizations.insert(org.id, org);
    }

    pub fn add_article(&self, article: Article) {
        self.world.lock().unwrap().articles.insert(article.id, article);
    }

    pub fn add_comment(&self, comment: Comment) {
        self.world.lock().unwrap().comments.insert(comment.id, comment);
    }

    /// Register a user as a trusted moderator with the given cooldown clock.
    pub fn add_moderator(&self, user_id: i64, last_notified: DateTime<Utc>) {
        self.world.lock().unwrap().moderators.insert(user_id, last_notified);
    }

    pub fn add_follow(
        &self,
        follower_id: i64,
        followable: FollowableRef,
        created_at: DateTime<Utc>,
    ) -> i64 {
        let mut world = self.world.lock().unwrap();
        world.next_follow_id += 1;
        let id = world.next_follow_id;
        world.follows.push(Follow {
            id,
            follower_id,
            followable,
            created_at,
        });
        id
    }

    pub fn remove_follow(&self, id: i64) {
        self.world.lock().unwrap().follows.retain(|f| f.id != id);
    }

    // ── Inspection ───────────────────────────────────────────

    pub fn notifications(&self) -> Vec<Notification> {
        let world = self.world.lock().unwrap();
        let mut rows: Vec<_> = world.notifications.values().cloned().collect();
        rows.sort_by_key(|n| n.id);
        rows
    }

    pub fn invalidations(&self) -> Vec<(NotifiableKind, i64)> {
        self.world.lock().unwrap().invalidations.clone()
    }

    pub fn moderator_clock(&self, user_id: i64) -> Option<DateTime<Utc>> {
        self.world.lock().unwrap().moderators.get(&user_id).copied()
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn upsert_by_natural_key(
        &self,
        key: &NotificationKey,
        write: NotificationWrite,
    ) -> Result<Notification, EngineError> {
        let mut world = self.world.lock().unwrap();
        let now = Utc::now();
        if let Some(existing) = world.notifications.get_mut(key) {
            existing.json_data = write.json_data;
            existing.notified_at = write.notified_at;
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        world.next_notification_id += 1;
        let row = Notification {
            id: world.next_notification_id,
            recipient: key.recipient,
            notifiable_type: key.notifiable_type,
            notifiable_id: key.notifiable_id,
            action: key.action.clone(),
            json_data: write.json_data,
            notified_at: write.notified_at,
            read: write.read,
            created_at: now,
            updated_at: now,
        };
        world.notifications.insert(key.clone(), row.clone());
        Ok(row)
    }

    async fn delete_by_natural_key(&self, key: &NotificationKey) -> Result<bool, EngineError> {
        Ok(self.world.lock().unwrap().notifications.remove(key).is_some())
    }

    async fn reconcile_aggregate(
        &self,
        recipient: Recipient,
        kind: NotifiableKind,
        action: Option<&str>,
        state: Option<AggregateState>,
    ) -> Result<Reconciled, EngineError> {
        let mut world = self.world.lock().unwrap();
        let existing_key = world
            .notifications
            .keys()
            .find(|k| {
                k.recipient == recipient
                    && k.notifiable_type == kind
                    && k.action.as_deref() == action
            })
            .cloned();

        match state {
            None => Ok(match existing_key {
                Some(key) => {
                    world.notifications.remove(&key);
                    Reconciled::Deleted
                }
                None => Reconciled::Absent,
            }),
            Some(state) => {
                let now = Utc::now();
                let new_key = NotificationKey {
                    recipient,
                    notifiable_type: kind,
                    notifiable_id: state.notifiable_id,
                    action: action.map(String::from),
                };
                let row = match existing_key {
                    Some(old_key) => {
                        // notifiable_id moves with the most recent event, so
                        // the row is re-keyed in place.
                        let mut row = world.notifications.remove(&old_key).unwrap();
                        row.notifiable_id = state.notifiable_id;
                        row.json_data = state.json_data;
                        row.notified_at = state.notified_at;
                        row.read = state.read;
                        row.updated_at = now;
                        row
                    }
                    None => {
                        world.next_notification_id += 1;
                        Notification {
                            id: world.next_notification_id,
                            recipient,
                            notifiable_type: kind,
                            notifiable_id: state.notifiable_id,
                            action: new_key.action.clone(),
                            json_data: state.json_data,
                            notified_at: state.notified_at,
                            read: state.read,
                            created_at: now,
                            updated_at: now,
                        }
                    }
                };
                world.notifications.insert(new_key, row);
                Ok(Reconciled::Written)
            }
        }
    }

    async fn find_by_notifiable(
        &self,
        kind: NotifiableKind,
        ids: &[i64],
    ) -> Result<Vec<Notification>, EngineError> {
        let world = self.world.lock().unwrap();
        let mut rows: Vec<_> = world
            .notifications
            .values()
            .filter(|n| n.notifiable_type == kind && ids.contains(&n.notifiable_id))
            .cloned()
            .collect();
        rows.sort_by_key(|n| n.id);
        Ok(rows)
    }

    async fn delete_by_notifiable(
        &self,
        kind: NotifiableKind,
        ids: &[i64],
    ) -> Result<u64, EngineError> {
        let mut world = self.world.lock().unwrap();
        let before = world.notifications.len();
        world
            .notifications
            .retain(|k, _| !(k.notifiable_type == kind && ids.contains(&k.notifiable_id)));
        Ok((before - world.notifications.len()) as u64)
    }

    async fn delete_by_action(
        &self,
        kind: NotifiableKind,
        ids: &[i64],
        action: &str,
    ) -> Result<u64, EngineError> {
        let mut world = self.world.lock().unwrap();
        let before = world.notifications.len();
        world.notifications.retain(|k, _| {
            !(k.notifiable_type == kind
                && ids.contains(&k.notifiable_id)
                && k.action.as_deref() == Some(action))
        });
        Ok((before - world.notifications.len()) as u64)
    }

    async fn update_json_by_notifiable(
        &self,
        kind: NotifiableKind,
        id: i64,
        action: Option<&str>,
        json_data: serde_json::Value,
    ) -> Result<u64, EngineError> {
        let mut world = self.world.lock().unwrap();
        let now = Utc::now();
        let mut touched = 0;
        for (key, row) in world.notifications.iter_mut() {
            if key.notifiable_type == kind
                && key.notifiable_id == id
                && key.action.as_deref() == action
            {
                row.json_data = json_data.clone();
                row.updated_at = now;
                touched += 1;
            }
        }
        Ok(touched)
    }
}

#[async_trait]
impl FollowWindow for MemoryStore {
    async fn follows_for(
        &self,
        followable: FollowableRef,
        since: DateTime<Utc>,
    ) -> Result<Vec<Follow>, EngineError> {
        let world = self.world.lock().unwrap();
        let mut rows: Vec<_> = world
            .follows
            .iter()
            .filter(|f| f.followable == followable && f.created_at > since)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }
}

#[async_trait]
impl EntityReader for MemoryStore {
    async fn follow(&self, id: i64) -> Result<Option<Follow>, EngineError> {
        Ok(self
            .world
            .lock()
            .unwrap()
            .follows
            .iter()
            .find(|f| f.id == id)
            .cloned())
    }

    async fn user(&self, id: i64) -> Result<Option<User>, EngineError> {
        Ok(self.world.lock().unwrap().users.get(&id).cloned())
    }

    async fn organization(&self, id: i64) -> Result<Option<Organization>, EngineError> {
        Ok(self.world.lock().unwrap().organizations.get(&id).cloned())
    }

    async fn article(&self, id: i64) -> Result<Option<Article>, EngineError> {
        Ok(self.world.lock().unwrap().articles.get(&id).cloned())
    }

    async fn comment(&self, id: i64) -> Result<Option<Comment>, EngineError> {
        Ok(self.world.lock().unwrap().comments.get(&id).cloned())
    }

    async fn spam_footprint(&self, user_id: i64) -> Result<SpamFootprint, EngineError> {
        let world = self.world.lock().unwrap();
        Ok(SpamFootprint {
            follow_ids: world
                .follows
                .iter()
                .filter(|f| f.follower_id == user_id)
                .map(|f| f.id)
                .collect(),
            comment_ids: world
                .comments
                .values()
                .filter(|c| c.user_id == user_id)
                .map(|c| c.id)
                .collect(),
            article_ids: world
                .articles
                .values()
                .filter(|a| a.user_id == user_id)
                .map(|a| a.id)
                .collect(),
        })
    }
}

#[async_trait]
impl ModeratorDirectory for MemoryStore {
    async fn eligible(&self, cooled_before: DateTime<Utc>) -> Result<Vec<Moderator>, EngineError> {
        let world = self.world.lock().unwrap();
        let mut pool: Vec<_> = world
            .moderators
            .iter()
            .filter(|(user_id, last)| {
                **last < cooled_before
                    && world.users.get(user_id).map(|u| !u.limited).unwrap_or(true)
            })
            .map(|(user_id, last)| Moderator {
                user_id: *user_id,
                last_moderation_notification: *last,
            })
            .collect();
        pool.sort_by_key(|m| m.user_id);
        Ok(pool)
    }

    async fn record_assignment(
        &self,
        user_ids: &[i64],
        at: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let mut world = self.world.lock().unwrap();
        for id in user_ids {
            if let Some(last) = world.moderators.get_mut(id) {
                *last = at;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CacheInvalidator for MemoryStore {
    async fn invalidate(&self, kind: NotifiableKind, id: i64) {
        self.world.lock().unwrap().invalidations.push((kind, id));
    }
}
