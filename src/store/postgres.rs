//! sqlx/Postgres implementation of the store and collaborator seams.
//!
//! The natural key lives in the schema as a `UNIQUE NULLS NOT DISTINCT`
//! constraint, so every write here is a single `INSERT .. ON CONFLICT`,
//! `UPDATE` or `DELETE` against that key — last writer wins on
//! `json_data`/`notified_at` and concurrent callers cannot produce
//! duplicate rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;

use crate::errors::EngineError;
use crate::models::{
    AggregateState, Article, Comment, Follow, FollowableRef, Moderator, NotifiableKind,
    Notification, NotificationKey, NotificationWrite, Organization, Recipient, Reconciled,
    SpamFootprint, User,
};
use crate::store::{
    CacheInvalidator, EntityReader, FollowWindow, ModeratorDirectory, NotificationStore,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

// ── Row mapping ──────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: i64,
    recipient_user_id: Option<i64>,
    recipient_organization_id: Option<i64>,
    notifiable_type: String,
    notifiable_id: i64,
    action: Option<String>,
    json_data: serde_json::Value,
    notified_at: DateTime<Utc>,
    read: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = EngineError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let recipient = match (row.recipient_user_id, row.recipient_organization_id) {
            (Some(user_id), None) => Recipient::User(user_id),
            (None, Some(org_id)) => Recipient::Organization(org_id),
            _ => {
                return Err(EngineError::Internal(anyhow::anyhow!(
                    "notification {} violates the one-recipient invariant",
                    row.id
                )))
            }
        };
        Ok(Notification {
            id: row.id,
            recipient,
            notifiable_type: row.notifiable_type.parse()?,
            notifiable_id: row.notifiable_id,
            action: row.action,
            json_data: row.json_data,
            notified_at: row.notified_at,
            read: row.read,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = "id, recipient_user_id, recipient_organization_id, \
     notifiable_type, notifiable_id, action, json_data, notified_at, read, \
     created_at, updated_at";

// ── NotificationStore ────────────────────────────────────────

#[async_trait]
impl NotificationStore for PgStore {
    async fn upsert_by_natural_key(
        &self,
        key: &NotificationKey,
        write: NotificationWrite,
    ) -> Result<Notification, EngineError> {
        let sql = format!(
            r#"INSERT INTO notifications
                   (recipient_user_id, recipient_organization_id, notifiable_type,
                    notifiable_id, action, json_data, notified_at, read)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               ON CONFLICT ON CONSTRAINT notifications_natural_key
               DO UPDATE SET json_data = EXCLUDED.json_data,
                             notified_at = EXCLUDED.notified_at,
                             updated_at = NOW()
               RETURNING {SELECT_COLUMNS}"#
        );
        let row = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(key.recipient.user_id())
            .bind(key.recipient.organization_id())
            .bind(key.notifiable_type.as_str())
            .bind(key.notifiable_id)
            .bind(key.action.as_deref())
            .bind(&write.json_data)
            .bind(write.notified_at)
            .bind(write.read)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn delete_by_natural_key(&self, key: &NotificationKey) -> Result<bool, EngineError> {
        let result = sqlx::query(
            r#"DELETE FROM notifications
               WHERE recipient_user_id IS NOT DISTINCT FROM $1
                 AND recipient_organization_id IS NOT DISTINCT FROM $2
                 AND notifiable_type = $3
                 AND notifiable_id = $4
                 AND action IS NOT DISTINCT FROM $5"#,
        )
        .bind(key.recipient.user_id())
        .bind(key.recipient.organization_id())
        .bind(key.notifiable_type.as_str())
        .bind(key.notifiable_id)
        .bind(key.action.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reconcile_aggregate(
        &self,
        recipient: Recipient,
        kind: NotifiableKind,
        action: Option<&str>,
        state: Option<AggregateState>,
    ) -> Result<Reconciled, EngineError> {
        match state {
            None => {
                let result = sqlx::query(
                    r#"DELETE FROM notifications
                       WHERE recipient_user_id IS NOT DISTINCT FROM $1
                         AND recipient_organization_id IS NOT DISTINCT FROM $2
                         AND notifiable_type = $3
                         AND action IS NOT DISTINCT FROM $4"#,
                )
                .bind(recipient.user_id())
                .bind(recipient.organization_id())
                .bind(kind.as_str())
                .bind(action)
                .execute(&self.pool)
                .await?;
                if result.rows_affected() > 0 {
                    Ok(Reconciled::Deleted)
                } else {
                    Ok(Reconciled::Absent)
                }
            }
            Some(state) => {
                // The aggregate key ignores notifiable_id, so a plain upsert
                // on the full natural key is not enough: first rewrite any
                // existing row in place, then insert if nothing matched.
                // The trailing ON CONFLICT absorbs the insert/insert race.
                let mut tx = self.pool.begin().await?;
                let updated = sqlx::query(
                    r#"UPDATE notifications
                       SET notifiable_id = $5, json_data = $6, notified_at = $7,
                           read = $8, updated_at = NOW()
                       WHERE recipient_user_id IS NOT DISTINCT FROM $1
                         AND recipient_organization_id IS NOT DISTINCT FROM $2
                         AND notifiable_type = $3
                         AND action IS NOT DISTINCT FROM $4"#,
                )
                .bind(recipient.user_id())
                .bind(recipient.organization_id())
                .bind(kind.as_str())
                .bind(action)
                .bind(state.notifiable_id)
                .bind(&state.json_data)
                .bind(state.notified_at)
                .bind(state.read)
                .execute(&mut *tx)
                .await?;

                if updated.rows_affected() == 0 {
                    sqlx::query(
                        r#"INSERT INTO notifications
                               (recipient_user_id, recipient_organization_id,
                                notifiable_type, notifiable_id, action, json_data,
                                notified_at, read)
                           VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                           ON CONFLICT ON CONSTRAINT notifications_natural_key
                           DO UPDATE SET json_data = EXCLUDED.json_data,
                                         notified_at = EXCLUDED.notified_at,
                                         read = EXCLUDED.read,
                                         updated_at = NOW()"#,
                    )
                    .bind(recipient.user_id())
                    .bind(recipient.organization_id())
                    .bind(kind.as_str())
                    .bind(state.notifiable_id)
                    .bind(action)
                    .bind(&state.json_data)
                    .bind(state.notified_at)
                    .bind(state.read)
                    .execute(&mut *tx)
                    .await?;
                }
                tx.commit().await?;
                Ok(Reconciled::Written)
            }
        }
    }

    async fn find_by_notifiable(
        &self,
        kind: NotifiableKind,
        ids: &[i64],
    ) -> Result<Vec<Notification>, EngineError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM notifications \
             WHERE notifiable_type = $1 AND notifiable_id = ANY($2) \
             ORDER BY id ASC"
        );
        let rows = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(kind.as_str())
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Notification::try_from).collect()
    }

    async fn delete_by_notifiable(
        &self,
        kind: NotifiableKind,
        ids: &[i64],
    ) -> Result<u64, EngineError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "DELETE FROM notifications WHERE notifiable_type = $1 AND notifiable_id = ANY($2)",
        )
        .bind(kind.as_str())
        .bind(ids)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_by_action(
        &self,
        kind: NotifiableKind,
        ids: &[i64],
        action: &str,
    ) -> Result<u64, EngineError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            r#"DELETE FROM notifications
               WHERE notifiable_type = $1 AND notifiable_id = ANY($2) AND action = $3"#,
        )
        .bind(kind.as_str())
        .bind(ids)
        .bind(action)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn update_json_by_notifiable(
        &self,
        kind: NotifiableKind,
        id: i64,
        action: Option<&str>,
        json_data: serde_json::Value,
    ) -> Result<u64, EngineError> {
        let result = sqlx::query(
            r#"UPDATE notifications
               SET json_data = $4, updated_at = NOW()
               WHERE notifiable_type = $1 AND notifiable_id = $2
                 AND action IS NOT DISTINCT FROM $3"#,
        )
        .bind(kind.as_str())
        .bind(id)
        .bind(action)
        .bind(json_data)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

// ── FollowWindow ─────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
struct FollowRow {
    id: i64,
    follower_id: i64,
    followable_type: String,
    followable_id: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<FollowRow> for Follow {
    type Error = EngineError;

    fn try_from(row: FollowRow) -> Result<Self, Self::Error> {
        let followable = match row.followable_type.as_str() {
            "User" => FollowableRef::User(row.followable_id),
            "Organization" => FollowableRef::Organization(row.followable_id),
            other => {
                return Err(EngineError::Internal(anyhow::anyhow!(
                    "follow {} targets unsupported followable type {other}",
                    row.id
                )))
            }
        };
        Ok(Follow {
            id: row.id,
            follower_id: row.follower_id,
            followable,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl FollowWindow for PgStore {
    async fn follows_for(
        &self,
        followable: FollowableRef,
        since: DateTime<Utc>,
    ) -> Result<Vec<Follow>, EngineError> {
        let rows = sqlx::query_as::<_, FollowRow>(
            r#"SELECT id, follower_id, followable_type, followable_id, created_at
               FROM follows
               WHERE followable_type = $1 AND followable_id = $2 AND created_at > $3
               ORDER BY created_at DESC, id DESC"#,
        )
        .bind(followable.type_name())
        .bind(followable.id())
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Follow::try_from).collect()
    }
}

// ── EntityReader ─────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    name: String,
    username: String,
    profile_image_url: String,
    comments_count: i64,
    limited: bool,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl EntityReader for PgStore {
    async fn follow(&self, id: i64) -> Result<Option<Follow>, EngineError> {
        let row = sqlx::query_as::<_, FollowRow>(
            "SELECT id, follower_id, followable_type, followable_id, created_at \
             FROM follows WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Follow::try_from).transpose()
    }

    async fn user(&self, id: i64) -> Result<Option<User>, EngineError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, username, profile_image_url, comments_count, limited, created_at \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| User {
            id: r.id,
            name: r.name,
            username: r.username,
            profile_image_url: r.profile_image_url,
            comments_count: r.comments_count,
            limited: r.limited,
            created_at: r.created_at,
        }))
    }

    async fn organization(&self, id: i64) -> Result<Option<Organization>, EngineError> {
        let row = sqlx::query_as::<_, (i64, String, String, String)>(
            "SELECT id, name, slug, profile_image_url FROM organizations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, name, slug, profile_image_url)| Organization {
            id,
            name,
            slug,
            profile_image_url,
        }))
    }

    async fn article(&self, id: i64) -> Result<Option<Article>, EngineError> {
        let row = sqlx::query_as::<_, (i64, String, String, String, i64, Option<i64>, bool)>(
            "SELECT id, title, path, description, user_id, organization_id, published \
             FROM articles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(
            |(id, title, path, description, user_id, organization_id, published)| Article {
                id,
                title,
                path,
                description,
                user_id,
                organization_id,
                published,
            },
        ))
    }

    async fn comment(&self, id: i64) -> Result<Option<Comment>, EngineError> {
        let row = sqlx::query_as::<_, (i64, String, String, i64, i64)>(
            "SELECT id, title, path, user_id, article_id FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, title, path, user_id, article_id)| Comment {
            id,
            title,
            path,
            user_id,
            article_id,
        }))
    }

    async fn spam_footprint(&self, user_id: i64) -> Result<SpamFootprint, EngineError> {
        let follow_ids =
            sqlx::query_scalar::<_, i64>("SELECT id FROM follows WHERE follower_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        let comment_ids =
            sqlx::query_scalar::<_, i64>("SELECT id FROM comments WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        let article_ids =
            sqlx::query_scalar::<_, i64>("SELECT id FROM articles WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(SpamFootprint {
            follow_ids,
            comment_ids,
            article_ids,
        })
    }
}

// ── ModeratorDirectory ───────────────────────────────────────

#[async_trait]
impl ModeratorDirectory for PgStore {
    async fn eligible(&self, cooled_before: DateTime<Utc>) -> Result<Vec<Moderator>, EngineError> {
        let rows = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
            r#"SELECT id, last_moderation_notification FROM users
               WHERE trusted = TRUE AND limited = FALSE
                 AND last_moderation_notification < $1"#,
        )
        .bind(cooled_before)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(user_id, last_moderation_notification)| Moderator {
                user_id,
                last_moderation_notification,
            })
            .collect())
    }

    async fn record_assignment(
        &self,
        user_ids: &[i64],
        at: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        if user_ids.is_empty() {
            return Ok(());
        }
        sqlx::query("UPDATE users SET last_moderation_notification = $2 WHERE id = ANY($1)")
            .bind(user_ids)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ── CacheInvalidator ─────────────────────────────────────────

#[async_trait]
impl CacheInvalidator for PgStore {
    /// The real sink lives at the edge; from here it is a log line keyed
    /// the way the external collaborator expects.
    async fn invalidate(&self, kind: NotifiableKind, id: i64) {
        tracing::debug!(kind = %kind, id, "cache invalidation requested");
    }
}
