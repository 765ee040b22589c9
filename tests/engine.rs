//! Integration tests for the fan-out engine over the in-memory store.
//!
//! These cover the behavioral contract end-to-end:
//! 1. Natural-key uniqueness under repeated upserts
//! 2. Follow-burst aggregation (distinct followers, most-recent-first,
//!    window expiry, emptying)
//! 3. Moderator assignment fairness, cooldown and self-exclusion
//! 4. Snapshot resync scoping
//! 5. Guarded bulk removal and cache invalidation

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use fanout::engine::{Engine, ACTION_FOLLOW, ACTION_MODERATION, ACTION_PUBLISHED};
use fanout::models::{
    Article, Comment, FollowableRef, NotifiableKind, NotificationKey, NotificationWrite,
    Organization, Recipient, User,
};
use fanout::store::memory::MemoryStore;
use fanout::store::NotificationStore;

fn user(id: i64, username: &str) -> User {
    User {
        id,
        name: username.to_uppercase(),
        username: username.to_string(),
        profile_image_url: format!("https://img.example/{username}.png"),
        comments_count: 0,
        limited: false,
        created_at: Utc::now() - Duration::days(30),
    }
}

fn limited_user(id: i64, username: &str) -> User {
    User {
        limited: true,
        ..user(id, username)
    }
}

fn article(id: i64, author_id: i64) -> Article {
    Article {
        id,
        title: format!("Article {id}"),
        path: format!("/articles/{id}"),
        description: String::new(),
        user_id: author_id,
        organization_id: None,
        published: true,
    }
}

fn comment(id: i64, author_id: i64, article_id: i64) -> Comment {
    Comment {
        id,
        title: format!("Comment {id}"),
        path: format!("/comments/{id}"),
        user_id: author_id,
        article_id,
    }
}

/// Engine over one shared in-memory world, with a one-hour moderation
/// cooldown so cooldown behavior is easy to stage.
fn engine_over(store: &Arc<MemoryStore>) -> Engine {
    Engine::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        Duration::hours(1),
    )
}

fn hours_ago(h: i64) -> DateTime<Utc> {
    Utc::now() - Duration::hours(h)
}

mod natural_key {
    use super::*;

    #[tokio::test]
    async fn repeated_upserts_keep_one_row() {
        let store = Arc::new(MemoryStore::new());
        let key = NotificationKey {
            recipient: Recipient::User(1),
            notifiable_type: NotifiableKind::Comment,
            notifiable_id: 9,
            action: Some(ACTION_MODERATION.to_string()),
        };

        for i in 0..3 {
            store
                .upsert_by_natural_key(
                    &key,
                    NotificationWrite {
                        json_data: json!({ "round": i }),
                        notified_at: Utc::now(),
                        read: false,
                    },
                )
                .await
                .unwrap();
        }

        let rows = store.notifications();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].json_data["round"], 2);
    }

    #[tokio::test]
    async fn read_state_survives_upsert() {
        let store = Arc::new(MemoryStore::new());
        let key = NotificationKey {
            recipient: Recipient::User(1),
            notifiable_type: NotifiableKind::Article,
            notifiable_id: 4,
            action: None,
        };
        let write = |read| NotificationWrite {
            json_data: json!({}),
            notified_at: Utc::now(),
            read,
        };

        store.upsert_by_natural_key(&key, write(true)).await.unwrap();
        let row = store.upsert_by_natural_key(&key, write(false)).await.unwrap();
        assert!(row.read, "upsert must not reset a stored read flag");
    }

    #[tokio::test]
    async fn distinct_actions_are_distinct_rows() {
        let store = Arc::new(MemoryStore::new());
        let base = NotificationKey {
            recipient: Recipient::User(1),
            notifiable_type: NotifiableKind::Article,
            notifiable_id: 4,
            action: None,
        };
        let published = NotificationKey {
            action: Some(ACTION_PUBLISHED.to_string()),
            ..base.clone()
        };
        let write = NotificationWrite {
            json_data: json!({}),
            notified_at: Utc::now(),
            read: false,
        };

        store.upsert_by_natural_key(&base, write.clone()).await.unwrap();
        store.upsert_by_natural_key(&published, write).await.unwrap();
        assert_eq!(store.notifications().len(), 2);
    }

    #[tokio::test]
    async fn find_by_notifiable_scopes_kind_and_ids() {
        let store = Arc::new(MemoryStore::new());
        let write = || NotificationWrite {
            json_data: json!({}),
            notified_at: Utc::now(),
            read: false,
        };
        let seed = |recipient, kind, id, action: Option<&str>| NotificationKey {
            recipient,
            notifiable_type: kind,
            notifiable_id: id,
            action: action.map(String::from),
        };

        // Two actions on article 5, one row each for article 6 and comment 5.
        for key in [
            seed(Recipient::User(1), NotifiableKind::Article, 5, None),
            seed(
                Recipient::User(2),
                NotifiableKind::Article,
                5,
                Some(ACTION_PUBLISHED),
            ),
            seed(Recipient::User(3), NotifiableKind::Article, 6, None),
            seed(Recipient::User(4), NotifiableKind::Comment, 5, None),
        ] {
            store.upsert_by_natural_key(&key, write()).await.unwrap();
        }

        let rows = store
            .find_by_notifiable(NotifiableKind::Article, &[5, 6])
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.windows(2).all(|w| w[0].id < w[1].id));
        assert!(rows
            .iter()
            .all(|r| r.notifiable_type == NotifiableKind::Article));

        let comment_rows = store
            .find_by_notifiable(NotifiableKind::Comment, &[5])
            .await
            .unwrap();
        assert_eq!(comment_rows.len(), 1);
        assert_eq!(comment_rows[0].recipient, Recipient::User(4));

        let none = store
            .find_by_notifiable(NotifiableKind::Article, &[])
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let store = Arc::new(MemoryStore::new());
        let key = NotificationKey {
            recipient: Recipient::Organization(7),
            notifiable_type: NotifiableKind::Mention,
            notifiable_id: 2,
            action: None,
        };
        store
            .upsert_by_natural_key(
                &key,
                NotificationWrite {
                    json_data: json!({}),
                    notified_at: Utc::now(),
                    read: false,
                },
            )
            .await
            .unwrap();

        assert!(store.delete_by_natural_key(&key).await.unwrap());
        assert!(!store.delete_by_natural_key(&key).await.unwrap());
    }
}

mod follow_aggregation {
    use super::*;

    #[tokio::test]
    async fn burst_collapses_into_one_row_most_recent_first() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        store.add_user(user(10, "target"));
        store.add_user(user(1, "alice"));
        store.add_user(user(2, "carol"));

        let target = FollowableRef::User(10);
        store.add_follow(1, target, hours_ago(2));
        let newest = store.add_follow(2, target, hours_ago(1));

        engine.refresh_follow_aggregate(newest, false).await.unwrap();

        let rows = store.notifications();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.recipient, Recipient::User(10));
        assert_eq!(row.notifiable_type, NotifiableKind::Follow);
        assert_eq!(row.notifiable_id, newest);
        assert_eq!(row.action.as_deref(), Some(ACTION_FOLLOW));
        assert!(!row.read);

        let siblings = row.json_data["aggregated_siblings"].as_array().unwrap();
        assert_eq!(siblings.len(), 2);
        assert_eq!(siblings[0]["username"], "carol");
        assert_eq!(siblings[1]["username"], "alice");
        assert_eq!(row.json_data["user"]["username"], "carol");
    }

    #[tokio::test]
    async fn expired_follows_drop_out_on_recompute() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        store.add_user(user(10, "target"));
        store.add_user(user(1, "alice"));
        store.add_user(user(2, "carol"));
        store.add_user(user(3, "dave"));

        let target = FollowableRef::User(10);
        store.add_follow(1, target, hours_ago(25)); // expired
        store.add_follow(2, target, hours_ago(23));
        let newest = store.add_follow(3, target, hours_ago(0));

        engine.refresh_follow_aggregate(newest, false).await.unwrap();

        let rows = store.notifications();
        assert_eq!(rows.len(), 1);
        let siblings = rows[0].json_data["aggregated_siblings"].as_array().unwrap();
        let names: Vec<_> = siblings.iter().map(|s| s["username"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["dave", "carol"]);
    }

    #[tokio::test]
    async fn refollow_counts_once() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        store.add_user(user(10, "target"));
        store.add_user(user(1, "alice"));

        let target = FollowableRef::User(10);
        store.add_follow(1, target, hours_ago(3));
        let latest = store.add_follow(1, target, hours_ago(1));

        engine.refresh_follow_aggregate(latest, false).await.unwrap();

        let rows = store.notifications();
        let siblings = rows[0].json_data["aggregated_siblings"].as_array().unwrap();
        assert_eq!(siblings.len(), 1);
        assert_eq!(rows[0].notifiable_id, latest);
    }

    #[tokio::test]
    async fn emptied_window_removes_row_and_stays_removed() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        store.add_user(user(10, "target"));
        store.add_user(user(1, "alice"));

        let target = FollowableRef::User(10);
        let fresh = store.add_follow(1, target, hours_ago(0));
        engine.refresh_follow_aggregate(fresh, false).await.unwrap();
        assert_eq!(store.notifications().len(), 1);

        // The fresh follow is retracted; only a long-expired one remains to
        // trigger on.
        store.remove_follow(fresh);
        let stale = store.add_follow(1, target, hours_ago(30));
        engine.refresh_follow_aggregate(stale, true).await.unwrap();
        assert!(store.notifications().is_empty());

        // Re-triggering against an already-absent row is a no-op.
        engine.refresh_follow_aggregate(stale, true).await.unwrap();
        assert!(store.notifications().is_empty());
    }

    #[tokio::test]
    async fn deleted_trigger_is_a_missing_entity() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);

        let err = engine.refresh_follow_aggregate(999, false).await.unwrap_err();
        assert!(err.is_missing_entity());
    }

    #[tokio::test]
    async fn organization_followable_routes_to_organization() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        store.add_user(user(1, "alice"));
        store.add_organization(Organization {
            id: 77,
            name: "Acme".into(),
            slug: "acme".into(),
            profile_image_url: String::new(),
        });

        let follow = store.add_follow(1, FollowableRef::Organization(77), hours_ago(0));
        engine.refresh_follow_aggregate(follow, false).await.unwrap();

        let rows = store.notifications();
        assert_eq!(rows[0].recipient, Recipient::Organization(77));
    }

    #[tokio::test]
    async fn vanished_followers_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        store.add_user(user(10, "target"));
        store.add_user(user(2, "carol"));
        // follower 1 has no user row at execution time

        let target = FollowableRef::User(10);
        store.add_follow(1, target, hours_ago(2));
        let newest = store.add_follow(2, target, hours_ago(1));

        engine.refresh_follow_aggregate(newest, false).await.unwrap();

        let rows = store.notifications();
        let siblings = rows[0].json_data["aggregated_siblings"].as_array().unwrap();
        assert_eq!(siblings.len(), 1);
        assert_eq!(siblings[0]["username"], "carol");
    }

    #[tokio::test]
    async fn read_flag_is_carried_from_caller() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        store.add_user(user(10, "target"));
        store.add_user(user(1, "alice"));

        let follow = store.add_follow(1, FollowableRef::User(10), hours_ago(0));
        engine.refresh_follow_aggregate(follow, true).await.unwrap();

        assert!(store.notifications()[0].read);
    }
}

mod moderation {
    use super::*;

    fn seed_moderators(store: &MemoryStore, ids: &[i64]) {
        for id in ids {
            store.add_user(user(*id, &format!("mod{id}")));
            store.add_moderator(*id, hours_ago(48));
        }
    }

    #[tokio::test]
    async fn assigns_exactly_sample_size_moderators() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        store.add_user(user(100, "author"));
        store.add_article(article(5, 100));
        seed_moderators(&store, &[1, 2, 3, 4]);

        engine
            .assign_moderators(NotifiableKind::Article, 5, 2)
            .await
            .unwrap();

        let rows = store.notifications();
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.notifiable_type, NotifiableKind::Article);
            assert_eq!(row.notifiable_id, 5);
            assert_eq!(row.action.as_deref(), Some(ACTION_MODERATION));
            assert_eq!(row.json_data["article"]["id"], 5);
            assert_eq!(row.json_data["user"]["username"], "author");
        }
    }

    #[tokio::test]
    async fn author_is_never_assigned_their_own_content() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        store.add_user(user(1, "author"));
        store.add_article(article(5, 1));
        // The author is also an eligible moderator.
        store.add_moderator(1, hours_ago(48));
        seed_moderators(&store, &[2]);

        engine
            .assign_moderators(NotifiableKind::Article, 5, 2)
            .await
            .unwrap();

        let rows = store.notifications();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].recipient, Recipient::User(2));
    }

    #[tokio::test]
    async fn cooldown_spreads_assignments_across_the_pool() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        store.add_user(user(100, "author"));
        store.add_article(article(5, 100));
        store.add_article(article(6, 100));
        store.add_article(article(7, 100));
        seed_moderators(&store, &[1, 2, 3, 4]);

        engine.assign_moderators(NotifiableKind::Article, 5, 2).await.unwrap();
        engine.assign_moderators(NotifiableKind::Article, 6, 2).await.unwrap();
        // Whole pool is now cooling down; a third call finds nobody.
        engine.assign_moderators(NotifiableKind::Article, 7, 2).await.unwrap();

        let rows = store.notifications();
        assert_eq!(rows.len(), 4);
        let mut per_moderator = std::collections::HashMap::new();
        for row in &rows {
            *per_moderator.entry(row.recipient).or_insert(0) += 1;
        }
        for (recipient, count) in per_moderator {
            assert_eq!(count, 1, "{recipient:?} was assigned more than once within cooldown");
        }
    }

    #[tokio::test]
    async fn assignment_advances_the_cooldown_clock() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        store.add_user(user(100, "author"));
        store.add_comment(comment(9, 100, 5));
        seed_moderators(&store, &[1]);
        let before = store.moderator_clock(1).unwrap();

        engine.assign_moderators(NotifiableKind::Comment, 9, 2).await.unwrap();

        assert!(store.moderator_clock(1).unwrap() > before);
    }

    #[tokio::test]
    async fn empty_pool_is_a_noop() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        store.add_user(user(100, "author"));
        store.add_article(article(5, 100));

        engine.assign_moderators(NotifiableKind::Article, 5, 2).await.unwrap();
        assert!(store.notifications().is_empty());
    }

    #[tokio::test]
    async fn limited_author_content_is_not_routed() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        store.add_user(limited_user(100, "restricted"));
        store.add_article(article(5, 100));
        seed_moderators(&store, &[1, 2]);

        engine.assign_moderators(NotifiableKind::Article, 5, 2).await.unwrap();
        assert!(store.notifications().is_empty());
    }

    #[tokio::test]
    async fn deleted_content_is_a_missing_entity() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        seed_moderators(&store, &[1, 2]);

        let err = engine
            .assign_moderators(NotifiableKind::Comment, 404, 2)
            .await
            .unwrap_err();
        assert!(err.is_missing_entity());
    }

    #[tokio::test]
    async fn non_moderatable_kinds_are_rejected() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);

        let err = engine
            .assign_moderators(NotifiableKind::Follow, 1, 2)
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn comment_payload_embeds_comment_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        store.add_user(user(100, "author"));
        store.add_comment(comment(9, 100, 5));
        seed_moderators(&store, &[1]);

        engine.assign_moderators(NotifiableKind::Comment, 9, 1).await.unwrap();

        let rows = store.notifications();
        assert_eq!(rows[0].json_data["comment"]["id"], 9);
        assert_eq!(rows[0].json_data["comment"]["path"], "/comments/9");
    }
}

mod resync {
    use super::*;

    async fn seed_row(
        store: &MemoryStore,
        recipient: Recipient,
        kind: NotifiableKind,
        id: i64,
        action: Option<&str>,
    ) {
        store
            .upsert_by_natural_key(
                &NotificationKey {
                    recipient,
                    notifiable_type: kind,
                    notifiable_id: id,
                    action: action.map(String::from),
                },
                NotificationWrite {
                    json_data: json!({ "stale": true }),
                    notified_at: Utc::now(),
                    read: false,
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rewrites_only_rows_matching_the_action() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        store.add_user(user(100, "author"));
        store.add_article(article(5, 100));
        seed_row(&store, Recipient::User(1), NotifiableKind::Article, 5, None).await;
        seed_row(
            &store,
            Recipient::User(2),
            NotifiableKind::Article,
            5,
            Some(ACTION_PUBLISHED),
        )
        .await;

        engine
            .resync_notifications(NotifiableKind::Article, 5, None)
            .await
            .unwrap();

        let rows = store.notifications();
        let untouched = rows.iter().find(|r| r.action.is_some()).unwrap();
        let refreshed = rows.iter().find(|r| r.action.is_none()).unwrap();
        assert_eq!(untouched.json_data["stale"], true);
        assert_eq!(refreshed.json_data["article"]["title"], "Article 5");
        assert_eq!(refreshed.json_data["user"]["username"], "author");
        // Routing fields stay put.
        assert_eq!(refreshed.recipient, Recipient::User(1));
    }

    #[tokio::test]
    async fn organization_snapshot_rides_along_when_present() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        store.add_user(user(100, "author"));
        store.add_organization(Organization {
            id: 8,
            name: "Acme".into(),
            slug: "acme".into(),
            profile_image_url: String::new(),
        });
        store.add_article(Article {
            organization_id: Some(8),
            ..article(5, 100)
        });
        seed_row(&store, Recipient::User(1), NotifiableKind::Article, 5, None).await;

        engine
            .resync_notifications(NotifiableKind::Article, 5, None)
            .await
            .unwrap();

        let rows = store.notifications();
        assert_eq!(rows[0].json_data["organization"]["slug"], "acme");
    }

    #[tokio::test]
    async fn comment_resync_rebuilds_comment_payload() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        store.add_user(user(100, "author"));
        store.add_comment(comment(9, 100, 5));
        seed_row(
            &store,
            Recipient::User(3),
            NotifiableKind::Comment,
            9,
            Some(ACTION_MODERATION),
        )
        .await;

        engine
            .resync_notifications(NotifiableKind::Comment, 9, Some(ACTION_MODERATION))
            .await
            .unwrap();

        let rows = store.notifications();
        assert_eq!(rows[0].json_data["comment"]["id"], 9);
    }

    #[tokio::test]
    async fn zero_matching_rows_is_a_clean_noop() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        store.add_user(user(100, "author"));
        store.add_article(article(5, 100));

        engine
            .resync_notifications(NotifiableKind::Article, 5, None)
            .await
            .unwrap();
        assert!(store.notifications().is_empty());
    }

    #[tokio::test]
    async fn deleted_source_is_a_missing_entity() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);

        let err = engine
            .resync_notifications(NotifiableKind::Article, 5, None)
            .await
            .unwrap_err();
        assert!(err.is_missing_entity());
    }
}

mod removal {
    use super::*;

    async fn seed_row(store: &MemoryStore, kind: NotifiableKind, id: i64, action: Option<&str>) {
        store
            .upsert_by_natural_key(
                &NotificationKey {
                    recipient: Recipient::User(id * 100),
                    notifiable_type: kind,
                    notifiable_id: id,
                    action: action.map(String::from),
                },
                NotificationWrite {
                    json_data: json!({}),
                    notified_at: Utc::now(),
                    read: false,
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn empty_id_list_is_a_noop() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        seed_row(&store, NotifiableKind::Article, 1, None).await;

        let removed = engine.remove_all(NotifiableKind::Article, &[]).await.unwrap();
        assert_eq!(removed, 0);
        assert_eq!(store.notifications().len(), 1);
        assert!(store.invalidations().is_empty());
    }

    #[tokio::test]
    async fn kinds_outside_the_allow_list_are_rejected() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);

        let err = engine
            .remove_all(NotifiableKind::Follow, &[1, 2])
            .await
            .unwrap_err();
        assert!(err.is_fatal());

        let err = engine
            .remove_all_by_action(NotifiableKind::BadgeAchievement, &[1], "Award")
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn removal_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        seed_row(&store, NotifiableKind::Comment, 1, None).await;
        seed_row(&store, NotifiableKind::Comment, 2, None).await;

        let first = engine
            .remove_all(NotifiableKind::Comment, &[1, 2])
            .await
            .unwrap();
        let second = engine
            .remove_all(NotifiableKind::Comment, &[1, 2])
            .await
            .unwrap();

        assert_eq!(first, 2);
        assert_eq!(second, 0);
        assert!(store.notifications().is_empty());
    }

    #[tokio::test]
    async fn action_scoped_removal_leaves_other_actions() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        seed_row(&store, NotifiableKind::Article, 1, Some(ACTION_PUBLISHED)).await;
        seed_row(&store, NotifiableKind::Article, 1, None).await;

        let removed = engine
            .remove_all_by_action(NotifiableKind::Article, &[1], ACTION_PUBLISHED)
            .await
            .unwrap();

        assert_eq!(removed, 1);
        let rows = store.notifications();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].action.is_none());
    }

    #[tokio::test]
    async fn removal_invalidates_downstream_caches() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);
        seed_row(&store, NotifiableKind::Mention, 3, None).await;

        engine.remove_all(NotifiableKind::Mention, &[3, 4]).await.unwrap();

        let invalidations = store.invalidations();
        assert!(invalidations.contains(&(NotifiableKind::Mention, 3)));
        assert!(invalidations.contains(&(NotifiableKind::Mention, 4)));
    }

    #[tokio::test]
    async fn spammer_cleanup_sweeps_their_entire_footprint() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);

        // The spammer follows someone (creating an aggregate), comments,
        // and has a published article.
        store.add_user(user(666, "spammer"));
        store.add_user(user(10, "target"));
        let follow = store.add_follow(666, FollowableRef::User(10), hours_ago(0));
        engine.refresh_follow_aggregate(follow, false).await.unwrap();

        store.add_comment(comment(9, 666, 5));
        seed_row(&store, NotifiableKind::Comment, 9, None).await;

        store.add_article(article(5, 666));
        seed_row(&store, NotifiableKind::Article, 5, Some(ACTION_PUBLISHED)).await;

        // An innocent bystander's notification must survive.
        seed_row(&store, NotifiableKind::Comment, 77, None).await;

        let removed = engine.remove_by_spammer(666).await.unwrap();
        assert_eq!(removed, 3);

        let rows = store.notifications();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].notifiable_id, 77);
    }

    #[tokio::test]
    async fn spammer_cleanup_for_unknown_user_is_missing_entity() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(&store);

        let err = engine.remove_by_spammer(404).await.unwrap_err();
        assert!(err.is_missing_entity());
    }
}
