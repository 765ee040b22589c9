//! Snapshot builders: pure functions turning a source entity into the
//! denormalized fragment embedded in `json_data`. Renderers read these
//! blobs directly and never re-query the source tables, so every field a
//! renderer needs has to be present here.

use serde_json::{json, Value};

use crate::models::{Article, Comment, Organization, User};

pub fn user_snapshot(user: &User) -> Value {
    json!({
        "id": user.id,
        "class": { "name": "User" },
        "name": user.name,
        "username": user.username,
        "path": user.path(),
        "profile_image_90": user.profile_image_url,
        "comments_count": user.comments_count,
        "created_at": user.created_at.to_rfc3339(),
    })
}

pub fn organization_snapshot(org: &Organization) -> Value {
    json!({
        "id": org.id,
        "class": { "name": "Organization" },
        "name": org.name,
        "slug": org.slug,
        "path": org.path(),
        "profile_image_90": org.profile_image_url,
    })
}

pub fn article_snapshot(article: &Article) -> Value {
    json!({
        "id": article.id,
        "class": { "name": "Article" },
        "title": article.title,
        "path": article.path,
        "description": article.description,
    })
}

pub fn comment_snapshot(comment: &Comment) -> Value {
    json!({
        "id": comment.id,
        "class": { "name": "Comment" },
        "title": comment.title,
        "path": comment.path,
    })
}
