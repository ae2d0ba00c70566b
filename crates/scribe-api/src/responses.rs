//! Row-to-JSON shaping. Owner fields are resolved into the response; the
//! password hash never leaves the store layer.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use scribe_db::models::{CommentRecord, PostRecord, UserRow};
use scribe_types::api::{CommentResponse, PostResponse, UserResponse};
use scribe_types::models::{Privacy, Reactions, Role, User};

pub(crate) fn parse_id(value: &str, what: &str) -> Uuid {
    value.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} id '{}': {}", what, value, e);
        Uuid::default()
    })
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Parse as naive UTC and convert.
pub(crate) fn parse_timestamp(value: &str) -> DateTime<Utc> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", value, e);
            DateTime::default()
        })
}

pub(crate) fn user_from_row(row: &UserRow) -> User {
    User {
        id: parse_id(&row.id, "user"),
        first_name: row.first_name.clone(),
        last_name: row.last_name.clone(),
        full_name: row.full_name.clone(),
        username: row.username.clone(),
        email: row.email.clone(),
        role: Role::parse(&row.role),
    }
}

pub(crate) fn user_response(row: &UserRow) -> UserResponse {
    UserResponse {
        id: parse_id(&row.id, "user"),
        first_name: row.first_name.clone(),
        last_name: row.last_name.clone(),
        full_name: row.full_name.clone(),
        username: row.username.clone(),
        email: row.email.clone(),
        role: Role::parse(&row.role),
    }
}

pub(crate) fn post_response(rec: &PostRecord, editable: Option<bool>) -> PostResponse {
    PostResponse {
        id: parse_id(&rec.post.id, "post"),
        title: rec.post.title.clone(),
        text: rec.post.text.clone(),
        privacy: Privacy::parse(&rec.post.privacy),
        reactions: Reactions {
            like: rec.post.likes,
            dislike: rec.post.dislikes,
        },
        user: user_response(&rec.owner),
        created_at: parse_timestamp(&rec.post.created_at),
        updated_at: parse_timestamp(&rec.post.updated_at),
        editable,
    }
}

pub(crate) fn comment_response(rec: &CommentRecord) -> CommentResponse {
    CommentResponse {
        id: parse_id(&rec.comment.id, "comment"),
        text: rec.comment.text.clone(),
        reactions: Reactions {
            like: rec.comment.likes,
            dislike: rec.comment.dislikes,
        },
        post_id: parse_id(&rec.comment.post_id, "post"),
        user: user_response(&rec.owner),
        created_at: parse_timestamp(&rec.comment.created_at),
        updated_at: parse_timestamp(&rec.comment.updated_at),
    }
}
