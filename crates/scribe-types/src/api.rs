use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Privacy, Reactions, Role};

// -- JWT Claims --

/// Canonical claims definition shared by token issuance (login) and the
/// REST middleware. Expiry is the only invalidation mechanism.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

// -- Auth --

/// Request fields default to empty strings so that missing fields flow
/// through validation (and produce field errors) instead of failing
/// deserialization.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

// -- Users --

#[derive(Debug, Deserialize)]
pub struct UserPayload {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirmation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub role: Role,
}

// -- Posts --

#[derive(Debug, Deserialize)]
pub struct PostPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub privacy: String,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub privacy: Privacy,
    pub reactions: Reactions,
    pub user: UserResponse,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Only present on the collection endpoint: true iff the viewing
    /// identity owns the post, independent of admin status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editable: Option<bool>,
}

// -- Comments --

#[derive(Debug, Deserialize)]
pub struct CommentPayload {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub text: String,
    pub reactions: Reactions,
    pub post_id: Uuid,
    pub user: UserResponse,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
