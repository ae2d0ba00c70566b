use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde_json::json;
use uuid::Uuid;

use scribe_db::Database;
use scribe_types::api::{Claims, LoginRequest, TokenResponse};

use crate::error::ApiError;
use crate::validate::{self, FieldSpec, Rule};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

/// Fixed claim values. Tokens carrying any other issuer or audience are
/// rejected by verification.
pub const TOKEN_ISSUER: &str = "https://api.scribe.blog";
pub const TOKEN_AUDIENCE: &str = "https://app.scribe.blog";

/// Expiry is the only invalidation mechanism; no refresh, no revocation.
const TOKEN_TTL_HOURS: i64 = 24;

const LOGIN_CHECKS: &[FieldSpec] = &[
    FieldSpec {
        field: "username",
        rules: &[Rule::Required("Username must not be empty.")],
    },
    FieldSpec {
        field: "password",
        rules: &[Rule::Required("Password must not be empty.")],
    },
];

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let checked = validate::run(
        LOGIN_CHECKS,
        &[("username", &req.username), ("password", &req.password)],
    );
    if !checked.errors.is_empty() {
        return Ok((StatusCode::BAD_REQUEST, Json(checked.into_errors_body())).into_response());
    }

    let Some(user) = state.db.get_user_by_username(checked.get("username"))? else {
        return Ok((
            StatusCode::FORBIDDEN,
            Json(json!({ "message": "Incorrect username" })),
        )
            .into_response());
    };

    if !verify_password(checked.get("password"), &user.password)? {
        return Ok((
            StatusCode::FORBIDDEN,
            Json(json!({ "message": "Incorrect password" })),
        )
            .into_response());
    }

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {}", user.id, e))?;

    let token = create_token(&state.jwt_secret, user_id)?;

    Ok(Json(TokenResponse { token }).into_response())
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

fn verify_password(password: &str, stored_hash: &str) -> anyhow::Result<bool> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|e| anyhow::anyhow!("corrupt password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn create_token(secret: &str, user_id: Uuid) -> anyhow::Result<String> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id,
        iss: TOKEN_ISSUER.to_string(),
        aud: TOKEN_AUDIENCE.to_string(),
        iat: now.timestamp(),
        exp: (now + chrono::Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify signature, expiry, issuer, and audience. Any failure collapses
/// to `None`; the middleware decides whether that means 401 (strict) or
/// anonymous (optional).
pub fn decode_token(secret: &str, token: &str) -> Option<Claims> {
    let mut validation = Validation::default();
    validation.set_issuer(&[TOKEN_ISSUER]);
    validation.set_audience(&[TOKEN_AUDIENCE]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .ok()
}
