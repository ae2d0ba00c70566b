use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use scribe_types::api::{UserPayload, UserResponse};
use scribe_types::models::Role;

use crate::auth::{self, AppState};
use crate::error::ApiError;
use crate::middleware::Identity;
use crate::policy;
use crate::responses::user_response;
use crate::validate::{self, FieldError, FieldSpec, Rule};

const USER_CHECKS: &[FieldSpec] = &[
    FieldSpec {
        field: "first_name",
        rules: &[
            Rule::MinLen(2, "First Name must not be less than 2 characters."),
            Rule::MaxLen(25, "First Name must not be greater than 25 characters."),
        ],
    },
    FieldSpec {
        field: "last_name",
        rules: &[
            Rule::MinLen(2, "Last Name must not be less than 2 characters."),
            Rule::MaxLen(25, "Last Name must not be greater than 25 characters."),
        ],
    },
    FieldSpec {
        field: "username",
        rules: &[
            Rule::MinLen(2, "Username must not be less than 2 characters."),
            Rule::MaxLen(25, "Username must not be greater than 25 characters."),
        ],
    },
    FieldSpec {
        field: "email",
        rules: &[Rule::Email("Email does not match.")],
    },
    FieldSpec {
        field: "password",
        rules: &[Rule::StrongPassword("Password is not strong enough.")],
    },
    FieldSpec {
        field: "password_confirmation",
        rules: &[Rule::Matches("password", "Password does not match.")],
    },
];

fn payload_fields(req: &UserPayload) -> Vec<(&'static str, &str)> {
    vec![
        ("first_name", req.first_name.as_str()),
        ("last_name", req.last_name.as_str()),
        ("username", req.username.as_str()),
        ("email", req.email.as_str()),
        ("password", req.password.as_str()),
        ("password_confirmation", req.password_confirmation.as_str()),
    ]
}

fn unique_message(field: &str) -> &'static str {
    if field == "email" {
        "Email already in use."
    } else {
        "Username already in use."
    }
}

/// Any authenticated user may list profiles; there is no admin gate on
/// reads.
pub async fn list_users(State(state): State<AppState>) -> Result<Response, ApiError> {
    let rows = state.db.list_users()?;

    if rows.is_empty() {
        return Err(ApiError::NotFound);
    }

    let users: Vec<UserResponse> = rows.iter().map(user_response).collect();
    Ok(Json(users).into_response())
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let Some(row) = state.db.get_user_by_id(&user_id.to_string())? else {
        return Err(ApiError::NotFound);
    };

    Ok(Json(user_response(&row)).into_response())
}

/// Registration. Open endpoint; the new account is always a Member.
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<UserPayload>,
) -> Result<Response, ApiError> {
    let mut checked = validate::run(USER_CHECKS, &payload_fields(&req));

    // Advisory uniqueness pre-check; the UNIQUE index below is the real
    // enforcement.
    if state
        .db
        .get_user_by_username(checked.get("username"))?
        .is_some()
    {
        checked
            .errors
            .push(FieldError::new("username", unique_message("username")));
    }
    if state.db.get_user_by_email(checked.get("email"))?.is_some() {
        checked
            .errors
            .push(FieldError::new("email", unique_message("email")));
    }

    if !checked.errors.is_empty() {
        return Ok(Json(checked.into_errors_body()).into_response());
    }

    let id = Uuid::new_v4();
    let password_hash = auth::hash_password(checked.get("password"))?;
    let full_name = format!("{} {}", checked.get("first_name"), checked.get("last_name"));

    if let Err(err) = state.db.create_user(
        &id.to_string(),
        checked.get("first_name"),
        checked.get("last_name"),
        &full_name,
        checked.get("username"),
        checked.get("email"),
        &password_hash,
        Role::Member.as_str(),
    ) {
        // Lost the race against a concurrent registration: fold the
        // conflict into the same field-scoped response.
        if let Some(field) = scribe_db::unique_violation(&err) {
            checked
                .errors
                .push(FieldError::new(field, unique_message(field)));
            return Ok(Json(checked.into_errors_body()).into_response());
        }
        return Err(err.into());
    }

    let row = state
        .db
        .get_user_by_id(&id.to_string())?
        .ok_or_else(|| anyhow::anyhow!("user {} missing after insert", id))?;

    Ok(Json(user_response(&row)).into_response())
}

/// Profile update, owner-only. The stored role is never touched and the
/// password is re-hashed from the submitted value.
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<UserPayload>,
) -> Result<Response, ApiError> {
    if !policy::can_update_user(&identity, user_id) {
        return Err(ApiError::Forbidden);
    }
    let current = identity.user.as_ref().ok_or(ApiError::Unauthorized)?;

    let mut checked = validate::run(USER_CHECKS, &payload_fields(&req));

    // Keeping your own username/email is not a conflict.
    if checked.get("username") != current.username
        && state
            .db
            .get_user_by_username(checked.get("username"))?
            .is_some()
    {
        checked
            .errors
            .push(FieldError::new("username", unique_message("username")));
    }
    if checked.get("email") != current.email
        && state.db.get_user_by_email(checked.get("email"))?.is_some()
    {
        checked
            .errors
            .push(FieldError::new("email", unique_message("email")));
    }

    if !checked.errors.is_empty() {
        return Ok(Json(checked.into_errors_body()).into_response());
    }

    let password_hash = auth::hash_password(checked.get("password"))?;
    let full_name = format!("{} {}", checked.get("first_name"), checked.get("last_name"));

    if let Err(err) = state.db.update_user(
        &user_id.to_string(),
        checked.get("first_name"),
        checked.get("last_name"),
        &full_name,
        checked.get("username"),
        checked.get("email"),
        &password_hash,
    ) {
        if let Some(field) = scribe_db::unique_violation(&err) {
            checked
                .errors
                .push(FieldError::new(field, unique_message(field)));
            return Ok(Json(checked.into_errors_body()).into_response());
        }
        return Err(err.into());
    }

    let row = state
        .db
        .get_user_by_id(&user_id.to_string())?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(user_response(&row)).into_response())
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(identity): Extension<Identity>,
) -> Result<Response, ApiError> {
    if !policy::can_delete_user(&identity, user_id) {
        return Err(ApiError::Forbidden);
    }

    state.db.delete_user(&user_id.to_string())?;

    Ok(StatusCode::OK.into_response())
}
