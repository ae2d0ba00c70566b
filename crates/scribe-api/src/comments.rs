use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;
use uuid::Uuid;

use scribe_types::api::{CommentPayload, CommentResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::Identity;
use crate::policy;
use crate::responses::{comment_response, parse_id};
use crate::validate::{self, FieldSpec, Rule};

const COMMENT_CHECKS: &[FieldSpec] = &[FieldSpec {
    field: "text",
    rules: &[
        Rule::Required("Comment must not be empty."),
        Rule::MaxLen(2500, "Comment must not be greater than 2500 characters."),
    ],
}];

/// Open endpoint with no privacy filter: comments under a post are
/// listed for any caller, even when the parent post is Private.
pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let db = state.clone();
    let records = tokio::task::spawn_blocking(move || db.db.list_comments(&post_id.to_string()))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            anyhow::anyhow!("join error: {}", e)
        })??;

    if records.is_empty() {
        return Err(ApiError::NotFound);
    }

    let comments: Vec<CommentResponse> = records.iter().map(comment_response).collect();
    Ok(Json(comments).into_response())
}

pub async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CommentPayload>,
) -> Result<Response, ApiError> {
    let author_id = identity.user_id().ok_or(ApiError::Unauthorized)?;

    if state.db.get_post(&post_id.to_string())?.is_none() {
        return Err(ApiError::NotFound);
    }

    let checked = validate::run(COMMENT_CHECKS, &[("text", &req.text)]);
    if !checked.errors.is_empty() {
        return Ok(Json(checked.into_errors_body()).into_response());
    }

    let comment_id = Uuid::new_v4();
    let text = checked.get("text").to_string();

    let db = state.clone();
    let rec = tokio::task::spawn_blocking(move || {
        db.db.insert_comment(
            &comment_id.to_string(),
            &text,
            &post_id.to_string(),
            &author_id.to_string(),
        )?;
        db.db.get_comment(&comment_id.to_string())
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        anyhow::anyhow!("join error: {}", e)
    })??
    .ok_or_else(|| anyhow::anyhow!("comment {} missing after insert", comment_id))?;

    Ok(Json(comment_response(&rec)).into_response())
}

/// Owner-only, like post edits.
pub async fn update_comment(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CommentPayload>,
) -> Result<Response, ApiError> {
    let _ = post_id; // the comment id alone identifies the target

    let Some(rec) = state.db.get_comment(&comment_id.to_string())? else {
        return Err(ApiError::NotFound);
    };

    let owner_id = parse_id(&rec.comment.user_id, "user");
    if !policy::can_edit(&identity, owner_id) {
        return Err(ApiError::Forbidden);
    }

    let checked = validate::run(COMMENT_CHECKS, &[("text", &req.text)]);
    if !checked.errors.is_empty() {
        return Ok(Json(checked.into_errors_body()).into_response());
    }

    state
        .db
        .update_comment(&comment_id.to_string(), checked.get("text"))?;

    let rec = state
        .db
        .get_comment(&comment_id.to_string())?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(comment_response(&rec)).into_response())
}

/// Owner or admin.
pub async fn delete_comment(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
    Extension(identity): Extension<Identity>,
) -> Result<Response, ApiError> {
    let _ = post_id;

    let Some(rec) = state.db.get_comment(&comment_id.to_string())? else {
        return Err(ApiError::NotFound);
    };

    let owner_id = parse_id(&rec.comment.user_id, "user");
    if !policy::can_delete(&identity, owner_id) {
        return Err(ApiError::Forbidden);
    }

    state.db.delete_comment(&comment_id.to_string())?;

    Ok(StatusCode::OK.into_response())
}
