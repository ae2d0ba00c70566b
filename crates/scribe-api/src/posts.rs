use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;
use uuid::Uuid;

use scribe_db::PostFilter;
use scribe_types::api::{PostPayload, PostResponse};
use scribe_types::models::Privacy;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::Identity;
use crate::policy::{self, ListingScope};
use crate::responses::{parse_id, post_response};
use crate::validate::{self, FieldSpec, Rule};

const POST_CHECKS: &[FieldSpec] = &[
    FieldSpec {
        field: "title",
        rules: &[
            Rule::Required("Title must not be empty."),
            Rule::MaxLen(50, "Title must not be greater than 50 characters."),
        ],
    },
    FieldSpec {
        field: "text",
        rules: &[
            Rule::Required("Body must not be empty."),
            Rule::MaxLen(5000, "Body must not be greater than 5000 characters."),
        ],
    },
    FieldSpec {
        field: "privacy",
        rules: &[Rule::OneOf(&["Public", "Private"], "Invalid value.")],
    },
];

fn payload_fields(req: &PostPayload) -> Vec<(&'static str, &str)> {
    vec![
        ("title", req.title.as_str()),
        ("text", req.text.as_str()),
        ("privacy", req.privacy.as_str()),
    ]
}

/// Filtered listing: each identity sees exactly the subset the policy
/// grants, with a per-item `editable` flag for the viewer.
pub async fn list_posts(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Response, ApiError> {
    let scope = policy::listing_scope(&identity);

    // Run blocking DB work off the async runtime
    let db = state.clone();
    let records = tokio::task::spawn_blocking(move || match scope {
        ListingScope::All => db.db.list_posts(PostFilter::All),
        ListingScope::Visible(id) => db.db.list_posts(PostFilter::VisibleTo(&id.to_string())),
        ListingScope::PublicOnly => db.db.list_posts(PostFilter::PublicOnly),
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        anyhow::anyhow!("join error: {}", e)
    })??;

    if records.is_empty() {
        return Err(ApiError::NotFound);
    }

    let posts: Vec<PostResponse> = records
        .iter()
        .map(|rec| {
            let owner_id = parse_id(&rec.post.user_id, "user");
            let editable = policy::is_editable(&identity, owner_id);
            post_response(rec, Some(editable))
        })
        .collect();

    Ok(Json(posts).into_response())
}

/// An invisible post is indistinguishable from an absent one: the caller
/// gets 404, never 403.
pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(identity): Extension<Identity>,
) -> Result<Response, ApiError> {
    let db = state.clone();
    let rec = tokio::task::spawn_blocking(move || db.db.get_post(&post_id.to_string()))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            anyhow::anyhow!("join error: {}", e)
        })??;

    let Some(rec) = rec else {
        return Err(ApiError::NotFound);
    };

    let owner_id = parse_id(&rec.post.user_id, "user");
    if !policy::can_view_post(&identity, owner_id, Privacy::parse(&rec.post.privacy)) {
        return Err(ApiError::NotFound);
    }

    Ok(Json(post_response(&rec, None)).into_response())
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<PostPayload>,
) -> Result<Response, ApiError> {
    let author_id = identity.user_id().ok_or(ApiError::Unauthorized)?;

    let checked = validate::run(POST_CHECKS, &payload_fields(&req));
    if !checked.errors.is_empty() {
        return Ok(Json(checked.into_errors_body()).into_response());
    }

    let post_id = Uuid::new_v4();
    let title = checked.get("title").to_string();
    let text = checked.get("text").to_string();
    let privacy = checked.get("privacy").to_string();

    let db = state.clone();
    let rec = tokio::task::spawn_blocking(move || {
        db.db.insert_post(
            &post_id.to_string(),
            &title,
            &text,
            &privacy,
            &author_id.to_string(),
        )?;
        db.db.get_post(&post_id.to_string())
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        anyhow::anyhow!("join error: {}", e)
    })??
    .ok_or_else(|| anyhow::anyhow!("post {} missing after insert", post_id))?;

    Ok(Json(post_response(&rec, None)).into_response())
}

/// Owner-only; an admin who is not the owner is refused.
pub async fn update_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<PostPayload>,
) -> Result<Response, ApiError> {
    let Some(rec) = state.db.get_post(&post_id.to_string())? else {
        return Err(ApiError::NotFound);
    };

    let owner_id = parse_id(&rec.post.user_id, "user");
    if !policy::can_edit(&identity, owner_id) {
        return Err(ApiError::Forbidden);
    }

    let checked = validate::run(POST_CHECKS, &payload_fields(&req));
    if !checked.errors.is_empty() {
        return Ok(Json(checked.into_errors_body()).into_response());
    }

    state.db.update_post(
        &post_id.to_string(),
        checked.get("title"),
        checked.get("text"),
        checked.get("privacy"),
    )?;

    let rec = state
        .db
        .get_post(&post_id.to_string())?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(post_response(&rec, None)).into_response())
}

/// Owner or admin.
pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(identity): Extension<Identity>,
) -> Result<Response, ApiError> {
    let Some(rec) = state.db.get_post(&post_id.to_string())? else {
        return Err(ApiError::NotFound);
    };

    let owner_id = parse_id(&rec.post.user_id, "user");
    if !policy::can_delete(&identity, owner_id) {
        return Err(ApiError::Forbidden);
    }

    state.db.delete_post(&post_id.to_string())?;

    Ok(StatusCode::OK.into_response())
}
