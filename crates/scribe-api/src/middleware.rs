use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use scribe_types::models::{Role, User};

use crate::auth::{self, AppState};
use crate::error::ApiError;
use crate::responses;

/// Per-request identity context: the resolved actor (or anonymous) and
/// the admin flag. An immutable value carried in request extensions,
/// never a global.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: Option<User>,
    pub is_admin: bool,
}

impl Identity {
    pub fn anonymous() -> Self {
        Identity {
            user: None,
            is_admin: false,
        }
    }

    pub fn from_user(user: User) -> Self {
        let is_admin = user.role == Role::Admin;
        Identity {
            user: Some(user),
            is_admin,
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user.as_ref().map(|u| u.id)
    }
}

/// Strict entry point: no resolvable identity fails the request with 401.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match resolve_identity(&state, &req)? {
        Some(user) => {
            req.extensions_mut().insert(Identity::from_user(user));
            Ok(next.run(req).await)
        }
        None => Err(ApiError::Unauthorized),
    }
}

/// Optional entry point: an unusable token degrades to the anonymous
/// identity instead of failing the request.
pub async fn identify(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = match resolve_identity(&state, &req)? {
        Some(user) => Identity::from_user(user),
        None => Identity::anonymous(),
    };
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Extract the bearer token, verify it, and resolve the subject claim
/// against the user store. `Ok(None)` covers missing, malformed, expired,
/// and unresolvable tokens alike; a store failure is the only hard error.
fn resolve_identity(state: &AppState, req: &Request) -> Result<Option<User>, ApiError> {
    let Some(token) = bearer_token(req) else {
        return Ok(None);
    };

    let Some(claims) = auth::decode_token(&state.jwt_secret, token) else {
        return Ok(None);
    };

    let Some(row) = state.db.get_user_by_id(&claims.sub.to_string())? else {
        return Ok(None);
    };

    Ok(Some(responses::user_from_row(&row)))
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
