//! End-to-end tests driving the assembled router against an in-memory
//! database, covering the access-control and validation contracts.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use scribe_api::auth::{TOKEN_AUDIENCE, TOKEN_ISSUER};
use scribe_api::{AppState, AppStateInner, router};
use scribe_db::Database;
use scribe_types::api::Claims;

const SECRET: &str = "integration-test-secret";
const PASSWORD: &str = "Str0ng!pass";

fn app() -> (Router, AppState) {
    let state = Arc::new(AppStateInner {
        db: Database::open_in_memory().expect("in-memory db"),
        jwt_secret: SECRET.to_string(),
    });
    (router(state.clone()), state)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };

    (status, value)
}

fn user_payload(first: &str, last: &str, username: &str) -> Value {
    json!({
        "first_name": first,
        "last_name": last,
        "username": username,
        "email": format!("{username}@example.com"),
        "password": PASSWORD,
        "password_confirmation": PASSWORD,
    })
}

async fn register(app: &Router, username: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/v1/users",
        None,
        Some(user_payload("Test", "User", username)),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "registration failed: {body}");
    assert!(body.get("errors").is_none(), "unexpected errors: {body}");
    body
}

async fn login(app: &Router, username: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/v1/login",
        None,
        Some(json!({ "username": username, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["token"].as_str().expect("token").to_string()
}

fn promote_to_admin(state: &AppState, username: &str) {
    state
        .db
        .with_conn(|conn| {
            conn.execute(
                "UPDATE users SET role = 'Admin' WHERE username = ?1",
                [username],
            )?;
            Ok(())
        })
        .expect("promote");
}

async fn create_post(app: &Router, token: &str, title: &str, text: &str, privacy: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/v1/posts",
        Some(token),
        Some(json!({ "title": title, "text": text, "privacy": privacy })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "post creation failed: {body}");
    assert!(body.get("errors").is_none(), "unexpected errors: {body}");
    body
}

fn id_of(resource: &Value) -> String {
    resource["id"].as_str().expect("id").to_string()
}

// -- Registration and login --

#[tokio::test]
async fn register_login_and_strict_listing() {
    let (app, _state) = app();

    let alice = register(&app, "alice").await;
    assert_eq!(alice["username"], "alice");
    assert_eq!(alice["full_name"], "Test User");
    assert_eq!(alice["role"], "Member");
    assert!(alice.get("password").is_none(), "hash must never be returned");

    // Strict endpoint: no token means 401, a valid token means 200.
    let (status, _) = send(&app, "GET", "/v1/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = login(&app, "alice").await;
    let (status, body) = send(&app, "GET", "/v1/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().expect("array").len(), 1);
}

#[tokio::test]
async fn registration_collects_every_validation_failure() {
    let (app, _state) = app();

    let (status, body) = send(
        &app,
        "POST",
        "/v1/users",
        None,
        Some(json!({
            "first_name": "A",
            "last_name": "",
            "username": "x",
            "email": "not-an-email",
            "password": "weak",
            "password_confirmation": "other",
        })),
    )
    .await;

    // Validation failures on create are body-carried, not a 4xx.
    assert_eq!(status, StatusCode::OK);
    let errors = body["errors"].as_array().expect("errors");
    assert_eq!(errors.len(), 6, "all failures collected: {body}");
}

#[tokio::test]
async fn duplicate_registration_is_field_scoped_and_not_persisted() {
    let (app, _state) = app();

    register(&app, "alice").await;
    let (status, body) = send(
        &app,
        "POST",
        "/v1/users",
        None,
        Some(user_payload("Other", "Person", "alice")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let messages: Vec<&str> = body["errors"]
        .as_array()
        .expect("errors")
        .iter()
        .map(|e| e["message"].as_str().unwrap())
        .collect();
    assert!(messages.contains(&"Username already in use."));
    assert!(messages.contains(&"Email already in use."));

    let token = login(&app, "alice").await;
    let (_, users) = send(&app, "GET", "/v1/users", Some(&token), None).await;
    assert_eq!(users.as_array().expect("array").len(), 1);
}

#[tokio::test]
async fn login_failures_name_the_failing_credential() {
    let (app, _state) = app();
    register(&app, "alice").await;

    let (status, body) = send(
        &app,
        "POST",
        "/v1/login",
        None,
        Some(json!({ "username": "nobody", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Incorrect username");

    let (status, body) = send(
        &app,
        "POST",
        "/v1/login",
        None,
        Some(json!({ "username": "alice", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Incorrect password");

    // Missing fields are a true 400 rejection on login.
    let (status, body) = send(&app, "POST", "/v1/login", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"].as_array().expect("errors").len(), 2);
}

// -- Posts --

#[tokio::test]
async fn post_roundtrip_trims_escapes_and_resolves_owner() {
    let (app, _state) = app();
    register(&app, "alice").await;
    let token = login(&app, "alice").await;

    let post = create_post(&app, &token, "  <Season & Sun>  ", " Hello & welcome ", "Public").await;
    assert_eq!(post["title"], "&lt;Season &amp; Sun&gt;");
    assert_eq!(post["text"], "Hello &amp; welcome");
    assert_eq!(post["privacy"], "Public");
    assert_eq!(post["user"]["username"], "alice");
    assert_eq!(post["reactions"]["like"], 0);
    assert_eq!(post["reactions"]["dislike"], 0);

    // Anonymous read of a public post sees the same record.
    let (status, fetched) =
        send(&app, "GET", &format!("/v1/posts/{}", id_of(&post)), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], post["title"]);
    assert_eq!(fetched["text"], post["text"]);
    assert_eq!(fetched["user"]["username"], "alice");
}

#[tokio::test]
async fn empty_post_listing_is_not_found() {
    let (app, _state) = app();
    let (status, _) = send(&app, "GET", "/v1/posts", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn private_posts_are_invisible_to_strangers() {
    let (app, state) = app();
    register(&app, "alice").await;
    register(&app, "bob").await;
    register(&app, "root").await;
    promote_to_admin(&state, "root");

    let alice = login(&app, "alice").await;
    let bob = login(&app, "bob").await;
    let root = login(&app, "root").await;

    create_post(&app, &alice, "Open", "body", "Public").await;
    let hidden = create_post(&app, &alice, "Hidden", "body", "Private").await;
    let hidden_uri = format!("/v1/posts/{}", id_of(&hidden));

    // Single reads: absence, never a 403.
    let (status, _) = send(&app, "GET", &hidden_uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "GET", &hidden_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "GET", &hidden_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", &hidden_uri, Some(&root), None).await;
    assert_eq!(status, StatusCode::OK);

    // Listings are filtered, not denied.
    let (_, listing) = send(&app, "GET", "/v1/posts", None, None).await;
    assert_eq!(listing.as_array().expect("array").len(), 1);

    let (_, listing) = send(&app, "GET", "/v1/posts", Some(&bob), None).await;
    assert_eq!(listing.as_array().expect("array").len(), 1);

    let (_, listing) = send(&app, "GET", "/v1/posts", Some(&alice), None).await;
    assert_eq!(listing.as_array().expect("array").len(), 2);

    let (_, listing) = send(&app, "GET", "/v1/posts", Some(&root), None).await;
    assert_eq!(listing.as_array().expect("array").len(), 2);
}

#[tokio::test]
async fn editable_flag_tracks_ownership_not_admin_status() {
    let (app, state) = app();
    register(&app, "alice").await;
    register(&app, "root").await;
    promote_to_admin(&state, "root");

    let alice = login(&app, "alice").await;
    let root = login(&app, "root").await;

    create_post(&app, &alice, "Mine", "body", "Public").await;

    let (_, listing) = send(&app, "GET", "/v1/posts", Some(&alice), None).await;
    assert_eq!(listing[0]["editable"], true);

    // Admins can see everything but the flag still tracks ownership.
    let (_, listing) = send(&app, "GET", "/v1/posts", Some(&root), None).await;
    assert_eq!(listing[0]["editable"], false);

    let (_, listing) = send(&app, "GET", "/v1/posts", None, None).await;
    assert_eq!(listing[0]["editable"], false);
}

#[tokio::test]
async fn post_edit_is_owner_only_even_for_admins() {
    let (app, state) = app();
    register(&app, "alice").await;
    register(&app, "bob").await;
    register(&app, "root").await;
    promote_to_admin(&state, "root");

    let alice = login(&app, "alice").await;
    let bob = login(&app, "bob").await;
    let root = login(&app, "root").await;

    let post = create_post(&app, &alice, "Original", "body", "Public").await;
    let uri = format!("/v1/posts/{}", id_of(&post));
    let update = json!({ "title": "Edited", "text": "body", "privacy": "Public" });

    let (status, _) = send(&app, "PUT", &uri, Some(&bob), Some(update.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Admin override applies to delete, not edit.
    let (status, _) = send(&app, "PUT", &uri, Some(&root), Some(update.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "PUT", &uri, Some(&alice), Some(update)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Edited");
}

#[tokio::test]
async fn post_delete_allows_owner_or_admin() {
    let (app, state) = app();
    register(&app, "alice").await;
    register(&app, "bob").await;
    register(&app, "root").await;
    promote_to_admin(&state, "root");

    let alice = login(&app, "alice").await;
    let bob = login(&app, "bob").await;
    let root = login(&app, "root").await;

    let first = create_post(&app, &alice, "First", "body", "Public").await;
    let first_uri = format!("/v1/posts/{}", id_of(&first));

    let (status, _) = send(&app, "DELETE", &first_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "DELETE", &first_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", &first_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let second = create_post(&app, &alice, "Second", "body", "Public").await;
    let second_uri = format!("/v1/posts/{}", id_of(&second));

    let (status, _) = send(&app, "DELETE", &second_uri, Some(&root), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn post_update_is_idempotent() {
    let (app, _state) = app();
    register(&app, "alice").await;
    let token = login(&app, "alice").await;

    let post = create_post(&app, &token, "Title", "body", "Public").await;
    let uri = format!("/v1/posts/{}", id_of(&post));
    let update = json!({ "title": "Stable", "text": "same body", "privacy": "Private" });

    let (status, first) = send(&app, "PUT", &uri, Some(&token), Some(update.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, second) = send(&app, "PUT", &uri, Some(&token), Some(update)).await;
    assert_eq!(status, StatusCode::OK);

    for field in ["title", "text", "privacy", "id"] {
        assert_eq!(first[field], second[field]);
    }
}

#[tokio::test]
async fn post_validation_failures_are_collected() {
    let (app, _state) = app();
    register(&app, "alice").await;
    let token = login(&app, "alice").await;

    let (status, body) = send(
        &app,
        "POST",
        "/v1/posts",
        Some(&token),
        Some(json!({ "title": "   ", "text": "", "privacy": "Secret" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["errors"].as_array().expect("errors").len(), 3);

    // Nothing was persisted.
    let (status, _) = send(&app, "GET", "/v1/posts", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_post_is_not_found_before_ownership() {
    let (app, _state) = app();
    register(&app, "alice").await;
    let token = login(&app, "alice").await;

    let uri = format!("/v1/posts/{}", uuid::Uuid::new_v4());
    let update = json!({ "title": "T", "text": "B", "privacy": "Public" });

    let (status, _) = send(&app, "PUT", &uri, Some(&token), Some(update)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// -- Comments --

#[tokio::test]
async fn comments_under_private_posts_are_publicly_listed() {
    let (app, _state) = app();
    register(&app, "alice").await;
    register(&app, "bob").await;
    let alice = login(&app, "alice").await;
    let bob = login(&app, "bob").await;

    let post = create_post(&app, &alice, "Hidden", "body", "Private").await;
    let comments_uri = format!("/v1/posts/{}/comments", id_of(&post));

    // Creation requires a credential.
    let (status, _) = send(
        &app,
        "POST",
        &comments_uri,
        None,
        Some(json!({ "text": "anon" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, comment) = send(
        &app,
        "POST",
        &comments_uri,
        Some(&bob),
        Some(json!({ "text": "  first & <loud>  " })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comment["text"], "first &amp; &lt;loud&gt;");
    assert_eq!(comment["user"]["username"], "bob");

    // The listing has no privacy filter: anonymous callers see comments
    // even though the parent post is Private.
    let (status, listing) = send(&app, "GET", &comments_uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing.as_array().expect("array").len(), 1);
}

#[tokio::test]
async fn comment_mutation_rights_mirror_posts() {
    let (app, state) = app();
    register(&app, "alice").await;
    register(&app, "bob").await;
    register(&app, "root").await;
    promote_to_admin(&state, "root");

    let alice = login(&app, "alice").await;
    let bob = login(&app, "bob").await;
    let root = login(&app, "root").await;

    let post = create_post(&app, &alice, "Thread", "body", "Public").await;
    let comments_uri = format!("/v1/posts/{}/comments", id_of(&post));

    let (_, comment) = send(
        &app,
        "POST",
        &comments_uri,
        Some(&bob),
        Some(json!({ "text": "original" })),
    )
    .await;
    let comment_uri = format!("{}/{}", comments_uri, id_of(&comment));

    // Edit: owner only, no admin override.
    let update = json!({ "text": "edited" });
    let (status, _) = send(&app, "PUT", &comment_uri, Some(&alice), Some(update.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "PUT", &comment_uri, Some(&root), Some(update.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send(&app, "PUT", &comment_uri, Some(&bob), Some(update)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "edited");

    // Delete: owner or admin.
    let (status, _) = send(&app, "DELETE", &comment_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "DELETE", &comment_uri, Some(&root), None).await;
    assert_eq!(status, StatusCode::OK);

    // Empty listing reads as absent.
    let (status, _) = send(&app, "GET", &comments_uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn commenting_on_a_missing_post_is_not_found() {
    let (app, _state) = app();
    register(&app, "alice").await;
    let token = login(&app, "alice").await;

    let uri = format!("/v1/posts/{}/comments", uuid::Uuid::new_v4());
    let (status, _) = send(&app, "POST", &uri, Some(&token), Some(json!({ "text": "hi" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// -- Users --

#[tokio::test]
async fn profile_update_is_owner_only_and_preserves_role() {
    let (app, state) = app();
    let alice = register(&app, "alice").await;
    register(&app, "bob").await;
    promote_to_admin(&state, "alice");

    let alice_token = login(&app, "alice").await;
    let bob_token = login(&app, "bob").await;
    let alice_uri = format!("/v1/users/{}", id_of(&alice));

    let update = user_payload("Renamed", "Owner", "alice");

    let (status, _) = send(&app, "PUT", &alice_uri, Some(&bob_token), Some(update.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "PUT", &alice_uri, Some(&alice_token), Some(update)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_name"], "Renamed Owner");
    assert_eq!(body["role"], "Admin", "update must not demote");
}

#[tokio::test]
async fn profile_update_rejects_taken_username_but_allows_own() {
    let (app, _state) = app();
    let alice = register(&app, "alice").await;
    register(&app, "bob").await;
    let token = login(&app, "alice").await;
    let uri = format!("/v1/users/{}", id_of(&alice));

    // Keeping your own username is not a conflict.
    let (status, body) = send(&app, "PUT", &uri, Some(&token), Some(user_payload("New", "Name", "alice"))).await;
    assert_eq!(status, StatusCode::OK, "own username rejected: {body}");

    // Taking someone else's is.
    let mut payload = user_payload("New", "Name", "bob");
    payload["email"] = json!("alice@example.com");
    let (status, body) = send(&app, "PUT", &uri, Some(&token), Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    let messages: Vec<&str> = body["errors"]
        .as_array()
        .expect("errors")
        .iter()
        .map(|e| e["message"].as_str().unwrap())
        .collect();
    assert!(messages.contains(&"Username already in use."));
}

#[tokio::test]
async fn user_delete_requires_self_and_admin() {
    let (app, state) = app();
    let alice = register(&app, "alice").await;
    let root = register(&app, "root").await;
    promote_to_admin(&state, "root");

    let alice_token = login(&app, "alice").await;
    let root_token = login(&app, "root").await;

    // A plain member cannot delete their own account.
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/v1/users/{}", id_of(&alice)),
        Some(&alice_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // An admin cannot delete someone else's account either.
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/v1/users/{}", id_of(&alice)),
        Some(&root_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Only the self-admin conjunction succeeds.
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/v1/users/{}", id_of(&root)),
        Some(&root_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The deleted subject no longer resolves: the old token is dead.
    let (status, _) = send(&app, "GET", "/v1/users", Some(&root_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// -- Tokens --

#[tokio::test]
async fn expired_token_fails_strict_endpoints() {
    let (app, _state) = app();
    let alice = register(&app, "alice").await;

    let now = chrono::Utc::now();
    let claims = Claims {
        sub: alice["id"].as_str().unwrap().parse().unwrap(),
        iss: TOKEN_ISSUER.to_string(),
        aud: TOKEN_AUDIENCE.to_string(),
        iat: now.timestamp() - 25 * 3600,
        exp: now.timestamp() - 3600,
    };
    let stale = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    let (status, _) = send(&app, "GET", "/v1/users", Some(&stale), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Optional-auth endpoints degrade to anonymous instead of failing.
    let (status, _) = send(&app, "GET", "/v1/posts", Some(&stale), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn garbage_token_fails_strict_endpoints() {
    let (app, _state) = app();
    register(&app, "alice").await;

    let (status, _) = send(&app, "GET", "/v1/users", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
