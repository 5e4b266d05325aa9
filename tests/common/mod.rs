// Shared helpers for the integration suites: an in-process app driven
// through tower's oneshot, no sockets involved.
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use tracksync_api_rust::storage::{MemoryStorage, NewAccount, Storage};
use tracksync_api_rust::token::TokenService;
use tracksync_api_rust::{app, AppState};

pub const SIGNING_KEY: &str = "integration-test-signing-key";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";

/// Fresh in-process app with the administrator seeded as account id 1.
pub async fn test_app() -> Result<Router> {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    // minimum bcrypt cost keeps the suites quick
    let password_hash = bcrypt::hash(ADMIN_PASSWORD, 4)?;
    storage
        .create_account(NewAccount {
            first_name: "Admin".into(),
            last_name: "User".into(),
            email_address: ADMIN_EMAIL.into(),
            password_hash,
            enabled: true,
            admin: true,
        })
        .await?;

    let state = AppState::new(storage, Arc::new(TokenService::new(SIGNING_KEY)));
    Ok(app(state))
}

/// Build a request; a JSON body implies the content-type header.
pub fn request(
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request must build")
}

/// Build a request with full control over content type and raw body.
pub fn raw_request(
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    content_type: Option<&str>,
    body: &str,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request must build")
}

/// Drive one request through the app.
pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.expect("infallible")
}

/// Read the response body as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("JSON body")
}

/// Sign in and hand back the `token=...` cookie pair for later requests.
pub async fn signin(app: &Router, email: &str, password: &str) -> Result<String> {
    let response = send(
        app,
        request(
            "POST",
            "/users/signin",
            None,
            Some(json!({ "username": email, "password": password })),
        ),
    )
    .await;
    ensure!(
        response.status() == StatusCode::ACCEPTED,
        "signin for {email} answered {}",
        response.status()
    );

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .context("signin response carries no cookie")?
        .to_str()?;
    Ok(set_cookie
        .split(';')
        .next()
        .unwrap_or_default()
        .to_string())
}

pub async fn admin_cookie(app: &Router) -> Result<String> {
    signin(app, ADMIN_EMAIL, ADMIN_PASSWORD).await
}

/// Register an account through the API and return its payload.
pub async fn create_account(app: &Router, email: &str, password: &str) -> Result<Value> {
    let response = send(
        app,
        request(
            "POST",
            "/users",
            None,
            Some(json!({
                "firstName": "Test",
                "lastName": "User",
                "emailAddress": email,
                "password": password,
                "confirmPassword": password,
            })),
        ),
    )
    .await;
    ensure!(
        response.status() == StatusCode::OK,
        "account creation for {email} answered {}",
        response.status()
    );
    Ok(body_json(response).await)
}

/// Create a playlist owned by the signed-in session, returning its payload.
pub async fn create_playlist(app: &Router, cookie: &str, name: &str) -> Result<Value> {
    let response = send(
        app,
        request("POST", "/playlists", Some(cookie), Some(json!({ "name": name }))),
    )
    .await;
    ensure!(
        response.status() == StatusCode::OK,
        "playlist creation answered {}",
        response.status()
    );
    Ok(body_json(response).await)
}

/// Append a track and return its payload.
pub async fn add_track(app: &Router, cookie: &str, playlist_uuid: &str, song: &str) -> Result<Value> {
    let response = send(
        app,
        request(
            "POST",
            &format!("/playlists/{playlist_uuid}/track"),
            Some(cookie),
            Some(json!({
                "path": format!("/music/{song}.mp3"),
                "artistName": "Artist",
                "songName": song,
                "albumName": "Album",
                "albumTrackNumber": 1,
                "duration": 180,
            })),
        ),
    )
    .await;
    ensure!(
        response.status() == StatusCode::OK,
        "track append answered {}",
        response.status()
    );
    Ok(body_json(response).await)
}
