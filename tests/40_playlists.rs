mod common;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use common::*;
use serde_json::json;

#[tokio::test]
async fn create_returns_an_empty_playlist_without_lease_fields() -> Result<()> {
    let app = test_app().await?;
    create_account(&app, "alice@example.com", "secret").await?;
    let cookie = signin(&app, "alice@example.com", "secret").await?;

    let playlist = create_playlist(&app, &cookie, "Road Trip").await?;
    assert_eq!(playlist["name"], "Road Trip");
    assert_eq!(playlist["currentTrack"], 0);
    assert_eq!(playlist["elapsed"], 0);
    assert_eq!(playlist["tracks"], json!([]));

    // the edit lease never reaches the wire
    let mut keys: Vec<&str> = playlist
        .as_object()
        .context("object")?
        .keys()
        .map(String::as_str)
        .collect();
    keys.sort_unstable();
    assert_eq!(keys, ["currentTrack", "elapsed", "id", "name", "tracks", "uuid"]);
    Ok(())
}

#[tokio::test]
async fn listing_covers_only_the_callers_playlists() -> Result<()> {
    let app = test_app().await?;
    create_account(&app, "alice@example.com", "secret").await?;
    create_account(&app, "bob@example.com", "secret").await?;
    let alice = signin(&app, "alice@example.com", "secret").await?;
    let bob = signin(&app, "bob@example.com", "secret").await?;

    let response = send(&app, request("GET", "/playlists", Some(&alice), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));

    create_playlist(&app, &alice, "Mine").await?;
    create_playlist(&app, &bob, "Theirs").await?;

    let response = send(&app, request("GET", "/playlists", Some(&alice), None)).await;
    let listing = body_json(response).await;
    let entries = listing.as_array().context("array")?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["name"], "Mine");
    Ok(())
}

#[tokio::test]
async fn show_is_owner_scoped_with_an_admin_bypass() -> Result<()> {
    let app = test_app().await?;
    create_account(&app, "alice@example.com", "secret").await?;
    create_account(&app, "bob@example.com", "secret").await?;
    let alice = signin(&app, "alice@example.com", "secret").await?;
    let playlist = create_playlist(&app, &alice, "Private").await?;
    let uri = format!("/playlists/{}", playlist["uuid"].as_str().unwrap_or_default());

    // someone else's playlist looks exactly like a missing one
    let bob = signin(&app, "bob@example.com", "secret").await?;
    let response = send(&app, request("GET", &uri, Some(&bob), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Playlist not found");

    let response = send(&app, request("GET", &uri, Some(&alice), None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let admin = admin_cookie(&app).await?;
    let response = send(&app, request("GET", &uri, Some(&admin), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], "Private");
    Ok(())
}

#[tokio::test]
async fn patch_applies_partial_changes() -> Result<()> {
    let app = test_app().await?;
    create_account(&app, "alice@example.com", "secret").await?;
    let cookie = signin(&app, "alice@example.com", "secret").await?;
    let playlist = create_playlist(&app, &cookie, "Evening").await?;
    let uri = format!("/playlists/{}", playlist["uuid"].as_str().unwrap_or_default());

    let response = send(
        &app,
        request(
            "PATCH",
            &uri,
            Some(&cookie),
            Some(json!({ "currentTrack": 3, "elapsed": 125 })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], "Evening");
    assert_eq!(body["currentTrack"], 3);
    assert_eq!(body["elapsed"], 125);

    // the same session holds the lease, so a follow-up edit just renews it
    let response = send(
        &app,
        request("PATCH", &uri, Some(&cookie), Some(json!({ "name": "Late Evening" }))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], "Late Evening");
    assert_eq!(body["currentTrack"], 3);
    Ok(())
}

#[tokio::test]
async fn patch_rejects_unknown_fields_without_persisting() -> Result<()> {
    let app = test_app().await?;
    create_account(&app, "alice@example.com", "secret").await?;
    let cookie = signin(&app, "alice@example.com", "secret").await?;
    let playlist = create_playlist(&app, &cookie, "Untouched").await?;
    let uri = format!("/playlists/{}", playlist["uuid"].as_str().unwrap_or_default());

    let response = send(
        &app,
        request(
            "PATCH",
            &uri,
            Some(&cookie),
            Some(json!({ "name": "Changed", "shuffle": true })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, request("GET", &uri, Some(&cookie), None)).await;
    let body = body_json(response).await;
    assert_eq!(body["name"], "Untouched");
    Ok(())
}

#[tokio::test]
async fn a_second_session_is_locked_out_of_patch() -> Result<()> {
    let app = test_app().await?;
    create_account(&app, "alice@example.com", "secret").await?;
    let first = signin(&app, "alice@example.com", "secret").await?;
    let second = signin(&app, "alice@example.com", "secret").await?;
    let playlist = create_playlist(&app, &first, "Shared").await?;
    let uuid = playlist["uuid"].as_str().unwrap_or_default().to_string();
    let uri = format!("/playlists/{uuid}");

    // first session takes the lease
    let response = send(
        &app,
        request("PATCH", &uri, Some(&first), Some(json!({ "currentTrack": 1 }))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // same account, different session: locked
    let response = send(
        &app,
        request("PATCH", &uri, Some(&second), Some(json!({ "currentTrack": 9 }))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::LOCKED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Playlist is locked");

    // ownership bypass does not bypass the lease
    let admin = admin_cookie(&app).await?;
    let response = send(
        &app,
        request("PATCH", &uri, Some(&admin), Some(json!({ "name": "Seized" }))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::LOCKED);

    // reads and appends stay open while the lease is held
    let response = send(&app, request("GET", &uri, Some(&second), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["currentTrack"], 1);
    add_track(&app, &second, &uuid, "Still Open").await?;

    // and the holder keeps editing
    let response = send(
        &app,
        request("PATCH", &uri, Some(&first), Some(json!({ "currentTrack": 2 }))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn the_lock_answers_before_the_body_is_parsed() -> Result<()> {
    let app = test_app().await?;
    create_account(&app, "alice@example.com", "secret").await?;
    let first = signin(&app, "alice@example.com", "secret").await?;
    let second = signin(&app, "alice@example.com", "secret").await?;
    let playlist = create_playlist(&app, &first, "Contested").await?;
    let uri = format!("/playlists/{}", playlist["uuid"].as_str().unwrap_or_default());

    let response = send(
        &app,
        request("PATCH", &uri, Some(&first), Some(json!({ "elapsed": 10 }))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // a body that would be a 400 still loses to the lock
    let response = send(
        &app,
        raw_request("PATCH", &uri, Some(&second), Some("application/json"), "not json"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::LOCKED);
    Ok(())
}

#[tokio::test]
async fn delete_removes_the_playlist_for_its_owner_only() -> Result<()> {
    let app = test_app().await?;
    create_account(&app, "alice@example.com", "secret").await?;
    create_account(&app, "bob@example.com", "secret").await?;
    let alice = signin(&app, "alice@example.com", "secret").await?;
    let bob = signin(&app, "bob@example.com", "secret").await?;
    let playlist = create_playlist(&app, &alice, "Done").await?;
    let uri = format!("/playlists/{}", playlist["uuid"].as_str().unwrap_or_default());

    let response = send(&app, request("DELETE", &uri, Some(&bob), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, request("DELETE", &uri, Some(&alice), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Record Successfully Deleted");

    let response = send(&app, request("GET", &uri, Some(&alice), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = send(&app, request("GET", "/playlists", Some(&alice), None)).await;
    assert_eq!(body_json(response).await, json!([]));
    Ok(())
}
