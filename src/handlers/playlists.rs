// Playlist handlers, including the lease-guarded mutation path
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::account_for_identity;
use super::tracks::{TrackRequest, TrackResponse};
use crate::authz;
use crate::error::ApiError;
use crate::router::{HandlerResult, RequestContext};
use crate::storage::{NewPlaylist, PlaylistRecord};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePlaylistRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdatePlaylistRequest {
    pub name: Option<String>,
    pub current_track: Option<u16>,
    pub elapsed: Option<u32>,
}

/// Playlist payload. The edit lease is internal bookkeeping and never
/// appears on the wire, not even on reads.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistResponse {
    pub id: u64,
    pub uuid: Uuid,
    pub name: String,
    pub current_track: u16,
    pub elapsed: u32,
    pub tracks: Vec<TrackResponse>,
}

impl PlaylistResponse {
    fn from_record(record: &PlaylistRecord) -> Self {
        Self {
            id: record.id,
            uuid: record.uuid,
            name: record.name.clone(),
            current_track: record.current_track,
            elapsed: record.elapsed,
            tracks: record.tracks.iter().map(TrackResponse::from_record).collect(),
        }
    }
}

/// GET /playlists - the caller's playlists
pub async fn list(ctx: RequestContext) -> HandlerResult {
    let claims = ctx.state.tokens.check(&ctx.headers)?;
    let storage = ctx.state.storage.as_ref();

    let account = account_for_identity(storage, &claims.sub).await?;
    let playlists = storage.playlists_by_account(account.id).await?;

    let listing: Vec<PlaylistResponse> =
        playlists.iter().map(PlaylistResponse::from_record).collect();
    Ok((StatusCode::OK, Json(listing)).into_response())
}

/// GET /playlists/{id} - single playlist with its tracks
pub async fn show(ctx: RequestContext) -> HandlerResult {
    let claims = ctx.state.tokens.check(&ctx.headers)?;
    let uuid = ctx.uuid_param("id")?;

    let playlist = authz::resolve_playlist(ctx.state.storage.as_ref(), &claims.sub, uuid).await?;
    Ok((StatusCode::OK, Json(PlaylistResponse::from_record(&playlist))).into_response())
}

/// POST /playlists - create an empty playlist owned by the caller
pub async fn create(ctx: RequestContext) -> HandlerResult {
    let claims = ctx.state.tokens.check(&ctx.headers)?;
    let payload: CreatePlaylistRequest = ctx.json()?;
    let storage = ctx.state.storage.as_ref();

    let account = account_for_identity(storage, &claims.sub).await?;
    let playlist = storage
        .create_playlist(account.id, NewPlaylist { name: payload.name })
        .await?;

    Ok((StatusCode::OK, Json(PlaylistResponse::from_record(&playlist))).into_response())
}

/// PATCH /playlists/{id} - apply changes under the edit lease
///
/// A lease freshly touched by another session refuses the whole mutation
/// with 423 before the body is even parsed. Otherwise the caller's session
/// takes the lease (or renews its own) and gets a full TTL alongside the
/// changes; lease state and changes persist in one update.
pub async fn update(ctx: RequestContext) -> HandlerResult {
    let claims = ctx.state.tokens.check(&ctx.headers)?;
    let uuid = ctx.uuid_param("id")?;
    let storage = ctx.state.storage.as_ref();

    let mut playlist = authz::resolve_playlist(storage, &claims.sub, uuid).await?;

    let now = Utc::now();
    if playlist.lease.is_held_by_other(&claims.sid, now) {
        tracing::debug!("playlist {} lease held by another session", playlist.uuid);
        return Err(ApiError::locked("Playlist is locked"));
    }

    let payload: UpdatePlaylistRequest = ctx.json()?;

    if !playlist.lease.try_acquire(&claims.sid, now) {
        return Err(ApiError::locked("Playlist is locked"));
    }

    if let Some(name) = payload.name {
        playlist.name = name;
    }
    if let Some(current_track) = payload.current_track {
        playlist.current_track = current_track;
    }
    if let Some(elapsed) = payload.elapsed {
        playlist.elapsed = elapsed;
    }

    let updated = storage
        .update_playlist(playlist)
        .await
        .map_err(|err| ApiError::bad_request(err.to_string()))?;

    Ok((StatusCode::OK, Json(PlaylistResponse::from_record(&updated))).into_response())
}

/// DELETE /playlists/{id} - remove a playlist and its tracks
pub async fn delete(ctx: RequestContext) -> HandlerResult {
    let claims = ctx.state.tokens.check(&ctx.headers)?;
    let uuid = ctx.uuid_param("id")?;
    let storage = ctx.state.storage.as_ref();

    let playlist = authz::resolve_playlist(storage, &claims.sub, uuid).await?;
    storage.delete_playlist(playlist.id).await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "message": "Record Successfully Deleted" })),
    )
        .into_response())
}

/// POST /playlists/{id}/track - append a track to the playlist
///
/// Appends are not lease-guarded; only the PATCH mutation contends for the
/// edit lease.
pub async fn add_track(ctx: RequestContext) -> HandlerResult {
    let claims = ctx.state.tokens.check(&ctx.headers)?;
    let uuid = ctx.uuid_param("id")?;
    let payload: TrackRequest = ctx.json()?;
    let storage = ctx.state.storage.as_ref();

    let playlist = authz::resolve_playlist(storage, &claims.sub, uuid).await?;
    let track = storage.add_track(playlist.id, payload.into_new_track()).await?;

    Ok((StatusCode::OK, Json(TrackResponse::from_record(&track))).into_response())
}
