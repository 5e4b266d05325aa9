// Track handlers
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::authz;
use crate::router::{HandlerResult, RequestContext};
use crate::storage::{NewTrack, TrackRecord};

/// Body for appending a track to a playlist.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TrackRequest {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub artist_name: String,
    #[serde(default)]
    pub song_name: String,
    #[serde(default)]
    pub album_name: String,
    #[serde(default)]
    pub album_track_number: u32,
    #[serde(default)]
    pub duration: u32,
}

impl TrackRequest {
    pub(crate) fn into_new_track(self) -> NewTrack {
        NewTrack {
            path: self.path,
            artist_name: self.artist_name,
            song_name: self.song_name,
            album_name: self.album_name,
            album_track_number: self.album_track_number,
            duration: self.duration,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateTrackRequest {
    pub path: Option<String>,
    pub artist_name: Option<String>,
    pub song_name: Option<String>,
    pub album_name: Option<String>,
    pub album_track_number: Option<u32>,
    pub duration: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackResponse {
    pub id: u64,
    pub uuid: Uuid,
    pub path: String,
    pub artist_name: String,
    pub song_name: String,
    pub album_name: String,
    pub album_track_number: u32,
    pub duration: u32,
}

impl TrackResponse {
    pub(crate) fn from_record(record: &TrackRecord) -> Self {
        Self {
            id: record.id,
            uuid: record.uuid,
            path: record.path.clone(),
            artist_name: record.artist_name.clone(),
            song_name: record.song_name.clone(),
            album_name: record.album_name.clone(),
            album_track_number: record.album_track_number,
            duration: record.duration,
        }
    }
}

/// PATCH /tracks/{id} - partial metadata update; absent fields keep their
/// stored values
pub async fn update(ctx: RequestContext) -> HandlerResult {
    let claims = ctx.state.tokens.check(&ctx.headers)?;
    let uuid = ctx.uuid_param("id")?;
    let payload: UpdateTrackRequest = ctx.json()?;
    let storage = ctx.state.storage.as_ref();

    let mut track = authz::resolve_track(storage, &claims.sub, uuid).await?;
    if let Some(path) = payload.path {
        track.path = path;
    }
    if let Some(artist_name) = payload.artist_name {
        track.artist_name = artist_name;
    }
    if let Some(song_name) = payload.song_name {
        track.song_name = song_name;
    }
    if let Some(album_name) = payload.album_name {
        track.album_name = album_name;
    }
    if let Some(album_track_number) = payload.album_track_number {
        track.album_track_number = album_track_number;
    }
    if let Some(duration) = payload.duration {
        track.duration = duration;
    }

    let updated = storage.update_track(track).await?;
    Ok((StatusCode::OK, Json(TrackResponse::from_record(&updated))).into_response())
}

/// DELETE /tracks/{id} - remove a track from its playlist
pub async fn delete(ctx: RequestContext) -> HandlerResult {
    let claims = ctx.state.tokens.check(&ctx.headers)?;
    let uuid = ctx.uuid_param("id")?;
    let storage = ctx.state.storage.as_ref();

    let track = authz::resolve_track(storage, &claims.sub, uuid).await?;
    storage.delete_track(track.id).await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "message": "Record Successfully Deleted" })),
    )
        .into_response())
}
