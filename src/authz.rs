// Authorization policy: administrator checks and owned-entity resolution
use uuid::Uuid;

use crate::error::ApiError;
use crate::storage::{PlaylistRecord, Storage, StorageError, TrackRecord};

/// Whether `identity` is an administrator right now.
///
/// Always answers from current storage state, never from token claims, so
/// revoking the flag or disabling the account takes effect on the very next
/// request. Unknown identities are simply not administrators.
pub async fn is_administrator(storage: &dyn Storage, identity: &str) -> Result<bool, ApiError> {
    match storage.account_by_email(identity).await {
        Ok(account) => Ok(account.enabled && account.admin),
        Err(StorageError::NotFound { .. }) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

/// Resolve a playlist the caller is allowed to touch.
///
/// Administrators see everything; everyone else only playlists reachable
/// from their own account. Zero matches answer an opaque not-found whether
/// the playlist is missing or merely someone else's.
pub async fn resolve_playlist(
    storage: &dyn Storage,
    identity: &str,
    uuid: Uuid,
) -> Result<PlaylistRecord, ApiError> {
    let owner = owner_constraint(storage, identity).await?;
    let matches = storage.find_playlists(uuid, owner).await?;
    exactly_one(matches, "Playlist", uuid)
}

/// Resolve a track the caller is allowed to touch. Same visibility rules as
/// [`resolve_playlist`], one level deeper.
pub async fn resolve_track(
    storage: &dyn Storage,
    identity: &str,
    uuid: Uuid,
) -> Result<TrackRecord, ApiError> {
    let owner = owner_constraint(storage, identity).await?;
    let matches = storage.find_tracks(uuid, owner).await?;
    exactly_one(matches, "Track", uuid)
}

async fn owner_constraint<'a>(
    storage: &dyn Storage,
    identity: &'a str,
) -> Result<Option<&'a str>, ApiError> {
    if is_administrator(storage, identity).await? {
        Ok(None)
    } else {
        Ok(Some(identity))
    }
}

fn exactly_one<T>(mut matches: Vec<T>, resource: &'static str, uuid: Uuid) -> Result<T, ApiError> {
    match matches.len() {
        1 => Ok(matches.remove(0)),
        0 => Err(ApiError::not_found(format!("{resource} not found"))),
        count => {
            // duplicate uuids mean the store is corrupt, not that the
            // request was wrong
            tracing::error!("{} lookup for {} returned {} records", resource, uuid, count);
            Err(ApiError::internal_server_error("Data integrity error"))
        }
    }
}
