// Persistence boundary: records, inputs and the Storage trait
mod memory;

pub use memory::MemoryStorage;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::lock::EditLease;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    /// A uniqueness constraint was violated on insert or update.
    #[error("{resource} already exists")]
    Conflict { resource: &'static str },

    #[error("{resource} not found")]
    NotFound { resource: &'static str },

    /// The engine failed in a way the caller cannot act on.
    #[error("storage failure: {0}")]
    Internal(String),
}

/// A stored account. Numeric ids are assigned sequentially from 1 and the
/// account with id 1 is the seeded administrator; the uuid is the external
/// identifier used in URLs.
#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub id: u64,
    pub uuid: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email_address: String,
    pub password_hash: String,
    pub enabled: bool,
    pub admin: bool,
    pub friends: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct PlaylistRecord {
    pub id: u64,
    pub uuid: Uuid,
    pub name: String,
    pub current_track: u16,
    pub elapsed: u32,
    pub tracks: Vec<TrackRecord>,
    pub lease: EditLease,
}

#[derive(Debug, Clone)]
pub struct TrackRecord {
    pub id: u64,
    pub uuid: Uuid,
    pub path: String,
    pub artist_name: String,
    pub song_name: String,
    pub album_name: String,
    pub album_track_number: u32,
    pub duration: u32,
}

/// Input for creating an account. The password is already hashed by the
/// time it reaches storage.
#[derive(Debug)]
pub struct NewAccount {
    pub first_name: String,
    pub last_name: String,
    pub email_address: String,
    pub password_hash: String,
    pub enabled: bool,
    pub admin: bool,
}

#[derive(Debug)]
pub struct NewPlaylist {
    pub name: String,
}

#[derive(Debug)]
pub struct NewTrack {
    pub path: String,
    pub artist_name: String,
    pub song_name: String,
    pub album_name: String,
    pub album_track_number: u32,
    pub duration: u32,
}

/// Persistence operations the handlers are written against.
///
/// E-mail addresses are unique case-insensitively and every lookup by e-mail
/// ignores case. Playlists belong to exactly one account and tracks to
/// exactly one playlist; the `find_*` operations take an optional owner
/// identity and, when given one, only traverse that account's collections.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn create_account(&self, new_account: NewAccount) -> Result<AccountRecord>;
    async fn account_by_id(&self, id: u64) -> Result<AccountRecord>;
    async fn account_by_uuid(&self, uuid: Uuid) -> Result<AccountRecord>;
    async fn account_by_email(&self, email: &str) -> Result<AccountRecord>;
    async fn list_accounts(&self) -> Result<Vec<AccountRecord>>;
    /// Persist the scalar fields of `account`, keyed by its numeric id.
    async fn update_account(&self, account: AccountRecord) -> Result<AccountRecord>;
    /// Remove an account along with every playlist it owns.
    async fn delete_account(&self, id: u64) -> Result<()>;

    async fn create_playlist(&self, owner_id: u64, new_playlist: NewPlaylist)
        -> Result<PlaylistRecord>;
    async fn playlists_by_account(&self, account_id: u64) -> Result<Vec<PlaylistRecord>>;
    /// All playlists with the given uuid, optionally restricted to the
    /// account whose e-mail is `owner_email`.
    async fn find_playlists(&self, uuid: Uuid, owner_email: Option<&str>)
        -> Result<Vec<PlaylistRecord>>;
    /// Persist the scalar fields and edit lease of `playlist`. The contained
    /// track list is managed by the track operations and left untouched.
    async fn update_playlist(&self, playlist: PlaylistRecord) -> Result<PlaylistRecord>;
    async fn delete_playlist(&self, id: u64) -> Result<()>;

    /// Append a track to the end of a playlist.
    async fn add_track(&self, playlist_id: u64, new_track: NewTrack) -> Result<TrackRecord>;
    /// All tracks with the given uuid, optionally restricted to playlists of
    /// the account whose e-mail is `owner_email`.
    async fn find_tracks(&self, uuid: Uuid, owner_email: Option<&str>) -> Result<Vec<TrackRecord>>;
    async fn update_track(&self, track: TrackRecord) -> Result<TrackRecord>;
    async fn delete_track(&self, id: u64) -> Result<()>;
}

/// Helper for uniqueness pre-checks: a row that exists becomes a conflict,
/// a missing row is fine, anything else passes through.
pub trait StorageResult {
    fn conflict_or_ok(self, resource: &'static str) -> Result<()>;
}

impl<T> StorageResult for Result<T> {
    fn conflict_or_ok(self, resource: &'static str) -> Result<()> {
        match self {
            Ok(_) => Err(StorageError::Conflict { resource }),
            Err(StorageError::NotFound { .. }) => Ok(()),
            Err(err) => Err(err),
        }
    }
}
