// In-memory storage engine
use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{
    AccountRecord, NewAccount, NewPlaylist, NewTrack, PlaylistRecord, Result, Storage,
    StorageError, TrackRecord,
};
use crate::lock::EditLease;

/// Storage engine backed by process memory.
///
/// All data lives under one RwLock, so every operation observes and applies
/// its changes atomically. Playlists are held inside their owning account
/// row and tracks inside their playlist, which makes the ownership
/// traversals plain nested iteration.
#[derive(Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    accounts: Vec<AccountRow>,
    last_account_id: u64,
    last_playlist_id: u64,
    last_track_id: u64,
}

struct AccountRow {
    account: AccountRecord,
    playlists: Vec<PlaylistRecord>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tables {
    fn email_taken(&self, email: &str, exclude_id: Option<u64>) -> bool {
        self.accounts.iter().any(|row| {
            row.account.email_address.eq_ignore_ascii_case(email)
                && Some(row.account.id) != exclude_id
        })
    }

    fn row_by_id_mut(&mut self, id: u64) -> Option<&mut AccountRow> {
        self.accounts.iter_mut().find(|row| row.account.id == id)
    }

    fn playlist_by_id_mut(&mut self, id: u64) -> Option<&mut PlaylistRecord> {
        self.accounts
            .iter_mut()
            .flat_map(|row| row.playlists.iter_mut())
            .find(|playlist| playlist.id == id)
    }

    fn track_by_id_mut(&mut self, id: u64) -> Option<&mut TrackRecord> {
        self.accounts
            .iter_mut()
            .flat_map(|row| row.playlists.iter_mut())
            .flat_map(|playlist| playlist.tracks.iter_mut())
            .find(|track| track.id == id)
    }

    /// Account rows visible to `owner_email`: all of them for None, just the
    /// matching account otherwise.
    fn visible_rows<'a>(
        &'a self,
        owner_email: Option<&'a str>,
    ) -> impl Iterator<Item = &'a AccountRow> + 'a {
        self.accounts.iter().filter(move |row| match owner_email {
            Some(email) => row.account.email_address.eq_ignore_ascii_case(email),
            None => true,
        })
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn create_account(&self, new_account: NewAccount) -> Result<AccountRecord> {
        let mut tables = self.tables.write();
        if tables.email_taken(&new_account.email_address, None) {
            return Err(StorageError::Conflict { resource: "Account" });
        }

        tables.last_account_id += 1;
        let account = AccountRecord {
            id: tables.last_account_id,
            uuid: Uuid::new_v4(),
            first_name: new_account.first_name,
            last_name: new_account.last_name,
            email_address: new_account.email_address,
            password_hash: new_account.password_hash,
            enabled: new_account.enabled,
            admin: new_account.admin,
            friends: Vec::new(),
        };
        tables.accounts.push(AccountRow {
            account: account.clone(),
            playlists: Vec::new(),
        });
        Ok(account)
    }

    async fn account_by_id(&self, id: u64) -> Result<AccountRecord> {
        self.tables
            .read()
            .accounts
            .iter()
            .find(|row| row.account.id == id)
            .map(|row| row.account.clone())
            .ok_or(StorageError::NotFound { resource: "Account" })
    }

    async fn account_by_uuid(&self, uuid: Uuid) -> Result<AccountRecord> {
        self.tables
            .read()
            .accounts
            .iter()
            .find(|row| row.account.uuid == uuid)
            .map(|row| row.account.clone())
            .ok_or(StorageError::NotFound { resource: "Account" })
    }

    async fn account_by_email(&self, email: &str) -> Result<AccountRecord> {
        self.tables
            .read()
            .accounts
            .iter()
            .find(|row| row.account.email_address.eq_ignore_ascii_case(email))
            .map(|row| row.account.clone())
            .ok_or(StorageError::NotFound { resource: "Account" })
    }

    async fn list_accounts(&self) -> Result<Vec<AccountRecord>> {
        Ok(self
            .tables
            .read()
            .accounts
            .iter()
            .map(|row| row.account.clone())
            .collect())
    }

    async fn update_account(&self, account: AccountRecord) -> Result<AccountRecord> {
        let mut tables = self.tables.write();
        if tables.email_taken(&account.email_address, Some(account.id)) {
            return Err(StorageError::Conflict { resource: "Account" });
        }
        let row = tables
            .row_by_id_mut(account.id)
            .ok_or(StorageError::NotFound { resource: "Account" })?;
        row.account = account.clone();
        Ok(account)
    }

    async fn delete_account(&self, id: u64) -> Result<()> {
        let mut tables = self.tables.write();
        let index = tables
            .accounts
            .iter()
            .position(|row| row.account.id == id)
            .ok_or(StorageError::NotFound { resource: "Account" })?;
        tables.accounts.remove(index);
        Ok(())
    }

    async fn create_playlist(
        &self,
        owner_id: u64,
        new_playlist: NewPlaylist,
    ) -> Result<PlaylistRecord> {
        let mut tables = self.tables.write();
        tables.last_playlist_id += 1;
        let playlist = PlaylistRecord {
            id: tables.last_playlist_id,
            uuid: Uuid::new_v4(),
            name: new_playlist.name,
            current_track: 0,
            elapsed: 0,
            tracks: Vec::new(),
            lease: EditLease::default(),
        };
        let row = tables
            .row_by_id_mut(owner_id)
            .ok_or(StorageError::NotFound { resource: "Account" })?;
        row.playlists.push(playlist.clone());
        Ok(playlist)
    }

    async fn playlists_by_account(&self, account_id: u64) -> Result<Vec<PlaylistRecord>> {
        self.tables
            .read()
            .accounts
            .iter()
            .find(|row| row.account.id == account_id)
            .map(|row| row.playlists.clone())
            .ok_or(StorageError::NotFound { resource: "Account" })
    }

    async fn find_playlists(
        &self,
        uuid: Uuid,
        owner_email: Option<&str>,
    ) -> Result<Vec<PlaylistRecord>> {
        Ok(self
            .tables
            .read()
            .visible_rows(owner_email)
            .flat_map(|row| row.playlists.iter())
            .filter(|playlist| playlist.uuid == uuid)
            .cloned()
            .collect())
    }

    async fn update_playlist(&self, playlist: PlaylistRecord) -> Result<PlaylistRecord> {
        let mut tables = self.tables.write();
        let stored = tables
            .playlist_by_id_mut(playlist.id)
            .ok_or(StorageError::NotFound { resource: "Playlist" })?;
        stored.name = playlist.name;
        stored.current_track = playlist.current_track;
        stored.elapsed = playlist.elapsed;
        stored.lease = playlist.lease;
        Ok(stored.clone())
    }

    async fn delete_playlist(&self, id: u64) -> Result<()> {
        let mut tables = self.tables.write();
        for row in tables.accounts.iter_mut() {
            if let Some(index) = row.playlists.iter().position(|playlist| playlist.id == id) {
                row.playlists.remove(index);
                return Ok(());
            }
        }
        Err(StorageError::NotFound { resource: "Playlist" })
    }

    async fn add_track(&self, playlist_id: u64, new_track: NewTrack) -> Result<TrackRecord> {
        let mut tables = self.tables.write();
        tables.last_track_id += 1;
        let track = TrackRecord {
            id: tables.last_track_id,
            uuid: Uuid::new_v4(),
            path: new_track.path,
            artist_name: new_track.artist_name,
            song_name: new_track.song_name,
            album_name: new_track.album_name,
            album_track_number: new_track.album_track_number,
            duration: new_track.duration,
        };
        let playlist = tables
            .playlist_by_id_mut(playlist_id)
            .ok_or(StorageError::NotFound { resource: "Playlist" })?;
        playlist.tracks.push(track.clone());
        Ok(track)
    }

    async fn find_tracks(
        &self,
        uuid: Uuid,
        owner_email: Option<&str>,
    ) -> Result<Vec<TrackRecord>> {
        Ok(self
            .tables
            .read()
            .visible_rows(owner_email)
            .flat_map(|row| row.playlists.iter())
            .flat_map(|playlist| playlist.tracks.iter())
            .filter(|track| track.uuid == uuid)
            .cloned()
            .collect())
    }

    async fn update_track(&self, track: TrackRecord) -> Result<TrackRecord> {
        let mut tables = self.tables.write();
        let stored = tables
            .track_by_id_mut(track.id)
            .ok_or(StorageError::NotFound { resource: "Track" })?;
        stored.path = track.path;
        stored.artist_name = track.artist_name;
        stored.song_name = track.song_name;
        stored.album_name = track.album_name;
        stored.album_track_number = track.album_track_number;
        stored.duration = track.duration;
        Ok(stored.clone())
    }

    async fn delete_track(&self, id: u64) -> Result<()> {
        let mut tables = self.tables.write();
        for row in tables.accounts.iter_mut() {
            for playlist in row.playlists.iter_mut() {
                if let Some(index) = playlist.tracks.iter().position(|track| track.id == id) {
                    playlist.tracks.remove(index);
                    return Ok(());
                }
            }
        }
        Err(StorageError::NotFound { resource: "Track" })
    }
}
