// Expiring edit leases for playlist mutation
use chrono::{DateTime, Duration, Utc};

/// How long a session keeps a playlist lease after touching it.
pub const LEASE_TTL_MINUTES: i64 = 10;

/// Relationship between a lease and the session asking about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseState {
    Unlocked,
    HeldBySelf,
    HeldByOther,
}

/// Advisory write lease on a playlist.
///
/// The holder is a session id, not an account: two signins by the same
/// account contend with each other. A lease with a zero or past expiry is
/// free for anyone regardless of who held it last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditLease {
    pub holder: String,
    pub expires_at: i64,
}

impl EditLease {
    pub fn state(&self, session_id: &str, now: DateTime<Utc>) -> LeaseState {
        if self.expires_at <= now.timestamp() {
            return LeaseState::Unlocked;
        }
        if self.holder == session_id {
            LeaseState::HeldBySelf
        } else {
            LeaseState::HeldByOther
        }
    }

    pub fn is_held_by_other(&self, session_id: &str, now: DateTime<Utc>) -> bool {
        self.state(session_id, now) == LeaseState::HeldByOther
    }

    /// Take or renew the lease for `session_id`.
    ///
    /// Succeeds when the lease is free or already held by this session, and
    /// pushes the expiry to a full TTL from `now`. Returns false and leaves
    /// the lease untouched when another session still holds it.
    pub fn try_acquire(&mut self, session_id: &str, now: DateTime<Utc>) -> bool {
        if self.is_held_by_other(session_id, now) {
            return false;
        }
        self.holder = session_id.to_string();
        self.expires_at = (now + Duration::minutes(LEASE_TTL_MINUTES)).timestamp();
        true
    }

    /// Give the lease up early. Only the holding session can release; calls
    /// from anyone else are ignored.
    pub fn release(&mut self, session_id: &str) {
        if self.holder == session_id {
            self.holder.clear();
            self.expires_at = 0;
        }
    }
}
