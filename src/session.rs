use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use time::OffsetDateTime;

use crate::personnummer::Personnummer;
use crate::token::{self, SessionClaims, SigningKey};
use crate::types::{OrderRef, SessionId};

/// How the active session is persisted between polls.
///
/// Exactly one strategy is active per deployment; the choice is an explicit
/// configuration value, never runtime-ambient. Mixing both for the same
/// logical session is a latent bug, so the two stores never coexist.
pub enum SessionBackend {
    /// The session lives entirely in a signed, time-limited cookie value.
    /// No server-side storage, survives restarts, but cannot be revoked
    /// before its natural expiry without the browser dropping the cookie.
    SignedCookie(CookieSessions),
    /// The cookie holds a generated id; the payload lives in a server-side
    /// map with proactive revocation. Lost on restart and not shared across
    /// processes.
    Memory(MemorySessions),
}

/// Which strategy a backend instance uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    SignedCookie,
    Memory,
}

impl SessionBackend {
    #[must_use]
    pub fn kind(&self) -> StoreKind {
        match self {
            Self::SignedCookie(_) => StoreKind::SignedCookie,
            Self::Memory(_) => StoreKind::Memory,
        }
    }

    /// Create and persist a new session. Returns the value the cookie carries.
    #[must_use]
    pub fn start(&self, personal_number: Personnummer, order_ref: OrderRef) -> String {
        match self {
            Self::SignedCookie(store) => store.start(personal_number, order_ref),
            Self::Memory(store) => store.start(personal_number, order_ref).to_string(),
        }
    }

    /// Decoded session payload, or `None` if expired, invalid, or absent.
    #[must_use]
    pub fn read(&self, token: &str) -> Option<SessionClaims> {
        match self {
            Self::SignedCookie(store) => store.read(token),
            Self::Memory(store) => store.read(token),
        }
    }

    /// Invalidate the session.
    ///
    /// The memory store deletes the record immediately. The cookie store has
    /// no server-side record to delete; the caller must overwrite or drop the
    /// cookie, and the token stays decodable until its natural expiry.
    pub fn destroy(&self, token: &str) {
        match self {
            Self::SignedCookie(_) => {}
            Self::Memory(store) => store.destroy(token),
        }
    }

    /// Remove expired records. No-op for the cookie store.
    pub fn sweep_expired(&self) -> usize {
        match self {
            Self::SignedCookie(_) => 0,
            Self::Memory(store) => store.sweep_expired(),
        }
    }
}

/// Stateless store: the signed token is the session.
pub struct CookieSessions {
    key: SigningKey,
    lifetime: time::Duration,
}

impl CookieSessions {
    #[must_use]
    pub fn new(key: SigningKey, lifetime: time::Duration) -> Self {
        Self { key, lifetime }
    }

    fn start(&self, personal_number: Personnummer, order_ref: OrderRef) -> String {
        token::encode(&self.key, personal_number, order_ref, self.lifetime)
    }

    fn read(&self, value: &str) -> Option<SessionClaims> {
        match token::decode(&self.key, value) {
            Ok(claims) => Some(claims),
            Err(reason) => {
                // Expired and invalid collapse to "no session" for callers.
                tracing::debug!(%reason, "session token rejected");
                None
            }
        }
    }
}

struct MemoryRecord {
    claims: SessionClaims,
    expires_at: Instant,
}

/// Server-side store keyed by a generated session identifier.
pub struct MemorySessions {
    lifetime: Duration,
    records: Mutex<HashMap<SessionId, MemoryRecord>>,
}

impl MemorySessions {
    #[must_use]
    pub fn new(lifetime: Duration) -> Self {
        Self {
            lifetime,
            records: Mutex::new(HashMap::new()),
        }
    }

    fn start(&self, personal_number: Personnummer, order_ref: OrderRef) -> SessionId {
        self.start_at(personal_number, order_ref, Instant::now())
    }

    fn start_at(
        &self,
        personal_number: Personnummer,
        order_ref: OrderRef,
        now: Instant,
    ) -> SessionId {
        let id = SessionId::from(generate_session_id());
        let issued = OffsetDateTime::now_utc().unix_timestamp();
        let record = MemoryRecord {
            claims: SessionClaims {
                personal_number,
                order_ref,
                issued_at: issued,
                expires_at: issued + self.lifetime.as_secs() as i64,
            },
            expires_at: now + self.lifetime,
        };
        self.lock().insert(id.clone(), record);
        id
    }

    fn read(&self, id: &str) -> Option<SessionClaims> {
        self.read_at(id, Instant::now())
    }

    /// Expired records are inert before the sweep removes them.
    fn read_at(&self, id: &str, now: Instant) -> Option<SessionClaims> {
        let records = self.lock();
        let record = records.get(&SessionId::from(id.to_string()))?;
        if now >= record.expires_at {
            return None;
        }
        Some(record.claims.clone())
    }

    fn destroy(&self, id: &str) {
        self.lock().remove(&SessionId::from(id.to_string()));
    }

    fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Instant::now())
    }

    fn sweep_expired_at(&self, now: Instant) -> usize {
        let mut records = self.lock();
        let before = records.len();
        records.retain(|_, record| now < record.expires_at);
        before - records.len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, MemoryRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 32 random bytes, base64url. Opaque to the browser.
fn generate_session_id() -> String {
    let random_bytes: [u8; 32] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}
