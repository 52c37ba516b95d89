use async_trait::async_trait;
use axum::http::{header::COOKIE, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::StoreError;

mod memory;
mod postgres;

pub use memory::MemorySessionStore;
pub use postgres::PgSessionStore;

/// Server-side session keyed by the cookie value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>, user_id: Uuid, idle: Duration) -> Self {
        Self {
            id: id.into(),
            user_id,
            expires_at: expiry(idle),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Push expiry out by the idle timeout
    pub fn touch(&mut self, idle: Duration) {
        self.expires_at = expiry(idle);
    }
}

fn expiry(idle: Duration) -> DateTime<Utc> {
    Utc::now().checked_add_signed(idle).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Session persistence. Creating sessions (login, MFA) happens elsewhere.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Expired sessions are reported as absent
    async fn load(&self, id: &str) -> Result<Option<Session>, StoreError>;

    async fn save(&self, session: &Session) -> Result<(), StoreError>;

    async fn destroy(&self, id: &str) -> Result<(), StoreError>;
}

/// Value of the named cookie from the request's Cookie headers
pub fn session_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}
