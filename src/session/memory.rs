use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{Session, SessionStore};
use crate::database::StoreError;

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &str) -> Result<Option<Session>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(id)
            .filter(|s| !s.is_expired(Utc::now()))
            .cloned())
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn destroy(&self, id: &str) -> Result<(), StoreError> {
        self.sessions.write().await.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    #[tokio::test]
    async fn expired_sessions_are_absent() {
        let store = MemorySessionStore::new();
        store
            .save(&Session::new("old", Uuid::new_v4(), Duration::seconds(-1)))
            .await
            .unwrap();
        store
            .save(&Session::new("live", Uuid::new_v4(), Duration::minutes(5)))
            .await
            .unwrap();

        assert!(store.load("old").await.unwrap().is_none());
        assert!(store.load("live").await.unwrap().is_some());

        store.destroy("live").await.unwrap();
        assert!(store.load("live").await.unwrap().is_none());
    }
}
