use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entities::{QuoteSession, Stage};
use crate::error::{not_found_error, unexpected_error, Error};

pub type SessionHandle = Arc<tokio::sync::Mutex<QuoteSession>>;

/// In-process quote drafts. Each session sits behind its own async mutex so
/// steps for one session run strictly one at a time while different
/// sessions proceed in parallel.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, now: DateTime<Utc>) -> Result<QuoteSession, Error> {
        let session = QuoteSession::new(now);
        let mut sessions = self.sessions.lock().map_err(unexpected_error)?;

        sessions.retain(|_, handle| match handle.try_lock() {
            Ok(session) => !is_finished(&session, now),
            Err(_) => true,
        });
        sessions.insert(session.id, Arc::new(tokio::sync::Mutex::new(session.clone())));

        Ok(session)
    }

    pub fn get(&self, id: Uuid) -> Result<SessionHandle, Error> {
        let sessions = self.sessions.lock().map_err(unexpected_error)?;

        sessions.get(&id).cloned().ok_or_else(not_found_error)
    }

    pub fn discard(&self, id: Uuid) -> Result<(), Error> {
        let mut sessions = self.sessions.lock().map_err(unexpected_error)?;
        sessions.remove(&id);

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|sessions| sessions.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// tombstones, plus any draft or committed session past its clock
fn is_finished(session: &QuoteSession, now: DateTime<Utc>) -> bool {
    match session.expires_at {
        _ if session.stage == Stage::Expired => true,
        Some(expires_at) => now >= expires_at,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn creates_and_finds_sessions() {
        let store = SessionStore::new();
        let session = store.create(Utc::now()).unwrap();

        let handle = store.get(session.id).unwrap();
        assert_eq!(handle.lock().await.stage, Stage::CollectingRoute);
        assert!(store.get(Uuid::new_v4()).unwrap_err().is_not_found_error());

        store.discard(session.id).unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn purges_expired_sessions_on_create() {
        let store = SessionStore::new();
        let start = Utc::now();
        let session = store.create(start).unwrap();

        {
            let handle = store.get(session.id).unwrap();
            let mut draft = handle.lock().await;
            draft.expires_at = Some(start + Duration::minutes(15));
        }

        store.create(start + Duration::minutes(1)).unwrap();
        assert_eq!(store.len(), 2);

        store.create(start + Duration::minutes(20)).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.get(session.id).is_err());
    }
}
