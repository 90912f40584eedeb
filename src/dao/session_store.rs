use std::{sync::Arc, time::Duration};

use dashmap::{DashMap, mapref::entry::Entry};
use thiserror::Error;
use tokio::{sync::Mutex, time::Instant};

use crate::state::session::Session;

/// Failure modes for session store access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Pin is unknown or the entry was already evicted.
    #[error("session not found")]
    NotFound,
    /// Retention window elapsed between lookup and update.
    #[error("session expired")]
    Expired,
}

struct Stored {
    session: Session,
    expires_at: Instant,
}

/// Authoritative, TTL-bound store for live sessions keyed by pin.
///
/// Updates for one pin are serialized on a per-entry mutex; unrelated sessions
/// never contend. Every successful update refreshes the retention deadline.
pub struct SessionStore {
    entries: DashMap<String, Arc<Mutex<Stored>>>,
    ttl: Duration,
}

impl SessionStore {
    /// Create an empty store whose entries live `ttl` past their last write.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Register a freshly created session under its pin. Returns `false` and
    /// leaves the existing entry untouched when the pin is already held by
    /// another session, live or awaiting sweep; callers retry with a fresh pin.
    pub fn insert(&self, session: &Session) -> bool {
        match self.entries.entry(session.pin.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(Stored {
                    expires_at: Instant::now() + self.ttl,
                    session: session.clone(),
                })));
                true
            }
        }
    }

    /// True when a live (non-expired) session is registered under `pin`.
    pub async fn contains(&self, pin: &str) -> bool {
        self.get(pin).await.is_ok()
    }

    /// Number of live entries. Expired-but-unswept entries are counted; the
    /// sweeper keeps that window short.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no session is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clone out a snapshot of the session stored under `pin`.
    pub async fn get(&self, pin: &str) -> Result<Session, StoreError> {
        let entry = self.entry(pin)?;
        let guard = entry.lock().await;
        if guard.expires_at <= Instant::now() {
            drop(guard);
            self.evict(pin, &entry);
            return Err(StoreError::NotFound);
        }
        Ok(guard.session.clone())
    }

    /// Run `update` against the session under `pin` with exclusive access.
    ///
    /// The closure receives a working copy; it is written back only when the
    /// closure succeeds, so a failed update leaves the stored session exactly
    /// as it was. The per-pin lock is held until the write-back completes,
    /// which makes concurrent updates for one pin linearizable.
    pub async fn atomic_update<T, E, F>(&self, pin: &str, update: F) -> Result<T, E>
    where
        F: FnOnce(&mut Session) -> Result<T, E>,
        E: From<StoreError>,
    {
        let entry = self.entry(pin).map_err(E::from)?;
        let mut guard = entry.lock().await;
        let now = Instant::now();
        if guard.expires_at <= now {
            drop(guard);
            self.evict(pin, &entry);
            return Err(E::from(StoreError::Expired));
        }

        let mut working = guard.session.clone();
        let value = update(&mut working)?;
        guard.session = working;
        guard.expires_at = now + self.ttl;
        Ok(value)
    }

    /// Drop every expired entry, returning the pins that were removed.
    pub async fn remove_expired(&self) -> Vec<String> {
        let now = Instant::now();
        let candidates: Vec<(String, Arc<Mutex<Stored>>)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        let mut removed = Vec::new();
        for (pin, entry) in candidates {
            let guard = entry.lock().await;
            if guard.expires_at <= now {
                drop(guard);
                self.evict(&pin, &entry);
                removed.push(pin);
            }
        }
        removed
    }

    fn entry(&self, pin: &str) -> Result<Arc<Mutex<Stored>>, StoreError> {
        self.entries
            .get(pin)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(StoreError::NotFound)
    }

    /// Remove the map entry only if it still points at the instance we hold,
    /// so a concurrent re-insert under the same pin is never clobbered.
    fn evict(&self, pin: &str, stale: &Arc<Mutex<Stored>>) {
        self.entries
            .remove_if(pin, |_, current| Arc::ptr_eq(current, stale));
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::state::session::{Player, QuizSnapshot};

    fn session(pin: &str) -> Session {
        Session::new(
            pin.to_string(),
            Uuid::new_v4(),
            QuizSnapshot {
                title: "test".into(),
                questions: Vec::new(),
            },
        )
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let store = SessionStore::new(Duration::from_secs(10));
        let original = session("111111");
        let id = original.id;
        assert!(store.insert(&original));

        let fetched = store.get("111111").await.unwrap();
        assert_eq!(fetched.id, id);
        assert!(store.contains("111111").await);
    }

    #[tokio::test]
    async fn duplicate_pin_insert_preserves_the_first_session() {
        let store = SessionStore::new(Duration::from_secs(10));
        let first = session("123123");
        let first_id = first.id;
        assert!(store.insert(&first));

        assert!(!store.insert(&session("123123")));

        let fetched = store.get("123123").await.unwrap();
        assert_eq!(fetched.id, first_id);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn unknown_pin_is_not_found() {
        let store = SessionStore::new(Duration::from_secs(10));
        assert_eq!(store.get("000000").await.unwrap_err(), StoreError::NotFound);
        assert!(!store.contains("000000").await);
    }

    #[tokio::test]
    async fn failed_update_leaves_session_untouched() {
        let store = SessionStore::new(Duration::from_secs(10));
        store.insert(&session("222222"));

        let result: Result<(), StoreError> = store
            .atomic_update("222222", |session| {
                let player = Player::new("ghost".into());
                session.players.insert(player.id, player);
                Err(StoreError::NotFound)
            })
            .await;
        assert!(result.is_err());

        let fetched = store.get("222222").await.unwrap();
        assert!(fetched.players.is_empty());
    }

    #[tokio::test]
    async fn successful_update_is_visible_to_readers() {
        let store = SessionStore::new(Duration::from_secs(10));
        store.insert(&session("333333"));

        let nickname: Result<String, StoreError> = store
            .atomic_update("333333", |session| {
                let player = Player::new("alice".into());
                let nickname = player.nickname.clone();
                session.players.insert(player.id, player);
                Ok(nickname)
            })
            .await;
        assert_eq!(nickname.unwrap(), "alice");

        let fetched = store.get("333333").await.unwrap();
        assert_eq!(fetched.players.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let store = SessionStore::new(Duration::from_secs(60));
        store.insert(&session("444444"));

        tokio::time::advance(Duration::from_secs(61)).await;

        // The update hits the still-resident expired entry and evicts it; the
        // later lookup no longer finds the pin at all.
        let result: Result<(), StoreError> = store.atomic_update("444444", |_| Ok(())).await;
        assert_eq!(result.unwrap_err(), StoreError::Expired);
        assert_eq!(store.get("444444").await.unwrap_err(), StoreError::NotFound);
    }

    #[tokio::test(start_paused = true)]
    async fn writes_refresh_the_ttl() {
        let store = SessionStore::new(Duration::from_secs(60));
        store.insert(&session("555555"));

        tokio::time::advance(Duration::from_secs(45)).await;
        let _: Result<(), StoreError> = store.atomic_update("555555", |_| Ok(())).await;

        tokio::time::advance(Duration::from_secs(45)).await;
        assert!(store.get("555555").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_returns_expired_pins() {
        let store = SessionStore::new(Duration::from_secs(60));
        store.insert(&session("666666"));
        store.insert(&session("777777"));

        tokio::time::advance(Duration::from_secs(30)).await;
        let _: Result<(), StoreError> = store.atomic_update("777777", |_| Ok(())).await;
        tokio::time::advance(Duration::from_secs(45)).await;

        let removed = store.remove_expired().await;
        assert_eq!(removed, vec!["666666".to_string()]);
        assert!(store.get("777777").await.is_ok());
    }
}
