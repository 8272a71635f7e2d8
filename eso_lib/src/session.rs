//! Session storage shared across refresh cycles.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use eso_api::Session;

/// Holds the portal session between refresh cycles.
///
/// The pipeline reads the stored session before each cycle, stores the one
/// produced by a fresh login, and invalidates it when a cycle that reused it
/// fails after authentication.
pub trait SessionStore {
    /// Returns the stored session, or `None` when a login is required.
    fn get(&self) -> Option<Session>;
    /// Stores a freshly authenticated session.
    fn set(&self, session: Session);
    /// Drops the stored session.
    fn invalidate(&self);
}

struct StoredSession {
    session: Session,
    stored_at: Instant,
}

/// In-process session store with an optional maximum session age.
///
/// Empty sessions (no cookie for the portal) are never returned. Aged-out
/// sessions are lazily evicted on the next `get`.
#[derive(Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<StoredSession>>,
    max_age: Option<Duration>,
}

impl MemorySessionStore {
    /// Creates a store whose sessions live until invalidated.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that forgets sessions older than `max_age`.
    pub fn with_max_age(max_age: Duration) -> Self {
        Self {
            slot: Mutex::new(None),
            max_age: Some(max_age),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Option<Session> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        let stored = slot.as_ref()?;
        let expired = self
            .max_age
            .is_some_and(|max_age| stored.stored_at.elapsed() > max_age);
        if expired {
            tracing::debug!("Stored session is older than the maximum age, dropping it");
            *slot = None;
            return None;
        }
        if stored.session.is_empty() {
            return None;
        }
        Some(stored.session.clone())
    }

    fn set(&self, session: Session) {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(StoredSession {
            session,
            stored_at: Instant::now(),
        });
    }

    fn invalidate(&self) {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl<T: SessionStore + ?Sized> SessionStore for &T {
    fn get(&self) -> Option<Session> {
        (**self).get()
    }

    fn set(&self, session: Session) {
        (**self).set(session)
    }

    fn invalidate(&self) {
        (**self).invalidate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn session_with_cookie() -> Session {
        let session = Session::new(Url::parse("https://mano.eso.lt/").unwrap());
        session.add_cookie("SSESS1=abc; Path=/");
        session
    }

    #[test]
    fn store_set_and_get() {
        let store = MemorySessionStore::new();
        assert!(store.get().is_none());
        store.set(session_with_cookie());
        assert!(store.get().is_some());
        // Reused on every subsequent read.
        assert!(store.get().is_some());
    }

    #[test]
    fn store_ignores_empty_session() {
        let store = MemorySessionStore::new();
        store.set(Session::new(Url::parse("https://mano.eso.lt/").unwrap()));
        assert!(store.get().is_none());
    }

    #[test]
    fn store_invalidate() {
        let store = MemorySessionStore::new();
        store.set(session_with_cookie());
        store.invalidate();
        assert!(store.get().is_none());
    }

    #[test]
    fn store_max_age() {
        let store = MemorySessionStore::with_max_age(Duration::from_millis(1));
        store.set(session_with_cookie());
        std::thread::sleep(Duration::from_millis(10));
        assert!(store.get().is_none());
    }

    #[test]
    fn store_by_reference() {
        fn seed<S: SessionStore>(store: S) {
            store.set(session_with_cookie());
        }

        let store = MemorySessionStore::new();
        seed(&store);
        assert!(store.get().is_some());
    }
}
