use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::client::{ClientId, ClientSession};
use crate::error::ReplError;

/// Default number of sessions kept alive at once.
pub const DEFAULT_CAPACITY: usize = 100;

struct Entry {
    session: Arc<ClientSession>,
    tick: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<ClientId, Entry>,
    recency: BTreeMap<u64, ClientId>,
    next_tick: u64,
}

impl Inner {
    fn touch(&mut self, id: &ClientId) -> Option<Arc<ClientSession>> {
        let tick = self.next_tick;
        let entry = self.entries.get_mut(id)?;
        self.recency.remove(&entry.tick);
        entry.tick = tick;
        self.recency.insert(tick, id.clone());
        self.next_tick += 1;
        Some(Arc::clone(&entry.session))
    }

    fn insert(&mut self, id: ClientId, session: Arc<ClientSession>) {
        let tick = self.next_tick;
        self.next_tick += 1;
        self.recency.insert(tick, id.clone());
        self.entries.insert(id, Entry { session, tick });
    }

    fn remove(&mut self, id: &ClientId) -> Option<Arc<ClientSession>> {
        let entry = self.entries.remove(id)?;
        self.recency.remove(&entry.tick);
        Some(entry.session)
    }

    fn pop_oldest(&mut self) -> Option<Arc<ClientSession>> {
        let (_, id) = self.recency.pop_first()?;
        self.entries.remove(&id).map(|entry| entry.session)
    }
}

/// A bounded, least-recently-used map from [`ClientId`] to [`ClientSession`].
///
/// Every successful lookup refreshes the session. When a new session would
/// exceed the capacity, the least recently used one is closed and dropped.
pub struct SessionRegistry {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SessionRegistry {
    /// Creates a registry holding at most `capacity` sessions (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &ClientId) -> bool {
        self.lock().entries.contains_key(id)
    }

    /// Returns the session for `id`, creating it with `create` if absent.
    ///
    /// `create` runs under the registry lock, so it must not block; model
    /// construction only reads settings and builds an HTTP client. If
    /// `create` fails nothing is inserted or evicted.
    pub fn get_or_create<F>(&self, id: &ClientId, create: F) -> Result<Arc<ClientSession>, ReplError>
    where
        F: FnOnce() -> Result<ClientSession, ReplError>,
    {
        let (session, evicted) = {
            let mut inner = self.lock();
            if let Some(session) = inner.touch(id) {
                return Ok(session);
            }

            let session = Arc::new(create()?);
            let mut evicted = Vec::new();
            while inner.entries.len() >= self.capacity {
                match inner.pop_oldest() {
                    Some(old) => evicted.push(old),
                    None => break,
                }
            }
            inner.insert(id.clone(), Arc::clone(&session));
            (session, evicted)
        };

        for old in evicted {
            tracing::info!(client_id = %old.id(), "evicting least recently used session");
            old.close();
        }
        tracing::debug!(client_id = %id, "session created");
        Ok(session)
    }

    /// Removes and closes the session for `id`.
    pub fn remove(&self, id: &ClientId) -> Option<Arc<ClientSession>> {
        let session = self.lock().remove(id)?;
        session.close();
        tracing::debug!(client_id = %id, "session removed");
        Some(session)
    }

    /// Closes every session and empties the registry.
    pub fn clear(&self) {
        let sessions: Vec<_> = {
            let mut inner = self.lock();
            inner.recency.clear();
            inner.entries.drain().map(|(_, entry)| entry.session).collect()
        };
        if !sessions.is_empty() {
            tracing::info!(sessions = sessions.len(), "closing remaining sessions");
        }
        for session in sessions {
            session.close();
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock leaves the maps consistent, so a
        // poisoned lock is still usable.
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}
