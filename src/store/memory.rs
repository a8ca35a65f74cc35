//! Thread-safe in-memory [`SessionStore`] for tests and short-lived processes.

// self
use crate::{
	_prelude::*,
	store::{PendingRedirect, PersistedSession, SessionStore, StoreFuture, StoreKey, StoreSnapshot},
};

/// Keeps sessions in-process; clones share the same contents.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<StoreSnapshot>>);
impl MemoryStore {
	/// Copy of the current contents.
	pub fn snapshot(&self) -> StoreSnapshot {
		self.0.read().clone()
	}
}
impl SessionStore for MemoryStore {
	fn load_session<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<PersistedSession>> {
		let session = self.0.read().sessions.get(key).cloned();

		Box::pin(async move { Ok(session) })
	}

	fn save_session<'a>(
		&'a self,
		key: &'a StoreKey,
		session: PersistedSession,
	) -> StoreFuture<'a, ()> {
		self.0.write().sessions.insert(key.to_owned(), session);

		Box::pin(async { Ok(()) })
	}

	fn clear_session<'a>(
		&'a self,
		key: &'a StoreKey,
	) -> StoreFuture<'a, Option<PersistedSession>> {
		let removed = self.0.write().sessions.remove(key);

		Box::pin(async move { Ok(removed) })
	}

	fn save_pending_redirect<'a>(
		&'a self,
		key: &'a StoreKey,
		pending: PendingRedirect,
	) -> StoreFuture<'a, ()> {
		self.0.write().pending.entry(key.to_owned()).or_default().push(pending);

		Box::pin(async { Ok(()) })
	}

	fn take_pending_redirect<'a>(
		&'a self,
		key: &'a StoreKey,
		state: &'a str,
	) -> StoreFuture<'a, Option<PendingRedirect>> {
		let found = self.0.write().take_pending(key, state, OffsetDateTime::now_utc());

		Box::pin(async move { Ok(found) })
	}
}
