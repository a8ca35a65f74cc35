//! JSON file-backed [`SessionStore`] that survives process restarts.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{
		PendingRedirect, PersistedSession, SessionStore, StoreError, StoreFuture, StoreKey,
		StoreSnapshot,
	},
};

/// Persists the whole [`StoreSnapshot`] to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<StoreSnapshot>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<StoreSnapshot, StoreError> {
		if !path.exists() {
			return Ok(StoreSnapshot::default());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(StoreSnapshot::default());
		}

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &StoreSnapshot) -> Result<(), StoreError> {
		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	fn mutate<T>(&self, f: impl FnOnce(&mut StoreSnapshot) -> T) -> Result<T, StoreError> {
		let mut guard = self.inner.write();
		let out = f(&mut guard);

		self.persist_locked(&guard)?;

		Ok(out)
	}
}
impl SessionStore for FileStore {
	fn load_session<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<PersistedSession>> {
		Box::pin(async move { Ok(self.inner.read().sessions.get(key).cloned()) })
	}

	fn save_session<'a>(
		&'a self,
		key: &'a StoreKey,
		session: PersistedSession,
	) -> StoreFuture<'a, ()> {
		let result = self.mutate(|snapshot| {
			snapshot.sessions.insert(key.to_owned(), session);
		});

		Box::pin(async move { result })
	}

	fn clear_session<'a>(
		&'a self,
		key: &'a StoreKey,
	) -> StoreFuture<'a, Option<PersistedSession>> {
		let result = self.mutate(|snapshot| snapshot.sessions.remove(key));

		Box::pin(async move { result })
	}

	fn save_pending_redirect<'a>(
		&'a self,
		key: &'a StoreKey,
		pending: PendingRedirect,
	) -> StoreFuture<'a, ()> {
		let result = self.mutate(|snapshot| {
			snapshot.pending.entry(key.to_owned()).or_default().push(pending);
		});

		Box::pin(async move { result })
	}

	fn take_pending_redirect<'a>(
		&'a self,
		key: &'a StoreKey,
		state: &'a str,
	) -> StoreFuture<'a, Option<PendingRedirect>> {
		let now = OffsetDateTime::now_utc();
		let result = self.mutate(|snapshot| snapshot.take_pending(key, state, now));

		Box::pin(async move { result })
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;
	use crate::auth::{SessionUser, TokenRecord, UserId};

	fn session() -> PersistedSession {
		let user = SessionUser::anonymous(UserId::new("guest-1").expect("User fixture should be valid."));
		let tokens =
			TokenRecord::issue("id-token", "refresh-token", OffsetDateTime::now_utc(), Duration::hours(1))
				.expect("Token fixture should build.");

		PersistedSession { user, tokens }
	}

	#[test]
	fn save_and_reload_round_trip() {
		let dir = tempfile::tempdir().expect("Temp dir should be created.");
		let path = dir.path().join("nested").join("session.json");
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let key = StoreKey::for_app("api-key", "[DEFAULT]");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.save_session(&key, session())).expect("Failed to save fixture session.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let fetched = rt
			.block_on(reopened.load_session(&key))
			.expect("Failed to load fixture session.")
			.expect("File store lost the session after reopen.");

		assert_eq!(fetched.user.uid.as_ref(), "guest-1");
		assert_eq!(fetched.tokens.refresh_token.expose(), "refresh-token");

		let cleared = rt.block_on(reopened.clear_session(&key)).expect("Clear should succeed.");

		assert!(cleared.is_some());
		assert!(
			FileStore::open(&path)
				.expect("Store should reopen.")
				.inner
				.read()
				.sessions
				.is_empty()
		);
	}
}
