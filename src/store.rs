//! Persistence contracts and built-in backends for provider sessions and pending redirects.
//!
//! The Firebase adapter keeps the signed-in user, its token pair, and in-flight redirect
//! attempts behind [`SessionStore`], so a fresh SDK instance over the same store restores the
//! session the way a page reload does.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{ProviderId, SessionUser, TokenRecord, TokenSecret},
};

/// Boxed future returned by [`SessionStore`] calls.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract for provider sessions.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Fetches the persisted session for `key`, if present.
	fn load_session<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<PersistedSession>>;

	/// Persists or replaces the session for `key`.
	fn save_session<'a>(&'a self, key: &'a StoreKey, session: PersistedSession)
	-> StoreFuture<'a, ()>;

	/// Removes the session for `key`, returning what was stored.
	fn clear_session<'a>(&'a self, key: &'a StoreKey)
	-> StoreFuture<'a, Option<PersistedSession>>;

	/// Records a redirect attempt awaiting its callback.
	fn save_pending_redirect<'a>(
		&'a self,
		key: &'a StoreKey,
		pending: PendingRedirect,
	) -> StoreFuture<'a, ()>;

	/// Removes and returns the pending redirect whose state equals `state`.
	///
	/// Expired entries are discarded on the way.
	fn take_pending_redirect<'a>(
		&'a self,
		key: &'a StoreKey,
		state: &'a str,
	) -> StoreFuture<'a, Option<PendingRedirect>>;
}

/// Error type produced by [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Partition key of one provider app (API key + app name).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreKey(String);
impl StoreKey {
	/// Builds the key for `app` configured with `api_key`.
	pub fn for_app(api_key: &str, app: &str) -> Self {
		Self(format!("{app}:{api_key}"))
	}
}
impl AsRef<str> for StoreKey {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

/// Signed-in user plus the token pair backing it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
	/// User snapshot published on restore.
	pub user: SessionUser,
	/// Identity and refresh tokens.
	pub tokens: TokenRecord,
}

/// Redirect sign-in waiting for its callback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRedirect {
	/// Opaque state sent to the provider.
	pub state: String,
	/// Federated provider the user was sent to.
	pub provider: ProviderId,
	/// Redirect URI used in the authorize request.
	pub redirect_uri: Url,
	/// PKCE verifier for the code exchange.
	pub code_verifier: TokenSecret,
	/// When the attempt started.
	pub created_at: OffsetDateTime,
}
impl PendingRedirect {
	/// Attempts older than this are discarded.
	pub const MAX_AGE: Duration = Duration::minutes(10);

	/// Returns `true` once the attempt is too old to complete at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant - self.created_at > Self::MAX_AGE
	}
}

/// Full store contents, shared by the built-in backends.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
	/// Sessions by app.
	#[serde(default)]
	pub sessions: BTreeMap<StoreKey, PersistedSession>,
	/// Pending redirects by app.
	#[serde(default)]
	pub pending: BTreeMap<StoreKey, Vec<PendingRedirect>>,
}
impl StoreSnapshot {
	pub(crate) fn take_pending(
		&mut self,
		key: &StoreKey,
		state: &str,
		now: OffsetDateTime,
	) -> Option<PendingRedirect> {
		let entries = self.pending.get_mut(key)?;

		entries.retain(|entry| !entry.is_expired_at(now));

		let found =
			entries.iter().position(|entry| entry.state == state).map(|idx| entries.remove(idx));

		if entries.is_empty() {
			self.pending.remove(key);
		}

		found
	}
}
