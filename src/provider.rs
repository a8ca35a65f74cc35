//! Seams toward the identity provider SDK and the hosting environment.
//!
//! [`ProviderSdk`] initializes at most one app per instance and hands out an [`AuthClient`], the
//! provider-owned session handle every other module talks to. [`Navigator`] stands in for page
//! navigation so redirect sign-in and the login page stay testable. `descriptor` carries the
//! validated endpoint metadata of federated identity providers.

pub mod descriptor;

pub use descriptor::*;

// self
use crate::{
	_prelude::*,
	auth::{AuthError, ProviderId, SessionUser, TokenSecret},
	config::ProviderConfig,
	state::AuthStateSubscription,
};

/// Boxed future returned by provider calls.
pub type AuthFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, AuthError>> + 'a + Send>>;

/// Entry point of an identity provider SDK.
pub trait ProviderSdk
where
	Self: Send + Sync,
{
	/// Client of the already-initialized default app, if any.
	fn default_app(&self) -> Option<Arc<dyn AuthClient>>;

	/// Initializes the default app from `config`.
	///
	/// Callers check [`ProviderSdk::default_app`] first; implementations reject a second
	/// initialization.
	fn initialize_app<'a>(
		&'a self,
		config: &'a ProviderConfig,
	) -> AuthFuture<'a, Arc<dyn AuthClient>>;
}

/// Provider-owned session handle.
///
/// Implementations publish every settled auth state to the subscriptions they hand out and keep
/// [`AuthClient::current_user`] in sync with the last publication.
pub trait AuthClient
where
	Self: Send + Sync,
{
	/// Signed-in user, when the provider has already settled on one.
	fn current_user(&self) -> Option<SessionUser>;

	/// Registers an auth-state observer.
	fn subscribe(&self) -> AuthStateSubscription;

	/// Whether popup sign-in can run in this environment.
	fn supports_popup(&self) -> bool {
		false
	}

	/// Creates an anonymous session.
	fn sign_in_anonymously(&self) -> AuthFuture<'_, SessionUser>;

	/// Runs a federated sign-in inside a popup.
	fn sign_in_with_popup<'a>(&'a self, provider: &'a FederatedProvider)
	-> AuthFuture<'a, SessionUser>;

	/// Phase 1 of a redirect sign-in: records the pending attempt and returns where to send the
	/// user.
	fn sign_in_with_redirect<'a>(
		&'a self,
		provider: &'a FederatedProvider,
	) -> AuthFuture<'a, RedirectIntent>;

	/// Returns `true` when `url` carries the result of a redirect sign-in.
	fn is_redirect_callback(&self, url: &Url) -> bool {
		is_redirect_callback(url)
	}

	/// Phase 2 of a redirect sign-in: validates the callback and signs the user in.
	///
	/// Resolves `None` when `callback` is not a redirect result.
	fn complete_redirect<'a>(&'a self, callback: &'a Url) -> AuthFuture<'a, Option<SessionUser>>;

	/// Ends the current session.
	fn sign_out(&self) -> AuthFuture<'_, ()>;

	/// Identity token of the current user, refreshed when stale or when `force_refresh` is set.
	fn id_token(&self, force_refresh: bool) -> AuthFuture<'_, Option<TokenSecret>>;
}

/// Default redirect-callback detection: a `state` parameter plus either `code` or `error`.
pub fn is_redirect_callback(url: &Url) -> bool {
	let mut has_state = false;
	let mut has_result = false;

	for (key, _) in url.query_pairs() {
		match key.as_ref() {
			"state" => has_state = true,
			"code" | "error" => has_result = true,
			_ => {},
		}
	}

	has_state && has_result
}

/// Output of phase 1 of a redirect sign-in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedirectIntent {
	/// Federated provider the user is sent to.
	pub provider: ProviderId,
	/// Fully-formed authorize URL.
	pub authorize_url: Url,
	/// Opaque state that must come back on the callback.
	pub state: String,
}

/// Federated provider requested by a sign-in call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FederatedProvider {
	/// Provider identifier (`google.com`).
	pub id: ProviderId,
	/// Scopes requested on top of the provider defaults.
	pub scopes: Vec<String>,
	/// Extra authorize-URL parameters.
	pub custom_parameters: BTreeMap<String, String>,
}
impl FederatedProvider {
	/// Identifier of the Google provider.
	pub const GOOGLE: &'static str = "google.com";

	/// Creates a provider request for `id`.
	pub fn new(id: ProviderId) -> Self {
		Self { id, scopes: Vec::new(), custom_parameters: BTreeMap::new() }
	}

	/// Google sign-in.
	pub fn google() -> Self {
		Self::new(ProviderId::google())
	}

	/// Requests an extra scope.
	pub fn add_scope(mut self, scope: impl Into<String>) -> Self {
		self.scopes.push(scope.into());

		self
	}

	/// Adds an authorize-URL parameter.
	pub fn custom_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.custom_parameters.insert(key.into(), value.into());

		self
	}
}

/// Page navigation performed after sign-in decisions.
pub trait Navigator
where
	Self: Send + Sync,
{
	/// Sends the user to `target` (a URL or a site path).
	fn navigate(&self, target: &str);
}

/// [`Navigator`] that only logs the requested target.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNavigator;
impl Navigator for LogNavigator {
	fn navigate(&self, target: &str) {
		tracing::info!(target_url = target, "Navigation requested.");
	}
}
