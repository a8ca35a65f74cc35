//! The session helper handed to pages once bootstrap has finished.

// self
use crate::{
	_prelude::*,
	auth::{AuthError, SessionUser, TokenSecret},
	config::ProviderConfig,
	mode::AuthMode,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{AuthClient, FederatedProvider, Navigator},
	state::{AuthStateSubscription, Readiness},
};

/// Options for [`SessionContext::sign_in_with_google`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GoogleSignInOptions {
	/// Prefer a popup over a full-page redirect.
	pub use_popup: bool,
}
impl GoogleSignInOptions {
	/// Popup preferred.
	pub const fn popup() -> Self {
		Self { use_popup: true }
	}

	/// Redirect only.
	pub const fn redirect() -> Self {
		Self { use_popup: false }
	}
}

/// Immutable session helper created once by the bootstrapper and shared by `Arc`.
pub struct SessionContext {
	mode: AuthMode,
	client: Arc<dyn AuthClient>,
	config: ProviderConfig,
	navigator: Arc<dyn Navigator>,
	federated: FederatedProvider,
	readiness: Readiness,
	sign_in_guard: AsyncMutex<()>,
}
impl SessionContext {
	/// Creates a context over an initialized provider client.
	pub fn new(
		mode: AuthMode,
		client: Arc<dyn AuthClient>,
		config: ProviderConfig,
		navigator: Arc<dyn Navigator>,
	) -> Self {
		Self {
			mode,
			client,
			config,
			navigator,
			federated: FederatedProvider::google(),
			readiness: Readiness::new(),
			sign_in_guard: AsyncMutex::new(()),
		}
	}

	/// Overrides the federated provider used by Google sign-in and the `auto` fallback.
	pub fn with_federated_provider(mut self, provider: FederatedProvider) -> Self {
		self.federated = provider;

		self
	}

	/// Sign-in mode resolved at bootstrap.
	pub fn mode(&self) -> AuthMode {
		self.mode
	}

	/// Underlying provider client.
	pub fn client(&self) -> &Arc<dyn AuthClient> {
		&self.client
	}

	/// Configuration the provider app was initialized with.
	pub fn config(&self) -> &ProviderConfig {
		&self.config
	}

	/// Readiness signal resolved by the bootstrapper.
	pub fn readiness(&self) -> &Readiness {
		&self.readiness
	}

	/// Signed-in user, if the provider has settled on one.
	pub fn current_user(&self) -> Option<SessionUser> {
		self.client.current_user()
	}

	/// Registers an auth-state observer.
	pub fn subscribe(&self) -> AuthStateSubscription {
		self.client.subscribe()
	}

	/// Establishes a session according to the mode.
	///
	/// An existing user is returned unchanged. Concurrent callers are serialized, so a single
	/// sign-in attempt serves all of them. Failures are logged, never returned.
	pub async fn ensure_signed_in(&self) -> Option<SessionUser> {
		let _guard = self.sign_in_guard.lock().await;
		let span = FlowSpan::new(FlowKind::EnsureSignedIn, "ensure_signed_in");

		span.instrument(self.ensure_signed_in_locked()).await
	}

	async fn ensure_signed_in_locked(&self) -> Option<SessionUser> {
		if let Some(user) = self.first_settled_user().await {
			tracing::debug!(uid = %user.uid, "Existing session reused.");

			return Some(user);
		}

		obs::record_flow_outcome(FlowKind::EnsureSignedIn, FlowOutcome::Attempt);

		match self.mode {
			AuthMode::Manual => None,
			AuthMode::Google => {
				self.redirect_or_log().await;

				None
			},
			AuthMode::Anonymous | AuthMode::Auto => match self.client.sign_in_anonymously().await {
				Ok(user) => {
					obs::record_flow_outcome(FlowKind::EnsureSignedIn, FlowOutcome::Success);

					Some(self.client.current_user().unwrap_or(user))
				},
				Err(e) if self.mode == AuthMode::Auto && e.code.is_anonymous_disabled() => {
					tracing::info!(code = %e.code, "Anonymous sign-in disabled; falling back to federated redirect.");

					self.redirect_or_log().await;

					None
				},
				Err(e) => {
					obs::record_flow_outcome(FlowKind::EnsureSignedIn, FlowOutcome::Failure);
					tracing::warn!(error = %e, "Anonymous sign-in failed.");

					None
				},
			},
		}
	}

	async fn first_settled_user(&self) -> Option<SessionUser> {
		match self.client.current_user() {
			Some(user) => Some(user),
			None => self.client.subscribe().next().await.flatten(),
		}
	}

	async fn redirect_or_log(&self) {
		if let Err(e) = self.redirect(&self.federated).await {
			obs::record_flow_outcome(FlowKind::EnsureSignedIn, FlowOutcome::Failure);
			tracing::error!(error = %e, "Federated sign-in redirect failed.");
		}
	}

	async fn redirect(&self, provider: &FederatedProvider) -> Result<(), AuthError> {
		let intent = self.client.sign_in_with_redirect(provider).await?;

		tracing::info!(provider = %intent.provider, "Redirecting to federated sign-in.");
		self.navigator.navigate(intent.authorize_url.as_str());

		Ok(())
	}

	/// Federated sign-in with Google.
	///
	/// Resolves the user when a popup completed, or `None` once a redirect has been started.
	/// Popup failures caused by the environment fall back to a redirect; every other error is
	/// returned.
	pub async fn sign_in_with_google(
		&self,
		options: GoogleSignInOptions,
	) -> Result<Option<SessionUser>, AuthError> {
		let span = FlowSpan::new(FlowKind::Federated, "sign_in_with_google");

		span.instrument(async {
			if options.use_popup && self.client.supports_popup() {
				match self.client.sign_in_with_popup(&self.federated).await {
					Ok(user) => return Ok(Some(user)),
					Err(e) if e.code.is_popup_unavailable() => {
						tracing::info!(code = %e.code, "Popup unavailable; falling back to redirect.");
					},
					Err(e) => return Err(e),
				}
			}

			self.redirect(&self.federated).await?;

			Ok(None)
		})
		.await
	}

	/// Creates an anonymous session.
	pub async fn sign_in_anonymously(&self) -> Result<SessionUser, AuthError> {
		self.client.sign_in_anonymously().await
	}

	/// Completes a redirect sign-in when `callback` carries its result.
	pub async fn complete_redirect(&self, callback: &Url) -> Result<Option<SessionUser>, AuthError> {
		if !self.client.is_redirect_callback(callback) {
			return Ok(None);
		}

		self.client.complete_redirect(callback).await
	}

	/// Current user, else the first non-null auth state.
	///
	/// Stays pending while nobody is signed in.
	pub async fn wait_for_user(&self) -> SessionUser {
		if let Some(user) = self.client.current_user() {
			return user;
		}

		match self.client.subscribe().next_user().await {
			Some(user) => user,
			None => std::future::pending().await,
		}
	}

	/// Exactly the next settled auth state, possibly no user.
	pub async fn once_auth_state(&self) -> Option<SessionUser> {
		self.client.subscribe().next().await.flatten()
	}

	/// Ends the current session.
	pub async fn sign_out(&self) -> Result<(), AuthError> {
		self.client.sign_out().await
	}

	/// Identity token of the current user.
	pub async fn id_token(&self, force_refresh: bool) -> Result<Option<TokenSecret>, AuthError> {
		self.client.id_token(force_refresh).await
	}
}
impl Debug for SessionContext {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionContext")
			.field("mode", &self.mode)
			.field("federated", &self.federated.id)
			.field("ready", &self.readiness.is_resolved())
			.finish_non_exhaustive()
	}
}
