//! Firebase Authentication over the Identity Toolkit and Secure Token REST APIs.
//!
//! [`FirebaseSdk`] implements [`ProviderSdk`] and hands out a [`FirebaseAuth`] per initialized
//! app. Sessions and pending redirect attempts live in a [`SessionStore`], so a new SDK instance
//! over the same store restores the signed-in user the way a page reload does. Popup sign-in is
//! never available natively; federated sign-in runs as a two-phase redirect using the
//! `googleOAuth` block of the provider configuration.

mod api;
mod federated;

// self
use crate::{
	_prelude::*,
	auth::{AuthError, AuthErrorCode, ProviderId, SessionUser, TokenRecord, TokenSecret, UserId},
	config::ProviderConfig,
	error::ConfigError,
	firebase::{
		api::{IdentityApi, SignInResponse},
		federated::FederatedFlow,
	},
	http::provider_http_client,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{
		AuthClient, AuthFuture, FederatedDescriptor, FederatedProvider, ProviderSdk, RedirectIntent,
		is_redirect_callback,
	},
	state::{AuthStateChannel, AuthStateSubscription},
	store::{PersistedSession, SessionStore, StoreError, StoreKey},
};

/// Base URLs of the Firebase REST APIs. Both must end with `/`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FirebaseEndpoints {
	/// Identity Toolkit (`accounts:*`) base.
	pub identity_toolkit: Url,
	/// Secure Token (`token`) base.
	pub secure_token: Url,
}
impl FirebaseEndpoints {
	/// Production Identity Toolkit base.
	pub const IDENTITY_TOOLKIT: &'static str = "https://identitytoolkit.googleapis.com/v1/";
	/// Production Secure Token base.
	pub const SECURE_TOKEN: &'static str = "https://securetoken.googleapis.com/v1/";

	/// Production endpoints.
	pub fn production() -> Result<Self, ConfigError> {
		Ok(Self { identity_toolkit: parse(Self::IDENTITY_TOOLKIT)?, secure_token: parse(Self::SECURE_TOKEN)? })
	}

	/// Endpoints of an Auth emulator (or mock server) listening at `base`.
	///
	/// The emulator serves both APIs under their production host names as path prefixes.
	pub fn emulator(base: &Url) -> Result<Self, ConfigError> {
		let join = |path: &str| {
			base.join(path).map_err(|source| ConfigError::InvalidTarget { target: path.to_owned(), source })
		};

		Ok(Self {
			identity_toolkit: join("/identitytoolkit.googleapis.com/v1/")?,
			secure_token: join("/securetoken.googleapis.com/v1/")?,
		})
	}
}

fn parse(raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw).map_err(|source| ConfigError::InvalidTarget { target: raw.to_owned(), source })
}

/// [`ProviderSdk`] backed by the Firebase REST APIs.
pub struct FirebaseSdk {
	http: ReqwestClient,
	endpoints: FirebaseEndpoints,
	store: Arc<dyn SessionStore>,
	app_name: String,
	descriptors: BTreeMap<ProviderId, FederatedDescriptor>,
	app: Mutex<Option<Arc<FirebaseAuth>>>,
	init_guard: AsyncMutex<()>,
}
impl FirebaseSdk {
	/// Name of the default app.
	pub const DEFAULT_APP: &'static str = "[DEFAULT]";

	/// Creates an SDK over `store` with production endpoints and the Google descriptor.
	pub fn new(store: Arc<dyn SessionStore>) -> Result<Self, ConfigError> {
		let google = FederatedDescriptor::google()?;

		Ok(Self {
			http: provider_http_client()?,
			endpoints: FirebaseEndpoints::production()?,
			store,
			app_name: Self::DEFAULT_APP.to_owned(),
			descriptors: BTreeMap::from([(google.id.clone(), google)]),
			app: Mutex::new(None),
			init_guard: AsyncMutex::new(()),
		})
	}

	/// Replaces the HTTP client.
	pub fn with_http_client(mut self, http: ReqwestClient) -> Self {
		self.http = http;

		self
	}

	/// Replaces the REST endpoints.
	pub fn with_endpoints(mut self, endpoints: FirebaseEndpoints) -> Self {
		self.endpoints = endpoints;

		self
	}

	/// Partitions persisted state under another app name.
	pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
		self.app_name = name.into();

		self
	}

	/// Registers or replaces the descriptor for `descriptor.id`.
	pub fn with_descriptor(mut self, descriptor: FederatedDescriptor) -> Self {
		self.descriptors.insert(descriptor.id.clone(), descriptor);

		self
	}

	/// Initialized app, with its concrete type.
	pub fn app(&self) -> Option<Arc<FirebaseAuth>> {
		self.app.lock().clone()
	}
}
impl ProviderSdk for FirebaseSdk {
	fn default_app(&self) -> Option<Arc<dyn AuthClient>> {
		self.app().map(|app| app as Arc<dyn AuthClient>)
	}

	fn initialize_app<'a>(
		&'a self,
		config: &'a ProviderConfig,
	) -> AuthFuture<'a, Arc<dyn AuthClient>> {
		Box::pin(async move {
			let _guard = self.init_guard.lock().await;

			if self.app.lock().is_some() {
				return Err(AuthError::new(
					AuthErrorCode::Other("app/duplicate-app".into()),
					format!("Firebase app `{}` already exists.", self.app_name),
				));
			}

			let api_key = config.api_key().ok_or_else(|| {
				AuthError::new(AuthErrorCode::InvalidApiKey, "Configuration has no `apiKey`.")
			})?;
			let auth = FirebaseAuth {
				api: IdentityApi::new(self.http.clone(), self.endpoints.clone(), api_key.to_owned()),
				store: self.store.clone(),
				key: StoreKey::for_app(api_key, &self.app_name),
				federated: config
					.federated_client()
					.map(|client| FederatedFlow::new(client, self.http.clone())),
				descriptors: self.descriptors.clone(),
				channel: AuthStateChannel::new(),
				session: RwLock::new(None),
				refresh_guard: AsyncMutex::new(()),
			};

			auth.restore().await;

			let auth = Arc::new(auth);

			*self.app.lock() = Some(auth.clone());

			tracing::debug!(app = %self.app_name, "Firebase app initialized.");

			Ok(auth as Arc<dyn AuthClient>)
		})
	}
}
impl Debug for FirebaseSdk {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FirebaseSdk")
			.field("endpoints", &self.endpoints)
			.field("app_name", &self.app_name)
			.field("initialized", &self.app.lock().is_some())
			.finish_non_exhaustive()
	}
}

/// Auth handle of one initialized Firebase app.
pub struct FirebaseAuth {
	api: IdentityApi,
	store: Arc<dyn SessionStore>,
	key: StoreKey,
	federated: Option<FederatedFlow>,
	descriptors: BTreeMap<ProviderId, FederatedDescriptor>,
	channel: AuthStateChannel,
	session: RwLock<Option<PersistedSession>>,
	refresh_guard: AsyncMutex<()>,
}
impl FirebaseAuth {
	/// Key this app's state is stored under.
	pub fn store_key(&self) -> &StoreKey {
		&self.key
	}

	/// Persisted session currently in use.
	pub fn session(&self) -> Option<PersistedSession> {
		self.session.read().clone()
	}

	async fn restore(&self) {
		let restored = match self.store.load_session(&self.key).await {
			Ok(session) => session,
			Err(e) => {
				tracing::warn!(error = %e, "Stored session could not be loaded; starting signed out.");

				None
			},
		};
		let user = restored.as_ref().map(|session| session.user.clone());

		if let Some(user) = &user {
			tracing::debug!(uid = %user.uid, "Session restored from store.");
		}

		*self.session.write() = restored;
		self.channel.publish(user);
	}

	async fn establish(
		&self,
		response: SignInResponse,
		user: SessionUser,
	) -> Result<SessionUser, AuthError> {
		let tokens = TokenRecord::issue(
			response.id_token,
			response.refresh_token,
			OffsetDateTime::now_utc(),
			Duration::seconds(response.expires_in),
		)
		.map_err(|e| AuthError::new(AuthErrorCode::InternalError, e.to_string()))?;
		let session = PersistedSession { user: user.clone(), tokens };
		// Waits out an in-flight refresh so it cannot overwrite the new session.
		let _guard = self.refresh_guard.lock().await;

		if let Err(e) = self.store.save_session(&self.key, session.clone()).await {
			tracing::warn!(error = %e, "Session could not be persisted; it will not survive a restart.");
		}

		*self.session.write() = Some(session);
		self.channel.publish(Some(user.clone()));

		Ok(user)
	}

	async fn drop_session(&self) {
		let _guard = self.refresh_guard.lock().await;

		self.drop_session_locked().await;
	}

	/// Caller holds `refresh_guard`.
	async fn drop_session_locked(&self) {
		if let Err(e) = self.store.clear_session(&self.key).await {
			tracing::warn!(error = %e, "Stored session could not be cleared.");
		}

		*self.session.write() = None;
		self.channel.publish(None);
	}

	async fn sign_up_anonymous(&self) -> Result<SessionUser, AuthError> {
		if let Some(user) = self.current_user().filter(|user| user.is_anonymous) {
			return Ok(user);
		}

		let response = self.api.sign_up_anonymous().await?;
		let user = SessionUser::anonymous(user_id(&response.local_id)?);

		self.establish(response, user).await
	}

	fn flow_for(
		&self,
		provider: &ProviderId,
	) -> Result<(&FederatedFlow, &FederatedDescriptor), AuthError> {
		let descriptor = self.descriptors.get(provider).ok_or_else(|| {
			AuthError::new(
				AuthErrorCode::ArgumentError,
				format!("No federated descriptor is registered for `{provider}`."),
			)
		})?;
		let flow = self.federated.as_ref().ok_or_else(|| {
			AuthError::new(
				AuthErrorCode::OperationNotAllowed,
				"Configuration has no `googleOAuth` client for redirect sign-in.",
			)
		})?;

		Ok((flow, descriptor))
	}

	async fn start_redirect(&self, provider: &FederatedProvider) -> Result<RedirectIntent, AuthError> {
		let (flow, descriptor) = self.flow_for(&provider.id)?;
		let (intent, pending) = flow.start(descriptor, provider, OffsetDateTime::now_utc());

		self.store.save_pending_redirect(&self.key, pending).await.map_err(store_error)?;

		Ok(intent)
	}

	async fn finish_redirect(&self, callback: &Url) -> Result<Option<SessionUser>, AuthError> {
		if !is_redirect_callback(callback) {
			return Ok(None);
		}

		let params: BTreeMap<String, String> = callback.query_pairs().into_owned().collect();
		let state = params.get("state").map(String::as_str).unwrap_or_default();
		let pending = self
			.store
			.take_pending_redirect(&self.key, state)
			.await
			.map_err(store_error)?
			.ok_or_else(|| AuthError::from_code(AuthErrorCode::NoAuthEvent))?;

		if let Some(error) = params.get("error") {
			let message = params.get("error_description").cloned().unwrap_or_else(|| error.clone());
			let code = match error.as_str() {
				"access_denied" => AuthErrorCode::Other("auth/user-cancelled".into()),
				_ => AuthErrorCode::InvalidCredential,
			};

			return Err(AuthError::new(code, message));
		}

		let code = params
			.get("code")
			.ok_or_else(|| AuthError::from_code(AuthErrorCode::InvalidAuthEvent))?;
		let (flow, descriptor) = self.flow_for(&pending.provider)?;
		let access_token = flow.exchange(descriptor, &pending, code).await?;
		let provider = FederatedProvider::new(pending.provider.clone());
		let post_body = federated::idp_post_body(&provider, &access_token);
		let response = self.api.sign_in_with_idp(&post_body, &pending.redirect_uri).await?;
		let provider_id = response
			.provider_id
			.as_deref()
			.and_then(|raw| ProviderId::new(raw).ok())
			.unwrap_or(pending.provider);
		let mut user = SessionUser::federated(user_id(&response.local_id)?, provider_id);

		if let Some(email) = &response.email {
			user = user.with_email(email.clone());
		}
		if let Some(name) = &response.display_name {
			user = user.with_display_name(name.clone());
		}

		self.establish(response, user).await.map(Some)
	}

	async fn fresh_id_token(&self, force_refresh: bool) -> Result<Option<TokenSecret>, AuthError> {
		let Some(seen) = self.session() else {
			return Ok(None);
		};

		if !force_refresh && !seen.tokens.needs_refresh_at(OffsetDateTime::now_utc()) {
			return Ok(Some(seen.tokens.id_token));
		}

		let _guard = self.refresh_guard.lock().await;
		let Some(current) = self.session() else {
			return Ok(None);
		};

		// Someone else refreshed (or signed in again) while this caller waited.
		if current.tokens.issued_at != seen.tokens.issued_at || current.user.uid != seen.user.uid {
			return Ok(Some(current.tokens.id_token));
		}

		obs::record_flow_outcome(FlowKind::TokenRefresh, FlowOutcome::Attempt);

		let result = self.refresh_locked(current).await;

		obs::record_result(FlowKind::TokenRefresh, &result);

		result.map(Some)
	}

	async fn refresh_locked(&self, current: PersistedSession) -> Result<TokenSecret, AuthError> {
		let response = match self.api.refresh(current.tokens.refresh_token.expose()).await {
			Ok(response) => response,
			Err(e) if e.code.invalidates_session() => {
				tracing::warn!(error = %e, "Refresh token rejected; signing out.");
				self.drop_session_locked().await;

				return Err(e);
			},
			Err(e) => return Err(e),
		};

		if response.user_id.as_deref().is_some_and(|uid| uid != current.user.uid.as_ref()) {
			tracing::warn!(uid = %current.user.uid, "Refresh response names a different user.");
		}

		let tokens = TokenRecord::issue(
			response.id_token,
			response.refresh_token,
			OffsetDateTime::now_utc(),
			Duration::seconds(response.expires_in),
		)
		.map_err(|e| AuthError::new(AuthErrorCode::InternalError, e.to_string()))?;
		let id_token = tokens.id_token.clone();
		let session = PersistedSession { user: current.user, tokens };

		if let Err(e) = self.store.save_session(&self.key, session.clone()).await {
			tracing::warn!(error = %e, "Refreshed tokens could not be persisted.");
		}

		*self.session.write() = Some(session);

		Ok(id_token)
	}
}
impl AuthClient for FirebaseAuth {
	fn current_user(&self) -> Option<SessionUser> {
		self.channel.current_user()
	}

	fn subscribe(&self) -> AuthStateSubscription {
		self.channel.subscribe()
	}

	fn sign_in_anonymously(&self) -> AuthFuture<'_, SessionUser> {
		Box::pin(async move {
			let span = FlowSpan::new(FlowKind::Anonymous, "sign_in_anonymously");

			obs::record_flow_outcome(FlowKind::Anonymous, FlowOutcome::Attempt);

			let result = span.instrument(self.sign_up_anonymous()).await;

			obs::record_result(FlowKind::Anonymous, &result);

			result
		})
	}

	fn sign_in_with_popup<'a>(
		&'a self,
		_provider: &'a FederatedProvider,
	) -> AuthFuture<'a, SessionUser> {
		Box::pin(async { Err(AuthError::from_code(AuthErrorCode::OperationNotSupported)) })
	}

	fn sign_in_with_redirect<'a>(
		&'a self,
		provider: &'a FederatedProvider,
	) -> AuthFuture<'a, RedirectIntent> {
		Box::pin(async move {
			let span = FlowSpan::new(FlowKind::Federated, "sign_in_with_redirect");

			obs::record_flow_outcome(FlowKind::Federated, FlowOutcome::Attempt);

			let result = span.instrument(self.start_redirect(provider)).await;

			obs::record_result(FlowKind::Federated, &result);

			result
		})
	}

	fn complete_redirect<'a>(&'a self, callback: &'a Url) -> AuthFuture<'a, Option<SessionUser>> {
		Box::pin(async move {
			let span = FlowSpan::new(FlowKind::RedirectResume, "complete_redirect");

			obs::record_flow_outcome(FlowKind::RedirectResume, FlowOutcome::Attempt);

			let result = span.instrument(self.finish_redirect(callback)).await;

			obs::record_result(FlowKind::RedirectResume, &result);

			result
		})
	}

	fn sign_out(&self) -> AuthFuture<'_, ()> {
		Box::pin(async move {
			let span = FlowSpan::new(FlowKind::SignOut, "sign_out");

			span.instrument(async {
				obs::record_flow_outcome(FlowKind::SignOut, FlowOutcome::Attempt);
				self.drop_session().await;
				obs::record_flow_outcome(FlowKind::SignOut, FlowOutcome::Success);

				Ok(())
			})
			.await
		})
	}

	fn id_token(&self, force_refresh: bool) -> AuthFuture<'_, Option<TokenSecret>> {
		Box::pin(async move {
			let span = FlowSpan::new(FlowKind::TokenRefresh, "id_token");

			span.instrument(self.fresh_id_token(force_refresh)).await
		})
	}
}
impl Debug for FirebaseAuth {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FirebaseAuth")
			.field("key", &self.key)
			.field("user", &self.channel.current_user())
			.field("federated", &self.federated.is_some())
			.finish_non_exhaustive()
	}
}

fn user_id(raw: &str) -> Result<UserId, AuthError> {
	UserId::new(raw).map_err(|e| {
		AuthError::new(AuthErrorCode::InternalError, format!("Provider returned an invalid user id: {e}"))
	})
}

fn store_error(e: StoreError) -> AuthError {
	AuthError::new(AuthErrorCode::InternalError, e.to_string())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::MemoryStore;

	#[test]
	fn emulator_endpoints_nest_host_names() {
		let base = Url::parse("http://127.0.0.1:9099").expect("Emulator URL should parse.");
		let endpoints = FirebaseEndpoints::emulator(&base).expect("Emulator endpoints should build.");

		assert_eq!(
			endpoints.identity_toolkit.as_str(),
			"http://127.0.0.1:9099/identitytoolkit.googleapis.com/v1/"
		);
		assert_eq!(endpoints.secure_token.as_str(), "http://127.0.0.1:9099/securetoken.googleapis.com/v1/");
	}

	#[tokio::test]
	async fn initialize_requires_api_key_and_rejects_duplicates() {
		let sdk = FirebaseSdk::new(Arc::new(MemoryStore::default())).expect("SDK should build.");
		let empty = ProviderConfig::from_json("{}").expect("Config fixture should parse.");
		let err = sdk.initialize_app(&empty).await.err().expect("Missing apiKey should fail.");

		assert_eq!(err.code, AuthErrorCode::InvalidApiKey);
		assert!(sdk.default_app().is_none());

		let config = ProviderConfig::from_json(r#"{"apiKey":"k"}"#).expect("Config fixture should parse.");
		let client = sdk.initialize_app(&config).await.expect("First initialization should succeed.");

		assert!(client.current_user().is_none());
		assert!(sdk.default_app().is_some());

		let err = sdk.initialize_app(&config).await.err().expect("Second initialization should fail.");

		assert_eq!(err.code.as_str(), "app/duplicate-app");
	}

	#[tokio::test]
	async fn popup_is_unsupported() {
		let sdk = FirebaseSdk::new(Arc::new(MemoryStore::default())).expect("SDK should build.");
		let config = ProviderConfig::from_json(r#"{"apiKey":"k"}"#).expect("Config fixture should parse.");
		let client = sdk.initialize_app(&config).await.expect("Initialization should succeed.");
		let err = client
			.sign_in_with_popup(&FederatedProvider::google())
			.await
			.expect_err("Popups should be unavailable.");

		assert!(err.code.is_popup_unavailable());

		let err = client
			.sign_in_with_redirect(&FederatedProvider::google())
			.await
			.expect_err("Redirect needs a client block.");

		assert_eq!(err.code, AuthErrorCode::OperationNotAllowed);
	}
}
