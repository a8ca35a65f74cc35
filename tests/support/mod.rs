//! Scripted provider, navigator, and login view shared by the integration tests.

#![allow(dead_code)]

// std
use std::sync::{
	Arc,
	atomic::{AtomicBool, AtomicUsize, Ordering},
};
// crates.io
use parking_lot::Mutex;
use url::Url;
// self
use idp_session::{
	auth::{AuthError, ProviderId, SessionUser, TokenSecret, UserId},
	config::ProviderConfig,
	login::LoginView,
	provider::{
		AuthClient, AuthFuture, FederatedProvider, Navigator, ProviderSdk, RedirectIntent,
	},
	state::{AuthStateChannel, AuthStateSubscription},
};

pub const AUTHORIZE_URL: &str = "https://accounts.example.com/o/oauth2/auth?state=fake-state";

pub fn guest(uid: &str) -> SessionUser {
	SessionUser::anonymous(UserId::new(uid).expect("Guest uid fixture should be valid."))
}

pub fn federated(uid: &str) -> SessionUser {
	SessionUser::federated(UserId::new(uid).expect("Federated uid fixture should be valid."), ProviderId::google())
		.with_email("reader@example.com")
}

pub fn config() -> ProviderConfig {
	ProviderConfig::from_json(r#"{"apiKey":"test-key","authDomain":"demo.firebaseapp.com","projectId":"demo"}"#)
		.expect("Config fixture should parse.")
}

/// Provider client whose answers are scripted per test.
pub struct FakeClient {
	channel: AuthStateChannel,
	popup_supported: AtomicBool,
	anonymous_error: Mutex<Option<AuthError>>,
	popup_error: Mutex<Option<AuthError>>,
	token: Mutex<Option<TokenSecret>>,
	token_error: Mutex<Option<AuthError>>,
	pub anonymous_calls: AtomicUsize,
	pub popup_calls: AtomicUsize,
	pub redirect_calls: AtomicUsize,
	pub complete_calls: AtomicUsize,
	pub sign_out_calls: AtomicUsize,
	pub token_calls: AtomicUsize,
}
impl FakeClient {
	/// Settled with no user.
	pub fn signed_out() -> Arc<Self> {
		Arc::new(Self::with_channel(AuthStateChannel::settled(None)))
	}

	/// Settled with `user`.
	pub fn with_user(user: SessionUser) -> Arc<Self> {
		Arc::new(Self::with_channel(AuthStateChannel::settled(Some(user))))
	}

	/// Not settled until [`FakeClient::publish`] runs.
	pub fn initializing() -> Arc<Self> {
		Arc::new(Self::with_channel(AuthStateChannel::new()))
	}

	fn with_channel(channel: AuthStateChannel) -> Self {
		Self {
			channel,
			popup_supported: AtomicBool::new(false),
			anonymous_error: Mutex::new(None),
			popup_error: Mutex::new(None),
			token: Mutex::new(Some(TokenSecret::new("fake-id-token"))),
			token_error: Mutex::new(None),
			anonymous_calls: AtomicUsize::new(0),
			popup_calls: AtomicUsize::new(0),
			redirect_calls: AtomicUsize::new(0),
			complete_calls: AtomicUsize::new(0),
			sign_out_calls: AtomicUsize::new(0),
			token_calls: AtomicUsize::new(0),
		}
	}

	pub fn publish(&self, user: Option<SessionUser>) {
		self.channel.publish(user);
	}

	pub fn fail_anonymous(&self, err: AuthError) {
		*self.anonymous_error.lock() = Some(err);
	}

	pub fn fail_popup(&self, err: AuthError) {
		*self.popup_error.lock() = Some(err);
	}

	pub fn support_popup(&self) {
		self.popup_supported.store(true, Ordering::SeqCst);
	}

	pub fn set_token(&self, token: Option<&str>) {
		*self.token.lock() = token.map(TokenSecret::new);
	}

	pub fn fail_token(&self, err: AuthError) {
		*self.token_error.lock() = Some(err);
	}

	pub fn count(counter: &AtomicUsize) -> usize {
		counter.load(Ordering::SeqCst)
	}
}
impl AuthClient for FakeClient {
	fn current_user(&self) -> Option<SessionUser> {
		self.channel.current_user()
	}

	fn subscribe(&self) -> AuthStateSubscription {
		self.channel.subscribe()
	}

	fn supports_popup(&self) -> bool {
		self.popup_supported.load(Ordering::SeqCst)
	}

	fn sign_in_anonymously(&self) -> AuthFuture<'_, SessionUser> {
		Box::pin(async move {
			let call = self.anonymous_calls.fetch_add(1, Ordering::SeqCst) + 1;

			// Give concurrent callers a chance to interleave.
			tokio::task::yield_now().await;

			if let Some(err) = self.anonymous_error.lock().clone() {
				return Err(err);
			}

			let user = guest(&format!("guest-{call}"));

			self.channel.publish(Some(user.clone()));

			Ok(user)
		})
	}

	fn sign_in_with_popup<'a>(
		&'a self,
		_provider: &'a FederatedProvider,
	) -> AuthFuture<'a, SessionUser> {
		Box::pin(async move {
			self.popup_calls.fetch_add(1, Ordering::SeqCst);

			if let Some(err) = self.popup_error.lock().clone() {
				return Err(err);
			}

			let user = federated("popup-user");

			self.channel.publish(Some(user.clone()));

			Ok(user)
		})
	}

	fn sign_in_with_redirect<'a>(
		&'a self,
		provider: &'a FederatedProvider,
	) -> AuthFuture<'a, RedirectIntent> {
		Box::pin(async move {
			self.redirect_calls.fetch_add(1, Ordering::SeqCst);

			Ok(RedirectIntent {
				provider: provider.id.clone(),
				authorize_url: Url::parse(AUTHORIZE_URL).expect("Authorize URL fixture should parse."),
				state: "fake-state".into(),
			})
		})
	}

	fn complete_redirect<'a>(&'a self, callback: &'a Url) -> AuthFuture<'a, Option<SessionUser>> {
		Box::pin(async move {
			self.complete_calls.fetch_add(1, Ordering::SeqCst);

			if !callback.query_pairs().any(|(key, _)| key == "code") {
				return Ok(None);
			}

			let user = federated("redirect-user");

			self.channel.publish(Some(user.clone()));

			Ok(Some(user))
		})
	}

	fn sign_out(&self) -> AuthFuture<'_, ()> {
		Box::pin(async move {
			self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
			self.channel.publish(None);

			Ok(())
		})
	}

	fn id_token(&self, _force_refresh: bool) -> AuthFuture<'_, Option<TokenSecret>> {
		Box::pin(async move {
			self.token_calls.fetch_add(1, Ordering::SeqCst);

			if self.channel.current_user().is_none() {
				return Ok(None);
			}
			if let Some(err) = self.token_error.lock().clone() {
				return Err(err);
			}

			Ok(self.token.lock().clone())
		})
	}
}

/// SDK handing out one [`FakeClient`].
pub struct FakeSdk {
	pub client: Arc<FakeClient>,
	existing: bool,
	init_error: Option<AuthError>,
	pub init_calls: AtomicUsize,
}
impl FakeSdk {
	pub fn new(client: Arc<FakeClient>) -> Arc<Self> {
		Arc::new(Self { client, existing: false, init_error: None, init_calls: AtomicUsize::new(0) })
	}

	/// Default app already initialized by someone else.
	pub fn already_initialized(client: Arc<FakeClient>) -> Arc<Self> {
		Arc::new(Self { client, existing: true, init_error: None, init_calls: AtomicUsize::new(0) })
	}

	pub fn failing(client: Arc<FakeClient>, err: AuthError) -> Arc<Self> {
		Arc::new(Self { client, existing: false, init_error: Some(err), init_calls: AtomicUsize::new(0) })
	}
}
impl ProviderSdk for FakeSdk {
	fn default_app(&self) -> Option<Arc<dyn AuthClient>> {
		self.existing.then(|| self.client.clone() as Arc<dyn AuthClient>)
	}

	fn initialize_app<'a>(
		&'a self,
		_config: &'a ProviderConfig,
	) -> AuthFuture<'a, Arc<dyn AuthClient>> {
		Box::pin(async move {
			self.init_calls.fetch_add(1, Ordering::SeqCst);

			match &self.init_error {
				Some(err) => Err(err.clone()),
				None => Ok(self.client.clone() as Arc<dyn AuthClient>),
			}
		})
	}
}

/// Navigator remembering every target.
#[derive(Default)]
pub struct RecordingNavigator {
	targets: Mutex<Vec<String>>,
}
impl RecordingNavigator {
	pub fn targets(&self) -> Vec<String> {
		self.targets.lock().clone()
	}
}
impl Navigator for RecordingNavigator {
	fn navigate(&self, target: &str) {
		self.targets.lock().push(target.to_owned());
	}
}

/// Login view remembering the status line history and the button state.
#[derive(Default)]
pub struct RecordingView {
	statuses: Mutex<Vec<(String, bool)>>,
	disabled: AtomicBool,
}
impl RecordingView {
	pub fn statuses(&self) -> Vec<(String, bool)> {
		self.statuses.lock().clone()
	}

	pub fn last_status(&self) -> Option<(String, bool)> {
		self.statuses.lock().last().cloned()
	}

	pub fn buttons_disabled(&self) -> bool {
		self.disabled.load(Ordering::SeqCst)
	}
}
impl LoginView for RecordingView {
	fn set_buttons_disabled(&self, disabled: bool) {
		self.disabled.store(disabled, Ordering::SeqCst);
	}

	fn show_status(&self, message: &str, is_error: bool) {
		self.statuses.lock().push((message.to_owned(), is_error));
	}
}
