//! Session bootstrap: SDK check, configuration, app initialization, mode, initial sign-in.
//!
//! [`Bootstrapper::run`] walks the stages once and publishes the outcome on a
//! [`BootstrapHandle`]: either the shared [`SessionContext`] or a localized failure string.
//! Nothing in the sequence panics; every failure is logged and recorded on the handle.

// crates.io
use tokio::sync::watch;
// self
use crate::{
	_prelude::*,
	auth::SessionUser,
	config::{ConfigLoader, ProviderConfig},
	error::BootstrapError,
	mode::AuthMode,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{AuthClient, FederatedProvider, LogNavigator, Navigator, ProviderSdk},
	session::SessionContext,
};

/// Bootstrap progress, logged at every transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BootstrapStage {
	/// Nothing has run yet.
	#[default]
	Uninitialized,
	/// An SDK is registered.
	SdkChecked,
	/// A configuration source succeeded.
	ConfigLoaded,
	/// The default app exists.
	ClientInitialized,
	/// The sign-in mode is fixed.
	ModeResolved,
	/// Redirect completion and automatic sign-in have run.
	SignInResolved,
	/// The context is published.
	Ready,
	/// Bootstrap aborted.
	Failed,
}
impl BootstrapStage {
	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Uninitialized => "uninitialized",
			Self::SdkChecked => "sdk_checked",
			Self::ConfigLoaded => "config_loaded",
			Self::ClientInitialized => "client_initialized",
			Self::ModeResolved => "mode_resolved",
			Self::SignInResolved => "sign_in_resolved",
			Self::Ready => "ready",
			Self::Failed => "failed",
		}
	}
}

/// Outcome published on the [`BootstrapHandle`].
#[derive(Clone, Debug, Default)]
pub enum BootstrapStatus {
	/// Bootstrap has not finished.
	#[default]
	Pending,
	/// The session helper is available.
	Ready(Arc<SessionContext>),
	/// Bootstrap aborted with a localized, human-readable message.
	Failed(String),
}
impl BootstrapStatus {
	/// Returns `true` unless still pending.
	pub fn is_settled(&self) -> bool {
		!matches!(self, Self::Pending)
	}
}

/// Observer of the bootstrap outcome.
#[derive(Clone, Debug)]
pub struct BootstrapHandle {
	rx: watch::Receiver<BootstrapStatus>,
}
impl BootstrapHandle {
	/// Latest status.
	pub fn status(&self) -> BootstrapStatus {
		self.rx.borrow().clone()
	}

	/// Session helper, once ready.
	pub fn context(&self) -> Option<Arc<SessionContext>> {
		match &*self.rx.borrow() {
			BootstrapStatus::Ready(context) => Some(context.clone()),
			_ => None,
		}
	}

	/// Recorded failure message, once failed.
	pub fn init_error(&self) -> Option<String> {
		match &*self.rx.borrow() {
			BootstrapStatus::Failed(message) => Some(message.clone()),
			_ => None,
		}
	}

	/// Waits until bootstrap leaves [`BootstrapStatus::Pending`].
	///
	/// Returns `Pending` only when the bootstrapper was dropped without finishing.
	pub async fn settled(&self) -> BootstrapStatus {
		let mut rx = self.rx.clone();

		match rx.wait_for(BootstrapStatus::is_settled).await {
			Ok(status) => status.clone(),
			Err(_) => BootstrapStatus::Pending,
		}
	}

	/// Waits for the session helper; `None` when bootstrap failed.
	pub async fn ready(&self) -> Option<Arc<SessionContext>> {
		match self.settled().await {
			BootstrapStatus::Ready(context) => Some(context),
			_ => None,
		}
	}
}

/// Localized texts published as [`BootstrapStatus::Failed`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootstrapMessages {
	/// No SDK registered.
	pub sdk_missing: String,
	/// Every configuration source failed.
	pub config_not_found: String,
	/// Prefix for provider initialization failures; the provider message follows.
	pub initialize_failed: String,
}
impl BootstrapMessages {
	/// English texts.
	pub fn english() -> Self {
		Self {
			sdk_missing: "The Firebase SDK is not loaded.".into(),
			config_not_found: "The Firebase configuration was not found.".into(),
			initialize_failed: "Firebase initialization failed".into(),
		}
	}

	/// Renders `err` for the failure status.
	pub fn localize(&self, err: &BootstrapError) -> String {
		match err {
			BootstrapError::SdkMissing => self.sdk_missing.clone(),
			BootstrapError::ConfigNotFound => self.config_not_found.clone(),
			BootstrapError::Initialize { message } => format!("{}: {message}", self.initialize_failed),
		}
	}
}
impl Default for BootstrapMessages {
	fn default() -> Self {
		Self {
			sdk_missing: "Firebase SDK が読み込まれていません。".into(),
			config_not_found: "Firebase の設定が見つかりません。".into(),
			initialize_failed: "Firebase の初期化に失敗しました".into(),
		}
	}
}

/// Inputs of a bootstrap run.
pub struct BootstrapOptions {
	/// Identity provider SDK; `None` reproduces a page without the SDK script.
	pub sdk: Option<Arc<dyn ProviderSdk>>,
	/// Configuration discovery.
	pub loader: ConfigLoader,
	/// Process-wide mode override, consulted before the inline mode attribute.
	pub mode_override: Option<String>,
	/// URL of the current page, inspected for a redirect callback.
	pub page_url: Option<Url>,
	/// Receives authorize URLs during redirect sign-in.
	pub navigator: Arc<dyn Navigator>,
	/// Provider used for federated sign-in.
	pub federated: FederatedProvider,
	/// Failure texts.
	pub messages: BootstrapMessages,
}
impl BootstrapOptions {
	/// Options with the given SDK and loader; the mode override is read from the environment.
	pub fn new(sdk: Arc<dyn ProviderSdk>, loader: ConfigLoader) -> Self {
		Self {
			sdk: Some(sdk),
			loader,
			mode_override: std::env::var(AuthMode::ENV_VAR).ok(),
			page_url: None,
			navigator: Arc::new(LogNavigator),
			federated: FederatedProvider::google(),
			messages: BootstrapMessages::default(),
		}
	}

	/// Options without an SDK.
	pub fn without_sdk(loader: ConfigLoader) -> Self {
		Self {
			sdk: None,
			loader,
			mode_override: None,
			page_url: None,
			navigator: Arc::new(LogNavigator),
			federated: FederatedProvider::google(),
			messages: BootstrapMessages::default(),
		}
	}

	/// Sets the mode override.
	pub fn with_mode_override(mut self, mode: impl Into<String>) -> Self {
		self.mode_override = Some(mode.into());

		self
	}

	/// Clears the mode override so only the inline attribute counts.
	pub fn without_mode_override(mut self) -> Self {
		self.mode_override = None;

		self
	}

	/// Sets the current page URL.
	pub fn with_page_url(mut self, url: Url) -> Self {
		self.page_url = Some(url);

		self
	}

	/// Sets the navigator.
	pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
		self.navigator = navigator;

		self
	}

	/// Sets the federated provider.
	pub fn with_federated_provider(mut self, provider: FederatedProvider) -> Self {
		self.federated = provider;

		self
	}

	/// Sets the failure texts.
	pub fn with_messages(mut self, messages: BootstrapMessages) -> Self {
		self.messages = messages;

		self
	}
}
impl Debug for BootstrapOptions {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BootstrapOptions")
			.field("sdk", &self.sdk.is_some())
			.field("loader", &self.loader)
			.field("mode_override", &self.mode_override)
			.field("page_url", &self.page_url)
			.field("federated", &self.federated)
			.finish_non_exhaustive()
	}
}

/// Runs the bootstrap sequence once and publishes its outcome.
#[derive(Debug)]
pub struct Bootstrapper {
	options: BootstrapOptions,
	status: watch::Sender<BootstrapStatus>,
	stage: Mutex<BootstrapStage>,
}
impl Bootstrapper {
	/// Creates a bootstrapper in [`BootstrapStage::Uninitialized`].
	pub fn new(options: BootstrapOptions) -> Self {
		Self {
			options,
			status: watch::Sender::new(BootstrapStatus::Pending),
			stage: Mutex::new(BootstrapStage::Uninitialized),
		}
	}

	/// Handle observing this bootstrapper; handles outlive it.
	pub fn handle(&self) -> BootstrapHandle {
		BootstrapHandle { rx: self.status.subscribe() }
	}

	/// Last stage reached.
	pub fn stage(&self) -> BootstrapStage {
		*self.stage.lock()
	}

	/// Runs the sequence. A second call returns the recorded outcome without running again.
	pub async fn run(&self) -> BootstrapStatus {
		let current = self.status.borrow().clone();

		if current.is_settled() {
			return current;
		}

		let span = FlowSpan::new(FlowKind::Bootstrap, "run");

		obs::record_flow_outcome(FlowKind::Bootstrap, FlowOutcome::Attempt);

		let status = match span.instrument(self.run_stages()).await {
			Ok(context) => {
				obs::record_flow_outcome(FlowKind::Bootstrap, FlowOutcome::Success);

				BootstrapStatus::Ready(context)
			},
			Err(e) => {
				obs::record_flow_outcome(FlowKind::Bootstrap, FlowOutcome::Failure);
				self.advance(BootstrapStage::Failed);
				tracing::error!(error = %e, "Session bootstrap failed.");

				BootstrapStatus::Failed(self.options.messages.localize(&e))
			},
		};

		self.status.send_replace(status.clone());

		status
	}

	async fn run_stages(&self) -> Result<Arc<SessionContext>, BootstrapError> {
		let sdk = self.options.sdk.as_ref().ok_or(BootstrapError::SdkMissing)?;

		self.advance(BootstrapStage::SdkChecked);

		let config = FlowSpan::new(FlowKind::ConfigLoad, "load")
			.instrument(self.options.loader.load())
			.await
			.ok_or(BootstrapError::ConfigNotFound)?;

		self.advance(BootstrapStage::ConfigLoaded);

		let client = self.client(sdk.as_ref(), &config).await?;

		self.advance(BootstrapStage::ClientInitialized);

		let attribute = self.options.loader.inline().and_then(|inline| inline.auth_mode.as_deref());
		let mode = AuthMode::resolve(self.options.mode_override.as_deref(), attribute);

		tracing::info!(%mode, "Auth mode resolved.");
		self.advance(BootstrapStage::ModeResolved);

		let context = Arc::new(
			SessionContext::new(mode, client, config, self.options.navigator.clone())
				.with_federated_provider(self.options.federated.clone()),
		);
		let resolved = self.resolve_sign_in(&context).await;

		self.advance(BootstrapStage::SignInResolved);
		context.readiness().resolve(resolved);
		self.advance(BootstrapStage::Ready);

		Ok(context)
	}

	async fn client(
		&self,
		sdk: &dyn ProviderSdk,
		config: &ProviderConfig,
	) -> Result<Arc<dyn AuthClient>, BootstrapError> {
		if let Some(existing) = sdk.default_app() {
			tracing::debug!("Reusing the existing default app.");

			return Ok(existing);
		}

		sdk.initialize_app(config)
			.await
			.map_err(|e| BootstrapError::Initialize { message: e.message })
	}

	async fn resolve_sign_in(&self, context: &SessionContext) -> Option<SessionUser> {
		if let Some(url) = self.options.page_url.as_ref() {
			match context.complete_redirect(url).await {
				Ok(Some(user)) => tracing::info!(uid = %user.uid, "Redirect sign-in completed."),
				Ok(None) => {},
				Err(e) => tracing::error!(error = %e, "Redirect sign-in could not be completed."),
			}
		}

		let signed_in = if context.mode() == AuthMode::Manual {
			None
		} else {
			context.ensure_signed_in().await
		};

		match signed_in {
			Some(user) => Some(user),
			None => context.once_auth_state().await,
		}
	}

	fn advance(&self, stage: BootstrapStage) {
		*self.stage.lock() = stage;

		tracing::debug!(stage = stage.as_str(), "Bootstrap stage reached.");
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn messages_localize_every_failure() {
		let messages = BootstrapMessages::default();

		assert_eq!(messages.localize(&BootstrapError::ConfigNotFound), "Firebase の設定が見つかりません。");
		assert_eq!(
			BootstrapMessages::english()
				.localize(&BootstrapError::Initialize { message: "API key not valid".into() }),
			"Firebase initialization failed: API key not valid"
		);
	}

	#[tokio::test]
	async fn missing_sdk_fails_with_localized_message() {
		let bootstrapper = Bootstrapper::new(BootstrapOptions::without_sdk(ConfigLoader::new(
			ReqwestClient::new(),
		)));
		let handle = bootstrapper.handle();
		let status = bootstrapper.run().await;

		assert!(matches!(status, BootstrapStatus::Failed(ref message) if message == "Firebase SDK が読み込まれていません。"));
		assert_eq!(bootstrapper.stage(), BootstrapStage::Failed);
		assert!(handle.context().is_none());
		assert!(handle.ready().await.is_none());
		assert!(handle.init_error().is_some());
	}
}
