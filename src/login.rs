//! UI-agnostic login page controller.
//!
//! The controller waits for bootstrap, offers a federated and a guest button through a
//! [`LoginView`], clears anonymous sessions it did not create itself, and navigates to the
//! `redirect` target shortly after a genuine sign-in.

mod messages;

pub use messages::*;

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	auth::SessionUser,
	bootstrap::{BootstrapHandle, BootstrapStatus},
	provider::Navigator,
	session::{GoogleSignInOptions, SessionContext},
};

/// Target used when the page URL carries no `redirect` parameter.
pub const DEFAULT_REDIRECT: &str = "/web/search.html";

/// Rendering surface of the login page.
pub trait LoginView
where
	Self: Send + Sync,
{
	/// Enables or disables both sign-in buttons.
	fn set_buttons_disabled(&self, disabled: bool);

	/// Replaces the status line.
	fn show_status(&self, message: &str, is_error: bool);
}

/// Why the login page could not obtain a session helper.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum LoginError {
	/// Bootstrap reported a failure.
	#[error("{message}")]
	Bootstrap {
		/// Recorded or generic failure text.
		message: String,
	},
	/// Bootstrap did not finish in time.
	#[error("{message}")]
	Timeout {
		/// Recorded failure text, or the generic timeout text.
		message: String,
	},
}
impl LoginError {
	/// Text shown on the status line.
	pub fn message(&self) -> &str {
		match self {
			Self::Bootstrap { message } | Self::Timeout { message } => message,
		}
	}
}

#[derive(Debug, Default)]
struct LoginFlags {
	has_navigated: bool,
	anonymous_flow_active: bool,
	clearing_anonymous_session: bool,
	guest_hint_pending: bool,
}

enum StateAction {
	Ignore,
	ClearAnonymous,
	Navigate { guest: bool },
	Prompt { guest_hint: bool },
}

struct LoginInner {
	view: Arc<dyn LoginView>,
	navigator: Arc<dyn Navigator>,
	messages: LoginMessages,
	redirect_to: String,
	boot_timeout: StdDuration,
	redirect_delay: StdDuration,
	context: RwLock<Option<Arc<SessionContext>>>,
	flags: Mutex<LoginFlags>,
}

/// Drives the login page; clones share state.
#[derive(Clone)]
pub struct LoginController(Arc<LoginInner>);
impl LoginController {
	/// How long [`LoginController::boot`] waits for bootstrap.
	pub const BOOT_TIMEOUT: StdDuration = StdDuration::from_secs(5);
	/// Delay between a successful sign-in and navigation.
	pub const REDIRECT_DELAY: StdDuration = StdDuration::from_millis(600);

	/// Creates a controller for the page at `page_url`.
	pub fn new(page_url: &Url, view: Arc<dyn LoginView>, navigator: Arc<dyn Navigator>) -> Self {
		Self(Arc::new(LoginInner {
			view,
			navigator,
			messages: LoginMessages::default(),
			redirect_to: redirect_target(page_url),
			boot_timeout: Self::BOOT_TIMEOUT,
			redirect_delay: Self::REDIRECT_DELAY,
			context: RwLock::new(None),
			flags: Mutex::new(LoginFlags::default()),
		}))
	}

	/// Replaces the status texts. Call before sharing the controller.
	pub fn with_messages(self, messages: LoginMessages) -> Self {
		self.rebuild(|inner| inner.messages = messages)
	}

	/// Overrides the bootstrap wait.
	pub fn with_boot_timeout(self, timeout: StdDuration) -> Self {
		self.rebuild(|inner| inner.boot_timeout = timeout)
	}

	/// Overrides the navigation delay.
	pub fn with_redirect_delay(self, delay: StdDuration) -> Self {
		self.rebuild(|inner| inner.redirect_delay = delay)
	}

	fn rebuild(self, f: impl FnOnce(&mut LoginInner)) -> Self {
		match Arc::try_unwrap(self.0) {
			Ok(mut inner) => {
				f(&mut inner);

				Self(Arc::new(inner))
			},
			Err(shared) => {
				tracing::warn!("Login controller is already shared; configuration change ignored.");

				Self(shared)
			},
		}
	}

	/// Where the page navigates after sign-in.
	pub fn redirect_target(&self) -> &str {
		&self.0.redirect_to
	}

	/// Session helper, once [`LoginController::boot`] succeeded.
	pub fn context(&self) -> Option<Arc<SessionContext>> {
		self.0.context.read().clone()
	}

	/// Returns `true` once navigation has been scheduled.
	pub fn has_navigated(&self) -> bool {
		self.0.flags.lock().has_navigated
	}

	/// Waits for bootstrap and prepares the page.
	///
	/// On failure the error is shown and the buttons stay disabled.
	pub async fn boot(&self, handle: &BootstrapHandle) -> Result<Arc<SessionContext>, LoginError> {
		let inner = &self.0;

		inner.view.show_status(&inner.messages.initializing, false);
		inner.view.set_buttons_disabled(true);

		match self.await_context(handle).await {
			Ok(context) => {
				*inner.context.write() = Some(context.clone());
				inner.view.show_status(&inner.messages.choose_method, false);
				inner.view.set_buttons_disabled(false);

				Ok(context)
			},
			Err(e) => {
				tracing::error!(error = %e, "Login page could not obtain the session helper.");
				inner.view.show_status(e.message(), true);
				inner.view.set_buttons_disabled(true);

				Err(e)
			},
		}
	}

	async fn await_context(&self, handle: &BootstrapHandle) -> Result<Arc<SessionContext>, LoginError> {
		let messages = &self.0.messages;

		match tokio::time::timeout(self.0.boot_timeout, handle.settled()).await {
			Ok(BootstrapStatus::Ready(context)) => Ok(context),
			Ok(BootstrapStatus::Failed(message)) => Err(LoginError::Bootstrap { message }),
			Ok(BootstrapStatus::Pending) =>
				Err(LoginError::Bootstrap { message: messages.init_failed.clone() }),
			Err(_) => match handle.context() {
				Some(context) => Ok(context),
				None => Err(LoginError::Timeout {
					message: handle.init_error().unwrap_or_else(|| messages.init_timeout.clone()),
				}),
			},
		}
	}

	/// Follows auth-state changes until navigation is scheduled or the provider goes away.
	pub async fn watch_auth_state(&self) {
		let Some(context) = self.context() else {
			return;
		};
		let mut subscription = context.subscribe();

		while let Some(user) = subscription.next().await {
			self.handle_auth_state(user).await;

			if self.has_navigated() {
				break;
			}
		}
	}

	/// Reacts to one settled auth state.
	pub async fn handle_auth_state(&self, user: Option<SessionUser>) {
		let Some(context) = self.context() else {
			return;
		};
		let inner = &self.0;
		let action = {
			let mut flags = inner.flags.lock();

			if flags.has_navigated {
				StateAction::Ignore
			} else {
				match &user {
					Some(user) if user.is_anonymous && !flags.anonymous_flow_active =>
						if flags.clearing_anonymous_session {
							StateAction::Ignore
						} else {
							flags.clearing_anonymous_session = true;
							flags.guest_hint_pending = true;

							StateAction::ClearAnonymous
						},
					Some(user) => {
						flags.has_navigated = true;

						StateAction::Navigate { guest: user.is_anonymous }
					},
					None => StateAction::Prompt {
						guest_hint: std::mem::take(&mut flags.guest_hint_pending),
					},
				}
			}
		};

		match action {
			StateAction::Ignore => {},
			StateAction::ClearAnonymous => {
				tracing::info!("Clearing an anonymous session the login page did not create.");

				if let Err(e) = context.sign_out().await {
					tracing::warn!(error = %e, "Stale anonymous session could not be signed out.");
				}

				inner.flags.lock().clearing_anonymous_session = false;
				inner.view.set_buttons_disabled(false);
				inner.view.show_status(&inner.messages.guest_hint, false);
			},
			StateAction::Navigate { guest } => {
				let message =
					if guest { &inner.messages.guest_signed_in } else { &inner.messages.signed_in };

				inner.view.set_buttons_disabled(true);
				inner.view.show_status(message, false);
				tokio::time::sleep(inner.redirect_delay).await;
				inner.navigator.navigate(&inner.redirect_to);
			},
			StateAction::Prompt { guest_hint } => {
				let message =
					if guest_hint { &inner.messages.guest_hint } else { &inner.messages.choose_method };

				inner.view.set_buttons_disabled(false);
				inner.view.show_status(message, false);
			},
		}
	}

	/// Federated button.
	pub async fn click_google(&self) {
		let Some(context) = self.context() else {
			return;
		};
		let inner = &self.0;

		inner.view.set_buttons_disabled(true);
		inner.view.show_status(&inner.messages.google_in_progress, false);

		match context.sign_in_with_google(GoogleSignInOptions::popup()).await {
			Ok(Some(_)) => {},
			Ok(None) => inner.view.show_status(&inner.messages.google_redirecting, false),
			Err(e) => {
				tracing::error!(error = %e, "Federated sign-in failed.");
				inner.view.show_status(&inner.messages.error_message(&e), true);
				inner.view.set_buttons_disabled(false);
			},
		}
	}

	/// Guest button.
	pub async fn click_guest(&self) {
		let Some(context) = self.context() else {
			return;
		};
		let inner = &self.0;

		inner.view.set_buttons_disabled(true);
		inner.view.show_status(&inner.messages.guest_in_progress, false);
		inner.flags.lock().anonymous_flow_active = true;

		match context.sign_in_anonymously().await {
			// The flag is still set, so this counts as the page's own guest session.
			Ok(user) => self.handle_auth_state(Some(user)).await,
			Err(e) => {
				tracing::error!(error = %e, "Anonymous sign-in failed.");
				inner.view.show_status(&inner.messages.error_message(&e), true);
			},
		}

		let navigated = {
			let mut flags = inner.flags.lock();

			if !flags.has_navigated {
				flags.anonymous_flow_active = false;
			}

			flags.has_navigated
		};

		if !navigated {
			inner.view.set_buttons_disabled(false);
		}
	}

	/// [`LoginController::boot`] followed by [`LoginController::watch_auth_state`].
	pub async fn run(&self, handle: &BootstrapHandle) -> Result<(), LoginError> {
		self.boot(handle).await?;
		self.watch_auth_state().await;

		Ok(())
	}
}
impl Debug for LoginController {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginController")
			.field("redirect_to", &self.0.redirect_to)
			.field("flags", &*self.0.flags.lock())
			.finish_non_exhaustive()
	}
}

/// `redirect` query parameter of `page_url`, else [`DEFAULT_REDIRECT`].
pub fn redirect_target(page_url: &Url) -> String {
	page_url
		.query_pairs()
		.find(|(key, _)| key == "redirect")
		.map(|(_, value)| value.into_owned())
		.filter(|value| !value.is_empty())
		.unwrap_or_else(|| DEFAULT_REDIRECT.to_owned())
}
