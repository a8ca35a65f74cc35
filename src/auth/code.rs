//! Provider error codes (`auth/...`) and the error value surfaced by sign-in calls.

// self
use crate::_prelude::*;

/// Error codes the sign-in state machine and the login page distinguish.
///
/// The string form matches the identity provider's `auth/<kebab-case>` convention so codes coming
/// from other SDKs or logs can be parsed back with [`AuthErrorCode::parse`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AuthErrorCode {
	/// The sign-in method is disabled for the project.
	OperationNotAllowed,
	/// The sign-in method is restricted to administrators.
	AdminRestrictedOperation,
	/// A popup was blocked by the environment.
	PopupBlocked,
	/// Popup (or other interactive) flows are unavailable in this environment.
	OperationNotSupported,
	/// The user closed the popup before finishing.
	PopupClosedByUser,
	/// Another popup request superseded this one.
	CancelledPopupRequest,
	/// The provider could not be reached.
	NetworkRequestFailed,
	/// The account has been disabled.
	UserDisabled,
	/// The account no longer exists.
	UserNotFound,
	/// The refresh credential expired; the user must sign in again.
	UserTokenExpired,
	/// The refresh credential is malformed or revoked.
	InvalidUserToken,
	/// The API key was rejected.
	InvalidApiKey,
	/// The federated credential could not be verified.
	InvalidCredential,
	/// A redirect result did not match any pending redirect.
	NoAuthEvent,
	/// A redirect result carried an unexpected state.
	InvalidAuthEvent,
	/// A call was made that needs a signed-in user.
	NullUser,
	/// An argument (provider, descriptor, callback) was unusable.
	ArgumentError,
	/// The provider is throttling this client.
	TooManyRequests,
	/// The provider failed in an unexpected way.
	InternalError,
	/// Any other provider code, kept verbatim.
	Other(String),
}
impl AuthErrorCode {
	/// Returns the `auth/...` string for the code.
	pub fn as_str(&self) -> &str {
		match self {
			Self::OperationNotAllowed => "auth/operation-not-allowed",
			Self::AdminRestrictedOperation => "auth/admin-restricted-operation",
			Self::PopupBlocked => "auth/popup-blocked",
			Self::OperationNotSupported => "auth/operation-not-supported-in-this-environment",
			Self::PopupClosedByUser => "auth/popup-closed-by-user",
			Self::CancelledPopupRequest => "auth/cancelled-popup-request",
			Self::NetworkRequestFailed => "auth/network-request-failed",
			Self::UserDisabled => "auth/user-disabled",
			Self::UserNotFound => "auth/user-not-found",
			Self::UserTokenExpired => "auth/user-token-expired",
			Self::InvalidUserToken => "auth/invalid-user-token",
			Self::InvalidApiKey => "auth/invalid-api-key",
			Self::InvalidCredential => "auth/invalid-credential",
			Self::NoAuthEvent => "auth/no-auth-event",
			Self::InvalidAuthEvent => "auth/invalid-auth-event",
			Self::NullUser => "auth/null-user",
			Self::ArgumentError => "auth/argument-error",
			Self::TooManyRequests => "auth/too-many-requests",
			Self::InternalError => "auth/internal-error",
			Self::Other(code) => code,
		}
	}

	/// Parses an `auth/...` string; unknown codes are kept as [`AuthErrorCode::Other`].
	pub fn parse(code: &str) -> Self {
		match code {
			"auth/operation-not-allowed" => Self::OperationNotAllowed,
			"auth/admin-restricted-operation" => Self::AdminRestrictedOperation,
			"auth/popup-blocked" => Self::PopupBlocked,
			"auth/operation-not-supported-in-this-environment" => Self::OperationNotSupported,
			"auth/popup-closed-by-user" => Self::PopupClosedByUser,
			"auth/cancelled-popup-request" => Self::CancelledPopupRequest,
			"auth/network-request-failed" => Self::NetworkRequestFailed,
			"auth/user-disabled" => Self::UserDisabled,
			"auth/user-not-found" => Self::UserNotFound,
			"auth/user-token-expired" => Self::UserTokenExpired,
			"auth/invalid-user-token" => Self::InvalidUserToken,
			"auth/invalid-api-key" => Self::InvalidApiKey,
			"auth/invalid-credential" => Self::InvalidCredential,
			"auth/no-auth-event" => Self::NoAuthEvent,
			"auth/invalid-auth-event" => Self::InvalidAuthEvent,
			"auth/null-user" => Self::NullUser,
			"auth/argument-error" => Self::ArgumentError,
			"auth/too-many-requests" => Self::TooManyRequests,
			"auth/internal-error" => Self::InternalError,
			other => Self::Other(other.to_owned()),
		}
	}

	/// Anonymous sign-in is switched off for the project (the `auto` mode fallback trigger).
	pub fn is_anonymous_disabled(&self) -> bool {
		matches!(self, Self::OperationNotAllowed | Self::AdminRestrictedOperation)
	}

	/// Popup flows cannot run here and a redirect should be used instead.
	pub fn is_popup_unavailable(&self) -> bool {
		matches!(self, Self::PopupBlocked | Self::OperationNotSupported)
	}

	/// The stored session is unusable and must be discarded.
	pub fn invalidates_session(&self) -> bool {
		matches!(
			self,
			Self::UserDisabled | Self::UserNotFound | Self::UserTokenExpired | Self::InvalidUserToken
		)
	}

	fn default_message(&self) -> &'static str {
		match self {
			Self::OperationNotAllowed => "The given sign-in provider is disabled for this project.",
			Self::AdminRestrictedOperation => "This operation is restricted to administrators only.",
			Self::PopupBlocked => "Unable to establish a connection with the popup.",
			Self::OperationNotSupported =>
				"This operation is not supported in the environment this client is running on.",
			Self::PopupClosedByUser => "The popup has been closed by the user.",
			Self::CancelledPopupRequest => "This operation has been cancelled by a newer popup.",
			Self::NetworkRequestFailed => "A network error occurred.",
			Self::UserDisabled => "The user account has been disabled.",
			Self::UserNotFound => "The user record no longer exists.",
			Self::UserTokenExpired => "The user's credential is no longer valid.",
			Self::InvalidUserToken => "The user's credential is malformed or revoked.",
			Self::InvalidApiKey => "The API key is not valid.",
			Self::InvalidCredential => "The supplied credential is malformed or has expired.",
			Self::NoAuthEvent => "No pending redirect sign-in matches this result.",
			Self::InvalidAuthEvent => "The redirect result carries an unexpected state.",
			Self::NullUser => "No user is currently signed in.",
			Self::ArgumentError => "An argument to the identity provider call was invalid.",
			Self::TooManyRequests => "Requests from this client are being throttled.",
			Self::InternalError | Self::Other(_) => "The identity provider reported an error.",
		}
	}
}
impl Display for AuthErrorCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Error produced by identity provider calls.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{message} ({code})")]
pub struct AuthError {
	/// Machine-readable provider code.
	pub code: AuthErrorCode,
	/// Human-readable message (provider text when available).
	pub message: String,
}
impl AuthError {
	/// Builds an error with an explicit message.
	pub fn new(code: AuthErrorCode, message: impl Into<String>) -> Self {
		Self { code, message: message.into() }
	}

	/// Builds an error with the code's default message.
	pub fn from_code(code: AuthErrorCode) -> Self {
		let message = code.default_message().to_owned();

		Self { code, message }
	}

	/// Wraps a transport failure as `auth/network-request-failed`.
	pub fn network(err: impl Display) -> Self {
		Self::new(AuthErrorCode::NetworkRequestFailed, format!("A network error occurred: {err}."))
	}
}
