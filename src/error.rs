//! Crate-level error types shared by the loader, bootstrapper, HTTP client, and adapters.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Session persistence failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Session bootstrap aborted.
	#[error(transparent)]
	Bootstrap(#[from] BootstrapError),
	/// Identity provider rejected or failed a sign-in related call.
	#[error(transparent)]
	Auth(#[from] crate::auth::AuthError),
	/// Login page could not obtain a session context.
	#[error(transparent)]
	Login(#[from] crate::login::LoginError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
}

/// Unrecoverable bootstrap failures; the page load stays unauthenticated.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum BootstrapError {
	/// No identity provider SDK was registered with the bootstrapper.
	#[error("Identity provider SDK is not loaded.")]
	SdkMissing,
	/// Every configuration source failed.
	#[error("Identity provider configuration was not found.")]
	ConfigNotFound,
	/// The provider rejected the configuration during app initialization.
	#[error("Identity provider initialization failed: {message}.")]
	Initialize {
		/// Provider-supplied failure message.
		message: String,
	},
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Request target cannot be resolved against the client's base URL.
	#[error("Request target `{target}` is not a valid URL.")]
	InvalidTarget {
		/// Target string supplied by the caller.
		target: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A header value could not be encoded.
	#[error("Header value is invalid.")]
	InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized.")]
	Body(#[from] serde_json::Error),
	/// Provider configuration document is not a JSON object.
	#[error("Provider configuration must be a JSON object.")]
	NotAnObject,
	/// Federated provider descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::provider::DescriptorError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while sending the request.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::{AuthError, AuthErrorCode};

	#[test]
	fn auth_errors_convert_with_code_preserved() {
		let err: Error = AuthError::from_code(AuthErrorCode::OperationNotAllowed).into();

		match err {
			Error::Auth(inner) => assert_eq!(inner.code, AuthErrorCode::OperationNotAllowed),
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn bootstrap_errors_render_provider_message() {
		let err = BootstrapError::Initialize { message: "API key not valid".into() };

		assert_eq!(err.to_string(), "Identity provider initialization failed: API key not valid.");
	}
}
