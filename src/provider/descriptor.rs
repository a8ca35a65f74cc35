//! Federated identity provider descriptors used by native redirect sign-in.
//!
//! A descriptor holds validated endpoint metadata and the client authentication preference for
//! the provider's token endpoint. Endpoints must use HTTPS; plain HTTP is accepted only for
//! loopback hosts so local emulators and mock servers stay usable.

/// Builder API for assembling federated descriptors.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, auth::ProviderId};

const GOOGLE_AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Preferred client authentication modes for token endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	/// Form POST body parameters for `client_id`/`client_secret`.
	#[default]
	ClientSecretPost,
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// Public clients that prove possession via PKCE only.
	NoneWithPkce,
}

/// Endpoint set declared by a federated descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedEndpoints {
	/// Authorization endpoint the user is redirected to.
	pub authorization: Url,
	/// Token endpoint used for the code exchange.
	pub token: Url,
}

/// Immutable federated provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedDescriptor {
	/// Provider identifier the descriptor serves (`google.com`).
	pub id: ProviderId,
	/// Endpoint definitions exposed by the provider.
	pub endpoints: FederatedEndpoints,
	/// Preferred client authentication mechanism.
	pub client_auth_method: ClientAuthMethod,
	/// Scopes always requested.
	pub default_scopes: Vec<String>,
}
impl FederatedDescriptor {
	/// Creates a new builder for the provided identifier.
	pub fn builder(id: ProviderId) -> FederatedDescriptorBuilder {
		FederatedDescriptorBuilder::new(id)
	}

	/// Google's OAuth 2.0 endpoints with the OpenID Connect default scopes.
	pub fn google() -> Result<Self, DescriptorError> {
		let authorization = Url::parse(GOOGLE_AUTHORIZATION_ENDPOINT)
			.map_err(|source| DescriptorError::InvalidEndpoint { endpoint: "authorization", source })?;
		let token = Url::parse(GOOGLE_TOKEN_ENDPOINT)
			.map_err(|source| DescriptorError::InvalidEndpoint { endpoint: "token", source })?;

		Self::builder(ProviderId::google())
			.authorization_endpoint(authorization)
			.token_endpoint(token)
			.default_scopes(["openid", "email", "profile"])
			.build()
	}

	/// Default scopes followed by `extra`, without duplicates, space-delimited.
	pub fn scope_param<'a>(&'a self, extra: impl IntoIterator<Item = &'a str>) -> String {
		let mut scopes: Vec<&str> = self.default_scopes.iter().map(String::as_str).collect();

		for scope in extra {
			if !scopes.contains(&scope) {
				scopes.push(scope);
			}
		}

		scopes.join(" ")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn google_descriptor_is_valid() {
		let descriptor = FederatedDescriptor::google().expect("Google descriptor should build.");

		assert_eq!(descriptor.id.as_ref(), "google.com");
		assert_eq!(descriptor.endpoints.token.as_str(), GOOGLE_TOKEN_ENDPOINT);
		assert_eq!(descriptor.client_auth_method, ClientAuthMethod::ClientSecretPost);
	}

	#[test]
	fn scope_param_merges_extras_once() {
		let descriptor = FederatedDescriptor::google().expect("Google descriptor should build.");

		assert_eq!(
			descriptor.scope_param(["email", "https://www.googleapis.com/auth/drive.file"]),
			"openid email profile https://www.googleapis.com/auth/drive.file"
		);
	}
}
