// std
use std::net::IpAddr;
// crates.io
use url::Host;
// self
use crate::{
	_prelude::*,
	auth::ProviderId,
	provider::{ClientAuthMethod, FederatedDescriptor, FederatedEndpoints},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum DescriptorError {
	/// Authorization endpoint is required for redirect sign-in.
	#[error("Missing authorization endpoint.")]
	MissingAuthorizationEndpoint,
	/// Token endpoint is required for the code exchange.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Endpoint text could not be parsed.
	#[error("The {endpoint} endpoint is not a valid URL.")]
	InvalidEndpoint {
		/// Which endpoint failed to parse.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Scopes must be non-empty and free of whitespace.
	#[error("Scope `{scope}` is not a valid scope token.")]
	InvalidScope {
		/// Rejected scope.
		scope: String,
	},
}

/// Builder for [`FederatedDescriptor`] values.
#[derive(Debug)]
pub struct FederatedDescriptorBuilder {
	/// Identifier for the descriptor being constructed.
	pub id: ProviderId,
	/// Authorization endpoint.
	pub authorization_endpoint: Option<Url>,
	/// Token endpoint.
	pub token_endpoint: Option<Url>,
	/// Preferred client authentication method for the token endpoint.
	pub client_auth_method: ClientAuthMethod,
	/// Scopes always requested.
	pub default_scopes: Vec<String>,
}
impl FederatedDescriptorBuilder {
	/// Creates a new builder seeded with the provided identifier.
	pub fn new(id: ProviderId) -> Self {
		Self {
			id,
			authorization_endpoint: None,
			token_endpoint: None,
			client_auth_method: ClientAuthMethod::default(),
			default_scopes: Vec::new(),
		}
	}

	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Overrides the preferred client authentication method.
	pub fn client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth_method = method;

		self
	}

	/// Replaces the default scopes.
	pub fn default_scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.default_scopes = scopes.into_iter().map(Into::into).collect();

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<FederatedDescriptor, DescriptorError> {
		let authorization =
			self.authorization_endpoint.ok_or(DescriptorError::MissingAuthorizationEndpoint)?;
		let token = self.token_endpoint.ok_or(DescriptorError::MissingTokenEndpoint)?;
		let descriptor = FederatedDescriptor {
			id: self.id,
			endpoints: FederatedEndpoints { authorization, token },
			client_auth_method: self.client_auth_method,
			default_scopes: self.default_scopes,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl FederatedDescriptor {
	fn validate(&self) -> Result<(), DescriptorError> {
		validate_endpoint("authorization", &self.endpoints.authorization)?;
		validate_endpoint("token", &self.endpoints.token)?;

		if let Some(scope) =
			self.default_scopes.iter().find(|s| s.is_empty() || s.chars().any(char::is_whitespace))
		{
			return Err(DescriptorError::InvalidScope { scope: scope.clone() });
		}

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), DescriptorError> {
	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(DescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
		Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
		None => false,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn builder() -> FederatedDescriptorBuilder {
		FederatedDescriptor::builder(ProviderId::google())
	}

	#[test]
	fn rejects_plain_http_on_public_hosts() {
		let err = builder()
			.authorization_endpoint(Url::parse("http://accounts.example.com/auth").expect("URL should parse."))
			.token_endpoint(Url::parse("https://oauth.example.com/token").expect("URL should parse."))
			.build()
			.expect_err("Plain HTTP on a public host must be rejected.");

		assert!(matches!(err, DescriptorError::InsecureEndpoint { endpoint: "authorization", .. }));
	}

	#[test]
	fn accepts_loopback_http() {
		let descriptor = builder()
			.authorization_endpoint(Url::parse("http://127.0.0.1:9099/auth").expect("URL should parse."))
			.token_endpoint(Url::parse("http://localhost:9099/token").expect("URL should parse."))
			.client_auth_method(ClientAuthMethod::NoneWithPkce)
			.build()
			.expect("Loopback endpoints should be accepted.");

		assert_eq!(descriptor.client_auth_method, ClientAuthMethod::NoneWithPkce);
	}

	#[test]
	fn requires_both_endpoints_and_clean_scopes() {
		assert_eq!(builder().build(), Err(DescriptorError::MissingAuthorizationEndpoint));
		assert_eq!(
			builder()
				.authorization_endpoint(Url::parse("https://a.example.com/auth").expect("URL should parse."))
				.token_endpoint(Url::parse("https://a.example.com/token").expect("URL should parse."))
				.default_scopes(["openid", "bad scope"])
				.build(),
			Err(DescriptorError::InvalidScope { scope: "bad scope".into() })
		);
	}
}
