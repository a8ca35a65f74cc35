//! Provider configuration values and their discovery.
//!
//! [`ProviderConfig`] stays an opaque JSON object so any key the provider needs survives the
//! trip; typed accessors cover the keys this crate reads. [`ConfigLoader`] resolves the
//! configuration from an inline block, a primary location, and a fallback location.

pub mod loader;

pub use loader::*;

// crates.io
use serde_json::{Map, Value};
// self
use crate::{_prelude::*, error::ConfigError};

/// Opaque key-value configuration used to initialize the identity client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderConfig(Map<String, Value>);
impl ProviderConfig {
	/// Wraps a JSON value, which must be an object.
	pub fn from_value(value: Value) -> Result<Self, ConfigError> {
		match value {
			Value::Object(map) => Ok(Self(map)),
			_ => Err(ConfigError::NotAnObject),
		}
	}

	/// Parses JSON text into a configuration object.
	pub fn from_json(text: &str) -> Result<Self, ConfigError> {
		Self::from_value(serde_json::from_str(text)?)
	}

	/// Raw value for `key`.
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.get(key)
	}

	/// String value for `key`, ignoring empty strings.
	pub fn get_str(&self, key: &str) -> Option<&str> {
		self.0.get(key).and_then(Value::as_str).filter(|value| !value.is_empty())
	}

	/// `apiKey`.
	pub fn api_key(&self) -> Option<&str> {
		self.get_str("apiKey")
	}

	/// `authDomain`.
	pub fn auth_domain(&self) -> Option<&str> {
		self.get_str("authDomain")
	}

	/// `projectId`.
	pub fn project_id(&self) -> Option<&str> {
		self.get_str("projectId")
	}

	/// `appId`.
	pub fn app_id(&self) -> Option<&str> {
		self.get_str("appId")
	}

	/// The `googleOAuth` block used by native redirect sign-in, when present and well-formed.
	pub fn federated_client(&self) -> Option<FederatedClientConfig> {
		let value = self.0.get(FederatedClientConfig::KEY)?.clone();

		match serde_json::from_value(value) {
			Ok(client) => Some(client),
			Err(e) => {
				tracing::warn!(error = %e, "Ignoring malformed federated client configuration.");

				None
			},
		}
	}

	/// Borrows the underlying JSON object.
	pub fn as_map(&self) -> &Map<String, Value> {
		&self.0
	}
}

/// OAuth client registration used to run the federated redirect flow outside a browser SDK.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedClientConfig {
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret, when the client type has one.
	#[serde(default)]
	pub client_secret: Option<String>,
	/// Redirect URI registered for the client.
	pub redirect_uri: Url,
	/// Extra scopes requested on top of the provider defaults.
	#[serde(default)]
	pub scopes: Vec<String>,
}
impl FederatedClientConfig {
	/// Configuration key holding the block.
	pub const KEY: &'static str = "googleOAuth";
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn accessors_read_well_known_keys() {
		let config = ProviderConfig::from_json(
			r#"{"apiKey":"AIza-test","authDomain":"demo.firebaseapp.com","projectId":"demo","appId":""}"#,
		)
		.expect("Config fixture should parse.");

		assert_eq!(config.api_key(), Some("AIza-test"));
		assert_eq!(config.auth_domain(), Some("demo.firebaseapp.com"));
		assert_eq!(config.project_id(), Some("demo"));
		assert_eq!(config.app_id(), None, "Empty strings count as absent.");
		assert!(config.federated_client().is_none());
	}

	#[test]
	fn non_objects_are_rejected() {
		assert!(matches!(ProviderConfig::from_json("[1,2]"), Err(ConfigError::NotAnObject)));
		assert!(matches!(ProviderConfig::from_json("{"), Err(ConfigError::Body(_))));
	}

	#[test]
	fn federated_block_parses_when_complete() {
		let config = ProviderConfig::from_json(
			r#"{"apiKey":"k","googleOAuth":{"clientId":"cid","redirectUri":"http://127.0.0.1:8765/callback"}}"#,
		)
		.expect("Config fixture should parse.");
		let client = config.federated_client().expect("Federated block should parse.");

		assert_eq!(client.client_id, "cid");
		assert!(client.client_secret.is_none());
		assert!(client.scopes.is_empty());

		let broken = ProviderConfig::from_json(r#"{"googleOAuth":{"clientId":"cid"}}"#)
			.expect("Config fixture should parse.");

		assert!(broken.federated_client().is_none());
	}
}
