//! Sign-in mode selection.

// std
use std::env;
// self
use crate::_prelude::*;

/// How the bootstrapper establishes a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
	/// Anonymous sign-in, falling back to federated sign-in when anonymous auth is disabled.
	#[default]
	Auto,
	/// Anonymous sign-in only.
	Anonymous,
	/// Federated (Google) sign-in only.
	Google,
	/// No automatic sign-in; the page drives sign-in itself.
	Manual,
}
impl AuthMode {
	/// Process-wide override consulted before the config attribute.
	pub const ENV_VAR: &'static str = "AUTH_MODE";

	/// Returns the lowercase label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Auto => "auto",
			Self::Anonymous => "anonymous",
			Self::Google => "google",
			Self::Manual => "manual",
		}
	}

	/// Parses a mode, coercing anything unrecognized to [`AuthMode::Auto`].
	pub fn parse_lenient(raw: &str) -> Self {
		raw.parse().unwrap_or_default()
	}

	/// Picks the first non-empty input in priority order (override, then attribute), defaulting
	/// to [`AuthMode::Auto`].
	pub fn resolve(global: Option<&str>, attribute: Option<&str>) -> Self {
		[global, attribute]
			.into_iter()
			.flatten()
			.map(str::trim)
			.find(|value| !value.is_empty())
			.map(Self::parse_lenient)
			.unwrap_or_default()
	}

	/// [`AuthMode::resolve`] with the override read from [`AuthMode::ENV_VAR`].
	pub fn from_env(attribute: Option<&str>) -> Self {
		let global = env::var(Self::ENV_VAR).ok();

		Self::resolve(global.as_deref(), attribute)
	}
}
impl Display for AuthMode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for AuthMode {
	type Err = UnknownAuthMode;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"auto" => Ok(Self::Auto),
			"anonymous" => Ok(Self::Anonymous),
			"google" => Ok(Self::Google),
			"manual" => Ok(Self::Manual),
			_ => Err(UnknownAuthMode { value: s.to_owned() }),
		}
	}
}

/// Strict parsing failure for [`AuthMode`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown auth mode `{value}`.")]
pub struct UnknownAuthMode {
	/// Rejected input.
	pub value: String,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn override_wins_over_attribute() {
		assert_eq!(AuthMode::resolve(Some("google"), Some("manual")), AuthMode::Google);
		assert_eq!(AuthMode::resolve(None, Some("Manual")), AuthMode::Manual);
		assert_eq!(AuthMode::resolve(Some(""), Some("anonymous")), AuthMode::Anonymous);
		assert_eq!(AuthMode::resolve(None, None), AuthMode::Auto);
	}

	#[test]
	fn unknown_values_coerce_to_auto() {
		assert_eq!(AuthMode::resolve(Some("facebook"), Some("google")), AuthMode::Auto);
		assert_eq!(AuthMode::parse_lenient("GOOGLE"), AuthMode::Google);
		assert!("popup".parse::<AuthMode>().is_err());
	}
}
