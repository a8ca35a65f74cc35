//! Identifiers for provider-issued users and federated providers.

// self
use crate::_prelude::*;

/// Error returned when a user or provider identifier is malformed.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum IdError {
	/// The identifier was empty.
	#[error("{kind} id cannot be empty.")]
	Empty {
		/// `user` or `provider`.
		kind: &'static str,
	},
	/// The identifier is longer than the provider allows.
	#[error("{kind} id exceeds {max} bytes.")]
	TooLong {
		/// `user` or `provider`.
		kind: &'static str,
		/// Maximum length in bytes.
		max: usize,
	},
	/// The identifier contains a character the provider never issues.
	#[error("{kind} id contains the invalid character {found:?}.")]
	InvalidChar {
		/// `user` or `provider`.
		kind: &'static str,
		/// First offending character.
		found: char,
	},
}

/// Provider-assigned identifier of a signed-in user (Firebase `localId`).
///
/// Firebase uids are 1 to 128 bytes of printable ASCII.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);
impl UserId {
	/// Longest uid the provider accepts.
	pub const MAX_LEN: usize = 128;

	/// Validates `value` as a uid.
	pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
		let value = value.into();

		check("user", &value, Self::MAX_LEN, |c| c.is_ascii_graphic())?;

		Ok(Self(value))
	}
}
impl AsRef<str> for UserId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl TryFrom<String> for UserId {
	type Error = IdError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl From<UserId> for String {
	fn from(value: UserId) -> Self {
		value.0
	}
}
impl Debug for UserId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "UserId({})", self.0)
	}
}
impl Display for UserId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Sign-in provider id as reported by the provider, e.g. `google.com` or `oidc.corp`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProviderId(String);
impl ProviderId {
	const MAX_LEN: usize = 64;

	/// Google sign-in.
	pub fn google() -> Self {
		Self("google.com".into())
	}

	/// Validates `value`: ASCII letters, digits, `.`, `-` and `_` only.
	pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
		let value = value.into();

		check("provider", &value, Self::MAX_LEN, |c| {
			c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')
		})?;

		Ok(Self(value))
	}
}
impl AsRef<str> for ProviderId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl TryFrom<String> for ProviderId {
	type Error = IdError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl From<ProviderId> for String {
	fn from(value: ProviderId) -> Self {
		value.0
	}
}
impl Debug for ProviderId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "ProviderId({})", self.0)
	}
}
impl Display for ProviderId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

fn check(
	kind: &'static str,
	value: &str,
	max: usize,
	allowed: impl Fn(char) -> bool,
) -> Result<(), IdError> {
	if value.is_empty() {
		return Err(IdError::Empty { kind });
	}
	if value.len() > max {
		return Err(IdError::TooLong { kind, max });
	}
	if let Some(found) = value.chars().find(|c| !allowed(*c)) {
		return Err(IdError::InvalidChar { kind, found });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn user_ids_accept_firebase_uids_only() {
		assert!(UserId::new("Xy9lq2bZ0kT").is_ok());
		assert_eq!(UserId::new(""), Err(IdError::Empty { kind: "user" }));
		assert_eq!(UserId::new("a b"), Err(IdError::InvalidChar { kind: "user", found: ' ' }));
		assert_eq!(UserId::new("a".repeat(129)), Err(IdError::TooLong { kind: "user", max: 128 }));
	}

	#[test]
	fn provider_ids_are_dotted_names() {
		assert_eq!(ProviderId::new("google.com"), Ok(ProviderId::google()));
		assert!(ProviderId::new("oidc.corp-sso").is_ok());
		assert!(ProviderId::new("google/com").is_err());
		assert_eq!(format!("{:?}", ProviderId::google()), "ProviderId(google.com)");
	}

	#[test]
	fn deserialization_validates() {
		let uid: UserId = serde_json::from_str("\"anon-1\"").expect("Uid should deserialize.");

		assert_eq!(uid.as_ref(), "anon-1");
		assert!(serde_json::from_str::<ProviderId>("\"has space\"").is_err());
	}
}
