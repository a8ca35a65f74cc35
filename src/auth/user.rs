//! Read-through snapshot of the provider's signed-in user.

// self
use crate::{
	_prelude::*,
	auth::{ProviderId, UserId},
};

/// Identity currently signed in at the provider, anonymous or federated.
///
/// The provider owns the session; this value is a snapshot handed out by
/// [`AuthClient`](crate::provider::AuthClient) and published on auth-state changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
	/// Provider-assigned user identifier.
	pub uid: UserId,
	/// `true` when the identity has no linked credentials.
	pub is_anonymous: bool,
	/// Federated provider that authenticated the user, if any.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub provider_id: Option<ProviderId>,
	/// Email reported by the federated provider.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	/// Display name reported by the federated provider.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub display_name: Option<String>,
}
impl SessionUser {
	/// Creates an anonymous (guest) user.
	pub fn anonymous(uid: UserId) -> Self {
		Self { uid, is_anonymous: true, provider_id: None, email: None, display_name: None }
	}

	/// Creates a user authenticated through `provider`.
	pub fn federated(uid: UserId, provider: ProviderId) -> Self {
		Self {
			uid,
			is_anonymous: false,
			provider_id: Some(provider),
			email: None,
			display_name: None,
		}
	}

	/// Sets the reported email.
	pub fn with_email(mut self, email: impl Into<String>) -> Self {
		self.email = Some(email.into());

		self
	}

	/// Sets the reported display name.
	pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
		self.display_name = Some(name.into());

		self
	}
}
