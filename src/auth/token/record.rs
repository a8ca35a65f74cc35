//! Identity-token records held for the signed-in user and their refresh window.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Errors produced while building a [`TokenRecord`] from a provider response.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum TokenRecordError {
	/// Provider response omitted the identity token.
	#[error("Identity token is required.")]
	MissingIdToken,
	/// Provider response carried a zero or negative lifetime.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// The lifetime pushes the expiry past the representable date range.
	#[error("The expires_in value is out of range.")]
	ExpiresInOutOfRange,
}

/// Identity + refresh token pair issued for the current user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
	/// Short-lived identity token presented as the bearer credential.
	pub id_token: TokenSecret,
	/// Long-lived credential used to mint new identity tokens.
	pub refresh_token: TokenSecret,
	/// Instant the identity token was issued.
	pub issued_at: OffsetDateTime,
	/// Instant the identity token stops being accepted.
	pub expires_at: OffsetDateTime,
}
impl TokenRecord {
	/// Tokens are refreshed once they are this close to expiry.
	pub const REFRESH_WINDOW: Duration = Duration::minutes(5);

	/// Builds a record from an issue instant and a relative lifetime.
	pub fn issue(
		id_token: impl Into<String>,
		refresh_token: impl Into<String>,
		issued_at: OffsetDateTime,
		expires_in: Duration,
	) -> Result<Self, TokenRecordError> {
		let id_token = id_token.into();

		if id_token.is_empty() {
			return Err(TokenRecordError::MissingIdToken);
		}
		if !expires_in.is_positive() {
			return Err(TokenRecordError::NonPositiveExpiresIn);
		}

		let expires_at =
			issued_at.checked_add(expires_in).ok_or(TokenRecordError::ExpiresInOutOfRange)?;

		Ok(Self {
			id_token: TokenSecret::new(id_token),
			refresh_token: TokenSecret::new(refresh_token),
			issued_at,
			expires_at,
		})
	}

	/// Returns `true` once the identity token is no longer valid at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Returns `true` when the identity token expires within [`Self::REFRESH_WINDOW`].
	pub fn needs_refresh_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at - instant <= Self::REFRESH_WINDOW
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("id_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
