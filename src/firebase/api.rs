//! Identity Toolkit and Secure Token REST calls plus their error mapping.

// crates.io
use reqwest::{RequestBuilder, StatusCode};
use serde::{Deserializer, de::DeserializeOwned};
// self
use crate::{
	_prelude::*,
	auth::{AuthError, AuthErrorCode},
	firebase::FirebaseEndpoints,
};

/// `accounts:signUp` / `accounts:signInWithIdp` response.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignInResponse {
	pub(crate) local_id: String,
	pub(crate) id_token: String,
	#[serde(default)]
	pub(crate) refresh_token: String,
	#[serde(deserialize_with = "seconds")]
	pub(crate) expires_in: i64,
	#[serde(default)]
	pub(crate) email: Option<String>,
	#[serde(default)]
	pub(crate) display_name: Option<String>,
	#[serde(default)]
	pub(crate) provider_id: Option<String>,
}

/// Secure Token `token` response.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct RefreshResponse {
	pub(crate) id_token: String,
	pub(crate) refresh_token: String,
	#[serde(deserialize_with = "seconds")]
	pub(crate) expires_in: i64,
	#[serde(default)]
	pub(crate) user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
	error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
	#[serde(default)]
	message: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Seconds {
	Text(String),
	Number(i64),
}

/// REST client for one API key.
#[derive(Clone, Debug)]
pub(crate) struct IdentityApi {
	http: ReqwestClient,
	endpoints: FirebaseEndpoints,
	api_key: String,
}
impl IdentityApi {
	pub(crate) fn new(http: ReqwestClient, endpoints: FirebaseEndpoints, api_key: String) -> Self {
		Self { http, endpoints, api_key }
	}

	pub(crate) async fn sign_up_anonymous(&self) -> Result<SignInResponse, AuthError> {
		let url = self.identity_url("accounts:signUp")?;

		self.call(self.http.post(url).json(&serde_json::json!({ "returnSecureToken": true }))).await
	}

	pub(crate) async fn sign_in_with_idp(
		&self,
		post_body: &str,
		request_uri: &Url,
	) -> Result<SignInResponse, AuthError> {
		let url = self.identity_url("accounts:signInWithIdp")?;
		let body = serde_json::json!({
			"postBody": post_body,
			"requestUri": request_uri.as_str(),
			"returnSecureToken": true,
			"returnIdpCredential": true,
		});

		self.call(self.http.post(url).json(&body)).await
	}

	pub(crate) async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, AuthError> {
		let mut url = join(&self.endpoints.secure_token, "token")?;

		url.query_pairs_mut().append_pair("key", &self.api_key);

		self.call(
			self.http
				.post(url)
				.form(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)]),
		)
		.await
	}

	fn identity_url(&self, method: &str) -> Result<Url, AuthError> {
		// `accounts:signUp` alone would parse as a URL scheme.
		let mut url = join(&self.endpoints.identity_toolkit, &format!("./{method}"))?;

		url.query_pairs_mut().append_pair("key", &self.api_key);

		Ok(url)
	}

	async fn call<T>(&self, request: RequestBuilder) -> Result<T, AuthError>
	where
		T: DeserializeOwned,
	{
		let response = request.send().await.map_err(AuthError::network)?;
		let status = response.status();
		let bytes = response.bytes().await.map_err(AuthError::network)?;

		if !status.is_success() {
			return Err(map_error_body(status, &bytes));
		}

		let de = &mut serde_json::Deserializer::from_slice(&bytes);

		serde_path_to_error::deserialize(de).map_err(|e| {
			AuthError::new(
				AuthErrorCode::InternalError,
				format!("Identity provider response is malformed at `{}`: {}.", e.path(), e.inner()),
			)
		})
	}
}

fn join(base: &Url, path: &str) -> Result<Url, AuthError> {
	base.join(path).map_err(|e| {
		AuthError::new(AuthErrorCode::ArgumentError, format!("Endpoint URL cannot be built: {e}."))
	})
}

/// Maps an error response to an [`AuthError`].
///
/// The provider reports `{"error":{"message":"KEY"}}` or `"KEY : detail"`.
pub(crate) fn map_error_body(status: StatusCode, body: &[u8]) -> AuthError {
	let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(body) else {
		let code = if status == StatusCode::TOO_MANY_REQUESTS {
			AuthErrorCode::TooManyRequests
		} else {
			AuthErrorCode::InternalError
		};

		return AuthError::new(code, format!("Identity provider returned HTTP {status}."));
	};
	let raw = envelope.error.message;
	let (key, detail) = match raw.split_once(" : ") {
		Some((key, detail)) => (key.trim(), Some(detail.trim())),
		None => (raw.trim(), None),
	};
	let code = code_for(key);
	let message = match detail {
		Some(detail) if !detail.is_empty() => detail.to_owned(),
		_ if key.is_empty() => format!("Identity provider returned HTTP {status}."),
		_ => key.to_owned(),
	};

	AuthError::new(code, message)
}

fn code_for(key: &str) -> AuthErrorCode {
	match key {
		"OPERATION_NOT_ALLOWED" => AuthErrorCode::OperationNotAllowed,
		"ADMIN_ONLY_OPERATION" => AuthErrorCode::AdminRestrictedOperation,
		"TOKEN_EXPIRED" => AuthErrorCode::UserTokenExpired,
		"USER_DISABLED" => AuthErrorCode::UserDisabled,
		"USER_NOT_FOUND" => AuthErrorCode::UserNotFound,
		"INVALID_REFRESH_TOKEN" | "INVALID_GRANT_TYPE" | "MISSING_REFRESH_TOKEN" =>
			AuthErrorCode::InvalidUserToken,
		"INVALID_API_KEY" | "API_KEY_INVALID" => AuthErrorCode::InvalidApiKey,
		"INVALID_IDP_RESPONSE" | "INVALID_CREDENTIAL_OR_PROVIDER_ID" =>
			AuthErrorCode::InvalidCredential,
		"TOO_MANY_ATTEMPTS_TRY_LATER" => AuthErrorCode::TooManyRequests,
		_ if key.starts_with("API key not valid") => AuthErrorCode::InvalidApiKey,
		_ => AuthErrorCode::InternalError,
	}
}

fn seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
	D: Deserializer<'de>,
{
	match Seconds::deserialize(deserializer)? {
		Seconds::Number(value) => Ok(value),
		Seconds::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
	}
}
