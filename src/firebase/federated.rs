//! Native two-phase redirect sign-in: PKCE authorize URL out, code exchange back in.

// std
use std::borrow::Cow;
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use oauth2::{
	AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, PkceCodeVerifier, RedirectUrl, RequestTokenError, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError},
};
use rand::{Rng, distr::Alphanumeric};
use reqwest::StatusCode;
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::{AuthError, AuthErrorCode, TokenSecret},
	config::FederatedClientConfig,
	http::{LastStatus, StatusRecordingClient},
	provider::{ClientAuthMethod, FederatedDescriptor, FederatedProvider, RedirectIntent},
	store::PendingRedirect,
};

type ExchangeClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

const STATE_LEN: usize = 32;
const PKCE_VERIFIER_LEN: usize = 64;

/// Redirect flow bound to one OAuth client registration.
#[derive(Clone, Debug)]
pub(crate) struct FederatedFlow {
	client: FederatedClientConfig,
	http: ReqwestClient,
}
impl FederatedFlow {
	pub(crate) fn new(client: FederatedClientConfig, http: ReqwestClient) -> Self {
		Self { client, http }
	}

	/// Phase 1: authorize URL plus the attempt to persist until the callback arrives.
	pub(crate) fn start(
		&self,
		descriptor: &FederatedDescriptor,
		provider: &FederatedProvider,
		now: OffsetDateTime,
	) -> (RedirectIntent, PendingRedirect) {
		let state = random_string(STATE_LEN);
		let verifier = random_string(PKCE_VERIFIER_LEN);
		let challenge = compute_pkce_challenge(&verifier);
		let extra = self.client.scopes.iter().chain(&provider.scopes).map(String::as_str);
		let mut authorize_url = descriptor.endpoints.authorization.clone();
		let mut pairs = authorize_url.query_pairs_mut();

		pairs.append_pair("response_type", "code");
		pairs.append_pair("client_id", &self.client.client_id);
		pairs.append_pair("redirect_uri", self.client.redirect_uri.as_str());
		pairs.append_pair("scope", &descriptor.scope_param(extra));
		pairs.append_pair("state", &state);
		pairs.append_pair("code_challenge", &challenge);
		pairs.append_pair("code_challenge_method", "S256");

		for (key, value) in &provider.custom_parameters {
			pairs.append_pair(key, value);
		}

		drop(pairs);

		let intent =
			RedirectIntent { provider: provider.id.clone(), authorize_url, state: state.clone() };
		let pending = PendingRedirect {
			state,
			provider: provider.id.clone(),
			redirect_uri: self.client.redirect_uri.clone(),
			code_verifier: TokenSecret::new(verifier),
			created_at: now,
		};

		(intent, pending)
	}

	/// Phase 2: exchanges `code` for the provider access token.
	pub(crate) async fn exchange(
		&self,
		descriptor: &FederatedDescriptor,
		pending: &PendingRedirect,
		code: &str,
	) -> Result<TokenSecret, AuthError> {
		let last_status = LastStatus::default();
		let handle = StatusRecordingClient::new(self.http.clone(), last_status.clone());
		let response = self
			.oauth_client(descriptor)
			.exchange_code(AuthorizationCode::new(code.to_owned()))
			.set_pkce_verifier(PkceCodeVerifier::new(pending.code_verifier.expose().to_owned()))
			.set_redirect_uri(Cow::Owned(RedirectUrl::from_url(pending.redirect_uri.clone())))
			.request_async(&handle)
			.await
			.map_err(|e| map_exchange_error(last_status.get(), e))?;

		Ok(TokenSecret::new(response.access_token().secret().to_owned()))
	}

	fn oauth_client(&self, descriptor: &FederatedDescriptor) -> ExchangeClient {
		let mut client = BasicClient::new(ClientId::new(self.client.client_id.clone()))
			.set_auth_uri(AuthUrl::from_url(descriptor.endpoints.authorization.clone()))
			.set_token_uri(TokenUrl::from_url(descriptor.endpoints.token.clone()));

		let secret = match descriptor.client_auth_method {
			ClientAuthMethod::NoneWithPkce => None,
			_ => self.client.client_secret.clone(),
		};

		if let Some(secret) = secret {
			client = client.set_client_secret(ClientSecret::new(secret));
		}
		if !matches!(descriptor.client_auth_method, ClientAuthMethod::ClientSecretBasic) {
			client = client.set_auth_type(AuthType::RequestBody);
		}

		client
	}
}

/// `postBody` for `accounts:signInWithIdp` carrying a provider access token.
pub(crate) fn idp_post_body(provider: &FederatedProvider, access_token: &TokenSecret) -> String {
	url::form_urlencoded::Serializer::new(String::new())
		.append_pair("access_token", access_token.expose())
		.append_pair("providerId", provider.id.as_ref())
		.finish()
}

fn map_exchange_error(
	status: Option<StatusCode>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> AuthError {
	let throttled = status == Some(StatusCode::TOO_MANY_REQUESTS);

	match err {
		RequestTokenError::ServerResponse(response) => {
			let code = match response.error().as_ref() {
				_ if throttled => AuthErrorCode::TooManyRequests,
				"invalid_grant" | "invalid_request" => AuthErrorCode::InvalidCredential,
				"invalid_client" | "unauthorized_client" => AuthErrorCode::ArgumentError,
				_ => AuthErrorCode::InternalError,
			};
			let message = match response.error_description() {
				Some(description) => format!("Token endpoint returned an OAuth error: {description}."),
				None =>
					format!("Token endpoint returned an OAuth error: {}.", response.error().as_ref()),
			};

			AuthError::new(code, message)
		},
		RequestTokenError::Request(e) => AuthError::network(e),
		RequestTokenError::Parse(e, _body) => AuthError::new(
			if throttled { AuthErrorCode::TooManyRequests } else { AuthErrorCode::InternalError },
			format!("Token response is malformed at `{}`: {}.", e.path(), e.inner()),
		),
		RequestTokenError::Other(message) => AuthError::new(
			AuthErrorCode::InternalError,
			format!("Token endpoint returned an unexpected response: {message}."),
		),
	}
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn compute_pkce_challenge(verifier: &str) -> String {
	let digest = Sha256::digest(verifier.as_bytes());

	URL_SAFE_NO_PAD.encode(digest)
}
