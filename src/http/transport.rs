//! Reqwest plumbing for provider calls and the `oauth2` code exchange.

// std
use std::time::Duration as StdDuration;
// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use reqwest::{StatusCode, redirect::Policy};
// self
use crate::{_prelude::*, error::ConfigError};

const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Builds the reqwest client used for provider calls.
///
/// Redirects are never followed: token and identity endpoints answer directly.
pub fn provider_http_client() -> Result<ReqwestClient, ConfigError> {
	ReqwestClient::builder()
		.redirect(Policy::none())
		.timeout(DEFAULT_TIMEOUT)
		.build()
		.map_err(ConfigError::http_client_build)
}

/// Status of the last token-endpoint response, shared with the exchange error mapping.
///
/// `oauth2` drops the status of error responses it manages to parse, and a throttled endpoint
/// has to be told apart from a rejected grant.
#[derive(Clone, Debug, Default)]
pub struct LastStatus(Arc<Mutex<Option<StatusCode>>>);
impl LastStatus {
	/// Status recorded by the most recent call, if a response arrived.
	pub fn get(&self) -> Option<StatusCode> {
		*self.0.lock()
	}

	fn set(&self, status: Option<StatusCode>) {
		*self.0.lock() = status;
	}
}

/// [`AsyncHttpClient`] over reqwest that records each response status in a [`LastStatus`].
#[derive(Clone, Debug)]
pub struct StatusRecordingClient {
	client: ReqwestClient,
	last: LastStatus,
}
impl StatusRecordingClient {
	/// Wraps `client`, recording into `last`.
	pub fn new(client: ReqwestClient, last: LastStatus) -> Self {
		Self { client, last }
	}
}
impl<'c> AsyncHttpClient<'c> for StatusRecordingClient {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.last.set(None);

			let response = self
				.client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			self.last.set(Some(status));

			let mut converted = HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*converted.status_mut() = status;
			*converted.headers_mut() = headers;

			Ok(converted)
		})
	}
}
