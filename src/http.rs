//! Authorized HTTP client for same-origin API calls.
//!
//! [`AuthorizedClient`] replaces the patched global `fetch` of browser pages with an explicit
//! client: requests whose target matches the [`AttachPolicy`] carry
//! `Authorization: Bearer <identity token>` and, on non-GET requests without one, a JSON
//! `Content-Type`. Requests that do not match are sent exactly as given. Header preparation never
//! fails a request; problems are logged and the request proceeds unchanged.

pub mod transport;

pub use transport::*;

// crates.io
use reqwest::{
	Body, Method, Request, Response,
	header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
	session::SessionContext,
};

/// Decides which request targets receive the bearer token.
pub trait AttachPolicy
where
	Self: Send + Sync,
{
	/// `target` is a relative reference or a path (same-origin absolute URLs are reduced to their
	/// path and query before reaching the policy).
	fn should_attach(&self, target: &str) -> bool;
}

/// Attaches to `/v1/...` paths and to relative targets containing `/v1/`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiPathPolicy {
	prefix: String,
}
impl ApiPathPolicy {
	/// Default API prefix.
	pub const DEFAULT_PREFIX: &'static str = "/v1/";

	/// Policy for a custom prefix such as `/api/`.
	pub fn new(prefix: impl Into<String>) -> Self {
		Self { prefix: prefix.into() }
	}
}
impl Default for ApiPathPolicy {
	fn default() -> Self {
		Self::new(Self::DEFAULT_PREFIX)
	}
}
impl AttachPolicy for ApiPathPolicy {
	fn should_attach(&self, target: &str) -> bool {
		target.starts_with(&self.prefix)
			|| (target.contains(&self.prefix) && !is_absolute_http(target))
	}
}

/// What to send: a target string or a prepared request.
#[derive(Debug)]
pub enum FetchInput {
	/// Relative reference or absolute URL, resolved against the client's base URL.
	Target(String),
	/// Fully built request.
	Request(Request),
}
impl From<&str> for FetchInput {
	fn from(value: &str) -> Self {
		Self::Target(value.to_owned())
	}
}
impl From<String> for FetchInput {
	fn from(value: String) -> Self {
		Self::Target(value)
	}
}
impl From<Request> for FetchInput {
	fn from(value: Request) -> Self {
		Self::Request(value)
	}
}

/// Request options layered over the [`FetchInput`].
#[derive(Debug, Default)]
pub struct FetchInit {
	/// Method; defaults to the prepared request's method, else GET.
	pub method: Option<Method>,
	/// Headers set on the request, replacing same-named ones.
	pub headers: HeaderMap,
	/// Body, replacing the prepared request's body.
	pub body: Option<Body>,
}
impl FetchInit {
	/// Empty options.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the method.
	pub fn method(mut self, method: Method) -> Self {
		self.method = Some(method);

		self
	}

	/// Sets a header.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Sets a raw body.
	pub fn body(mut self, body: impl Into<Body>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Serializes `value` as the body. No content type is set here; the client adds the JSON
	/// default on matching non-GET requests.
	pub fn json<T>(mut self, value: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		self.body = Some(Body::from(serde_json::to_vec(value)?));

		Ok(self)
	}
}

/// HTTP client that attaches the current user's identity token to API calls.
#[derive(Clone)]
pub struct AuthorizedClient {
	http: ReqwestClient,
	base: Url,
	session: Arc<SessionContext>,
	policy: Arc<dyn AttachPolicy>,
}
impl AuthorizedClient {
	/// Creates a client resolving relative targets against `base` with the default policy.
	pub fn new(http: ReqwestClient, base: Url, session: Arc<SessionContext>) -> Self {
		Self { http, base, session, policy: Arc::new(ApiPathPolicy::default()) }
	}

	/// Replaces the attach policy.
	pub fn with_policy(mut self, policy: Arc<dyn AttachPolicy>) -> Self {
		self.policy = policy;

		self
	}

	/// Base URL relative targets resolve against.
	pub fn base_url(&self) -> &Url {
		&self.base
	}

	/// Sends `input` with `init` layered on top.
	pub async fn fetch(&self, input: impl Into<FetchInput>, init: FetchInit) -> Result<Response> {
		let request = self.prepare(input.into(), init).await?;

		self.http.execute(request).await.map_err(|e| TransportError::from(e).into())
	}

	/// GET `target`.
	pub async fn get(&self, target: &str) -> Result<Response> {
		self.fetch(target, FetchInit::new()).await
	}

	/// POST `value` as JSON to `target`.
	pub async fn post_json<T>(&self, target: &str, value: &T) -> Result<Response>
	where
		T: ?Sized + Serialize,
	{
		self.fetch(target, FetchInit::new().method(Method::POST).json(value)?).await
	}

	/// Builds the request `fetch` would send, without sending it.
	pub async fn prepare(&self, input: FetchInput, init: FetchInit) -> Result<Request> {
		let (mut request, judged) = match input {
			FetchInput::Target(target) => {
				let url = self.base.join(&target).map_err(|source| ConfigError::InvalidTarget {
					target: target.clone(),
					source,
				})?;
				// Protocol-relative targets can leave the base origin too.
				let judged = if is_absolute_http(&target) || url.origin() != self.base.origin() {
					self.same_origin_path(&url)
				} else {
					Some(target)
				};

				(Request::new(Method::GET, url), judged)
			},
			FetchInput::Request(request) => {
				let judged = self.same_origin_path(request.url());

				(request, judged)
			},
		};
		let FetchInit { method, headers, body } = init;

		if let Some(method) = method {
			*request.method_mut() = method;
		}
		for (name, value) in headers.iter() {
			request.headers_mut().insert(name.clone(), value.clone());
		}
		if let Some(body) = body {
			*request.body_mut() = Some(body);
		}

		if judged.is_some_and(|target| self.policy.should_attach(&target)) {
			self.attach(&mut request).await;
		}

		Ok(request)
	}

	fn same_origin_path(&self, url: &Url) -> Option<String> {
		if url.origin() != self.base.origin() {
			return None;
		}

		Some(match url.query() {
			Some(query) => format!("{}?{query}", url.path()),
			None => url.path().to_owned(),
		})
	}

	async fn attach(&self, request: &mut Request) {
		let user = match self.session.current_user() {
			Some(user) => Some(user),
			None => self.session.readiness().wait().await,
		};
		let authorization = match user {
			Some(_) => match self.bearer().await {
				Ok(value) => value,
				Err(e) => {
					tracing::debug!(error = %e, "Identity token unavailable; sending the request unchanged.");

					return;
				},
			},
			None => None,
		};

		if let Some(value) = authorization {
			request.headers_mut().insert(AUTHORIZATION, value);
		}
		if *request.method() != Method::GET && !request.headers().contains_key(CONTENT_TYPE) {
			request.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		}
	}

	async fn bearer(&self) -> Result<Option<HeaderValue>> {
		let Some(token) = self.session.id_token(false).await? else {
			return Ok(None);
		};
		let mut value = HeaderValue::from_str(&token.bearer()).map_err(ConfigError::from)?;

		value.set_sensitive(true);

		Ok(Some(value))
	}
}
impl Debug for AuthorizedClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizedClient")
			.field("base", &self.base.as_str())
			.field("session", &self.session)
			.finish_non_exhaustive()
	}
}

fn is_absolute_http(target: &str) -> bool {
	target.starts_with("http://") || target.starts_with("https://")
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn default_policy_matches_api_paths() {
		let policy = ApiPathPolicy::default();

		assert!(policy.should_attach("/v1/search?q=x"));
		assert!(policy.should_attach("api/v1/books"));
		assert!(!policy.should_attach("/web/search.html"));
		assert!(!policy.should_attach("https://other.example.com/v1/search"));
	}

	#[test]
	fn custom_prefix_is_respected() {
		let policy = ApiPathPolicy::new("/api/");

		assert!(policy.should_attach("/api/items"));
		assert!(!policy.should_attach("/v1/items"));
	}

	#[test]
	fn json_init_serializes_body() {
		let init = FetchInit::new()
			.method(Method::POST)
			.json(&serde_json::json!({ "q": "x" }))
			.expect("JSON body should serialize.");

		assert_eq!(init.method, Some(Method::POST));
		assert!(init.body.is_some());
		assert!(init.headers.is_empty());
	}
}
