//! Demonstrates the full page lifecycle against a mocked Firebase backend:
//!
//! 1. Bootstrap discovers the configuration and signs in a guest (`auto` mode).
//! 2. The login controller sees the guest it did not create and clears it.
//! 3. The guest button signs in again and the controller navigates to the `redirect` target.
//! 4. The authorized client calls a `/v1/` API with the guest's identity token.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use idp_session::{
	bootstrap::{BootstrapOptions, BootstrapStatus, Bootstrapper},
	config::{ConfigLoader, InlineConfig},
	firebase::{FirebaseEndpoints, FirebaseSdk},
	http::AuthorizedClient,
	login::{LoginController, LoginMessages, LoginView},
	provider::{LogNavigator, Navigator, ProviderSdk},
	reqwest::Client,
	store::{MemoryStore, SessionStore},
};

struct StdoutView;
impl LoginView for StdoutView {
	fn set_buttons_disabled(&self, disabled: bool) {
		println!("[view] buttons disabled: {disabled}");
	}

	fn show_status(&self, message: &str, is_error: bool) {
		println!("[view] {}{message}", if is_error { "error: " } else { "" });
	}
}

struct StdoutNavigator;
impl Navigator for StdoutNavigator {
	fn navigate(&self, target: &str) {
		println!("[navigator] -> {target}");
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let sign_up = server
		.mock_async(|when, then| {
			when.method(POST).path("/identitytoolkit.googleapis.com/v1/accounts:signUp");
			then.status(200).header("content-type", "application/json").body(
				"{\"localId\":\"guest-demo\",\"idToken\":\"demo-id-token\",\"refreshToken\":\"demo-refresh\",\"expiresIn\":\"3600\"}",
			);
		})
		.await;
	let api = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/search").header("authorization", "Bearer demo-id-token");
			then.status(200).header("content-type", "application/json").body("{\"items\":[]}");
		})
		.await;
	let base = Url::parse(&server.base_url())?;
	let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::default());
	let sdk: Arc<dyn ProviderSdk> = Arc::new(
		FirebaseSdk::new(store)?
			.with_http_client(Client::new())
			.with_endpoints(FirebaseEndpoints::emulator(&base)?),
	);
	let loader = ConfigLoader::new(Client::new())
		.with_base_url(base.clone())
		.with_inline(InlineConfig::new("{\"apiKey\":\"demo-key\",\"projectId\":\"demo\"}"));
	let bootstrapper = Bootstrapper::new(
		BootstrapOptions::new(sdk, loader)
			.with_mode_override("auto")
			.with_navigator(Arc::new(LogNavigator)),
	);
	let handle = bootstrapper.handle();

	if let BootstrapStatus::Failed(message) = bootstrapper.run().await {
		return Err(color_eyre::eyre::eyre!(message));
	}

	let page = base.join("/web/login.html?redirect=/web/search.html")?;
	let controller = LoginController::new(&page, Arc::new(StdoutView), Arc::new(StdoutNavigator))
		.with_messages(LoginMessages::english());
	let context = controller.boot(&handle).await?;

	// Bootstrap's guest was not created by this page, so it is cleared first.
	controller.handle_auth_state(context.current_user()).await;
	controller.click_guest().await;

	let client = AuthorizedClient::new(Client::new(), base, context.clone());
	let response = client.get("/v1/search?q=rust").await?;

	println!("[api] status {}", response.status());
	println!("[session] {:?}", context.current_user());

	sign_up.assert_hits_async(2).await;
	api.assert_async().await;

	Ok(())
}
