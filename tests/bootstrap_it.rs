mod support;

// std
use std::sync::Arc;
// crates.io
use url::Url;
// self
use idp_session::{
	auth::{AuthError, AuthErrorCode},
	bootstrap::{
		BootstrapMessages, BootstrapOptions, BootstrapStage, BootstrapStatus, Bootstrapper,
	},
	config::{ConfigLoader, InlineConfig},
	mode::AuthMode,
	provider::{Navigator, ProviderSdk},
};
use support::{FakeClient, FakeSdk, RecordingNavigator};

const INLINE: &str = r#"{"apiKey":"test-key","projectId":"demo"}"#;

fn loader(inline: InlineConfig) -> ConfigLoader {
	ConfigLoader::new(reqwest::Client::new()).with_inline(inline)
}

fn options(sdk: Arc<FakeSdk>, inline: InlineConfig) -> (BootstrapOptions, Arc<RecordingNavigator>) {
	let navigator = Arc::new(RecordingNavigator::default());
	let options = BootstrapOptions::new(sdk as Arc<dyn ProviderSdk>, loader(inline))
		.without_mode_override()
		.with_navigator(navigator.clone() as Arc<dyn Navigator>);

	(options, navigator)
}

#[tokio::test]
async fn auto_bootstrap_signs_in_a_guest_and_resolves_readiness_once() {
	let client = FakeClient::signed_out();
	let sdk = FakeSdk::new(client.clone());
	let (options, _) = options(sdk.clone(), InlineConfig::new(INLINE));
	let bootstrapper = Bootstrapper::new(options);
	let handle = bootstrapper.handle();

	assert!(matches!(handle.status(), BootstrapStatus::Pending));

	let status = bootstrapper.run().await;
	let context = match status {
		BootstrapStatus::Ready(context) => context,
		other => panic!("Bootstrap should succeed, got {other:?}."),
	};

	assert_eq!(bootstrapper.stage(), BootstrapStage::Ready);
	assert_eq!(context.mode(), AuthMode::Auto);
	assert_eq!(context.config().project_id(), Some("demo"));

	let ready_user = context.readiness().wait().await.expect("Readiness should carry the guest.");

	assert!(ready_user.is_anonymous);
	assert!(!context.readiness().resolve(None), "Readiness must resolve exactly once.");
	assert_eq!(context.readiness().wait().await, Some(ready_user));

	// A second run replays the outcome.
	assert!(matches!(bootstrapper.run().await, BootstrapStatus::Ready(_)));
	assert_eq!(FakeClient::count(&sdk.init_calls), 1);
	assert_eq!(FakeClient::count(&client.anonymous_calls), 1);
	assert!(handle.ready().await.is_some());
}

#[tokio::test]
async fn inline_mode_attribute_selects_manual() {
	let client = FakeClient::signed_out();
	let (options, navigator) =
		options(FakeSdk::new(client.clone()), InlineConfig::new(INLINE).with_auth_mode("manual"));
	let bootstrapper = Bootstrapper::new(options);
	let context = match bootstrapper.run().await {
		BootstrapStatus::Ready(context) => context,
		other => panic!("Bootstrap should succeed, got {other:?}."),
	};

	assert_eq!(context.mode(), AuthMode::Manual);
	assert_eq!(context.readiness().peek(), Some(None));
	assert_eq!(FakeClient::count(&client.anonymous_calls), 0);
	assert!(navigator.targets().is_empty());
}

#[tokio::test]
async fn mode_override_wins_over_attribute() {
	let client = FakeClient::signed_out();
	let (options, navigator) =
		options(FakeSdk::new(client.clone()), InlineConfig::new(INLINE).with_auth_mode("manual"));
	let bootstrapper = Bootstrapper::new(options.with_mode_override("google"));
	let handle = bootstrapper.handle();

	bootstrapper.run().await;

	let context = handle.context().expect("Bootstrap should publish a context.");

	assert_eq!(context.mode(), AuthMode::Google);
	assert_eq!(navigator.targets(), [support::AUTHORIZE_URL]);
	assert_eq!(context.readiness().peek(), Some(None));
}

#[tokio::test]
async fn redirect_callback_is_completed_before_sign_in() {
	let client = FakeClient::signed_out();
	let (options, navigator) = options(FakeSdk::new(client.clone()), InlineConfig::new(INLINE));
	let page = Url::parse("https://app.example.com/web/login.html?state=fake-state&code=abc")
		.expect("Callback URL fixture should parse.");
	let bootstrapper = Bootstrapper::new(options.with_page_url(page));
	let context = match bootstrapper.run().await {
		BootstrapStatus::Ready(context) => context,
		other => panic!("Bootstrap should succeed, got {other:?}."),
	};

	assert_eq!(FakeClient::count(&client.complete_calls), 1);
	assert_eq!(FakeClient::count(&client.anonymous_calls), 0);
	assert_eq!(context.readiness().wait().await, Some(support::federated("redirect-user")));
	assert!(navigator.targets().is_empty());
}

#[tokio::test]
async fn existing_default_app_is_reused() {
	let client = FakeClient::with_user(support::guest("kept"));
	let sdk = FakeSdk::already_initialized(client.clone());
	let (options, _) = options(sdk.clone(), InlineConfig::new(INLINE));
	let bootstrapper = Bootstrapper::new(options);

	bootstrapper.run().await;

	assert_eq!(FakeClient::count(&sdk.init_calls), 0);
	assert_eq!(FakeClient::count(&client.anonymous_calls), 0);
}

#[tokio::test]
async fn missing_configuration_publishes_the_localized_failure() {
	let client = FakeClient::signed_out();
	let sdk = FakeSdk::new(client);
	let (options, _) = options(sdk.clone(), InlineConfig::new("{ broken"));
	let bootstrapper = Bootstrapper::new(options.with_messages(BootstrapMessages::english()));
	let handle = bootstrapper.handle();
	let status = bootstrapper.run().await;

	assert!(matches!(status, BootstrapStatus::Failed(ref message) if message == "The Firebase configuration was not found."));
	assert_eq!(handle.init_error().as_deref(), Some("The Firebase configuration was not found."));
	assert_eq!(bootstrapper.stage(), BootstrapStage::Failed);
	assert_eq!(FakeClient::count(&sdk.init_calls), 0);
}

#[tokio::test]
async fn initialization_failure_carries_the_provider_message() {
	let sdk = FakeSdk::failing(
		FakeClient::signed_out(),
		AuthError::new(AuthErrorCode::InvalidApiKey, "API key not valid"),
	);
	let (options, _) = options(sdk, InlineConfig::new(INLINE));
	let bootstrapper = Bootstrapper::new(options.with_messages(BootstrapMessages::english()));
	let handle = bootstrapper.handle();

	bootstrapper.run().await;

	assert_eq!(
		handle.init_error().as_deref(),
		Some("Firebase initialization failed: API key not valid")
	);
	assert!(handle.ready().await.is_none());
}
