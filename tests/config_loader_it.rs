// crates.io
use httpmock::prelude::*;
use url::Url;
// self
use idp_session::config::{ConfigLoader, FALLBACK_CONFIG_PATH, InlineConfig, PRIMARY_CONFIG_PATH};

fn loader(server: &MockServer) -> ConfigLoader {
	ConfigLoader::new(reqwest::Client::new())
		.with_base_url(Url::parse(&server.base_url()).expect("Mock base URL should parse."))
}

#[tokio::test]
async fn inline_block_wins_without_fetching() {
	let server = MockServer::start_async().await;
	let primary = server
		.mock_async(|when, then| {
			when.method(GET).path(PRIMARY_CONFIG_PATH);
			then.status(200).json_body(serde_json::json!({ "apiKey": "from-primary" }));
		})
		.await;
	let config = loader(&server)
		.with_inline(InlineConfig::new(r#"{"apiKey":"from-inline"}"#))
		.load()
		.await
		.expect("Inline configuration should load.");

	assert_eq!(config.api_key(), Some("from-inline"));
	primary.assert_hits_async(0).await;
}

#[tokio::test]
async fn invalid_inline_falls_through_to_primary() {
	let server = MockServer::start_async().await;
	let primary = server
		.mock_async(|when, then| {
			when.method(GET).path(PRIMARY_CONFIG_PATH).header("cache-control", "no-store");
			then.status(200).json_body(serde_json::json!({ "apiKey": "from-primary" }));
		})
		.await;
	let config = loader(&server)
		.with_inline(InlineConfig::new("{ not json"))
		.load()
		.await
		.expect("Primary configuration should load.");

	assert_eq!(config.api_key(), Some("from-primary"));
	primary.assert_async().await;
}

#[tokio::test]
async fn failed_primary_falls_back() {
	let server = MockServer::start_async().await;
	let primary = server
		.mock_async(|when, then| {
			when.method(GET).path(PRIMARY_CONFIG_PATH);
			then.status(404);
		})
		.await;
	let fallback = server
		.mock_async(|when, then| {
			when.method(GET).path(FALLBACK_CONFIG_PATH);
			then.status(200).json_body(serde_json::json!({ "apiKey": "from-fallback" }));
		})
		.await;
	let config = loader(&server)
		.with_inline(InlineConfig::new("   "))
		.load()
		.await
		.expect("Fallback configuration should load.");

	assert_eq!(config.api_key(), Some("from-fallback"));
	primary.assert_async().await;
	fallback.assert_async().await;
}

#[tokio::test]
async fn every_source_failing_yields_none() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path(PRIMARY_CONFIG_PATH);
			then.status(200).body("[]");
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path(FALLBACK_CONFIG_PATH);
			then.status(500);
		})
		.await;

	assert!(loader(&server).load().await.is_none());
	assert!(ConfigLoader::new(reqwest::Client::new()).load().await.is_none());
}

#[tokio::test]
async fn file_locations_are_read_from_disk() {
	let dir = tempfile::tempdir().expect("Temporary directory should be created.");
	let path = dir.path().join("firebase-config.json");

	std::fs::write(&path, r#"{"apiKey":"from-file","projectId":"demo"}"#)
		.expect("Config file fixture should be written.");

	let config = ConfigLoader::new(reqwest::Client::new())
		.with_primary(dir.path().join("missing.json"))
		.with_fallback(path)
		.load()
		.await
		.expect("File configuration should load.");

	assert_eq!(config.project_id(), Some("demo"));
}
