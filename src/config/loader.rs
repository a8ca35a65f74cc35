//! Ordered configuration discovery: inline text, primary location, fallback location.

// std
use std::path::PathBuf;
// crates.io
use reqwest::{
	StatusCode,
	header::{CACHE_CONTROL, HeaderValue},
};
// self
use crate::{_prelude::*, config::ProviderConfig, error::ConfigError};

/// Site-relative path tried after the inline block.
pub const PRIMARY_CONFIG_PATH: &str = "/web/firebase-config.json";
/// Site-relative path tried last.
pub const FALLBACK_CONFIG_PATH: &str = "/firebase-config.json";

/// Configuration embedded next to the page (or binary) that hosts the client.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InlineConfig {
	/// JSON text of the configuration object, possibly blank.
	pub text: String,
	/// Mode attribute carried next to the inline block.
	pub auth_mode: Option<String>,
}
impl InlineConfig {
	/// Creates an inline block from raw JSON text.
	pub fn new(text: impl Into<String>) -> Self {
		Self { text: text.into(), auth_mode: None }
	}

	/// Attaches the mode attribute.
	pub fn with_auth_mode(mut self, mode: impl Into<String>) -> Self {
		self.auth_mode = Some(mode.into());

		self
	}
}

/// Where a non-inline configuration document lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigLocation {
	/// Absolute URL fetched over HTTP.
	Url(Url),
	/// Local file read from disk.
	File(PathBuf),
	/// Path resolved against the loader's site base URL.
	SitePath(String),
}
impl From<Url> for ConfigLocation {
	fn from(value: Url) -> Self {
		Self::Url(value)
	}
}
impl From<PathBuf> for ConfigLocation {
	fn from(value: PathBuf) -> Self {
		Self::File(value)
	}
}
impl From<&str> for ConfigLocation {
	fn from(value: &str) -> Self {
		Self::SitePath(value.to_owned())
	}
}

/// Why one configuration source was skipped.
#[derive(Debug, ThisError)]
pub enum ConfigSourceError {
	/// A site path was configured but the loader has no base URL.
	#[error("No site base URL is configured.")]
	NoBaseUrl,
	/// The site path cannot be joined onto the base URL.
	#[error("Site path `{path}` is not a valid URL reference.")]
	InvalidPath {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The HTTP request failed before a response arrived.
	#[error("Configuration request failed.")]
	Request(#[from] ReqwestError),
	/// The server answered with a non-success status.
	#[error("Configuration request returned status {0}.")]
	Status(StatusCode),
	/// The local file could not be read.
	#[error("Configuration file could not be read.")]
	Io(#[from] std::io::Error),
	/// The document is not a JSON object.
	#[error(transparent)]
	Invalid(#[from] ConfigError),
}

/// Resolves a [`ProviderConfig`] from up to three sources; the first well-formed object wins.
#[derive(Clone, Debug)]
pub struct ConfigLoader {
	http: ReqwestClient,
	base: Option<Url>,
	inline: Option<InlineConfig>,
	primary: ConfigLocation,
	fallback: ConfigLocation,
}
impl ConfigLoader {
	/// Creates a loader using the default site paths.
	pub fn new(http: ReqwestClient) -> Self {
		Self {
			http,
			base: None,
			inline: None,
			primary: ConfigLocation::SitePath(PRIMARY_CONFIG_PATH.into()),
			fallback: ConfigLocation::SitePath(FALLBACK_CONFIG_PATH.into()),
		}
	}

	/// Sets the site base URL that [`ConfigLocation::SitePath`] entries resolve against.
	pub fn with_base_url(mut self, base: Url) -> Self {
		self.base = Some(base);

		self
	}

	/// Sets the inline configuration block.
	pub fn with_inline(mut self, inline: InlineConfig) -> Self {
		self.inline = Some(inline);

		self
	}

	/// Overrides the primary location.
	pub fn with_primary(mut self, location: impl Into<ConfigLocation>) -> Self {
		self.primary = location.into();

		self
	}

	/// Overrides the fallback location.
	pub fn with_fallback(mut self, location: impl Into<ConfigLocation>) -> Self {
		self.fallback = location.into();

		self
	}

	/// Inline block, if one was supplied.
	pub fn inline(&self) -> Option<&InlineConfig> {
		self.inline.as_ref()
	}

	/// Site base URL, if one was supplied.
	pub fn base_url(&self) -> Option<&Url> {
		self.base.as_ref()
	}

	/// Tries every source in order and returns the first usable configuration.
	///
	/// Every failure is logged at debug level and skipped; `None` means all sources failed.
	pub async fn load(&self) -> Option<ProviderConfig> {
		if let Some(config) = self.inline.as_ref().and_then(Self::parse_inline) {
			tracing::debug!(source = "inline", "Loaded provider configuration.");

			return Some(config);
		}

		for (label, location) in [("primary", &self.primary), ("fallback", &self.fallback)] {
			match self.read_location(location).await {
				Ok(config) => {
					tracing::debug!(source = label, ?location, "Loaded provider configuration.");

					return Some(config);
				},
				Err(reason) => tracing::debug!(
					source = label,
					?location,
					%reason,
					"Provider configuration source skipped."
				),
			}
		}

		tracing::debug!("No provider configuration source succeeded.");

		None
	}

	fn parse_inline(inline: &InlineConfig) -> Option<ProviderConfig> {
		let text = inline.text.trim();

		if text.is_empty() {
			return None;
		}

		match ProviderConfig::from_json(text) {
			Ok(config) => Some(config),
			Err(e) => {
				tracing::debug!(error = %e, "Inline provider configuration is not usable.");

				None
			},
		}
	}

	async fn read_location(
		&self,
		location: &ConfigLocation,
	) -> Result<ProviderConfig, ConfigSourceError> {
		let text = match location {
			ConfigLocation::Url(url) => self.fetch_text(url.clone()).await?,
			ConfigLocation::SitePath(path) => {
				let base = self.base.as_ref().ok_or(ConfigSourceError::NoBaseUrl)?;
				let url = base.join(path).map_err(|source| ConfigSourceError::InvalidPath {
					path: path.clone(),
					source,
				})?;

				self.fetch_text(url).await?
			},
			ConfigLocation::File(path) => tokio::fs::read_to_string(path).await?,
		};

		Ok(ProviderConfig::from_json(&text)?)
	}

	async fn fetch_text(&self, url: Url) -> Result<String, ConfigSourceError> {
		let response = self
			.http
			.get(url)
			.header(CACHE_CONTROL, HeaderValue::from_static("no-store"))
			.send()
			.await?;
		let status = response.status();

		if !status.is_success() {
			return Err(ConfigSourceError::Status(status));
		}

		Ok(response.text().await?)
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::io::Write;
	// self
	use super::*;

	#[tokio::test]
	async fn inline_block_wins_without_touching_other_sources() {
		let loader = ConfigLoader::new(ReqwestClient::new())
			.with_inline(InlineConfig::new(r#"{"apiKey":"inline"}"#))
			.with_primary(ConfigLocation::File(PathBuf::from("/definitely/missing.json")));
		let config = loader.load().await.expect("Inline configuration should load.");

		assert_eq!(config.api_key(), Some("inline"));
	}

	#[tokio::test]
	async fn invalid_inline_falls_through_to_file() {
		let mut file = tempfile::NamedTempFile::new().expect("Temp file should be created.");

		write!(file, r#"{{"apiKey":"from-file"}}"#).expect("Temp file should be writable.");

		let loader = ConfigLoader::new(ReqwestClient::new())
			.with_inline(InlineConfig::new("{ not json"))
			.with_primary(file.path().to_path_buf());
		let config = loader.load().await.expect("File configuration should load.");

		assert_eq!(config.api_key(), Some("from-file"));
	}

	#[tokio::test]
	async fn site_paths_without_base_are_skipped() {
		let loader = ConfigLoader::new(ReqwestClient::new()).with_inline(InlineConfig::new("  "));

		assert!(matches!(
			loader.read_location(&ConfigLocation::from(PRIMARY_CONFIG_PATH)).await,
			Err(ConfigSourceError::NoBaseUrl)
		));
		assert!(loader.load().await.is_none());
	}

	#[tokio::test]
	async fn non_object_files_report_the_config_error() {
		let mut file = tempfile::NamedTempFile::new().expect("Temp file should be created.");

		write!(file, "[1, 2]").expect("Temp file should be writable.");

		let loader = ConfigLoader::new(ReqwestClient::new());
		let err = loader
			.read_location(&ConfigLocation::File(file.path().to_path_buf()))
			.await
			.expect_err("An array is not a configuration object.");

		assert!(matches!(err, ConfigSourceError::Invalid(ConfigError::NotAnObject)));
		assert!(matches!(
			loader.read_location(&ConfigLocation::File(PathBuf::from("/definitely/missing.json"))).await,
			Err(ConfigSourceError::Io(_))
		));
	}
}
