//! Identity-provider session bootstrap for Rust clients: configuration discovery, anonymous or
//! federated sign-in, a single-resolution readiness signal, and an HTTP client that attaches
//! bearer identity tokens to same-origin API calls.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod firebase;
pub mod http;
pub mod login;
pub mod mode;
pub mod obs;
pub mod provider;
pub mod session;
pub mod state;
pub mod store;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
