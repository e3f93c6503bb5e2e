//! Session-bound OAuth 2.0 PKCE broker and API proxy for Spotify web sessions.
//!
//! The crate brokers the Authorization-Code-with-PKCE handshake on behalf of browser
//! sessions, binds the resulting tokens to an opaque session identifier, and proxies a
//! small set of Spotify Web API calls with a transparent refresh-and-retry-once
//! protocol. All state lives in process; restarting the server invalidates every
//! session and pending authorization.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod client;
pub mod config;
pub mod error;
pub mod exchange;
pub mod flow;
pub mod obs;
pub mod pkce;
pub mod store;
pub mod token;
pub mod web;

mod _prelude {
	pub use std::{
		collections::HashMap,
		fmt::{Debug, Formatter, Result as FmtResult},
		future::Future,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::{Map as JsonMap, Value};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use url;
#[cfg(test)] use {httpmock as _, tower as _};
