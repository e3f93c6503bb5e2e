//! Error taxonomy shared across the flow controller, exchange client, and proxy.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical error exposed by the broker's public operations.
///
/// The enum doubles as the classification the refresh-retry protocol branches on:
/// [`Error::Unauthorized`] is the auth-class marker, everything else propagates
/// unchanged. [`Error::Unauthorized`] deliberately carries no cause so callers cannot
/// distinguish "never logged in" from "refresh failed".
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem; fatal for the affected operation.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Bad or missing request parameters, rejected before touching the provider.
	#[error("{message}")]
	Validation {
		/// Human-readable rejection reason.
		message: String,
	},
	/// The pending authorization outlived its TTL.
	#[error("OAuth state expired")]
	StateExpired,
	/// No usable session or token; also raised when a refresh attempt fails.
	#[error("Not authorized")]
	Unauthorized,
	/// The provider rejected the authorization-code exchange.
	#[error("Token exchange failed: {reason}")]
	InvalidGrant {
		/// Sanitized provider-supplied reason.
		reason: String,
	},
	/// The provider returned a non-auth 4xx for a resource call.
	#[error("{message}")]
	UpstreamRejected {
		/// HTTP status reported by the provider, passed through to the caller.
		status: u16,
		/// Sanitized provider-supplied message.
		message: String,
	},
	/// Network failure, timeout, 5xx, or malformed JSON from the provider.
	#[error("{message}")]
	UpstreamUnavailable {
		/// Human-readable failure summary.
		message: String,
	},
}
impl Error {
	/// Creates a [`Error::Validation`] from any displayable message.
	pub fn validation(message: impl Into<String>) -> Self {
		Self::Validation { message: message.into() }
	}

	/// Returns `true` when the error indicates the credential itself is invalid.
	///
	/// The refresh-retry protocol consults this to decide whether a refresh attempt
	/// is worthwhile; every other classification propagates without retry.
	pub fn is_auth(&self) -> bool {
		matches!(self, Self::Unauthorized)
	}

	/// HTTP status the transport layer should answer with.
	pub fn http_status(&self) -> u16 {
		match self {
			Self::Config(_) => 500,
			Self::Validation { .. } | Self::StateExpired | Self::InvalidGrant { .. } => 400,
			Self::Unauthorized => 401,
			Self::UpstreamRejected { status, .. } => *status,
			Self::UpstreamUnavailable { .. } => 502,
		}
	}
}

/// Configuration failures raised while constructing or using broker components.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// No OAuth client identifier is configured.
	#[error("CLIENT_ID is not configured")]
	MissingClientId,
	/// A configured endpoint URL cannot be parsed.
	#[error("Configured {endpoint} URL is invalid.")]
	InvalidEndpoint {
		/// Which endpoint setting failed to parse.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// API base URL cannot carry extra path segments.
	#[error("API base URL `{url}` cannot be extended with path segments.")]
	UnsupportedApiBase {
		/// The offending base URL.
		url: String,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: reqwest::Error,
	},
	/// Listener or runtime IO failure during startup.
	#[error("I/O error occurred during startup.")]
	Io(#[from] std::io::Error),
}
