//! Form-encoded grant calls against the provider's token endpoint.

// std
use std::time::Duration as StdDuration;
// crates.io
use reqwest::Client;
// self
use crate::{_prelude::*, token::TokenSet};

/// Fixed timeout applied to every outbound provider call.
pub(crate) const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(15);

/// Performs authorization-code and refresh-token grants.
///
/// Neither grant retries internally; the refresh-retry protocol in
/// [`crate::client`] owns the single retry the system ever performs.
#[derive(Clone, Debug)]
pub struct TokenExchangeClient {
	http: Client,
	token_url: Url,
	client_id: String,
	redirect_uri: String,
}
impl TokenExchangeClient {
	/// Creates an exchange client bound to one token endpoint and client identifier.
	pub fn new(
		http: Client,
		token_url: Url,
		client_id: impl Into<String>,
		redirect_uri: impl Into<String>,
	) -> Self {
		Self { http, token_url, client_id: client_id.into(), redirect_uri: redirect_uri.into() }
	}

	/// Exchanges an authorization code (plus PKCE verifier) for a token payload.
	///
	/// Transport failures, non-2xx statuses, and payloads without a usable access
	/// token all surface as the recoverable [`Error::InvalidGrant`] kind; callers
	/// translate it into a 400 at the callback boundary.
	pub async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<TokenSet> {
		let form = [
			("grant_type", "authorization_code"),
			("client_id", self.client_id.as_str()),
			("code", code),
			("redirect_uri", self.redirect_uri.as_str()),
			("code_verifier", code_verifier),
		];
		let response = self
			.http
			.post(self.token_url.clone())
			.form(&form)
			.timeout(REQUEST_TIMEOUT)
			.send()
			.await
			.map_err(|_| Error::InvalidGrant { reason: ENDPOINT_UNAVAILABLE.into() })?;
		let status = response.status();
		let body = response
			.bytes()
			.await
			.map_err(|_| Error::InvalidGrant { reason: ENDPOINT_UNAVAILABLE.into() })?;

		if !status.is_success() {
			tracing::warn!(status = status.as_u16(), "Authorization code exchange was rejected.");

			return Err(Error::InvalidGrant { reason: provider_reason(&body) });
		}

		let tokens = parse_token_set(&body)
			.map_err(|_| Error::InvalidGrant { reason: "malformed token response".into() })?;

		if !tokens.is_usable() {
			return Err(Error::InvalidGrant { reason: "access_token missing in response".into() });
		}

		Ok(tokens)
	}

	/// Requests a fresh access token for `refresh_token`.
	///
	/// Provider rejections of any HTTP error status, as well as payloads without a
	/// usable access token, are auth-class ([`Error::Unauthorized`]); timeouts and
	/// other transport failures are not, so the retry protocol will not discard the
	/// session over a flaky network.
	pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenSet> {
		let form = [
			("grant_type", "refresh_token"),
			("refresh_token", refresh_token),
			("client_id", self.client_id.as_str()),
		];
		let response = self
			.http
			.post(self.token_url.clone())
			.form(&form)
			.timeout(REQUEST_TIMEOUT)
			.send()
			.await
			.map_err(|_| Error::UpstreamUnavailable { message: ENDPOINT_UNAVAILABLE.into() })?;
		let status = response.status();
		let body = response
			.bytes()
			.await
			.map_err(|_| Error::UpstreamUnavailable { message: ENDPOINT_UNAVAILABLE.into() })?;

		if !status.is_success() {
			tracing::warn!(status = status.as_u16(), "Token refresh was rejected by the provider.");

			return Err(Error::Unauthorized);
		}

		let tokens = parse_token_set(&body).map_err(|_| Error::Unauthorized)?;

		if !tokens.is_usable() {
			return Err(Error::Unauthorized);
		}

		Ok(tokens)
	}
}

const ENDPOINT_UNAVAILABLE: &str = "Spotify token endpoint unavailable";

fn parse_token_set(body: &[u8]) -> Result<TokenSet, serde_path_to_error::Error<serde_json::Error>> {
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
}

/// Extracts a human-readable reason from an OAuth error body.
///
/// Only the standard `error`/`error_description` fields are surfaced; raw bodies are
/// never echoed back to callers.
fn provider_reason(body: &[u8]) -> String {
	#[derive(Deserialize)]
	struct ProviderError {
		error: Option<String>,
		error_description: Option<String>,
	}

	serde_json::from_slice::<ProviderError>(body)
		.ok()
		.and_then(|payload| payload.error_description.or(payload.error))
		.unwrap_or_else(|| "provider rejected the request".into())
}
