//! Authenticated resource calls with the refresh-and-retry-once protocol.

// crates.io
use reqwest::{Client, RequestBuilder, StatusCode};
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	exchange::{REQUEST_TIMEOUT, TokenExchangeClient},
	store::SessionTokenStore,
	token::TokenSet,
};

/// Proxies Spotify Web API calls using session-bound tokens.
///
/// Every endpoint funnels through [`SpotifyClient::call_with_session`], which owns
/// the refresh-and-retry-once protocol; individual operations only describe the
/// request they make with a given access token.
pub struct SpotifyClient {
	http: Client,
	api_base: Url,
	exchange: TokenExchangeClient,
	sessions: Arc<SessionTokenStore>,
	refresh_guards: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}
impl SpotifyClient {
	/// Creates a resource client rooted at `api_base`.
	pub fn new(
		http: Client,
		api_base: Url,
		exchange: TokenExchangeClient,
		sessions: Arc<SessionTokenStore>,
	) -> Result<Self, ConfigError> {
		if api_base.cannot_be_a_base() {
			return Err(ConfigError::UnsupportedApiBase { url: api_base.to_string() });
		}

		Ok(Self {
			http,
			api_base,
			exchange,
			sessions,
			refresh_guards: Default::default(),
		})
	}

	/// Fetches the authenticated user's profile.
	pub async fn current_user(&self, session_id: &str) -> Result<Value> {
		let url = self.endpoint(&["me"]);

		self.call_with_session(session_id, move |access_token| {
			self.execute(self.http.get(url.clone()).bearer_auth(access_token))
		})
		.await
	}

	/// Lists the authenticated user's playlists.
	pub async fn my_playlists(&self, session_id: &str, limit: u32, offset: u32) -> Result<Value> {
		let url = self.endpoint(&["me", "playlists"]);

		self.call_with_session(session_id, move |access_token| {
			let request = self
				.http
				.get(url.clone())
				.query(&[("limit", limit.to_string()), ("offset", offset.to_string())])
				.bearer_auth(access_token);

			self.execute(request)
		})
		.await
	}

	/// Lists the items of one playlist.
	pub async fn playlist_items(
		&self,
		session_id: &str,
		playlist_id: &str,
		limit: u32,
		offset: u32,
	) -> Result<Value> {
		let url = self.endpoint(&["playlists", playlist_id, "tracks"]);

		self.call_with_session(session_id, move |access_token| {
			let request = self
				.http
				.get(url.clone())
				.query(&[("limit", limit.to_string()), ("offset", offset.to_string())])
				.bearer_auth(access_token);

			self.execute(request)
		})
		.await
	}

	/// Creates a playlist for the authenticated user.
	pub async fn create_playlist(
		&self,
		session_id: &str,
		name: &str,
		description: Option<&str>,
		public: bool,
	) -> Result<Value> {
		let url = self.endpoint(&["me", "playlists"]);
		let mut body = JsonMap::new();

		body.insert("name".into(), Value::String(name.to_owned()));
		body.insert("public".into(), Value::Bool(public));

		if let Some(description) = description {
			body.insert("description".into(), Value::String(description.to_owned()));
		}

		let body = Value::Object(body);

		self.call_with_session(session_id, move |access_token| {
			self.execute(self.http.post(url.clone()).json(&body).bearer_auth(access_token))
		})
		.await
	}

	/// Runs `operation` with the session's access token, refreshing and retrying
	/// exactly once on an auth-class failure.
	///
	/// 1. Missing session or unusable token fails [`Error::Unauthorized`] with no call.
	/// 2. Non-auth failures propagate unchanged without any retry.
	/// 3. An auth-class failure triggers one refresh (under the per-session guard) and
	///    one retry; a second auth-class failure clears the session's tokens.
	pub async fn call_with_session<T, F, Fut>(&self, session_id: &str, operation: F) -> Result<T>
	where
		F: Fn(String) -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		let tokens = self.sessions.get(session_id).ok_or(Error::Unauthorized)?;
		let err = match operation(tokens.access_token.clone()).await {
			Ok(value) => return Ok(value),
			Err(err) => err,
		};

		if !err.is_auth() {
			return Err(err);
		}

		let refreshed = self.refresh_session(session_id).await?;

		match operation(refreshed.access_token).await {
			Ok(value) => Ok(value),
			Err(err) if err.is_auth() => {
				tracing::info!("Retried call still unauthorized; clearing session tokens.");
				self.sessions.clear(session_id);

				Err(Error::Unauthorized)
			},
			Err(err) => Err(err),
		}
	}

	/// Refreshes the session's tokens and merges the response into the stored record.
	///
	/// The whole read-modify-write runs under a per-session guard so two requests
	/// racing a refresh cannot lose each other's updates. Every refresh failure is
	/// surfaced as [`Error::Unauthorized`]; the stored record is discarded only when
	/// the provider actually rejected the credential.
	async fn refresh_session(&self, session_id: &str) -> Result<TokenSet> {
		let guard = self.refresh_guard(session_id);
		let _refresh_lock = guard.lock().await;
		let mut current = self.sessions.get(session_id).ok_or(Error::Unauthorized)?;
		let Some(refresh_token) = current.refresh_token.clone().filter(|token| !token.is_empty())
		else {
			self.sessions.clear(session_id);

			return Err(Error::Unauthorized);
		};

		tracing::debug!("Access token rejected; attempting refresh.");

		let newer = match self.exchange.refresh_access_token(&refresh_token).await {
			Ok(newer) => newer,
			Err(err) => {
				if err.is_auth() {
					tracing::info!("Refresh rejected; clearing session tokens.");
					self.sessions.clear(session_id);
				}

				return Err(Error::Unauthorized);
			},
		};

		current.merge_refreshed(newer);
		self.sessions.store(session_id, current.clone());

		Ok(current)
	}

	/// Returns (and creates on demand) the refresh guard for a session.
	fn refresh_guard(&self, session_id: &str) -> Arc<AsyncMutex<()>> {
		let mut guards = self.refresh_guards.lock();

		guards.entry(session_id.to_owned()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}

	// The constructor rejects bases that cannot carry segments, so the fallible
	// branch is unreachable here.
	fn endpoint(&self, segments: &[&str]) -> Url {
		let mut url = self.api_base.clone();

		if let Ok(mut parts) = url.path_segments_mut() {
			parts.pop_if_empty();
			parts.extend(segments.iter().copied());
		}

		url
	}

	async fn execute(&self, request: RequestBuilder) -> Result<Value> {
		let response = request
			.timeout(REQUEST_TIMEOUT)
			.send()
			.await
			.map_err(|_| Error::UpstreamUnavailable { message: API_UNAVAILABLE.into() })?;
		let status = response.status();
		let body = response
			.bytes()
			.await
			.map_err(|_| Error::UpstreamUnavailable { message: API_UNAVAILABLE.into() })?;

		if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
			return Err(Error::Unauthorized);
		}
		if status.is_client_error() {
			return Err(Error::UpstreamRejected {
				status: status.as_u16(),
				message: api_message(&body),
			});
		}
		if !status.is_success() {
			return Err(Error::UpstreamUnavailable { message: API_FAILED.into() });
		}

		serde_json::from_slice(&body)
			.map_err(|_| Error::UpstreamUnavailable { message: API_FAILED.into() })
	}
}
impl Debug for SpotifyClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SpotifyClient").field("api_base", &self.api_base.as_str()).finish()
	}
}

const API_UNAVAILABLE: &str = "Spotify API unavailable";
const API_FAILED: &str = "Spotify API request failed";

/// Extracts Spotify's `error.message` field when the body carries one.
fn api_message(body: &[u8]) -> String {
	serde_json::from_slice::<Value>(body)
		.ok()
		.and_then(|payload| {
			payload.get("error")?.get("message")?.as_str().map(str::to_owned)
		})
		.unwrap_or_else(|| API_FAILED.into())
}
