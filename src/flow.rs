//! Login, callback, and logout orchestration for the PKCE handshake.
//!
//! A login attempt moves through `STARTED → REDIRECTED_TO_PROVIDER →
//! CALLBACK_RECEIVED → {EXCHANGED | REJECTED | EXPIRED}`; the pending-authorization
//! store carries the handshake state between the two requests, keyed by the OAuth
//! `state` value so each callback can be consumed at most once.

// self
use crate::{
	_prelude::*,
	config::Settings,
	error::ConfigError,
	exchange::TokenExchangeClient,
	pkce,
	store::{PendingAuthStore, SessionTokenStore},
};

/// Redirect and transport bindings produced by a successful login initiation.
#[derive(Clone, Debug)]
pub struct LoginStart {
	/// Fully-formed provider authorize URL the caller should redirect to.
	pub authorize_url: Url,
	/// Session identifier to bind persistently in the transport.
	pub session_id: String,
	/// State value to bind short-lived (≤ the pending-authorization TTL).
	pub state: String,
}

/// Raw callback inputs as seen by the transport collaborator.
#[derive(Clone, Debug, Default)]
pub struct CallbackRequest {
	/// `code` query parameter, when present.
	pub code: Option<String>,
	/// `state` query parameter, when present.
	pub state: Option<String>,
	/// `error` query parameter, when the provider reported a failure.
	pub error: Option<String>,
	/// State value bound in the transport during login, when still present.
	pub tracked_state: Option<String>,
	/// Session identifier carried by the transport, when present.
	pub session_id: Option<String>,
}

/// Result of a handled callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackOutcome {
	/// Foreign or stale redirect; forward the raw query to the front end unmodified.
	Forward(String),
	/// Tokens were exchanged and persisted for the session.
	Completed {
		/// Session the tokens are now bound to.
		session_id: String,
	},
}

/// Orchestrates the OAuth flow using the PKCE generator, the two stores, and the
/// token exchange client.
#[derive(Debug)]
pub struct OAuthBroker {
	client_id: String,
	redirect_uri: String,
	scopes: String,
	authorize_url: Url,
	exchange: TokenExchangeClient,
	pending: Arc<PendingAuthStore>,
	sessions: Arc<SessionTokenStore>,
}
impl OAuthBroker {
	/// Creates a broker from resolved settings, validating the authorize URL eagerly.
	pub fn new(
		settings: &Settings,
		exchange: TokenExchangeClient,
		pending: Arc<PendingAuthStore>,
		sessions: Arc<SessionTokenStore>,
	) -> Result<Self, ConfigError> {
		let authorize_url = Url::parse(&settings.authorize_url)
			.map_err(|source| ConfigError::InvalidEndpoint { endpoint: "authorize", source })?;

		Ok(Self {
			client_id: settings.client_id.clone(),
			redirect_uri: settings.redirect_uri.clone(),
			scopes: settings.scopes.clone(),
			authorize_url,
			exchange,
			pending,
			sessions,
		})
	}

	/// Initiates a login attempt.
	///
	/// Reuses the transport's session identifier when one exists, mints one
	/// otherwise, and records the pending authorization keyed by a fresh `state`.
	pub fn login(&self, existing_session_id: Option<&str>) -> Result<LoginStart> {
		if self.client_id.is_empty() {
			return Err(ConfigError::MissingClientId.into());
		}

		let session_id = existing_session_id
			.filter(|id| !id.is_empty())
			.map(str::to_owned)
			.unwrap_or_else(pkce::generate_session_id);
		let state = pkce::generate_state();
		let verifier = pkce::generate_code_verifier();
		let challenge = pkce::generate_code_challenge(&verifier);

		self.pending.store(&state, &session_id, &verifier);
		tracing::debug!("Login started; redirecting to the provider.");

		Ok(LoginStart {
			authorize_url: self.build_authorize_url(&state, &challenge),
			session_id,
			state,
		})
	}

	/// Validates a provider callback and exchanges the authorization code.
	///
	/// Redirects that cannot be tied to a locally-tracked login attempt (no tracked
	/// state, state mismatch, or already-consumed state) are forwarded to the front
	/// end untouched rather than rejected; a mismatch is indistinguishable from a
	/// legitimate stale-cookie cross-tab scenario.
	pub async fn callback(&self, request: CallbackRequest) -> Result<CallbackOutcome> {
		let CallbackRequest { code, state, error, tracked_state, session_id } = request;
		let Some(tracked_state) = tracked_state.filter(|value| !value.is_empty()) else {
			return forward_to_frontend(code.as_deref(), state.as_deref(), error.as_deref());
		};

		if let Some(error) = error.as_deref().filter(|value| !value.is_empty()) {
			return Err(Error::validation(format!("Spotify authorization failed: {error}")));
		}

		let Some(code) = code.filter(|value| !value.is_empty()) else {
			return Err(Error::validation("Missing authorization code"));
		};
		let Some(state) = state.filter(|value| !value.is_empty()) else {
			return Err(Error::validation("Missing OAuth state"));
		};

		if tracked_state != state {
			tracing::debug!("Callback state does not match the tracked binding; forwarding.");

			return forward_to_frontend(Some(&code), Some(&state), error.as_deref());
		}

		let Some(pending) = self.pending.pop(&state) else {
			tracing::debug!("No pending authorization for the callback state; forwarding.");

			return forward_to_frontend(Some(&code), Some(&state), error.as_deref());
		};

		if pending.is_expired() {
			return Err(Error::StateExpired);
		}

		let session_id = session_id
			.filter(|id| !id.is_empty() && *id == pending.session_id)
			.ok_or_else(|| Error::validation("Invalid OAuth session"))?;
		let tokens = self.exchange.exchange_code(&code, &pending.code_verifier).await?;

		self.sessions.store(&session_id, tokens);
		tracing::info!("Authorization code exchanged; tokens bound to session.");

		Ok(CallbackOutcome::Completed { session_id })
	}

	/// Clears the session's token record; always succeeds.
	pub fn logout(&self, session_id: Option<&str>) {
		if let Some(session_id) = session_id.filter(|id| !id.is_empty()) {
			self.sessions.clear(session_id);
			tracing::debug!("Session tokens cleared on logout.");
		}
	}

	fn build_authorize_url(&self, state: &str, code_challenge: &str) -> Url {
		let mut url = self.authorize_url.clone();
		let mut pairs = url.query_pairs_mut();

		pairs.append_pair("response_type", "code");
		pairs.append_pair("client_id", &self.client_id);
		pairs.append_pair("redirect_uri", &self.redirect_uri);
		pairs.append_pair("scope", &self.scopes);
		pairs.append_pair("state", state);
		pairs.append_pair("code_challenge_method", "S256");
		pairs.append_pair("code_challenge", code_challenge);

		drop(pairs);

		url
	}
}

fn forward_to_frontend(
	code: Option<&str>,
	state: Option<&str>,
	error: Option<&str>,
) -> Result<CallbackOutcome> {
	let mut query = url::form_urlencoded::Serializer::new(String::new());
	let mut any = false;

	for (key, value) in [("code", code), ("state", state), ("error", error)] {
		if let Some(value) = value.filter(|value| !value.is_empty()) {
			query.append_pair(key, value);

			any = true;
		}
	}

	if !any {
		return Err(Error::validation("Missing authorization code"));
	}

	Ok(CallbackOutcome::Forward(query.finish()))
}
