//! HTTP transport collaborator: routes, cookie bindings, and error translation.
//!
//! This layer carries no flow logic of its own. It maps paths to core operations,
//! validates request inputs before they reach the core, and translates the error
//! taxonomy into HTTP statuses with FastAPI-style `{"detail": …}` bodies.

// crates.io
use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::{StatusCode, header::LOCATION},
	response::{IntoResponse, Response},
	routing::get,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tower_http::trace::TraceLayer;
// self
use crate::{
	_prelude::*,
	client::SpotifyClient,
	config::Settings,
	error::ConfigError,
	exchange::TokenExchangeClient,
	flow::{CallbackOutcome, CallbackRequest, OAuthBroker},
	store::{PendingAuthStore, SessionTokenStore},
};

/// Name of the persistent session cookie.
pub const SESSION_COOKIE: &str = "spotify_session_id";
/// Name of the short-lived state cookie set during login.
pub const STATE_COOKIE: &str = "spotify_oauth_state";

// Matches the pending-authorization TTL.
const STATE_COOKIE_MAX_AGE: Duration = Duration::seconds(600);

/// Shared handler state constructed once at process start.
#[derive(Clone)]
pub struct AppState {
	/// Flow controller for login, callback, and logout.
	pub broker: Arc<OAuthBroker>,
	/// Resource client for proxied API calls.
	pub spotify: Arc<SpotifyClient>,
	/// Session token store, shared with both components above.
	pub sessions: Arc<SessionTokenStore>,
}
impl AppState {
	/// Bundles prebuilt components into handler state.
	pub fn new(
		broker: Arc<OAuthBroker>,
		spotify: Arc<SpotifyClient>,
		sessions: Arc<SessionTokenStore>,
	) -> Self {
		Self { broker, spotify, sessions }
	}

	/// Builds the full component graph from resolved settings.
	pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
		let http = reqwest::Client::builder()
			.build()
			.map_err(|source| ConfigError::HttpClientBuild { source })?;
		let token_url = Url::parse(&settings.token_url)
			.map_err(|source| ConfigError::InvalidEndpoint { endpoint: "token", source })?;
		let api_base = Url::parse(&settings.api_base)
			.map_err(|source| ConfigError::InvalidEndpoint { endpoint: "API base", source })?;
		let exchange = TokenExchangeClient::new(
			http.clone(),
			token_url,
			settings.client_id.clone(),
			settings.redirect_uri.clone(),
		);
		let pending = Arc::new(PendingAuthStore::default());
		let sessions = Arc::new(SessionTokenStore::default());
		let broker =
			OAuthBroker::new(settings, exchange.clone(), pending, sessions.clone())?;
		let spotify = SpotifyClient::new(http, api_base, exchange, sessions.clone())?;

		Ok(Self::new(Arc::new(broker), Arc::new(spotify), sessions))
	}
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/auth/spotify/login", get(login))
		.route("/auth/spotify/callback", get(callback))
		.route("/auth/logout", get(logout))
		.route("/api/me", get(me))
		.route("/api/me/playlists", get(my_playlists).post(create_playlist))
		.route("/api/me/playlists/{playlist_id}/items", get(playlist_items))
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}

/// Binds the listener and serves the router until the task is cancelled.
pub async fn serve(settings: Settings) -> Result<()> {
	let state = AppState::from_settings(&settings)?;
	let app = router(state);
	let listener =
		tokio::net::TcpListener::bind(&settings.bind_addr).await.map_err(ConfigError::from)?;

	tracing::info!(addr = %settings.bind_addr, "Listening for connections.");
	axum::serve(listener, app).await.map_err(ConfigError::from)?;

	Ok(())
}

struct ApiError(Error);
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		Self(err)
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let status = StatusCode::from_u16(self.0.http_status())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		let detail = self.0.to_string();

		(status, Json(serde_json::json!({ "detail": detail }))).into_response()
	}
}

// 302 like the original app; axum's Redirect helpers answer 303/307.
fn found(location: &str) -> Response {
	(StatusCode::FOUND, [(LOCATION, location.to_owned())]).into_response()
}

fn persistent_cookie(name: &'static str, value: String) -> Cookie<'static> {
	Cookie::build((name, value)).http_only(true).same_site(SameSite::Lax).path("/").build()
}

fn short_lived_cookie(name: &'static str, value: String) -> Cookie<'static> {
	Cookie::build((name, value))
		.http_only(true)
		.same_site(SameSite::Lax)
		.path("/")
		.max_age(STATE_COOKIE_MAX_AGE)
		.build()
}

fn removal(name: &'static str) -> Cookie<'static> {
	Cookie::build((name, "")).path("/").build()
}

fn cookie_value(jar: &CookieJar, name: &str) -> Option<String> {
	jar.get(name).map(|cookie| cookie.value().to_owned()).filter(|value| !value.is_empty())
}

fn require_session(jar: &CookieJar) -> Result<String, ApiError> {
	cookie_value(jar, SESSION_COOKIE).ok_or(ApiError(Error::Unauthorized))
}

async fn login(
	State(app): State<AppState>,
	jar: CookieJar,
) -> Result<(CookieJar, Response), ApiError> {
	let existing = cookie_value(&jar, SESSION_COOKIE);
	let start = app.broker.login(existing.as_deref())?;
	let jar = jar
		.add(persistent_cookie(SESSION_COOKIE, start.session_id))
		.add(short_lived_cookie(STATE_COOKIE, start.state));

	Ok((jar, found(start.authorize_url.as_str())))
}

#[derive(Deserialize)]
struct CallbackQuery {
	code: Option<String>,
	state: Option<String>,
	error: Option<String>,
}

async fn callback(
	State(app): State<AppState>,
	jar: CookieJar,
	Query(query): Query<CallbackQuery>,
) -> Result<Response, ApiError> {
	let request = CallbackRequest {
		code: query.code,
		state: query.state,
		error: query.error,
		tracked_state: cookie_value(&jar, STATE_COOKIE),
		session_id: cookie_value(&jar, SESSION_COOKIE),
	};

	match app.broker.callback(request).await? {
		CallbackOutcome::Forward(query) => Ok(found(&format!("/?{query}"))),
		CallbackOutcome::Completed { .. } => {
			let jar = jar.remove(removal(STATE_COOKIE));

			Ok((jar, found("/")).into_response())
		},
	}
}

async fn logout(State(app): State<AppState>, jar: CookieJar) -> Response {
	let session = cookie_value(&jar, SESSION_COOKIE);

	app.broker.logout(session.as_deref());

	let jar = jar.remove(removal(SESSION_COOKIE)).remove(removal(STATE_COOKIE));

	(jar, StatusCode::NO_CONTENT).into_response()
}

async fn me(State(app): State<AppState>, jar: CookieJar) -> Result<Json<Value>, ApiError> {
	let session_id = require_session(&jar)?;

	Ok(Json(app.spotify.current_user(&session_id).await?))
}

#[derive(Deserialize)]
struct PageQuery {
	limit: Option<u32>,
	offset: Option<u32>,
}
impl PageQuery {
	/// Applies the endpoint's default and upper bound before the core is reached.
	fn bounded(&self, default_limit: u32, max_limit: u32) -> Result<(u32, u32), ApiError> {
		let limit = self.limit.unwrap_or(default_limit);

		if !(1..=max_limit).contains(&limit) {
			return Err(ApiError(Error::validation(format!(
				"limit must be between 1 and {max_limit}"
			))));
		}

		Ok((limit, self.offset.unwrap_or(0)))
	}
}

async fn my_playlists(
	State(app): State<AppState>,
	jar: CookieJar,
	Query(page): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
	let (limit, offset) = page.bounded(10, 10)?;
	let session_id = require_session(&jar)?;

	Ok(Json(app.spotify.my_playlists(&session_id, limit, offset).await?))
}

async fn playlist_items(
	State(app): State<AppState>,
	jar: CookieJar,
	Path(playlist_id): Path<String>,
	Query(page): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
	let (limit, offset) = page.bounded(25, 50)?;
	let session_id = require_session(&jar)?;

	Ok(Json(app.spotify.playlist_items(&session_id, &playlist_id, limit, offset).await?))
}

#[derive(Deserialize)]
struct CreatePlaylistBody {
	name: String,
	#[serde(default)]
	description: Option<String>,
	#[serde(default)]
	public: bool,
}

async fn create_playlist(
	State(app): State<AppState>,
	jar: CookieJar,
	Json(body): Json<CreatePlaylistBody>,
) -> Result<Json<Value>, ApiError> {
	let session_id = require_session(&jar)?;
	let name = body.name.trim();

	if name.is_empty() {
		return Err(ApiError(Error::validation("Playlist name is required")));
	}

	let description = body.description.as_deref().map(str::trim).filter(|text| !text.is_empty());

	Ok(Json(
		app.spotify.create_playlist(&session_id, name, description, body.public).await?,
	))
}
