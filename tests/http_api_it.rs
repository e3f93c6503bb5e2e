// crates.io
use axum::{
	Router,
	body::Body,
	http::{Request, Response, StatusCode, header},
};
use httpmock::prelude::*;
use serde_json::Value;
use tower::ServiceExt;
// self
use spotify_session_broker::{
	config::Settings,
	token::TokenSet,
	url::Url,
	web::{self, AppState, SESSION_COOKIE, STATE_COOKIE},
};

fn test_settings(client_id: &str, server: Option<&MockServer>) -> Settings {
	let token_url = server.map(|server| server.url("/api/token"));
	let api_base = server.map(|server| server.url("/v1"));

	Settings::from_lookup(move |key| match key {
		"SPOTIFY_CLIENT_ID" => Some(client_id.to_owned()).filter(|id| !id.is_empty()),
		"SPOTIFY_TOKEN_URL" => token_url.clone(),
		"SPOTIFY_API_BASE" => api_base.clone(),
		_ => None,
	})
}

fn test_app(settings: &Settings) -> (Router, AppState) {
	let state = AppState::from_settings(settings)
		.expect("Handler state should build from test settings.");

	(web::router(state.clone()), state)
}

fn get(uri: &str) -> Request<Body> {
	Request::builder().uri(uri).body(Body::empty()).expect("Request fixture should build.")
}

fn get_with_session(uri: &str, session_id: &str) -> Request<Body> {
	Request::builder()
		.uri(uri)
		.header(header::COOKIE, format!("{SESSION_COOKIE}={session_id}"))
		.body(Body::empty())
		.expect("Request fixture should build.")
}

async fn json_body(response: Response<Body>) -> Value {
	let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Response body should be readable.");

	serde_json::from_slice(&bytes).expect("Response body should be JSON.")
}

fn location(response: &Response<Body>) -> String {
	response
		.headers()
		.get(header::LOCATION)
		.expect("Redirect should carry a Location header.")
		.to_str()
		.expect("Location header should be valid UTF-8.")
		.to_owned()
}

fn set_cookie_value(response: &Response<Body>, name: &str) -> Option<String> {
	response.headers().get_all(header::SET_COOKIE).iter().find_map(|header| {
		let raw = header.to_str().ok()?;
		let (cookie, _) = raw.split_once(';').unwrap_or((raw, ""));
		let (key, value) = cookie.split_once('=')?;

		(key == name).then(|| value.to_owned())
	})
}

#[tokio::test]
async fn login_redirects_to_the_provider_with_both_cookies() {
	let (app, _) = test_app(&test_settings("client-web", None));
	let response =
		app.oneshot(get("/auth/spotify/login")).await.expect("Router should answer login.");

	assert_eq!(response.status(), StatusCode::FOUND);

	let authorize = Url::parse(&location(&response)).expect("Redirect target should parse.");
	let pairs: std::collections::HashMap<_, _> = authorize.query_pairs().into_owned().collect();

	assert_eq!(authorize.host_str(), Some("accounts.spotify.com"));
	assert_eq!(pairs.get("client_id").map(String::as_str), Some("client-web"));
	assert_eq!(pairs.get("code_challenge_method").map(String::as_str), Some("S256"));

	let session = set_cookie_value(&response, SESSION_COOKIE)
		.expect("Login should bind a session cookie.");
	let state = set_cookie_value(&response, STATE_COOKIE)
		.expect("Login should bind a state cookie.");

	assert!(!session.is_empty());
	assert_eq!(pairs.get("state"), Some(&state));
}

#[tokio::test]
async fn login_without_a_client_id_is_a_server_error() {
	let (app, _) = test_app(&test_settings("", None));
	let response =
		app.oneshot(get("/auth/spotify/login")).await.expect("Router should answer login.");

	assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(
		json_body(response).await.get("detail").and_then(Value::as_str),
		Some("CLIENT_ID is not configured"),
	);
}

#[tokio::test]
async fn full_handshake_through_the_router_completes() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"access-1\",\"refresh_token\":\"refresh-1\"}");
		})
		.await;
	let (app, state) = test_app(&test_settings("client-web", Some(&server)));
	let login = app
		.clone()
		.oneshot(get("/auth/spotify/login"))
		.await
		.expect("Router should answer login.");
	let session = set_cookie_value(&login, SESSION_COOKIE)
		.expect("Login should bind a session cookie.");
	let state_value = set_cookie_value(&login, STATE_COOKIE)
		.expect("Login should bind a state cookie.");
	let callback = app
		.oneshot(
			Request::builder()
				.uri(format!("/auth/spotify/callback?code=mock-code&state={state_value}"))
				.header(
					header::COOKIE,
					format!("{SESSION_COOKIE}={session}; {STATE_COOKIE}={state_value}"),
				)
				.body(Body::empty())
				.expect("Request fixture should build."),
		)
		.await
		.expect("Router should answer the callback.");

	assert_eq!(callback.status(), StatusCode::FOUND);
	assert_eq!(location(&callback), "/");
	// Completion discards the short-lived state binding.
	assert_eq!(set_cookie_value(&callback, STATE_COOKIE).as_deref(), Some(""));

	mock.assert_async().await;

	let tokens = state.sessions.get(&session).expect("Tokens should be bound to the session.");

	assert_eq!(tokens.access_token, "access-1");
}

#[tokio::test]
async fn foreign_callbacks_are_forwarded_to_the_frontend() {
	let (app, _) = test_app(&test_settings("client-web", None));
	let response = app
		.oneshot(get("/auth/spotify/callback?code=abc123&state=frontend-state"))
		.await
		.expect("Router should answer the callback.");

	assert_eq!(response.status(), StatusCode::FOUND);
	assert_eq!(location(&response), "/?code=abc123&state=frontend-state");
}

#[tokio::test]
async fn empty_callbacks_are_rejected() {
	let (app, _) = test_app(&test_settings("client-web", None));
	let response = app
		.oneshot(get("/auth/spotify/callback"))
		.await
		.expect("Router should answer the callback.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert_eq!(
		json_body(response).await.get("detail").and_then(Value::as_str),
		Some("Missing authorization code"),
	);
}

#[tokio::test]
async fn api_routes_require_a_session_cookie() {
	let (app, _) = test_app(&test_settings("client-web", None));
	let response = app.oneshot(get("/api/me")).await.expect("Router should answer the call.");

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	assert_eq!(
		json_body(response).await.get("detail").and_then(Value::as_str),
		Some("Not authorized"),
	);
}

#[tokio::test]
async fn pagination_bounds_are_validated_before_auth() {
	let (app, _) = test_app(&test_settings("client-web", None));
	let response = app
		.clone()
		.oneshot(get("/api/me/playlists?limit=11"))
		.await
		.expect("Router should answer the call.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert_eq!(
		json_body(response).await.get("detail").and_then(Value::as_str),
		Some("limit must be between 1 and 10"),
	);

	let response = app
		.oneshot(get("/api/me/playlists/p1/items?limit=51"))
		.await
		.expect("Router should answer the call.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert_eq!(
		json_body(response).await.get("detail").and_then(Value::as_str),
		Some("limit must be between 1 and 50"),
	);
}

#[tokio::test]
async fn create_playlist_requires_a_non_blank_name() {
	let (app, state) = test_app(&test_settings("client-web", None));

	state.sessions.store("session-1", TokenSet {
		access_token: "access".into(),
		..Default::default()
	});

	let response = app
		.oneshot(
			Request::builder()
				.method("POST")
				.uri("/api/me/playlists")
				.header(header::COOKIE, format!("{SESSION_COOKIE}=session-1"))
				.header(header::CONTENT_TYPE, "application/json")
				.body(Body::from("{\"name\":\"   \"}"))
				.expect("Request fixture should build."),
		)
		.await
		.expect("Router should answer the call.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	assert_eq!(
		json_body(response).await.get("detail").and_then(Value::as_str),
		Some("Playlist name is required"),
	);
}

#[tokio::test]
async fn logout_clears_the_session_and_both_cookies() {
	let (app, state) = test_app(&test_settings("client-web", None));

	state.sessions.store("session-1", TokenSet {
		access_token: "access".into(),
		..Default::default()
	});

	let response = app
		.oneshot(get_with_session("/auth/logout", "session-1"))
		.await
		.expect("Router should answer logout.");

	assert_eq!(response.status(), StatusCode::NO_CONTENT);
	assert!(state.sessions.get("session-1").is_none());
	assert_eq!(set_cookie_value(&response, SESSION_COOKIE).as_deref(), Some(""));
	assert_eq!(set_cookie_value(&response, STATE_COOKIE).as_deref(), Some(""));
}

#[tokio::test]
async fn logout_without_a_session_still_succeeds() {
	let (app, _) = test_app(&test_settings("client-web", None));
	let response = app.oneshot(get("/auth/logout")).await.expect("Router should answer logout.");

	assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
