//! Process settings resolved from the environment with `.env` fallback.

const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8000/";
const DEFAULT_SCOPES: &str = "user-read-private user-read-email";
const DEFAULT_AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";

/// Resolved broker configuration.
///
/// `client_id` may legitimately be empty; the flow controller rejects login attempts
/// with a configuration error instead of failing at startup, so the remaining routes
/// stay serviceable for already-authorized sessions.
#[derive(Clone, Debug)]
pub struct Settings {
	/// OAuth client identifier registered with Spotify.
	pub client_id: String,
	/// Redirect URI announced during login and repeated during the code exchange.
	pub redirect_uri: String,
	/// Space-delimited scope string requested at authorization time.
	pub scopes: String,
	/// Provider authorize endpoint receiving the login redirect.
	pub authorize_url: String,
	/// Provider token endpoint for code exchange and refresh grants.
	pub token_url: String,
	/// Base URL of the resource API that proxied calls are issued against.
	pub api_base: String,
	/// Socket address the HTTP server binds to.
	pub bind_addr: String,
}
impl Settings {
	/// Loads settings from process environment variables, hydrating them from a
	/// `.env` file first when one exists.
	pub fn load() -> Self {
		dotenvy::dotenv().ok();

		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Resolves settings through an injectable lookup so tests can avoid mutating
	/// process-wide environment state.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
		let value = |key: &str| {
			lookup(key).map(|raw| raw.trim().to_owned()).filter(|trimmed| !trimmed.is_empty())
		};
		let value_or = |key: &str, fallback: &str| value(key).unwrap_or_else(|| fallback.to_owned());

		Self {
			client_id: value("SPOTIFY_CLIENT_ID").or_else(|| value("CLIENT_ID")).unwrap_or_default(),
			redirect_uri: value_or("SPOTIFY_REDIRECT_URI", DEFAULT_REDIRECT_URI),
			scopes: value_or("SPOTIFY_SCOPES", DEFAULT_SCOPES),
			authorize_url: value_or("SPOTIFY_AUTHORIZE_URL", DEFAULT_AUTHORIZE_URL),
			token_url: value_or("SPOTIFY_TOKEN_URL", DEFAULT_TOKEN_URL),
			api_base: value_or("SPOTIFY_API_BASE", DEFAULT_API_BASE),
			bind_addr: value_or("BIND_ADDR", DEFAULT_BIND_ADDR),
		}
	}
}
