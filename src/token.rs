//! Provider token payloads and the refresh merge rule.

// self
use crate::_prelude::*;

/// Token payload returned by the provider's token endpoint.
///
/// Well-known fields are typed; everything else the provider sends is preserved
/// verbatim in `extra` so the payload round-trips untouched through the session
/// store and back out to API callers.
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct TokenSet {
	/// Bearer credential for resource calls. Empty means the payload is unusable.
	#[serde(default)]
	pub access_token: String,
	/// Long-lived credential used to mint new access tokens, when issued.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<String>,
	/// Token type reported by the provider (`bearer` for Spotify).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub token_type: Option<String>,
	/// Relative expiry in seconds, as reported by the provider.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires_in: Option<u64>,
	/// Provider-defined fields preserved verbatim (scope, etc.).
	#[serde(flatten)]
	pub extra: JsonMap<String, Value>,
}
impl TokenSet {
	/// Returns `true` when the payload carries a non-empty access token.
	pub fn is_usable(&self) -> bool {
		!self.access_token.is_empty()
	}

	/// Folds a refresh response into this payload.
	///
	/// Fields present in the refresh response override; absent fields keep their
	/// previous values. In particular a refresh response that omits `refresh_token`
	/// must not erase the stored one.
	pub fn merge_refreshed(&mut self, newer: TokenSet) {
		self.access_token = newer.access_token;

		if newer.refresh_token.is_some() {
			self.refresh_token = newer.refresh_token;
		}
		if newer.token_type.is_some() {
			self.token_type = newer.token_type;
		}
		if newer.expires_in.is_some() {
			self.expires_in = newer.expires_in;
		}

		self.extra.extend(newer.extra);
	}
}
impl Debug for TokenSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenSet")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("token_type", &self.token_type)
			.field("expires_in", &self.expires_in)
			.field("extra", &self.extra)
			.finish()
	}
}
