//! Session-to-token bindings for authenticated API proxying.

// self
use crate::{_prelude::*, token::TokenSet};

/// Stored token payload together with the instant it was (re)written.
#[derive(Clone, Debug)]
pub struct SessionTokenRecord {
	/// Provider token payload, merged across refreshes.
	pub tokens: TokenSet,
	/// Instant of the last store or refresh merge.
	pub stored_at: OffsetDateTime,
}

/// Maps opaque session identifiers to their current token record.
#[derive(Debug, Default)]
pub struct SessionTokenStore(RwLock<HashMap<String, SessionTokenRecord>>);
impl SessionTokenStore {
	/// Overwrites the record for `session_id`, stamped with the current instant.
	pub fn store(&self, session_id: &str, tokens: TokenSet) {
		let record = SessionTokenRecord { tokens, stored_at: OffsetDateTime::now_utc() };

		self.0.write().insert(session_id.to_owned(), record);
	}

	/// Returns the stored payload, treating an empty access token as absent.
	pub fn get(&self, session_id: &str) -> Option<TokenSet> {
		self.0.read().get(session_id).map(|record| record.tokens.clone()).filter(TokenSet::is_usable)
	}

	/// Removes the record for `session_id`; a no-op when nothing is stored.
	pub fn clear(&self, session_id: &str) {
		self.0.write().remove(session_id);
	}
}
