//! Pending-authorization records keyed by OAuth `state`, consumed at most once.

// self
use crate::_prelude::*;

/// Lifetime of a pending authorization, measured from creation.
pub const PENDING_AUTH_TTL: Duration = Duration::seconds(600);

/// Handshake state tracked between login initiation and the provider callback.
#[derive(Clone)]
pub struct PendingAuthorization {
	/// Session identifier the eventual tokens must be bound to.
	pub session_id: String,
	/// PKCE verifier to present during the code exchange.
	pub code_verifier: String,
	/// Creation instant; the record expires [`PENDING_AUTH_TTL`] after it.
	pub created_at: OffsetDateTime,
}
impl PendingAuthorization {
	/// Returns `true` when the record has outlived its TTL at the provided instant.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		now - self.created_at > PENDING_AUTH_TTL
	}

	/// Convenience helper that checks expiry against the current UTC instant.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}
}
impl Debug for PendingAuthorization {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PendingAuthorization")
			.field("session_id", &self.session_id)
			.field("code_verifier", &"<redacted>")
			.field("created_at", &self.created_at)
			.finish()
	}
}

/// Maps OAuth `state` values to pending authorizations.
///
/// Expired-but-unpopped records are harmless; they are reaped when popped rather
/// than by a background sweeper.
#[derive(Debug, Default)]
pub struct PendingAuthStore(RwLock<HashMap<String, PendingAuthorization>>);
impl PendingAuthStore {
	/// Inserts or overwrites the record for `state`, stamped with the current instant.
	pub fn store(&self, state: &str, session_id: &str, code_verifier: &str) {
		let record = PendingAuthorization {
			session_id: session_id.to_owned(),
			code_verifier: code_verifier.to_owned(),
			created_at: OffsetDateTime::now_utc(),
		};

		self.0.write().insert(state.to_owned(), record);
	}

	/// Atomically removes and returns the record for `state`.
	///
	/// Read and delete happen under one write lock so two callbacks racing on the
	/// same state cannot both succeed.
	pub fn pop(&self, state: &str) -> Option<PendingAuthorization> {
		self.0.write().remove(state)
	}

	#[cfg(test)]
	pub(crate) fn insert_raw(&self, state: &str, record: PendingAuthorization) {
		self.0.write().insert(state.to_owned(), record);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn record(created_at: OffsetDateTime) -> PendingAuthorization {
		PendingAuthorization {
			session_id: "session".into(),
			code_verifier: "pkce-secret".into(),
			created_at,
		}
	}

	#[test]
	fn pop_consumes_at_most_once() {
		let store = PendingAuthStore::default();

		store.store("state-1", "session", "verifier");

		let first = store.pop("state-1").expect("First pop should return the record.");

		assert_eq!(first.session_id, "session");
		assert_eq!(first.code_verifier, "verifier");
		assert!(store.pop("state-1").is_none(), "Second pop must find nothing.");
	}

	#[test]
	fn pop_of_unknown_state_is_none() {
		assert!(PendingAuthStore::default().pop("never-stored").is_none());
	}

	#[test]
	fn store_overwrites_existing_state() {
		let store = PendingAuthStore::default();

		store.store("state", "session-a", "verifier-a");
		store.store("state", "session-b", "verifier-b");

		let popped = store.pop("state").expect("Overwritten record should be retrievable.");

		assert_eq!(popped.session_id, "session-b");
	}

	#[test]
	fn expiry_boundary_is_strict() {
		let now = OffsetDateTime::now_utc();

		assert!(!record(now - Duration::seconds(599)).is_expired_at(now));
		assert!(!record(now - Duration::seconds(600)).is_expired_at(now));
		assert!(record(now - Duration::seconds(601)).is_expired_at(now));
	}

	#[test]
	fn debug_redacts_verifier() {
		let rendered = format!("{:?}", record(OffsetDateTime::now_utc()));

		assert!(!rendered.contains("pkce-secret"));
	}
}
