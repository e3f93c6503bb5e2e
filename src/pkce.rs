//! Cryptographically random identifiers and RFC 7636 PKCE challenge derivation.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::{Digest, Sha256};

const SESSION_ID_BYTES: usize = 24;
const STATE_BYTES: usize = 32;
const CODE_VERIFIER_BYTES: usize = 96;
// RFC 7636 §4.1 upper bound.
const CODE_VERIFIER_MAX_LEN: usize = 128;

/// Generates an opaque, URL-safe session identifier (192 bits of entropy).
pub fn generate_session_id() -> String {
	random_urlsafe(SESSION_ID_BYTES)
}

/// Generates an unguessable OAuth `state` value (256 bits of entropy).
pub fn generate_state() -> String {
	random_urlsafe(STATE_BYTES)
}

/// Generates a PKCE code verifier, truncated to the RFC 7636 maximum of 128 chars.
pub fn generate_code_verifier() -> String {
	let mut verifier = random_urlsafe(CODE_VERIFIER_BYTES);

	verifier.truncate(CODE_VERIFIER_MAX_LEN);

	verifier
}

/// Derives the S256 code challenge: base64url(SHA-256(verifier)) without padding.
pub fn generate_code_challenge(verifier: &str) -> String {
	let mut hasher = Sha256::new();

	hasher.update(verifier.as_bytes());

	URL_SAFE_NO_PAD.encode(hasher.finalize())
}

fn random_urlsafe(len: usize) -> String {
	let mut buf = vec![0_u8; len];

	rand::rng().fill_bytes(&mut buf);

	URL_SAFE_NO_PAD.encode(buf)
}
