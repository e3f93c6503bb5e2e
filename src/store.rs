//! In-process stores binding OAuth state values and sessions to their records.
//!
//! Both stores are process-wide keyed maps behind [`parking_lot::RwLock`]; nothing is
//! persisted, so a restart invalidates every session and pending authorization. The
//! stores are constructed once at startup and passed by reference to the flow
//! controller and the resource client.

pub mod pending;
pub mod session;

pub use pending::{PENDING_AUTH_TTL, PendingAuthStore, PendingAuthorization};
pub use session::{SessionTokenRecord, SessionTokenStore};
