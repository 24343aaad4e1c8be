//! License verification and entitlement engine for Keyforge.
//!
//! [`Verifier::verify`] takes one inbound request through the full ordered
//! pipeline (throttles, team resolution, session-key opening, license and
//! release resolution, blacklists, customer policy, suspension, expiration,
//! IP and seat caps) and either returns an encrypted [`Delivery`] stream or
//! a single terminal [`keyforge_types::RejectReason`].
//!
//! The ordering is load-bearing twice over: later checks assume earlier ones
//! passed, and the step reached bounds what a rejection can reveal (a
//! license lookup failure looks the same whether the team has no licenses
//! or the key is simply wrong).
//!
//! Every request records exactly one audit outcome and appends exactly one
//! request-log row, success or failure.

mod blacklist;
mod config;
mod expiration;
mod limits;
mod ratelimit;
mod request;
mod verify;

pub use blacklist::{find_match, has_country_entries};
pub use config::{EngineConfig, RateLimitConfig};
pub use expiration::{evaluate_expiration, Validity};
pub use limits::{ip_allowed, seat_allowed};
pub use ratelimit::RateLimiter;
pub use request::VerifyRequest;
pub use verify::{Delivery, Verifier};
