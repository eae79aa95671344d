//! Attestation distribution bridge
//!
//! Subscribes to every attestation on the CPS bus and keeps the most recent
//! one for each called/calling number pair in Redis for a short time, where
//! the call verifier picks it up.
//!
//! ## Components
//!
//! - **subject**: routing subject parsing and cache keys
//! - **cache**: the expiring key/value store attestations land in
//! - **bus**: the authenticated NATS subscription
//! - **relay**: the loop that moves one into the other

pub mod bus;
pub mod cache;
pub mod relay;
pub mod subject;

pub use bus::{AttestationMessage, BusClient, ALL_SUBJECTS};
pub use cache::{AttestationCache, RedisCache, ATTESTATION_TTL};
pub use relay::{Relay, RelayOutcome, RelayStats};
pub use subject::{RoutingKey, SubjectError};
