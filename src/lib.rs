//! oob-relay - out-of-band call attestation for CPS
//!
//! Registers an operator's NATS account with the CPS registry for one or
//! more service provider codes, and relays the attestations CPS publishes
//! into Redis for the call verifier.
//!
//! ## Modules
//!
//! - **identity**: nkey account and user keypairs
//! - **registry**: STI-PA login, SPC token and CPS registration
//! - **credentials**: account seed and user `.creds` files
//! - **bridge**: NATS subscription to Redis relay

pub mod bridge;
pub mod config;
pub mod credentials;
pub mod identity;
pub mod logging;
pub mod registry;
pub mod types;

pub use identity::{Identity, IdentityKind};
pub use types::{OobError, Result};
