//! CPS registration protocol
//!
//! Registers an account's public key with CPS for a service provider code,
//! using an SPC token obtained from the STI-PA authentication API as proof
//! that the operator controls the code.
//!
//! ## Components
//!
//! - **spc**: service provider code validation
//! - **fingerprint**: canonical payloads, fingerprints and TKValue encoding
//! - **client**: HTTP transport for STI-PA and CPS
//! - **flow**: the login → token → submit sequence

pub mod client;
pub mod fingerprint;
pub mod flow;
pub mod spc;

pub use client::{HttpRegistry, RegistryApi, RegistryEndpoints};
pub use fingerprint::{build_fingerprint, build_tk_value, RegistrationAction};
pub use flow::{PaCredentials, RegistrationFlow, RegistrationReceipt, RegistrationRequest};
pub use spc::ServiceProviderCode;
