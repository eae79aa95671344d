//! NATS credentials for the relay
//!
//! Follows the NATS decentralized auth chain (Account → User): the
//! registered account signs a JWT for a freshly generated user, and the
//! JWT plus the user's seed form the `.creds` file the relay connects with.
//!
//! The user may subscribe to every subject and publish to none.

pub mod envelope;
pub mod jwt;
pub mod store;

pub use envelope::CredentialEnvelope;
pub use jwt::{decode_user_jwt, encode_user_jwt, NatsPermissions, UserClaims};
pub use store::{load_envelope, CredentialStore, MaterializedCredentials};
