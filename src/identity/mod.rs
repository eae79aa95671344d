//! Account and user identities
//!
//! Both identities are Ed25519 keypairs in NATS nkey encoding:
//!
//! - **Account**: registered with CPS, signs registration requests and user JWTs.
//!   Public keys start with `A`, seeds with `SA`.
//! - **User**: subordinate to the account, only used to authenticate to NATS.
//!   Public keys start with `U`, seeds with `SU`.
//!
//! Ed25519 signing is deterministic, so the same identity always produces
//! the same signature for the same bytes.

use nkeys::{KeyPair, KeyPairType};
use zeroize::Zeroizing;

use crate::types::{OobError, Result};

/// Role an identity plays in the chain of trust
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    Account,
    User,
}

/// An nkey-encoded Ed25519 keypair
pub struct Identity {
    kind: IdentityKind,
    keypair: KeyPair,
}

impl Identity {
    /// Generate a fresh account identity
    pub fn generate_account() -> Self {
        Self {
            kind: IdentityKind::Account,
            keypair: KeyPair::new_account(),
        }
    }

    /// Generate a fresh user identity
    pub fn generate_user() -> Self {
        Self {
            kind: IdentityKind::User,
            keypair: KeyPair::new_user(),
        }
    }

    /// Reload an identity from its seed.
    ///
    /// Surrounding whitespace is ignored so that seed files written by
    /// editors with a trailing newline still load.
    pub fn from_seed(seed: &str) -> Result<Self> {
        let keypair = KeyPair::from_seed(seed.trim())
            .map_err(|e| OobError::InvalidSeed(format!("seed could not be decoded: {e}")))?;

        let kind = match keypair.key_pair_type() {
            KeyPairType::Account => IdentityKind::Account,
            KeyPairType::User => IdentityKind::User,
            other => {
                return Err(OobError::InvalidSeed(format!(
                    "unsupported key type {other:?}, expected an account or user seed"
                )))
            }
        };

        Ok(Self { kind, keypair })
    }

    /// Reload an identity from its seed, requiring a specific role
    pub fn from_seed_of_kind(seed: &str, kind: IdentityKind) -> Result<Self> {
        let identity = Self::from_seed(seed)?;
        if identity.kind != kind {
            return Err(OobError::InvalidSeed(format!(
                "expected {kind:?} seed, found {:?} seed",
                identity.kind
            )));
        }
        Ok(identity)
    }

    pub fn kind(&self) -> IdentityKind {
        self.kind
    }

    /// Public key in nkey encoding (`A...` or `U...`)
    pub fn public_key(&self) -> String {
        self.keypair.public_key()
    }

    /// Private seed in nkey encoding (`SA...` or `SU...`)
    pub fn seed(&self) -> Result<Zeroizing<String>> {
        self.keypair
            .seed()
            .map(Zeroizing::new)
            .map_err(|e| OobError::InvalidSeed(e.to_string()))
    }

    /// Sign a message with the private key
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        self.keypair
            .sign(message)
            .map_err(|e| OobError::Internal(format!("Signing failed: {e}")))
    }

    /// Verify a signature against this identity's public key
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        self.keypair.verify(message, signature).is_ok()
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("kind", &self.kind)
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// Verify a signature against a bare nkey public key
pub fn verify_with_public_key(public_key: &str, message: &[u8], signature: &[u8]) -> Result<()> {
    let keypair = KeyPair::from_public_key(public_key)
        .map_err(|e| OobError::InvalidSeed(format!("public key could not be decoded: {e}")))?;
    keypair
        .verify(message, signature)
        .map_err(|e| OobError::Internal(format!("Signature verification failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_account() {
        let account = Identity::generate_account();
        assert_eq!(account.kind(), IdentityKind::Account);
        assert!(account.public_key().starts_with('A'));
        assert!(account.seed().unwrap().starts_with("SA"));
    }

    #[test]
    fn test_generate_user() {
        let user = Identity::generate_user();
        assert_eq!(user.kind(), IdentityKind::User);
        assert!(user.public_key().starts_with('U'));
        assert!(user.seed().unwrap().starts_with("SU"));
    }

    #[test]
    fn test_seed_round_trip_keeps_public_key() {
        let account = Identity::generate_account();
        let seed = account.seed().unwrap();

        let reloaded = Identity::from_seed(&seed).unwrap();
        assert_eq!(reloaded.public_key(), account.public_key());
        assert_eq!(reloaded.kind(), IdentityKind::Account);
    }

    #[test]
    fn test_seed_with_trailing_newline() {
        let account = Identity::generate_account();
        let seed = format!("{}\n", account.seed().unwrap().as_str());
        assert!(Identity::from_seed(&seed).is_ok());
    }

    #[test]
    fn test_malformed_seed_rejected() {
        let err = Identity::from_seed("not-a-seed").unwrap_err();
        assert!(matches!(err, OobError::InvalidSeed(_)));

        let err = Identity::from_seed("").unwrap_err();
        assert!(matches!(err, OobError::InvalidSeed(_)));
    }

    #[test]
    fn test_truncated_seed_rejected() {
        let account = Identity::generate_account();
        let seed = account.seed().unwrap();
        let truncated = &seed[..seed.len() - 4];
        assert!(matches!(
            Identity::from_seed(truncated),
            Err(OobError::InvalidSeed(_))
        ));
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let user = Identity::generate_user();
        let seed = user.seed().unwrap();
        let err = Identity::from_seed_of_kind(&seed, IdentityKind::Account).unwrap_err();
        assert!(matches!(err, OobError::InvalidSeed(_)));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let account = Identity::generate_account();
        let a = account.sign(b"attest").unwrap();
        let b = account.sign(b"attest").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_signature_verifies() {
        let account = Identity::generate_account();
        let signature = account.sign(b"attest").unwrap();

        assert!(account.verify(b"attest", &signature));
        assert!(!account.verify(b"attest!", &signature));
        assert!(verify_with_public_key(&account.public_key(), b"attest", &signature).is_ok());

        let other = Identity::generate_account();
        assert!(!other.verify(b"attest", &signature));
    }
}
