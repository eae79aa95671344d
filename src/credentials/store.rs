//! Credential materialization
//!
//! After CPS accepts a registration the account seed and the NATS user
//! credentials are written to disk. A registration that succeeded remotely
//! but left nothing on disk cannot be recovered by re-running the tool, so
//! every write failure here is a [`OobError::Persistence`] and must reach
//! the operator.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::envelope::CredentialEnvelope;
use super::jwt::{encode_user_jwt, UserClaims};
use crate::identity::{Identity, IdentityKind};
use crate::types::{OobError, Result};

/// Default file name of the account seed
pub const ACCOUNT_SEED_FILE: &str = "account.nk";

/// Default file name of the user credentials
pub const USER_CREDS_FILE: &str = "user.creds";

/// Result of materializing credentials
#[derive(Debug, Clone)]
pub struct MaterializedCredentials {
    pub account_public_key: String,
    pub user_public_key: String,
    pub account_seed_path: PathBuf,
    pub creds_path: PathBuf,
}

/// Location of the account seed and user credentials on disk
#[derive(Debug, Clone)]
pub struct CredentialStore {
    account_seed_path: PathBuf,
    creds_path: PathBuf,
}

impl CredentialStore {
    pub fn new(account_seed_path: impl Into<PathBuf>, creds_path: impl Into<PathBuf>) -> Self {
        Self {
            account_seed_path: account_seed_path.into(),
            creds_path: creds_path.into(),
        }
    }

    /// Store rooted at `dir` with the default file names
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(ACCOUNT_SEED_FILE), dir.join(USER_CREDS_FILE))
    }

    pub fn account_seed_path(&self) -> &Path {
        &self.account_seed_path
    }

    pub fn creds_path(&self) -> &Path {
        &self.creds_path
    }

    /// Whether an account seed already exists
    pub async fn has_account(&self) -> bool {
        tokio::fs::try_exists(&self.account_seed_path)
            .await
            .unwrap_or(false)
    }

    /// Load the registered account identity
    pub async fn load_account(&self) -> Result<Identity> {
        let seed = tokio::fs::read_to_string(&self.account_seed_path)
            .await
            .map_err(|e| {
                OobError::InvalidSeed(format!(
                    "Unable to read account seed from {}: {e}",
                    self.account_seed_path.display()
                ))
            })?;
        let seed = zeroize::Zeroizing::new(seed);
        Identity::from_seed_of_kind(&seed, IdentityKind::Account)
    }

    /// Load and parse the user credentials envelope
    pub async fn load_envelope(&self) -> Result<CredentialEnvelope> {
        load_envelope(&self.creds_path).await
    }

    /// Persist the account seed, mint a listen-only user and write its `.creds`.
    ///
    /// Steps run in order and stop at the first failure.
    pub async fn materialize(
        &self,
        account: &Identity,
        iat: i64,
    ) -> Result<MaterializedCredentials> {
        if account.kind() != IdentityKind::Account {
            return Err(OobError::Internal(
                "credentials can only be issued by an account identity".to_string(),
            ));
        }

        let account_seed = account.seed()?;
        write_secret(&self.account_seed_path, account_seed.as_bytes()).await?;

        let user = Identity::generate_user();
        let claims = UserClaims::subscriber(&account.public_key(), &user.public_key(), iat);
        let jwt = encode_user_jwt(account, &claims)?;

        let envelope = CredentialEnvelope::new(jwt, user.seed()?);
        write_secret(&self.creds_path, envelope.render().as_bytes()).await?;

        info!(
            account = %account.public_key(),
            user = %user.public_key(),
            creds = %self.creds_path.display(),
            "Credentials materialized"
        );

        Ok(MaterializedCredentials {
            account_public_key: account.public_key(),
            user_public_key: user.public_key(),
            account_seed_path: self.account_seed_path.clone(),
            creds_path: self.creds_path.clone(),
        })
    }
}

/// Read and parse a `.creds` file
pub async fn load_envelope(path: &Path) -> Result<CredentialEnvelope> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        OobError::InvalidCredentials(format!("Unable to read {}: {e}", path.display()))
    })?;
    let text = zeroize::Zeroizing::new(text);
    CredentialEnvelope::parse(&text)
}

async fn write_secret(path: &Path, contents: &[u8]) -> Result<()> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        warn!(path = %path.display(), "Overwriting existing file");
    }

    tokio::fs::write(path, contents).await.map_err(|e| {
        OobError::Persistence(format!("Unable to write {}: {e}", path.display()))
    })
}
