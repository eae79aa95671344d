//! Registration state machine
//!
//! A registration is three calls made strictly in order, each one-shot:
//!
//! 1. STI-PA login with the operator's credentials
//! 2. SPC token request, binding the token to the request fingerprint
//! 3. Signed submission to CPS
//!
//! Any failure aborts the remaining steps. Nothing is retried; the operator
//! re-runs the tool. The timestamp is taken once when the request is built
//! and flows unchanged into the fingerprint, the token request and the
//! signature.

use tracing::info;
use zeroize::Zeroizing;

use super::client::{Atc, LoginRequest, RegistrationSubmission, RegistryApi, TokenRequest};
use super::fingerprint::{
    build_fingerprint, build_tk_value, FingerprintPayload, RegistrationAction, SignaturePayload,
    TKTYPE_TNAUTHLIST,
};
use super::spc::ServiceProviderCode;
use crate::identity::Identity;
use crate::types::{OobError, Result};

/// Placeholder used when the registry gives no reason for a refusal
const NO_MESSAGE: &str = "no message";

/// Operator credentials for the STI-PA authentication API
pub struct PaCredentials {
    pub user_id: String,
    pub password: Zeroizing<String>,
}

impl PaCredentials {
    pub fn new(user_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            password: Zeroizing::new(password.into()),
        }
    }
}

impl std::fmt::Debug for PaCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaCredentials")
            .field("user_id", &self.user_id)
            .field("password", &"***")
            .finish()
    }
}

/// Everything a registration is determined by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub action: RegistrationAction,
    pub account_public_key: String,
    pub service_provider_code: ServiceProviderCode,
    pub master_service_provider_code: Option<ServiceProviderCode>,
    /// Unix seconds, captured once per registration
    pub timestamp: i64,
}

impl RegistrationRequest {
    /// Register a fresh account under its first code
    pub fn register(
        account: &Identity,
        service_provider_code: ServiceProviderCode,
        timestamp: i64,
    ) -> Self {
        Self {
            action: RegistrationAction::Register,
            account_public_key: account.public_key(),
            service_provider_code,
            master_service_provider_code: None,
            timestamp,
        }
    }

    /// Add a code to an account registered under `master`
    pub fn add_service_provider_code(
        account: &Identity,
        master: ServiceProviderCode,
        service_provider_code: ServiceProviderCode,
        timestamp: i64,
    ) -> Self {
        Self {
            action: RegistrationAction::AddServiceProviderCode,
            account_public_key: account.public_key(),
            service_provider_code,
            master_service_provider_code: Some(master),
            timestamp,
        }
    }

    /// Current Unix time in seconds
    pub fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    /// The STI-PA account the SPC token is requested under
    pub fn token_account(&self) -> &ServiceProviderCode {
        self.master_service_provider_code
            .as_ref()
            .unwrap_or(&self.service_provider_code)
    }

    pub fn fingerprint_payload(&self) -> FingerprintPayload<'_> {
        FingerprintPayload {
            account_public_key: &self.account_public_key,
            action: self.action,
            master_service_provider_code: self.master_service_provider_code.as_ref(),
            service_provider_code: &self.service_provider_code,
            timestamp: self.timestamp,
        }
    }

    pub fn signature_payload<'a>(&'a self, spc_token: &'a str) -> SignaturePayload<'a> {
        SignaturePayload {
            account_public_key: &self.account_public_key,
            action: self.action,
            master_service_provider_code: self.master_service_provider_code.as_ref(),
            service_provider_code: &self.service_provider_code,
            spc_token,
            timestamp: self.timestamp,
        }
    }

    pub fn fingerprint(&self) -> Result<String> {
        build_fingerprint(&self.fingerprint_payload())
    }

    /// ATC for the token request. The TKValue always encodes the code being
    /// registered, even when the token is requested under the master code.
    pub fn atc(&self) -> Result<Atc> {
        Ok(Atc {
            tktype: TKTYPE_TNAUTHLIST.to_string(),
            tkvalue: build_tk_value(&self.service_provider_code),
            ca: false,
            fingerprint: self.fingerprint()?,
        })
    }

    /// Hex signature over the canonical signature payload
    pub fn sign(&self, account: &Identity, spc_token: &str) -> Result<String> {
        let payload = serde_json::to_vec(&self.signature_payload(spc_token))?;
        Ok(hex::encode(account.sign(&payload)?))
    }

    fn submission(&self, signature: String, spc_token: String) -> RegistrationSubmission {
        RegistrationSubmission {
            account_public_key: self.account_public_key.clone(),
            master_service_provider_code: self.master_service_provider_code.clone(),
            service_provider_code: self.service_provider_code.clone(),
            signature,
            spc_token,
            timestamp: self.timestamp,
        }
    }
}

/// What a successful registration sent to the registry
#[derive(Debug, Clone)]
pub struct RegistrationReceipt {
    pub fingerprint: String,
    pub signature: String,
    pub submission: RegistrationSubmission,
}

/// Drives one registration against a [`RegistryApi`]
pub struct RegistrationFlow<'a, R: RegistryApi + ?Sized> {
    api: &'a R,
}

impl<'a, R: RegistryApi + ?Sized> RegistrationFlow<'a, R> {
    pub fn new(api: &'a R) -> Self {
        Self { api }
    }

    /// Run login, token request and submission in order
    pub async fn run(
        &self,
        account: &Identity,
        request: &RegistrationRequest,
        credentials: &PaCredentials,
    ) -> Result<RegistrationReceipt> {
        if account.public_key() != request.account_public_key {
            return Err(OobError::Internal(
                "registration request was built for a different account".to_string(),
            ));
        }

        let atc = request.atc()?;

        let login = self
            .api
            .login(&LoginRequest {
                user_id: &credentials.user_id,
                password: &credentials.password,
            })
            .await?;
        let access_token = match login.access_token.filter(|t| !t.is_empty()) {
            Some(token) => token,
            None => {
                return Err(OobError::Authentication(
                    login.message.unwrap_or_else(|| NO_MESSAGE.to_string()),
                ))
            }
        };
        info!(user_id = %credentials.user_id, "Logged in to STI-PA");

        let token = self
            .api
            .request_spc_token(&access_token, request.token_account(), &TokenRequest { atc: &atc })
            .await?;
        let spc_token = match token.token.filter(|t| !t.is_empty()) {
            Some(token) => token,
            None => {
                return Err(OobError::TokenRequest(
                    token.message.unwrap_or_else(|| NO_MESSAGE.to_string()),
                ))
            }
        };
        info!(account = %request.token_account(), "SPC token issued");

        let signature = request.sign(account, &spc_token)?;
        let submission = request.submission(signature.clone(), spc_token);
        self.api.submit(request.action, &submission).await?;

        info!(
            action = request.action.as_str(),
            service_provider_code = %request.service_provider_code,
            "Registration accepted by CPS"
        );

        Ok(RegistrationReceipt {
            fingerprint: atc.fingerprint,
            signature,
            submission,
        })
    }
}
