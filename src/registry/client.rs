//! HTTP transport for the STI-PA authentication API and the CPS registry
//!
//! The STI-PA endpoints answer with a JSON body even when they refuse a
//! request, so login and token responses are decoded regardless of status
//! and the caller decides what a missing token means. CPS answers a refused
//! registration with a non-2xx status and a `message` field.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::fingerprint::RegistrationAction;
use super::spc::ServiceProviderCode;
use crate::types::{OobError, Result};

/// Production STI-PA authentication API
pub const AUTHENTICATE_URL: &str = "https://authenticate-api.iconectiv.com";

/// Staging STI-PA authentication API
pub const AUTHENTICATE_STAGING_URL: &str = "https://authenticate-api-stg.iconectiv.com";

/// CPS registry
pub const CPS_URL: &str = "https://cps.transnexus.com";

/// Registration calls can take close to a minute on the STI-PA side
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// Base URLs of the two services a registration talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEndpoints {
    /// STI-PA authentication API base URL
    pub authenticate_url: String,
    /// CPS base URL
    pub cps_url: String,
}

impl RegistryEndpoints {
    /// Endpoints for the production or staging STI-PA environment.
    /// CPS has a single environment.
    pub fn for_environment(staging: bool) -> Self {
        Self {
            authenticate_url: if staging {
                AUTHENTICATE_STAGING_URL
            } else {
                AUTHENTICATE_URL
            }
            .to_string(),
            cps_url: CPS_URL.to_string(),
        }
    }

    pub fn login_url(&self) -> String {
        format!("{}/api/v1/auth/login", self.authenticate_url.trim_end_matches('/'))
    }

    /// Token endpoint of the account the SPC token is requested under
    pub fn token_url(&self, account_code: &ServiceProviderCode) -> String {
        format!(
            "{}/api/v1/account/{}/token/",
            self.authenticate_url.trim_end_matches('/'),
            account_code
        )
    }

    pub fn submit_url(&self, action: RegistrationAction) -> String {
        format!("{}/v1/{}", self.cps_url.trim_end_matches('/'), action.as_str())
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest<'a> {
    pub user_id: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: Option<String>,
    pub message: Option<String>,
}

/// Authority token constraints sent with an SPC token request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Atc {
    pub tktype: String,
    pub tkvalue: String,
    pub ca: bool,
    pub fingerprint: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenRequest<'a> {
    pub atc: &'a Atc,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    pub token: Option<String>,
    pub message: Option<String>,
}

/// Body of the final CPS call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationSubmission {
    pub account_public_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_service_provider_code: Option<ServiceProviderCode>,
    pub service_provider_code: ServiceProviderCode,
    pub signature: String,
    pub spc_token: String,
    pub timestamp: i64,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    message: Option<String>,
}

// =============================================================================
// Transport
// =============================================================================

/// The three registry calls a registration is made of
#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// Log in to STI-PA with the operator's credentials
    async fn login(&self, request: &LoginRequest<'_>) -> Result<LoginResponse>;

    /// Ask STI-PA for an SPC token under `account_code`
    async fn request_spc_token(
        &self,
        access_token: &str,
        account_code: &ServiceProviderCode,
        request: &TokenRequest<'_>,
    ) -> Result<TokenResponse>;

    /// Submit the signed registration to CPS.
    /// A refusal is returned as [`OobError::Registration`].
    async fn submit(
        &self,
        action: RegistrationAction,
        submission: &RegistrationSubmission,
    ) -> Result<()>;
}

/// reqwest implementation of [`RegistryApi`]
pub struct HttpRegistry {
    endpoints: RegistryEndpoints,
    http_client: reqwest::Client,
}

impl HttpRegistry {
    pub fn new(endpoints: RegistryEndpoints) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .user_agent(concat!("oob-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            endpoints,
            http_client,
        })
    }

    async fn decode<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
        call: &str,
    ) -> Result<T> {
        let status = response.status();
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| {
            OobError::Http(format!("{call} returned {status} with an unreadable body: {e}"))
        })
    }
}

#[async_trait]
impl RegistryApi for HttpRegistry {
    async fn login(&self, request: &LoginRequest<'_>) -> Result<LoginResponse> {
        let url = self.endpoints.login_url();
        debug!(url = %url, user_id = %request.user_id, "STI-PA login");

        let response = self.http_client.post(&url).json(request).send().await?;
        Self::decode(response, "STI-PA login").await
    }

    async fn request_spc_token(
        &self,
        access_token: &str,
        account_code: &ServiceProviderCode,
        request: &TokenRequest<'_>,
    ) -> Result<TokenResponse> {
        let url = self.endpoints.token_url(account_code);
        debug!(url = %url, account = %account_code, "Requesting SPC token");

        // STI-PA expects the bare access token, without a "Bearer" scheme
        let response = self
            .http_client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, access_token)
            .json(request)
            .send()
            .await?;
        Self::decode(response, "STI-PA token request").await
    }

    async fn submit(
        &self,
        action: RegistrationAction,
        submission: &RegistrationSubmission,
    ) -> Result<()> {
        let url = self.endpoints.submit_url(action);
        info!(
            url = %url,
            service_provider_code = %submission.service_provider_code,
            "Submitting registration to CPS"
        );

        let response = self.http_client.post(&url).json(submission).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.bytes().await.unwrap_or_default();
        let message = serde_json::from_slice::<ErrorResponse>(&body)
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| status.to_string());
        Err(OobError::Registration(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_endpoints() {
        let endpoints = RegistryEndpoints::for_environment(false);
        assert_eq!(
            endpoints.login_url(),
            "https://authenticate-api.iconectiv.com/api/v1/auth/login"
        );
        assert_eq!(
            endpoints.token_url(&"ABCD".parse().unwrap()),
            "https://authenticate-api.iconectiv.com/api/v1/account/ABCD/token/"
        );
        assert_eq!(
            endpoints.submit_url(RegistrationAction::Register),
            "https://cps.transnexus.com/v1/register"
        );
        assert_eq!(
            endpoints.submit_url(RegistrationAction::AddServiceProviderCode),
            "https://cps.transnexus.com/v1/addServiceProviderCode"
        );
    }

    #[test]
    fn test_staging_endpoints() {
        let endpoints = RegistryEndpoints::for_environment(true);
        assert_eq!(
            endpoints.login_url(),
            "https://authenticate-api-stg.iconectiv.com/api/v1/auth/login"
        );
        assert_eq!(endpoints.cps_url, CPS_URL);
    }

    #[test]
    fn test_trailing_slash_tolerated() {
        let endpoints = RegistryEndpoints {
            authenticate_url: "http://127.0.0.1:9000/".to_string(),
            cps_url: "http://127.0.0.1:9001/".to_string(),
        };
        assert_eq!(endpoints.login_url(), "http://127.0.0.1:9000/api/v1/auth/login");
        assert_eq!(
            endpoints.submit_url(RegistrationAction::Register),
            "http://127.0.0.1:9001/v1/register"
        );
    }

    #[test]
    fn test_submission_wire_format() {
        let submission = RegistrationSubmission {
            account_public_key: "AKEY".to_string(),
            master_service_provider_code: Some("WXYZ".parse().unwrap()),
            service_provider_code: "ABCD".parse().unwrap(),
            signature: "00ff".to_string(),
            spc_token: "tok".to_string(),
            timestamp: 1,
        };
        assert_eq!(
            serde_json::to_string(&submission).unwrap(),
            r#"{"accountPublicKey":"AKEY","masterServiceProviderCode":"WXYZ","serviceProviderCode":"ABCD","signature":"00ff","spcToken":"tok","timestamp":1}"#
        );
    }

    #[test]
    fn test_token_request_wire_format() {
        let atc = Atc {
            tktype: "TNAuthList".to_string(),
            tkvalue: "MAigBhYEQUJDRA==".to_string(),
            ca: false,
            fingerprint: "SHA256 00".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&TokenRequest { atc: &atc }).unwrap(),
            r#"{"atc":{"tktype":"TNAuthList","tkvalue":"MAigBhYEQUJDRA==","ca":false,"fingerprint":"SHA256 00"}}"#
        );
    }
}
