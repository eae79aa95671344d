//! User JWTs for NATS
//!
//! A compact token with three base64url (no padding) segments:
//! `header.payload.signature`. The account key signs the *encoded* payload
//! segment, so verification must use the segment bytes as transmitted.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::identity::{verify_with_public_key, Identity};
use crate::types::{OobError, Result};

/// JWT `typ` header value
pub const JWT_TYPE: &str = "jwt";

/// JWT `alg` header value
pub const JWT_ALGORITHM: &str = "ed25519";

/// Claim `type` for user credentials
pub const USER_CLAIM_TYPE: &str = "user";

/// NATS wildcard matching every subject
pub const ALL_SUBJECTS: &str = ">";

/// Length of the random `jti` in bytes
const JTI_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtHeader {
    pub typ: String,
    pub alg: String,
}

impl Default for JwtHeader {
    fn default() -> Self {
        Self {
            typ: JWT_TYPE.to_string(),
            alg: JWT_ALGORITHM.to_string(),
        }
    }
}

/// Subject allow/deny lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectPermission {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deny: Vec<String>,
}

/// Publish/subscribe permissions as NATS reads them from the `nats` claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatsPermissions {
    #[serde(rename = "pub")]
    pub publish: SubjectPermission,
    #[serde(rename = "sub")]
    pub subscribe: SubjectPermission,
}

impl NatsPermissions {
    /// Listen-only: publishing to anything is denied, every subject may be subscribed
    pub fn subscribe_only() -> Self {
        Self {
            publish: SubjectPermission {
                allow: vec![],
                deny: vec![ALL_SUBJECTS.to_string()],
            },
            subscribe: SubjectPermission {
                allow: vec![ALL_SUBJECTS.to_string()],
                deny: vec![],
            },
        }
    }
}

/// Claims of a user JWT
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
    /// Random token id (uppercase hex)
    pub jti: String,
    /// Issued at, Unix seconds
    pub iat: i64,
    /// Issuing account public key
    pub iss: String,
    /// User public key
    pub sub: String,
    #[serde(rename = "type")]
    pub claim_type: String,
    pub nats: NatsPermissions,
}

impl UserClaims {
    /// Claims for a listen-only user of `account`
    pub fn subscriber(account_public_key: &str, user_public_key: &str, iat: i64) -> Self {
        let mut jti = [0u8; JTI_LEN];
        OsRng.fill_bytes(&mut jti);

        Self {
            jti: hex::encode_upper(jti),
            iat,
            iss: account_public_key.to_string(),
            sub: user_public_key.to_string(),
            claim_type: USER_CLAIM_TYPE.to_string(),
            nats: NatsPermissions::subscribe_only(),
        }
    }
}

/// Encode and sign a user JWT with the issuing account
pub fn encode_user_jwt(account: &Identity, claims: &UserClaims) -> Result<String> {
    if claims.iss != account.public_key() {
        return Err(OobError::Internal(
            "JWT issuer does not match the signing account".to_string(),
        ));
    }

    let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&JwtHeader::default())?);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
    let signature = URL_SAFE_NO_PAD.encode(account.sign(payload.as_bytes())?);

    Ok(format!("{header}.{payload}.{signature}"))
}

/// A user JWT split into its decoded parts
#[derive(Debug, Clone)]
pub struct DecodedUserJwt {
    pub header: JwtHeader,
    pub claims: UserClaims,
    /// Payload segment exactly as it appeared in the token
    pub payload_segment: String,
    pub signature: Vec<u8>,
}

impl DecodedUserJwt {
    /// Check the signature against the issuer named in the claims
    pub fn verify(&self) -> Result<()> {
        verify_with_public_key(&self.claims.iss, self.payload_segment.as_bytes(), &self.signature)
    }
}

/// Split and decode a user JWT without verifying it
pub fn decode_user_jwt(token: &str) -> Result<DecodedUserJwt> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    let (header, payload, signature) = match segments.as_slice() {
        [header, payload, signature] => (*header, *payload, *signature),
        _ => {
            return Err(OobError::InvalidCredentials(format!(
                "JWT must have 3 segments, found {}",
                segments.len()
            )))
        }
    };

    let decode = |segment: &str, name: &str| {
        URL_SAFE_NO_PAD
            .decode(segment)
            .map_err(|e| OobError::InvalidCredentials(format!("JWT {name} is not base64url: {e}")))
    };

    let header: JwtHeader = serde_json::from_slice(&decode(header, "header")?)
        .map_err(|e| OobError::InvalidCredentials(format!("JWT header: {e}")))?;
    let claims: UserClaims = serde_json::from_slice(&decode(payload, "payload")?)
        .map_err(|e| OobError::InvalidCredentials(format!("JWT payload: {e}")))?;

    Ok(DecodedUserJwt {
        header,
        claims,
        payload_segment: payload.to_string(),
        signature: decode(signature, "signature")?,
    })
}
