//! Canonical registration payloads, fingerprints and TKValue encoding
//!
//! The registry recomputes the fingerprint from the fields it receives, so the
//! serialized form must match byte for byte. The payload structs below fix
//! the key order through their declared field order (alphabetical, which is
//! what the registry expects); serde_json emits struct fields in declaration
//! order without whitespace.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

use super::spc::ServiceProviderCode;
use crate::types::Result;

/// Prefix of every fingerprint string
pub const FINGERPRINT_PREFIX: &str = "SHA256 ";

/// DER header of the TNAuthList SPC entry carried in the ATC `tkvalue`:
///
/// - `30 08`: SEQUENCE, 8 bytes
/// - `A0 06`: context tag [0] (ServiceProviderCode), 6 bytes
/// - `16 04`: IA5String, 4 bytes (the code itself follows)
pub const TKVALUE_HEADER: [u8; 6] = [0x30, 0x08, 0xA0, 0x06, 0x16, 0x04];

/// ATC `tktype` for service provider code authorization
pub const TKTYPE_TNAUTHLIST: &str = "TNAuthList";

/// Which registry operation a request is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationAction {
    /// Register a new account with its first service provider code
    Register,
    /// Add a code to an account already registered under a master code
    AddServiceProviderCode,
}

impl RegistrationAction {
    /// Wire name, used both in payloads and as the CPS endpoint path
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::AddServiceProviderCode => "addServiceProviderCode",
        }
    }
}

impl Serialize for RegistrationAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Fields hashed into the fingerprint sent with the SPC token request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintPayload<'a> {
    pub account_public_key: &'a str,
    pub action: RegistrationAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_service_provider_code: Option<&'a ServiceProviderCode>,
    pub service_provider_code: &'a ServiceProviderCode,
    pub timestamp: i64,
}

/// Fields signed by the account key; the fingerprint fields plus the SPC token
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignaturePayload<'a> {
    pub account_public_key: &'a str,
    pub action: RegistrationAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_service_provider_code: Option<&'a ServiceProviderCode>,
    pub service_provider_code: &'a ServiceProviderCode,
    pub spc_token: &'a str,
    pub timestamp: i64,
}

/// Serialize `fields` canonically and fingerprint the result
pub fn build_fingerprint<T: Serialize>(fields: &T) -> Result<String> {
    let canonical = serde_json::to_vec(fields)?;
    Ok(fingerprint_bytes(&canonical))
}

/// Fingerprint raw bytes: `SHA256 ` followed by the digest as uppercase,
/// colon-separated byte pairs (`SHA256 0A:1B:...`)
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let pairs: Vec<String> = digest.iter().map(|b| format!("{b:02X}")).collect();
    format!("{FINGERPRINT_PREFIX}{}", pairs.join(":"))
}

/// Raw TKValue bytes for a service provider code
pub fn tk_value_bytes(code: &ServiceProviderCode) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(TKVALUE_HEADER.len() + code.as_bytes().len());
    bytes.extend_from_slice(&TKVALUE_HEADER);
    bytes.extend_from_slice(code.as_bytes());
    bytes
}

/// Base64 TKValue for a service provider code
pub fn build_tk_value(code: &ServiceProviderCode) -> String {
    STANDARD.encode(tk_value_bytes(code))
}
