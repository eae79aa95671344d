//! Service provider codes

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::OobError;

/// Length of a service provider code
pub const SPC_LEN: usize = 4;

/// A 4-character uppercase alphanumeric service provider code (e.g. `ABCD`, `1A2B`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceProviderCode(String);

impl ServiceProviderCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The code's ASCII bytes
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl FromStr for ServiceProviderCode {
    type Err = OobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = s.len() == SPC_LEN
            && s
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
        if !valid {
            return Err(OobError::Config(format!(
                "\"{s}\" must be exactly 4 characters long and only contain uppercase letters and numbers"
            )));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for ServiceProviderCode {
    type Error = OobError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ServiceProviderCode> for String {
    fn from(code: ServiceProviderCode) -> Self {
        code.0
    }
}

impl fmt::Display for ServiceProviderCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
