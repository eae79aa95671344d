//! Attestation subjects and cache keys
//!
//! Publishers route attestations on
//! `{destinationSpc}.{destinationNumber}.{sourceSpc}.{sourceNumber}`.
//! The relay only keeps the number pair; the verifier looks attestations up
//! by called/calling number.

use std::fmt;

/// Prefix of every attestation cache key
pub const CACHE_KEY_PREFIX: &str = "oob";

/// Number of `.`-separated tokens in an attestation subject
pub const SUBJECT_TOKENS: usize = 4;

/// Why a subject could not be read as an attestation routing key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubjectError {
    #[error("expected 4 tokens, found {0}")]
    TokenCount(usize),
    #[error("token {0} is empty")]
    EmptyToken(usize),
}

/// A parsed attestation subject
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingKey<'a> {
    pub destination_spc: &'a str,
    pub destination_number: &'a str,
    pub source_spc: &'a str,
    pub source_number: &'a str,
}

impl<'a> RoutingKey<'a> {
    pub fn parse(subject: &'a str) -> Result<Self, SubjectError> {
        let tokens: Vec<&str> = subject.split('.').collect();
        if tokens.len() != SUBJECT_TOKENS {
            return Err(SubjectError::TokenCount(tokens.len()));
        }
        if let Some(index) = tokens.iter().position(|t| t.is_empty()) {
            return Err(SubjectError::EmptyToken(index));
        }

        Ok(Self {
            destination_spc: tokens[0],
            destination_number: tokens[1],
            source_spc: tokens[2],
            source_number: tokens[3],
        })
    }

    /// `oob:{destinationNumber}:{sourceNumber}`
    pub fn cache_key(&self) -> String {
        format!(
            "{CACHE_KEY_PREFIX}:{}:{}",
            self.destination_number, self.source_number
        )
    }
}

impl fmt::Display for RoutingKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.destination_spc, self.destination_number, self.source_spc, self.source_number
        )
    }
}
