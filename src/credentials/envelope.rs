//! `.creds` envelope: a user JWT and the user's nkey seed in one text file
//!
//! ```text
//! -----BEGIN NATS USER JWT-----
//! eyJ0eXAiOiJqd3QiLCJhbGciOiJlZDI1NTE5In0...
//! ------END NATS USER JWT------
//! -----BEGIN USER NKEY SEED-----
//! SUAM...
//! ------END USER NKEY SEED------
//! ```
//!
//! Blocks are read positionally: the JWT block first, then the seed block.
//! Anything outside the blocks (banners, blank lines as written by `nsc`)
//! is ignored.

use zeroize::Zeroizing;

use crate::types::{OobError, Result};

pub const JWT_BEGIN: &str = "-----BEGIN NATS USER JWT-----";
pub const JWT_END: &str = "------END NATS USER JWT------";
pub const SEED_BEGIN: &str = "-----BEGIN USER NKEY SEED-----";
pub const SEED_END: &str = "------END USER NKEY SEED------";

/// Parsed contents of a `.creds` file
pub struct CredentialEnvelope {
    pub jwt: String,
    pub seed: Zeroizing<String>,
}

impl CredentialEnvelope {
    pub fn new(jwt: impl Into<String>, seed: Zeroizing<String>) -> Self {
        Self {
            jwt: jwt.into(),
            seed,
        }
    }

    /// Render the envelope text
    pub fn render(&self) -> Zeroizing<String> {
        Zeroizing::new(format!(
            "{JWT_BEGIN}\n{}\n{JWT_END}\n{SEED_BEGIN}\n{}\n{SEED_END}\n",
            self.jwt,
            self.seed.as_str()
        ))
    }

    /// Parse envelope text
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().map(str::trim);

        let jwt = read_block(&mut lines, JWT_BEGIN, JWT_END, "user JWT")?;
        let seed = read_block(&mut lines, SEED_BEGIN, SEED_END, "user seed")?;

        Ok(Self {
            jwt,
            seed: Zeroizing::new(seed),
        })
    }
}

impl std::fmt::Debug for CredentialEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialEnvelope")
            .field("jwt", &self.jwt)
            .field("seed", &"***")
            .finish()
    }
}

/// Skip to `begin`, take the first non-empty line, then require `end`
fn read_block<'a>(
    lines: &mut impl Iterator<Item = &'a str>,
    begin: &str,
    end: &str,
    what: &str,
) -> Result<String> {
    if !lines.any(|line| line == begin) {
        return Err(OobError::InvalidCredentials(format!("missing {what} block")));
    }

    let value = lines
        .find(|line| !line.is_empty())
        .ok_or_else(|| OobError::InvalidCredentials(format!("{what} block is truncated")))?;
    if value == end {
        return Err(OobError::InvalidCredentials(format!("{what} block is empty")));
    }

    match lines.find(|line| !line.is_empty()) {
        Some(line) if line == end => Ok(value.to_string()),
        _ => Err(OobError::InvalidCredentials(format!(
            "{what} block is not terminated by {end}"
        ))),
    }
}
