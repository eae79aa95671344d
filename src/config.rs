//! Configuration for the relay and the registration tools
//!
//! CLI arguments and environment variable handling using clap. Each binary
//! flattens the argument groups it needs.

use std::path::PathBuf;

use clap::{Args, Parser};

use crate::credentials::store::{ACCOUNT_SEED_FILE, USER_CREDS_FILE};
use crate::registry::{PaCredentials, RegistryEndpoints, ServiceProviderCode};
use crate::types::{OobError, Result};

/// Logging options shared by every binary
#[derive(Args, Debug, Clone)]
pub struct LogArgs {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,
}

/// NATS connection configuration
#[derive(Args, Debug, Clone)]
pub struct NatsArgs {
    /// NATS server URL
    #[arg(long, env = "NATS_URL", default_value = "tls://cps.transnexus.com:4222")]
    pub nats_url: String,

    /// Credentials file written by oob-register
    #[arg(long, env = "NATS_CREDS", default_value = USER_CREDS_FILE)]
    pub creds: PathBuf,

    /// Refuse to connect without TLS
    #[arg(long, env = "NATS_REQUIRE_TLS", default_value = "true", action = clap::ArgAction::Set)]
    pub require_tls: bool,

    /// Messages buffered per subscription before the server drops us as a slow consumer
    #[arg(long, env = "NATS_SUBSCRIPTION_CAPACITY", default_value = "1024")]
    pub subscription_capacity: usize,
}

/// Redis connection configuration
#[derive(Args, Debug, Clone)]
pub struct RedisArgs {
    /// Redis URL
    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    pub redis_url: String,
}

/// STI-PA and CPS registration configuration
#[derive(Args, Debug, Clone)]
pub struct RegistryArgs {
    /// Use the STI-PA staging environment
    #[arg(long, env = "STI_PA_STAGING", default_value = "false")]
    pub staging: bool,

    /// STI-PA user ID
    #[arg(long, env = "STI_PA_USER_ID")]
    pub pa_user_id: String,

    /// STI-PA password (prompted for when not set)
    #[arg(long, env = "STI_PA_PASSWORD", hide_env_values = true)]
    pub pa_password: Option<String>,

    /// Where the account seed is kept
    #[arg(long, env = "ACCOUNT_SEED_PATH", default_value = ACCOUNT_SEED_FILE)]
    pub account_seed_path: PathBuf,

    /// Where the user credentials are written
    #[arg(long, env = "NATS_CREDS", default_value = USER_CREDS_FILE)]
    pub creds_path: PathBuf,

    /// Override the STI-PA authentication API base URL
    #[arg(long, env = "STI_PA_AUTHENTICATE_URL")]
    pub authenticate_url: Option<String>,

    /// Override the CPS base URL
    #[arg(long, env = "CPS_URL")]
    pub cps_url: Option<String>,
}

impl RegistryArgs {
    /// Registry endpoints for the selected environment, with overrides applied
    pub fn endpoints(&self) -> RegistryEndpoints {
        let mut endpoints = RegistryEndpoints::for_environment(self.staging);
        if let Some(ref url) = self.authenticate_url {
            endpoints.authenticate_url = url.clone();
        }
        if let Some(ref url) = self.cps_url {
            endpoints.cps_url = url.clone();
        }
        endpoints
    }

    /// STI-PA credentials, prompting for the password when it was not given
    pub fn credentials(&self) -> Result<PaCredentials> {
        let password = match self.pa_password {
            Some(ref password) => password.clone(),
            None => dialoguer::Password::new()
                .with_prompt(format!("STI-PA password for {}", self.pa_user_id))
                .interact()
                .map_err(|e| OobError::Config(format!("Unable to read password: {e}")))?,
        };
        Ok(PaCredentials::new(self.pa_user_id.clone(), password))
    }
}

/// clap value parser for service provider codes
pub fn parse_spc(value: &str) -> std::result::Result<ServiceProviderCode, String> {
    value.parse().map_err(|e: OobError| match e {
        OobError::Config(message) => message,
        other => other.to_string(),
    })
}

/// Arguments of the `oob-relay` bridge
#[derive(Parser, Debug, Clone)]
#[command(name = "oob-relay")]
#[command(about = "Relay out-of-band call attestations from CPS into Redis")]
#[command(version)]
pub struct RelayArgs {
    #[command(flatten)]
    pub nats: NatsArgs,

    #[command(flatten)]
    pub redis: RedisArgs,

    #[command(flatten)]
    pub log: LogArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Parser, Debug)]
    struct RegistryCli {
        #[command(flatten)]
        registry: RegistryArgs,
    }

    #[test]
    fn test_relay_defaults() {
        let args = RelayArgs::try_parse_from(["oob-relay"]).unwrap();
        assert_eq!(args.nats.nats_url, "tls://cps.transnexus.com:4222");
        assert_eq!(args.nats.creds, PathBuf::from("user.creds"));
        assert!(args.nats.require_tls);
        assert_eq!(args.nats.subscription_capacity, 1024);
        assert_eq!(args.redis.redis_url, "redis://127.0.0.1:6379");
        assert_eq!(args.log.log_level, "info");
        assert!(!args.log.log_json);
    }

    #[test]
    fn test_relay_overrides() {
        let args = RelayArgs::try_parse_from([
            "oob-relay",
            "--nats-url",
            "nats://localhost:4222",
            "--require-tls",
            "false",
            "--redis-url",
            "redis://cache:6379/1",
        ])
        .unwrap();
        assert_eq!(args.nats.nats_url, "nats://localhost:4222");
        assert!(!args.nats.require_tls);
        assert_eq!(args.redis.redis_url, "redis://cache:6379/1");
    }

    #[test]
    fn test_registry_endpoint_overrides() {
        let cli = RegistryCli::try_parse_from([
            "oob-register",
            "--pa-user-id",
            "operator",
            "--staging",
            "--cps-url",
            "http://127.0.0.1:9000",
        ])
        .unwrap();
        let endpoints = cli.registry.endpoints();
        assert_eq!(
            endpoints.authenticate_url,
            "https://authenticate-api-stg.iconectiv.com"
        );
        assert_eq!(endpoints.cps_url, "http://127.0.0.1:9000");
        assert_eq!(cli.registry.account_seed_path, PathBuf::from("account.nk"));
        assert!(cli.registry.pa_password.is_none());
    }

    #[test]
    fn test_given_password_is_not_prompted() {
        let cli = RegistryCli::try_parse_from([
            "oob-register",
            "--pa-user-id",
            "operator",
            "--pa-password",
            "hunter2",
        ])
        .unwrap();
        let credentials = cli.registry.credentials().unwrap();
        assert_eq!(credentials.user_id, "operator");
        assert_eq!(credentials.password.as_str(), "hunter2");
    }

    #[test]
    fn test_attestation_ttl_is_not_configurable() {
        let err =
            RelayArgs::try_parse_from(["oob-relay", "--attestation-ttl-secs", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_parse_spc() {
        assert_eq!(parse_spc("AB12").unwrap().as_str(), "AB12");
        let err = parse_spc("ab12").unwrap_err();
        assert!(err.contains("exactly 4 characters"));
    }
}
