//! oob-relay - Attestation distribution bridge
//!
//! Subscribes to every attestation CPS publishes for this operator and
//! keeps each one in Redis under `oob:{destinationNumber}:{sourceNumber}`
//! for the verifier to look up.
//!
//! Usage:
//!   oob-relay --creds user.creds --redis-url redis://127.0.0.1:6379

use clap::Parser;
use tracing::{error, info};

use oob_relay::{
    bridge::{BusClient, Relay, RedisCache, ATTESTATION_TTL},
    config::RelayArgs,
    credentials::load_envelope,
    logging,
};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = RelayArgs::parse();
    logging::init_tracing(&args.log);

    info!("======================================");
    info!("  oob-relay - CPS attestation bridge");
    info!("======================================");
    info!("NATS: {}", args.nats.nats_url);
    info!("Credentials: {}", args.nats.creds.display());
    info!("Attestation TTL: {}s", ATTESTATION_TTL.as_secs());
    info!("======================================");

    tokio::select! {
        result = run(&args) => {
            if let Err(e) = result {
                error!("{:#}", e);
                std::process::exit(1);
            }
            info!("Attestation feed closed");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, exiting");
        }
    }
}

async fn run(args: &RelayArgs) -> anyhow::Result<()> {
    let envelope = load_envelope(&args.nats.creds).await?;

    // The cache has to be up before anything is taken off the bus
    let cache = RedisCache::connect(&args.redis).await?;

    let bus = BusClient::connect(&args.nats, &envelope, "oob-relay").await?;
    let attestations = bus.attestations().await?;

    let mut relay = Relay::new(cache);
    relay.run(attestations).await;
    Ok(())
}
