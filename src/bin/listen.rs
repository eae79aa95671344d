//! oob-listen - Print every attestation on the bus
//!
//! Debugging aid. Connects with the same credentials as the relay and
//! prints each subject and body; nothing is stored.

use clap::Parser;
use futures::StreamExt;

use oob_relay::{
    bridge::{AttestationMessage, BusClient},
    config::{LogArgs, NatsArgs},
    credentials::load_envelope,
    logging,
};

#[derive(Parser, Debug)]
#[command(name = "oob-listen")]
#[command(about = "Print out-of-band attestations as they arrive")]
#[command(version)]
struct Args {
    #[command(flatten)]
    nats: NatsArgs,

    #[command(flatten)]
    log: LogArgs,
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    logging::init_tracing(&args.log);

    tokio::select! {
        result = run(&args) => {
            if let Err(e) = result {
                eprintln!("{e:#}");
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {}
    }
}

async fn run(args: &Args) -> anyhow::Result<()> {
    let envelope = load_envelope(&args.nats.creds).await?;
    let bus = BusClient::connect(&args.nats, &envelope, "oob-listen").await?;

    let mut attestations = bus.attestations().await?;
    while let Some(message) = attestations.next().await {
        println!("{}", render(&message));
    }
    Ok(())
}

/// Subject line, then the body (pretty-printed when it is JSON) and a blank line
fn render(message: &AttestationMessage) -> String {
    let body = serde_json::from_slice::<serde_json::Value>(&message.payload)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or_else(|_| String::from_utf8_lossy(&message.payload).into_owned());
    format!("Subject: {}\nMessage:\n{}\n", message.subject, body)
}
