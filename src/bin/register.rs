//! oob-register - Register a service provider code with CPS
//!
//! Generates a new account key, registers it with CPS for the given code,
//! then writes the account seed and the relay's user credentials.
//!
//! Usage:
//!   oob-register ABCD --pa-user-id operator
//!
//! Environment variables:
//!   STI_PA_USER_ID - STI-PA user ID
//!   STI_PA_PASSWORD - STI-PA password (prompted for when not set)
//!   STI_PA_STAGING - Use the STI-PA staging environment (default: false)

use anyhow::Context;
use clap::Parser;

use oob_relay::{
    config::{parse_spc, LogArgs, RegistryArgs},
    credentials::CredentialStore,
    logging,
    registry::{HttpRegistry, RegistrationFlow, RegistrationRequest, ServiceProviderCode},
    Identity,
};

#[derive(Parser, Debug)]
#[command(name = "oob-register")]
#[command(about = "Register a service provider code and create relay credentials")]
#[command(version)]
struct Args {
    /// Service provider code to register
    #[arg(value_parser = parse_spc)]
    service_provider_code: ServiceProviderCode,

    /// Replace an existing account seed
    #[arg(long, default_value = "false")]
    force: bool,

    #[command(flatten)]
    registry: RegistryArgs,

    #[command(flatten)]
    log: LogArgs,
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    logging::init_tracing(&args.log);

    if let Err(e) = run(args).await {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let store = CredentialStore::new(&args.registry.account_seed_path, &args.registry.creds_path);
    if store.has_account().await && !args.force {
        anyhow::bail!(
            "{} already exists; use oob-add-spc to add a code to this account, or --force to replace it",
            store.account_seed_path().display()
        );
    }

    let credentials = args.registry.credentials()?;
    let registry = HttpRegistry::new(args.registry.endpoints())?;

    println!("Registering, this can take a minute, please wait...");

    let account = Identity::generate_account();
    let timestamp = RegistrationRequest::now();
    let request =
        RegistrationRequest::register(&account, args.service_provider_code.clone(), timestamp);

    RegistrationFlow::new(&registry)
        .run(&account, &request, &credentials)
        .await?;

    let saved = store.materialize(&account, timestamp).await.with_context(|| {
        format!(
            "CPS accepted {} for account {} but its credentials were not saved",
            args.service_provider_code,
            account.public_key()
        )
    })?;
    println!("Account seed saved to {}", saved.account_seed_path.display());
    println!("User credentials saved to {}", saved.creds_path.display());
    println!(
        "Successfully registered service provider code {}.",
        args.service_provider_code
    );
    Ok(())
}
