//! oob-add-spc - Add a service provider code to a registered account
//!
//! Signs with the account seed written by oob-register. The SPC token is
//! requested under the master code the account was registered with.
//!
//! Usage:
//!   oob-add-spc ABCD EFGH --pa-user-id operator

use clap::Parser;

use oob_relay::{
    config::{parse_spc, LogArgs, RegistryArgs},
    credentials::CredentialStore,
    logging,
    registry::{HttpRegistry, RegistrationFlow, RegistrationRequest, ServiceProviderCode},
};

#[derive(Parser, Debug)]
#[command(name = "oob-add-spc")]
#[command(about = "Add a service provider code to an account registered with CPS")]
#[command(version)]
struct Args {
    /// Master service provider code the account was registered with
    #[arg(value_parser = parse_spc)]
    master_service_provider_code: ServiceProviderCode,

    /// Service provider code to add
    #[arg(value_parser = parse_spc)]
    service_provider_code: ServiceProviderCode,

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
    let account = store.load_account().await?;

    let credentials = args.registry.credentials()?;
    let registry = HttpRegistry::new(args.registry.endpoints())?;

    println!("Registering, this can take a minute, please wait...");

    let request = RegistrationRequest::add_service_provider_code(
        &account,
        args.master_service_provider_code.clone(),
        args.service_provider_code.clone(),
        RegistrationRequest::now(),
    );

    RegistrationFlow::new(&registry)
        .run(&account, &request, &credentials)
        .await?;

    println!(
        "Successfully added service provider code {}.",
        args.service_provider_code
    );
    Ok(())
}
