mod cli;
mod config;
mod files;
mod keys;
mod storage;
mod tui;

use crate::cli::ConfigCommand;
use clap::{CommandFactory, Parser};
use color_eyre::{eyre::bail, Result};
use strongbox_accounts::CredentialStore;
use strongbox_core::storage::StoragePort;
use strongbox_vault::VaultStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const HEALTH_OWNER: &str = "health-probe";

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config = config::load()?;
    let Some(command) = cli.command else {
        cli::Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    match command {
        cli::Command::Version => print_version(),
        cli::Command::Health => run_health_check(&config).await?,
        cli::Command::Register { login } => {
            let store = storage::credential_store(&config)?;
            if !store.register(&login.user, &login.password).await? {
                bail!("account {} already exists", login.user);
            }
            println!("Registered {}", login.user);
        }
        cli::Command::Put { login, path, name } => {
            let session = files::login(&login, &config).await?;
            let vault = storage::open_vault(&config).await?;
            let record = files::put(&vault, &session, &path, name).await?;
            println!("Stored {} as {}", record, record.storage_key);
        }
        cli::Command::List { login } => {
            let session = files::login(&login, &config).await?;
            let vault = storage::open_vault(&config).await?;
            let records = files::list(&vault, &session).await?;
            if records.is_empty() {
                println!("No files yet. Add one with `strongbox put <path>`.");
            }
            for record in &records {
                println!("{}", files::describe(record));
            }
        }
        cli::Command::Get {
            login,
            storage_key,
            output,
        } => {
            let session = files::login(&login, &config).await?;
            let vault = storage::open_vault(&config).await?;
            let record = files::get(&vault, &session, &storage_key, &output).await?;
            println!("Restored {} to {}", record, output.display());
        }
        cli::Command::Rm { login, storage_key } => {
            let session = files::login(&login, &config).await?;
            let vault = storage::open_vault(&config).await?;
            let record = files::remove(&vault, &session, &storage_key).await?;
            println!("Deleted {record}");
        }
        cli::Command::Keys(cmd) => keys::handle(cmd, &config).await?,
        cli::Command::Config(ConfigCommand::Init) => init_config(&config)?,
        cli::Command::Tui { login } => {
            let session = files::login(&login, &config).await?;
            let vault = storage::open_vault(&config).await?;
            let records = files::list(&vault, &session).await?;
            tui::launch(session.owner_id(), &records)?
        }
    }

    Ok(())
}

fn init_tracing() {
    // Respect user-provided filters, default to info.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("strongbox {}", env!("CARGO_PKG_VERSION"));
}

/// Round-trips a probe file through the configured vault and keypair.
async fn run_health_check(config: &config::Config) -> Result<()> {
    let vault = storage::open_vault(config).await?;
    run_vault_health(&vault).await?;
    println!("Vault: ok");
    Ok(())
}

async fn run_vault_health<S: StoragePort>(vault: &VaultStore<S>) -> Result<()> {
    // Spans two cipher blocks.
    let payload = vec![0x5au8; 300];
    let record = vault.store(&payload, HEALTH_OWNER, "probe").await?;
    let round_trip = vault.open(&record, HEALTH_OWNER).await;
    vault.delete(&record, HEALTH_OWNER).await?;

    if round_trip? != payload {
        bail!("vault round-trip failed");
    }
    Ok(())
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}
