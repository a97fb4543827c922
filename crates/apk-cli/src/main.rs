//! apkc - bootstrap and populate apk roots

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use apk_cli::cmd;
use apk_cli::{ArchCommands, Cli, Commands, KeysCommands, ReposCommands, WorldCommands};
use apk_core::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    let apk = cmd::open(&cli)?;

    match cli.command {
        Commands::Init => cmd::init::init(&apk),
        Commands::Keys { command } => match command {
            KeysCommands::Add {
                sources,
                system,
                system_dirs,
            } => cmd::keys::add(&apk, &cancel, &sources, system, system_dirs).await,
            KeysCommands::List {
                system,
                system_dirs,
            } => cmd::keys::list(&apk, system, &system_dirs),
        },
        Commands::Repos { command } => match command {
            ReposCommands::Set { uris } => cmd::repos::set(&apk, &uris),
            ReposCommands::List => cmd::repos::list(&apk),
        },
        Commands::World { command } => match command {
            WorldCommands::Set { names } => cmd::world::set(&apk, &names),
            WorldCommands::List => cmd::world::list(&apk),
        },
        Commands::Arch { command } => match command {
            ArchCommands::Set { arch } => cmd::arch::set(&apk, arch),
            ArchCommands::Show => cmd::arch::show(&apk),
        },
        Commands::Fetch {
            packages,
            repository,
            output,
        } => {
            cmd::fetch::fetch(
                &apk,
                &cancel,
                &packages,
                repository.as_deref(),
                output.as_deref(),
            )
            .await
        }
    }
}
