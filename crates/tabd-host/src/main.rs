mod cli;
mod config;
mod host;
mod messaging;
mod storage;

use std::{ffi::OsString, fs::OpenOptions, io, path::Path, sync::Mutex};

use crate::cli::{Command, ConfigCommand};
use color_eyre::Result;
use tabd_core::{
    clipboard::ClipboardRepository,
    storage::{SecureStore, SecureStoreError},
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log file written inside the installation directory when debugging is enabled.
const LOG_FILE: &str = "native-host.log";
/// Setting this to a non-empty value turns on file logging, like `debug = true` in config.
const DEBUG_ENV: &str = "TABD_DEBUG";

/// Entry point: browsers launch the messaging loop, people run subcommands.
fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = cli::Cli::from_args(std::env::args().collect());
    let mut config = config::load()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    let command = cli.command.unwrap_or(Command::Host);
    match command {
        Command::Version => print_version(),
        Command::Config(ConfigCommand::Init) => init_config(&config)?,
        command => {
            let install_dir = storage::install_dir(&config)?;
            let debug = debug_enabled(config.debug, std::env::var_os(DEBUG_ENV));
            init_tracing(&install_dir, debug)?;
            run_storage_command(command, &config)?;
        }
    }

    Ok(())
}

fn debug_enabled(from_config: bool, env_value: Option<OsString>) -> bool {
    from_config || env_value.is_some_and(|value| !value.is_empty())
}

fn init_tracing(install_dir: &Path, debug: bool) -> Result<()> {
    // Stdout carries protocol frames, so logs go to a file or stderr only.
    let (file_layer, stderr_layer, default_filter) = if debug {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(install_dir.join(LOG_FILE))?;
        let layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file));
        (Some(layer), None, "debug")
    } else {
        let layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(io::stderr);
        (None, Some(layer), "off")
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
    Ok(())
}

fn print_version() {
    println!("tabd-native-host {}", env!("CARGO_PKG_VERSION"));
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}

fn run_storage_command(command: Command, config: &config::Config) -> Result<()> {
    let repo = storage::open_repo(config)?;
    match command {
        Command::Host => {
            let host = host::NativeHost::new(repo);
            host.run(&mut io::stdin().lock(), &mut io::stdout().lock())?;
            info!("native host shutdown");
        }
        Command::GetClipboard => print_latest(&repo)?,
        Command::Clear => {
            if repo
                .clear()
                .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?
            {
                println!("Clipboard snapshot removed.");
            } else {
                println!("Nothing stored yet.");
            }
        }
        Command::Health => {
            run_store_health(repo.backend())?;
            println!("Storage: ok");
        }
        Command::Version | Command::Config(_) => {}
    }
    Ok(())
}

fn print_latest<R: ClipboardRepository>(repo: &R) -> Result<()> {
    let data = repo
        .latest()
        .map_err(|e| color_eyre::eyre::eyre!("failed to retrieve clipboard data: {e}"))?
        .ok_or_else(|| color_eyre::eyre::eyre!("no clipboard data stored yet"))?;
    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}

/// Round trip through the selected backend with a probe record.
fn run_store_health<S: SecureStore>(store: &S) -> Result<()> {
    let probe_key = "health_probe";
    let payload = b"ok";
    store
        .store(probe_key, payload)
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    let round_trip = store
        .retrieve(probe_key)
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    match store.delete(probe_key) {
        Ok(()) | Err(SecureStoreError::NotFound { .. }) => {}
        Err(e) => color_eyre::eyre::bail!(e.to_string()),
    }

    if round_trip != payload {
        color_eyre::eyre::bail!("storage round-trip failed");
    }
    Ok(())
}
