use std::path::{Path, PathBuf};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use carik_runtime::application::services::RuntimeSettings;
use carik_runtime::domain::traits::Transport;
use carik_runtime::infrastructure::adapters::ConsoleAdapter;
use carik_runtime::infrastructure::config::Config;
use carik_runtime::infrastructure::storage::JsonStore;
use carik_runtime::plugins::builtin::DEFAULT_MANIFESTS;
use carik_runtime::plugins::{ManagerOptions, PluginCatalog, PluginLoader, PluginManager};
use carik_runtime::{BotError, UpdateDispatcher};

#[derive(Parser)]
#[command(name = "carik-runtime")]
#[command(about = "Plugin runtime for chat bots", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Plugin directory (overrides config)
    #[arg(short, long)]
    plugins: Option<PathBuf>,

    /// Console user id the stdin messages come from
    #[arg(long, default_value = "console-user")]
    user: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the runtime with the console transport
    Run,
    /// Show version
    Version,
    /// Generate default config and built-in plugin manifests
    InitConfig,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run => run(&cli),
        Commands::Version => {
            println!("carik-runtime v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::InitConfig => init_config(&cli),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Config {
    let mut config = if Path::new(&cli.config).exists() {
        Config::load(&cli.config)
            .map(Config::with_env)
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to load config: {}, using defaults", e);
                Config::load_env()
            })
    } else {
        Config::load_env()
    };
    if let Some(dir) = &cli.plugins {
        config.plugins.directory = dir.clone();
    }
    config
}

fn run(cli: &Cli) -> Result<(), BotError> {
    let config = load_config(cli);
    block_on_bounded(run_runtime(config, cli.user.clone()))?
}

/// Drive `fut` to completion, then give blocking threads one second to finish.
///
/// The stdin reader sits on a blocking thread that cannot be interrupted.
fn block_on_bounded<F: Future>(fut: F) -> Result<F::Output, BotError> {
    let rt = tokio::runtime::Runtime::new().map_err(|e| BotError::Internal(e.to_string()))?;
    let output = rt.block_on(fut);
    rt.shutdown_timeout(Duration::from_secs(1));
    Ok(output)
}

async fn run_runtime(config: Config, console_user: String) -> Result<(), BotError> {
    tracing::info!("Starting {}", config.bot.name);

    let store = Arc::new(JsonStore::open(&config.storage.path).await?);
    let settings = RuntimeSettings::new(store).with_default_prefixes(config.runtime.prefixes.clone());
    if let Some(owner) = &config.admin.owner {
        settings.seed_owner(owner).await?;
    }
    if let Some(mode) = config.admin.account_mode {
        settings.seed_account_mode(mode).await?;
    }

    let transport: Arc<dyn Transport> = Arc::new(ConsoleAdapter::new(config.bot.username.clone(), console_user));
    let manager = PluginManager::new(
        PluginCatalog::with_builtins(),
        PluginLoader::new(&config.plugins.directory),
        Arc::clone(&transport),
        settings,
        ManagerOptions {
            handler_timeout: config.runtime.handler_timeout(),
        },
    );

    if config.plugins.auto_load {
        let report = manager.load_all().await?;
        tracing::info!("Plugin system initialized with {} plugins", report.loaded.len());
    }

    let (tx, rx) = mpsc::channel(64);
    let dispatcher = Arc::new(UpdateDispatcher::new(Arc::clone(&manager)));
    let dispatch = tokio::spawn(dispatcher.run(rx));

    tokio::select! {
        result = transport.start(tx) => {
            if let Err(e) = result {
                tracing::error!("Transport stopped: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
        }
    }

    manager.shutdown().await;
    dispatch.abort();
    Ok(())
}

fn init_config(cli: &Cli) -> Result<(), BotError> {
    let config = load_config(cli);
    let yaml = config.to_yaml()?;
    std::fs::write(&cli.config, yaml).map_err(|e| BotError::Internal(e.to_string()))?;
    println!("Config written to {}", cli.config);

    let dir = &config.plugins.directory;
    std::fs::create_dir_all(dir).map_err(|e| BotError::Internal(e.to_string()))?;
    for (file, manifest) in DEFAULT_MANIFESTS {
        let path = dir.join(file);
        if path.exists() {
            continue;
        }
        std::fs::write(&path, manifest).map_err(|e| BotError::Internal(e.to_string()))?;
        println!("Plugin manifest written to {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_stuck_blocking_reader_does_not_hold_exit() {
        let started = Instant::now();
        let output = block_on_bounded(async {
            // Stands in for a stdin read nobody will answer
            tokio::task::spawn_blocking(|| std::thread::sleep(Duration::from_secs(30)));
            7
        })
        .unwrap();

        assert_eq!(output, 7);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
