//! Main application entry point for the versus server.
//!
//! Provides the CLI interface, configuration loading, logging setup and
//! server startup, and waits for a termination signal to shut down.

mod cli;
mod config;
mod logging;
mod signals;

use cli::CliArgs;
use config::AppConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use versus_server::GameServer;

/// Main application struct.
pub struct Application {
    config: AppConfig,
    config_path: PathBuf,
    server: Arc<GameServer>,
}

impl Application {
    /// Creates the application from parsed command-line arguments.
    ///
    /// Loads the configuration file, applies CLI overrides, validates the
    /// result, installs logging and builds the server.
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = AppConfig::load_from_file(&args.config_path).await?;
        apply_overrides(&mut config, &args);

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }

        logging::setup_logging(&config.logging, args.json_logs)?;

        let server = Arc::new(GameServer::new(config.to_server_config()?));
        Ok(Self {
            config,
            config_path: args.config_path,
            server,
        })
    }

    /// Runs the server until a shutdown signal arrives.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let version = option_env!("CARGO_PKG_VERSION").unwrap_or("UNK");
        info!("🌟 Starting versus server v{}", version);
        info!("📋 Configuration Summary:");
        info!("  📂 Config file: {}", self.config_path.display());
        info!("  🌐 Bind address: {}", self.config.server.bind_address);
        info!("  🔑 Protocol version: {}", self.config.server.protocol_version);
        info!("  👥 Max connections: {}", self.config.server.max_connections);
        if let Some(seed) = self.config.server.rng_seed {
            info!("  🎲 Deterministic sessions from seed {}", seed);
        }

        let listener = self.server.bind()?;
        let server_handle = {
            let server = self.server.clone();
            tokio::spawn(async move { server.serve(listener).await })
        };

        info!("🛑 Press Ctrl+C to gracefully shutdown");
        signals::wait_for_shutdown_signal().await?;

        info!("🛑 Shutdown signal received, initiating graceful shutdown...");
        self.server.shutdown().await?;
        match server_handle.await {
            Ok(Ok(())) => info!("✅ Server completed successfully"),
            Ok(Err(e)) => error!("❌ Server error: {}", e),
            Err(e) => error!("❌ Server task failed: {}", e),
        }

        info!("👋 Versus server shutdown complete");
        Ok(())
    }
}

/// Applies command-line overrides on top of the file configuration.
fn apply_overrides(config: &mut AppConfig, args: &CliArgs) {
    if let Some(bind_address) = &args.bind_address {
        config.server.bind_address = bind_address.clone();
    }
    if let Some(protocol_version) = &args.protocol_version {
        config.server.protocol_version = protocol_version.clone();
    }
    if let Some(seed) = args.rng_seed {
        config.server.rng_seed = Some(seed);
    }
    if let Some(log_level) = &args.log_level {
        config.logging.level = log_level.clone();
    }
    if args.json_logs {
        config.logging.json_format = true;
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("❌ Failed to start application: {e}");
            std::process::exit(1);
        }
    }

    Ok(())
}
