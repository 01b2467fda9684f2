use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

use secunda::config::Settings;
use secunda::seed::populate_if_empty;
use secunda::server::{start_server, AppState};
use secunda::storage::{InMemoryStorage, Storage};
use secunda::{DirectoryService, Result};

#[derive(Parser)]
#[command(name = "secunda")]
#[command(about = "Directory service for buildings, organizations and practice categories")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Use the Turso/libSQL backend instead of the in-memory store
    #[cfg(feature = "db")]
    #[arg(long, global = true)]
    database: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the store (if empty) and serve the HTTP API
    Serve {
        /// Port override; defaults to the PORT environment variable or 8080
        #[arg(long)]
        port: Option<u16>,
    },
    /// Populate the store with the demo dataset and exit
    Seed,
}

#[cfg(feature = "db")]
async fn create_storage(database: bool) -> Result<Arc<dyn Storage>> {
    if database {
        Ok(Arc::new(secunda::storage::DatabaseStorage::new().await?))
    } else {
        Ok(Arc::new(InMemoryStorage::new()))
    }
}

#[cfg(not(feature = "db"))]
async fn create_storage() -> Result<Arc<dyn Storage>> {
    Ok(Arc::new(InMemoryStorage::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    secunda::logging::init_logging();

    let cli = Cli::parse();

    #[cfg(feature = "db")]
    let storage = create_storage(cli.database).await?;
    #[cfg(not(feature = "db"))]
    let storage = create_storage().await?;

    match cli.command {
        Commands::Serve { port } => {
            let settings = Settings::from_env()?;
            populate_if_empty(storage.as_ref()).await?;

            let state = AppState {
                service: DirectoryService::new(storage),
                api_key: settings.api_key.clone(),
            };
            let port = port.unwrap_or(settings.port);
            start_server(state, port).await?;
        }
        Commands::Seed => {
            populate_if_empty(storage.as_ref()).await?;
            info!("Seed command finished");
        }
    }
    Ok(())
}
