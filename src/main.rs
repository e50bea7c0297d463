use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::{error, info};

use recipe_catalog::config::AppConfig;
use recipe_catalog::populate::export_catalog;
use recipe_catalog::{
    build_router, run_migration, AppState, ChatApiProvider, MemoryStore, MigrationOptions,
};

/// Recipe catalog backend
#[derive(Parser, Debug)]
#[command(name = "recipe-catalog")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the REST and admin routes
    Serve {
        /// Port to listen on (overrides server.port)
        #[arg(short, long, env = "CATALOG_PORT")]
        port: Option<u16>,
    },
    /// Import markdown collection files into the store
    Migrate {
        /// Directory with active collection files
        #[arg(long)]
        active: Option<PathBuf>,
        /// Directory with archived collection files
        #[arg(long)]
        archived: Option<PathBuf>,
    },
    /// Write every collection and recipe, populated, as JSON
    Export {
        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

async fn open_store(config: &AppConfig) -> recipe_catalog::Result<MemoryStore> {
    match &config.store.path {
        Some(path) => {
            info!("Store snapshot: {}", path.display());
            MemoryStore::open(path.clone()).await
        }
        None => {
            info!("No store path configured, keeping data in memory");
            Ok(MemoryStore::new())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let config = AppConfig::load()?;
    let store = open_store(&config).await?;

    match args.command {
        Command::Serve { port } => {
            let provider = ChatApiProvider::new(&config.chat)?;
            let addr = format!(
                "{}:{}",
                config.server.host,
                port.unwrap_or(config.server.port)
            );
            if config.server.admin_token.is_none() {
                info!("No admin token configured; /generate and /create will reject all requests");
            }

            let state = AppState::new(Arc::new(store), Arc::new(provider), config);
            let app = build_router(state);

            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!("recipe-catalog listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
        Command::Migrate { active, archived } => {
            let options = MigrationOptions {
                active_dir: active.unwrap_or(config.content.active_dir),
                archived_dir: archived.unwrap_or(config.content.archived_dir),
            };
            if let Err(e) = options.ensure_active_dir().await {
                error!("{}", e);
                return Err(e.into());
            }

            let report = run_migration(&store, &options).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.errors.is_empty() {
                error!("{} records failed to migrate", report.errors.len());
            }
        }
        Command::Export { output } => {
            let export = export_catalog(&store).await?;
            let json = serde_json::to_string_pretty(&export)?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, json).await?;
                    info!(
                        "Exported {} collections and {} recipes to {}",
                        export.collections.len(),
                        export.recipes.len(),
                        path.display()
                    );
                }
                None => println!("{}", json),
            }
        }
    }

    Ok(())
}
