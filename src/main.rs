use std::sync::Arc;

use tracing::{error, info, warn};

use merchant_server::data::ItemRegistry;
use merchant_server::merchant::{MerchantRegistry, RestockScheduler};
use merchant_server::script::{HotReloadEvent, ScriptRegistry};
use merchant_server::{MerchantWorld, ServerConfig};

#[tokio::main]
async fn main() {
    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting merchant server with {:?}", config);

    // Load item registry from TOML files
    let mut item_registry = ItemRegistry::new();
    if let Err(e) = item_registry.load_from_directory(&config.data_dir) {
        error!("Failed to load item registry: {}", e);
    }

    // Load merchant definitions from TOML files
    let mut merchant_registry = MerchantRegistry::new();
    if let Err(e) = merchant_registry.load_from_directory(&config.data_dir) {
        error!("Failed to load merchant registry: {}", e);
    }

    // Load merchant scripts
    let script_registry = Arc::new(ScriptRegistry::new(&config.scripts_dir));
    if let Err(e) = script_registry.load_all() {
        error!("Failed to load merchant scripts: {}", e);
    }

    let world = match MerchantWorld::new(Arc::new(item_registry), script_registry) {
        Ok(world) => Arc::new(world),
        Err(e) => {
            error!("Failed to build menu dispatch table: {}", e);
            return;
        }
    };
    world.spawn_all(&merchant_registry);

    if config.hot_reload {
        match world.scripts().start_file_watcher() {
            Ok(mut rx) => {
                let world = Arc::clone(&world);
                tokio::spawn(async move {
                    while let Some(event) = rx.recv().await {
                        match event {
                            HotReloadEvent::Reloaded(name) => {
                                info!("Script hot-reload: {}", name);
                                world.reload_script(&name);
                            }
                            HotReloadEvent::Error(e) => error!("Script hot-reload error: {}", e),
                        }
                    }
                });
                info!("Script hot-reload enabled");
            }
            Err(e) => warn!("Failed to start script hot-reload: {}", e),
        }
    }

    let restock = RestockScheduler::new(config.restock_tick()).spawn(Arc::clone(&world));

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down");
    restock.abort();
}
