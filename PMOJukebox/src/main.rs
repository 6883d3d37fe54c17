use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use pmocontrol::{Jukebox, JukeboxExt};
use pmoconfig::get_config;
use pmoqueue::{PolicyKind, QueueManager};
use pmoserver::{LoggingOptions, ServerBuilder};
use pmostore::SqliteStore;
use tracing::{info, warn};

/// Recharge la file sauvegardée lors du dernier arrêt
async fn restore_queue(queue: &QueueManager, snapshot: &Path) {
    if !snapshot.exists() {
        info!(snapshot = %snapshot.display(), "No queue snapshot to restore");
        return;
    }

    match queue.load_playlist(snapshot).await {
        Ok(songs) => {
            let restored = queue.restore(songs).await;
            info!("📼 {} song(s) restored from {}", restored, snapshot.display());
        }
        Err(e) => warn!("⚠️ Failed to restore queue snapshot: {}", e),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ========== PHASE 1 : Configuration et logs ==========
    let config = get_config();

    let mut server = ServerBuilder::new_configured().build();
    server.init_logging(LoggingOptions::from_config()).await;
    let server_info = server.info();
    server
        .add_route("/info", move || {
            let server_info = server_info.clone();
            async move {
                serde_json::json!({
                    "server": server_info,
                    "version": env!("CARGO_PKG_VERSION"),
                })
            }
        })
        .await;

    // ========== PHASE 2 : Stockage et file d'attente ==========
    let db_path = config.get_database_path()?;
    info!("🗄️ Opening database {}", db_path.display());
    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("Cannot open database {}", db_path.display()))?;

    let policy = config.get_queue_policy()?;
    let policy = policy.parse::<PolicyKind>().unwrap_or_else(|e| {
        warn!("⚠️ {}, falling back to {}", e, PolicyKind::default());
        PolicyKind::default()
    });
    let queue = QueueManager::with_policy(policy);

    let snapshot = config.get_queue_snapshot_path()?;
    if config.get_queue_restore_on_start()? {
        restore_queue(&queue, &snapshot).await;
    }

    // ========== PHASE 3 : Jukebox et API ==========
    let jukebox = Arc::new(Jukebox::start(queue, Arc::new(store), Some(snapshot)));
    server.init_jukebox(jukebox.clone()).await;
    server.add_redirect("/", "/swagger-ui/jukebox").await;

    info!("🌐 Starting HTTP server...");
    server.start().await?;

    info!("✅ PMOJukebox is ready!");
    info!("Press Ctrl+C to stop...");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    // ========== PHASE 4 : Arrêt ==========
    info!("Ctrl+C reçu, arrêt gracieux");
    jukebox.stop().await;
    server.stop().await;

    Ok(())
}
