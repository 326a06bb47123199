/**
 * JUTEEX KERNEL - Point d'entrée du service de simulation
 *
 * RÔLE : Bootstrap : config, rechargement de l'état persisté, démarrage des
 * boucles périodiques (tick télémétrie + autosave), arrêt propre sur Ctrl-C
 * avec sauvegarde finale.
 */

use juteex_kernel::config::load_config;
use juteex_kernel::persist::{spawn_autosave, StateSlot};
use juteex_kernel::store::FleetStore;
use juteex_kernel::telemetry::spawn_telemetry_simulator;

use anyhow::Result;
use log::info;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok(); // Ok si .env n'existe pas
    env_logger::init();

    let cfg = load_config().await;

    let slot = StateSlot::new(&cfg.data_file);
    let store = Arc::new(FleetStore::new(
        slot,
        Duration::from_millis(cfg.rental_commit_delay_ms),
    ));

    // observateur de trace : chaque snapshot diffusé passe par ici
    let subscription = store.subscribe(|snapshot| {
        log::debug!(
            "[bus] snapshot: {} machines, {} run logs",
            snapshot.machines.len(),
            snapshot.run_logs.len()
        );
    });

    let tick_task = spawn_telemetry_simulator(
        store.clone(),
        Duration::from_secs(cfg.tick_interval_secs),
    );
    let autosave_task = spawn_autosave(
        store.clone(),
        Duration::from_secs(cfg.autosave_interval_secs),
    );

    info!(
        "[kernel] fleet kernel running ({} machines, tick {}s, autosave {}s)",
        store.snapshot().machines.len(),
        cfg.tick_interval_secs,
        cfg.autosave_interval_secs
    );

    tokio::signal::ctrl_c().await?;

    info!("[kernel] shutting down");
    tick_task.abort();
    autosave_task.abort();
    subscription.unsubscribe();
    store.persist(); // sauvegarde finale avant sortie

    Ok(())
}
