/**
 * PERSISTANCE - Slot durable de l'état du parc
 *
 * RÔLE : Chargement initial et sauvegarde de `{machines, runLogs}` dans un
 * fichier JSON versionné (changement de schéma = nouveau nom de slot, pas
 * de migration).
 *
 * FONCTIONNEMENT : Les échecs ne sont jamais fatals : lecture manquante ou
 * corrompue -> parc d'exemple ; écriture échouée -> warning et on continue.
 * Une task périodique resauvegarde en filet de sécurité.
 */

use crate::models::{sample_machines, FleetState, Machine, RunLog};
use crate::store::FleetStore;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, thiserror::Error)]
pub enum SlotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Blob tel que stocké : les deux listes sont optionnelles pour tolérer
/// les états partiels (liste absente -> valeur par défaut, comme la source).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredState {
    machines: Option<Vec<Machine>>,
    run_logs: Option<Vec<RunLog>>,
}

pub struct StateSlot {
    path: PathBuf,
}

impl StateSlot {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Charge l'état persisté ; toute défaillance retombe sur le parc
    /// d'exemple avec un journal vide, sans remonter d'erreur.
    pub fn load(&self) -> FleetState {
        match self.try_load() {
            Ok(Some(state)) => {
                log::info!(
                    "[persist] loaded {} machines / {} run logs from {:?}",
                    state.machines.len(),
                    state.run_logs.len(),
                    self.path
                );
                state
            }
            Ok(None) => {
                log::info!("[persist] no state file at {:?}, starting with sample fleet", self.path);
                Self::defaults()
            }
            Err(e) => {
                log::warn!("[persist] failed to load state ({e}), falling back to sample fleet");
                Self::defaults()
            }
        }
    }

    fn try_load(&self) -> Result<Option<FleetState>, SlotError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        let stored: StoredState = serde_json::from_str(&content)?;
        Ok(Some(FleetState {
            machines: stored.machines.unwrap_or_else(sample_machines),
            run_logs: stored.run_logs.unwrap_or_default(),
        }))
    }

    /// Sérialise et écrit l'état complet ; les échecs d'écriture sont
    /// avalés (warning) et ne remontent jamais au processus.
    pub fn save(&self, state: &FleetState) {
        if let Err(e) = self.try_save(state) {
            log::warn!("[persist] failed to save state to {:?}: {e}", self.path);
        }
    }

    fn try_save(&self, state: &FleetState) -> Result<(), SlotError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    fn defaults() -> FleetState {
        FleetState {
            machines: sample_machines(),
            run_logs: Vec::new(),
        }
    }
}

/// Sauvegarde périodique de filet : rattrape les mutations dont la
/// sauvegarde immédiate aurait échoué. Handle = poignée d'annulation.
pub fn spawn_autosave(store: Arc<FleetStore>, period: Duration) -> JoinHandle<()> {
    log::info!("[persist] starting autosave task (period: {:?})", period);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            interval.tick().await;
            store.persist();
        }
    })
}
