use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct KernelConfig {
    /// Slot de persistance versionné (changement de schéma = nouveau fichier)
    pub data_file: String,
    pub tick_interval_secs: u64,
    pub autosave_interval_secs: u64,
    pub rental_commit_delay_ms: u64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            data_file: "./data/fleet_state_v4.json".into(),
            tick_interval_secs: 1,
            autosave_interval_secs: 5,
            rental_commit_delay_ms: 500,
        }
    }
}

pub async fn load_config() -> KernelConfig {
    let path = std::env::var("JUTEEX_KERNEL_CONFIG").unwrap_or_else(|_| "kernel.yaml".into());
    if Path::new(&path).exists() {
        let txt = fs::read_to_string(&path).await.unwrap_or_default();
        if txt.trim().is_empty() {
            return KernelConfig::default();
        }
        serde_yaml::from_str(&txt).unwrap_or_else(|e| {
            log::warn!("[kernel] config invalide: {e}");
            KernelConfig::default()
        })
    } else {
        log::info!("[kernel] pas de kernel.yaml, usage config par défaut");
        KernelConfig::default()
    }
}
