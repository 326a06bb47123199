/**
 * TELEMETRY SIMULATOR - Simulation physique du parc machines
 *
 * RÔLE : Avance les mesures de chaque machine sur un tick périodique :
 * RPM avec bruit, montée en température liée à la vitesse, efficacité,
 * courant selon le mode, refroidissement des machines à l'arrêt.
 *
 * ARCHITECTURE : `advance_machine` est déterministe (le jitter est injecté
 * en paramètre) ; `advance_fleet` tire le bruit ; la boucle périodique est
 * une task tokio dont le JoinHandle sert de poignée d'annulation.
 *
 * UTILITÉ : Tient lieu de pipeline d'ingestion télémétrie réel — un
 * déploiement sur vrai matériel remplace ce module par un récepteur
 * protocole en conservant le même contrat de mise à jour.
 */

use crate::models::{ConnectionStatus, FleetState, Machine, MachineMode, MachineStatus};
use crate::modes;
use crate::store::FleetStore;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const RPM_MAX: f64 = 3000.0;
const RPM_JITTER_GAIN: f64 = 30.0;
const RPM_COOLDOWN_STEP: f64 = 150.0;
const TEMP_MIN: f64 = 20.0;
const TEMP_MAX: f64 = 95.0;
const TEMP_COOLDOWN_STEP: f64 = 0.2;
const EFFICIENCY_MIN: f64 = 70.0;
const EFFICIENCY_MAX: f64 = 100.0;
/// Vitesse à laquelle l'efficacité est maximale
const EFFICIENCY_SWEET_SPOT: f64 = 65.0;
const CURRENT_FLOOR_AMPS: f64 = 0.5;

/// Avance une machine d'un tick. `jitter` est un bruit dans [-1, 1].
pub fn advance_machine(machine: &mut Machine, jitter: f64, now: i64) {
    if machine.status == MachineStatus::Running {
        let t = &machine.telemetry;
        let rpm = (t.rpm + jitter * RPM_JITTER_GAIN).clamp(0.0, RPM_MAX);

        // protection : POWER calé (< 50 RPM) redescend en ECO
        machine.current_mode = modes::stall_downgrade(machine.current_mode, rpm);

        let heat_rise = t.speed / 100.0 * 0.2;
        let motor_temp = (t.motor_temp + heat_rise + jitter * 0.05).clamp(TEMP_MIN, TEMP_MAX);

        let eff_base = 100.0 - (t.speed - EFFICIENCY_SWEET_SPOT).abs() * 0.5;
        let efficiency = (eff_base + jitter).clamp(EFFICIENCY_MIN, EFFICIENCY_MAX).round();

        let mut amps_base = 2.0 + t.speed / 100.0 * 10.0;
        match machine.current_mode {
            MachineMode::Power => amps_base *= 1.25,
            MachineMode::Eco => amps_base *= 0.85,
            _ => {}
        }
        let amps = (amps_base + jitter * 0.5).max(CURRENT_FLOOR_AMPS);

        let t = &mut machine.telemetry;
        t.rpm = rpm;
        t.motor_temp = motor_temp;
        t.efficiency = efficiency;
        t.current = (amps * 10.0).round() / 10.0;
        t.runtime += 1;
        t.connection_status = ConnectionStatus::Live;
        t.last_seen = now;
    } else {
        // refroidissement : le RPM et la température retombent, courant nul
        let t = &mut machine.telemetry;
        t.rpm = (t.rpm - RPM_COOLDOWN_STEP).max(0.0);
        t.motor_temp = (t.motor_temp - TEMP_COOLDOWN_STEP).max(TEMP_MIN);
        t.current = 0.0;
        t.connection_status = ConnectionStatus::Live;
        t.last_seen = now;
    }
}

/// Une passe complète du simulateur : chaque machine avance avec son propre bruit.
pub fn advance_fleet(state: &mut FleetState, now: i64) {
    let mut rng = rand::thread_rng();
    for machine in &mut state.machines {
        let jitter: f64 = rng.gen_range(-1.0..=1.0);
        advance_machine(machine, jitter, now);
    }
}

/// Démarre la boucle de tick périodique. Le handle rendu permet d'arrêter
/// la simulation (`abort`) ; il n'y a pas d'autre mécanisme d'annulation.
pub fn spawn_telemetry_simulator(store: Arc<FleetStore>, period: Duration) -> JoinHandle<()> {
    log::info!("[telemetry] starting simulator (period: {:?})", period);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // la première échéance d'un interval tokio est immédiate, on la saute
        interval.tick().await;
        loop {
            interval.tick().await;
            store.tick();
        }
    })
}
