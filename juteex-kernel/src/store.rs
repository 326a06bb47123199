/**
 * FLEET STORE - Source de vérité de l'état du parc machines
 *
 * RÔLE : Détient la liste canonique des machines et le journal des runs.
 * Toute mutation passe par une opération nommée (toggle, setMode, setSpeed,
 * antiJam, startRental, tick) — pas d'écriture directe par les consommateurs.
 *
 * ARCHITECTURE : État partagé sous mutex + bus de snapshots synchrone.
 * Chaque opération applique TOUS ses changements de champs avant l'unique
 * diffusion : un abonné ne voit jamais de mutation partielle. Les ids
 * inconnus sont ignorés en silence (ni erreur, ni diffusion).
 *
 * UTILITÉ : Tient lieu de backend réel pour le dashboard et les harnais de
 * test ; instance construite explicitement au démarrage et injectée, jamais
 * un singleton ambiant.
 */

use crate::bus::{SnapshotBus, Subscription};
use crate::models::{
    now_iso, now_ms, DurationUnit, FleetState, Machine, MachineMode, MachineStatus, RentalSession,
    RunLog,
};
use crate::modes;
use crate::persist::StateSlot;
use crate::telemetry;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub type Shared<T> = Arc<Mutex<T>>;

/// Valeurs de démarrage d'une machine, pour éviter un état visuellement mort
const KICKSTART_SPEED: f64 = 20.0;
const KICKSTART_RPM: f64 = 500.0;

pub struct FleetStore {
    state: Shared<FleetState>,
    bus: SnapshotBus,
    slot: StateSlot,
    /// Aller-retour réseau simulé avant la prise d'effet d'une location
    rental_delay: Duration,
}

impl FleetStore {
    /// Construit le store en rechargeant l'état persisté (ou le parc
    /// d'exemple si le slot est vide / illisible).
    pub fn new(slot: StateSlot, rental_delay: Duration) -> Self {
        let state = slot.load();
        Self {
            state: Arc::new(Mutex::new(state)),
            bus: SnapshotBus::new(),
            slot,
            rental_delay,
        }
    }

    /// Copie en lecture seule de l'état complet.
    pub fn snapshot(&self) -> FleetState {
        self.state.lock().clone()
    }

    /// Abonne un observateur : le snapshot courant lui est livré
    /// immédiatement et de façon synchrone, puis à chaque changement.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&FleetState) + Send + Sync + 'static,
    {
        listener(&self.snapshot());
        self.bus.subscribe(listener)
    }

    /// Démarre une machine à l'arrêt, ou l'arrête en synthétisant un run log.
    ///
    /// À l'arrêt, les étapes (statut STOPPED, run log en tête de journal,
    /// remise à zéro runtime/rpm/speed) sont atomiques vis-à-vis des
    /// abonnés : une seule diffusion après l'ensemble.
    pub fn toggle_machine_state(&self, id: &str) {
        {
            let mut state = self.state.lock();
            let Some(idx) = state.machines.iter().position(|m| m.id == id) else {
                return;
            };

            if state.machines[idx].status == MachineStatus::Running {
                let log = close_run(&state.machines[idx]);
                log::info!(
                    "[store] machine {} stopped after {}s (mode {:?}, {} jams)",
                    id,
                    log.duration,
                    log.mode,
                    log.jams
                );
                let machine = &mut state.machines[idx];
                machine.status = MachineStatus::Stopped;
                machine.telemetry.runtime = 0;
                machine.telemetry.rpm = 0.0;
                machine.telemetry.speed = 0.0;
                machine.telemetry.current = 0.0; // invariant : courant nul hors RUNNING
                state.run_logs.insert(0, log); // journal ordonné du plus récent au plus ancien
            } else {
                let machine = &mut state.machines[idx];
                machine.status = MachineStatus::Running;
                machine.telemetry.runtime = 0;
                machine.telemetry.speed = KICKSTART_SPEED;
                machine.telemetry.rpm = KICKSTART_RPM;
                log::info!("[store] machine {} started", id);
            }
        }
        self.commit();
    }

    /// Change le mode sans condition (la confirmation des transitions à
    /// risque, ex. entrée en POWER, est du ressort de l'appelant).
    pub fn set_mode(&self, id: &str, mode: MachineMode) {
        {
            let mut state = self.state.lock();
            let Some(machine) = state.machines.iter_mut().find(|m| m.id == id) else {
                return;
            };
            machine.current_mode = mode;
        }
        self.commit();
    }

    /// Fixe la consigne de vitesse (bornée à [0, 100]) et applique les
    /// règles de mode dépendantes de la vitesse.
    pub fn set_speed(&self, id: &str, speed: f64) {
        let speed = speed.clamp(0.0, 100.0);
        {
            let mut state = self.state.lock();
            let Some(machine) = state.machines.iter_mut().find(|m| m.id == id) else {
                return;
            };
            machine.telemetry.speed = speed;
            machine.current_mode = modes::apply_speed_rules(machine.current_mode, speed);
        }
        self.commit();
    }

    /// Action opérateur anti-bourrage : incrémente le compteur de jams et
    /// horodate l'intervention.
    pub fn trigger_anti_jam(&self, id: &str) {
        {
            let mut state = self.state.lock();
            let Some(machine) = state.machines.iter_mut().find(|m| m.id == id) else {
                return;
            };
            machine.telemetry.jams += 1;
            machine.telemetry.last_anti_jam = Some(now_ms());
            log::info!("[store] anti-jam triggered on {} (total: {})", id, machine.telemetry.jams);
        }
        self.commit();
    }

    /// Attache une session de location à la machine, en remplaçant toute
    /// session antérieure. L'effet n'est committé qu'après le délai simulé :
    /// un appelant qui veut lire l'état engagé doit attendre la complétion.
    pub async fn start_rental(&self, machine_id: &str, duration: f64, unit: DurationUnit) {
        tokio::time::sleep(self.rental_delay).await;
        {
            let mut state = self.state.lock();
            let Some(machine) = state.machines.iter_mut().find(|m| m.id == machine_id) else {
                return;
            };
            machine.rental_session = Some(RentalSession {
                start_time: now_ms(),
                duration,
                duration_unit: unit,
                renter_id: Some("temp-renter".into()),
            });
            log::info!("[store] rental started on {} ({} {:?})", machine_id, duration, unit);
        }
        self.commit();
    }

    /// Une passe du simulateur télémétrie sur tout le parc, suivie d'une
    /// diffusion. Appelée par la boucle périodique, ou directement par les
    /// tests pour un tick déterministe.
    pub fn tick(&self) {
        let snapshot = {
            let mut state = self.state.lock();
            telemetry::advance_fleet(&mut state, now_ms());
            state.clone()
        };
        // le tick ne sauvegarde pas : la task d'autosave s'en charge
        self.bus.publish(&snapshot);
    }

    /// Sauvegarde immédiate de l'état courant (autosave et arrêt propre).
    pub fn persist(&self) {
        self.slot.save(&self.snapshot());
    }

    // Diffusion + sauvegarde après une opération de mutation.
    fn commit(&self) {
        let snapshot = self.snapshot();
        self.bus.publish(&snapshot);
        self.slot.save(&snapshot);
    }
}

/// Synthétise le run log d'une machine en cours de fonctionnement, à
/// l'instant de son arrêt. Les valeurs instantanées de vitesse et
/// d'efficacité tiennent lieu de moyennes de session.
fn close_run(machine: &Machine) -> RunLog {
    let now = now_ms();
    RunLog {
        id: Uuid::new_v4().to_string(),
        machine_id: machine.id.clone(),
        machine_name: machine.name.clone(),
        start_time: now - machine.telemetry.runtime as i64 * 1000,
        end_time: now,
        duration: machine.telemetry.runtime,
        mode: machine.current_mode,
        jams: machine.telemetry.jams,
        avg_speed: machine.telemetry.speed,
        avg_efficiency: machine.telemetry.efficiency,
        date: now_iso(),
    }
}
