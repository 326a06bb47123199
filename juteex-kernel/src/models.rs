use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Horodatage courant en millisecondes epoch (format wire des timestamps).
pub fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Horodatage courant au format ISO (Rfc3339), pour le champ `date` des run logs.
pub fn now_iso() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MachineMode {
    Eco,
    Power,
    Auto,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MachineStatus {
    Running,
    Stopped,
    Error,
    Maintenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Live,
    Cached,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DurationUnit {
    Hours,
    Days,
}

impl DurationUnit {
    pub fn unit_ms(self) -> i64 {
        match self {
            DurationUnit::Hours => 3_600_000,
            DurationUnit::Days => 86_400_000,
        }
    }
}

/// Mesures temps réel d'une machine, mises à jour à chaque tick du simulateur.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryData {
    pub rpm: f64,
    /// Température moteur en °C
    pub motor_temp: f64,
    /// Secondes de fonctionnement depuis le dernier démarrage
    pub runtime: u64,
    pub jams: u32,
    pub last_anti_jam: Option<i64>,
    /// Pourcentage d'efficacité [70..100]
    pub efficiency: f64,
    /// Consigne de vitesse [0..100] (%)
    pub speed: f64,
    /// Courant en ampères
    pub current: f64,
    pub connection_status: ConnectionStatus,
    pub last_seen: i64,
}

/// Session de location : accès limité dans le temps à une machine.
/// L'expiration est un fait dérivé à la lecture, jamais une transition d'état.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalSession {
    pub start_time: i64,
    pub duration: f64,
    pub duration_unit: DurationUnit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renter_id: Option<String>,
}

impl RentalSession {
    /// Temps restant (ms) à l'instant `now_ms` ; <= 0 signifie session expirée.
    pub fn remaining_ms_at(&self, now_ms: i64) -> i64 {
        self.start_time + (self.duration * self.duration_unit.unit_ms() as f64) as i64 - now_ms
    }

    pub fn remaining_ms(&self) -> i64 {
        self.remaining_ms_at(now_ms())
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.remaining_ms_at(now_ms) <= 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    pub id: String,
    pub name: String,
    pub model: String,
    pub status: MachineStatus,
    pub current_mode: MachineMode,
    pub telemetry: TelemetryData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rental_session: Option<RentalSession>,
}

/// Enregistrement historique immuable d'une session de fonctionnement.
/// Créé uniquement à la transition RUNNING -> STOPPED, jamais modifié ensuite.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunLog {
    pub id: String,
    pub machine_id: String,
    /// Nom de la machine figé au moment de l'arrêt (dénormalisé)
    pub machine_name: String,
    pub start_time: i64,
    pub end_time: i64,
    /// Durée en secondes (= runtime au moment de l'arrêt)
    pub duration: u64,
    pub mode: MachineMode,
    pub jams: u32,
    pub avg_speed: f64,
    pub avg_efficiency: f64,
    pub date: String,
}

/// État complet du parc : la source de vérité du store, et le format
/// des snapshots livrés aux abonnés comme du blob persisté.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetState {
    pub machines: Vec<Machine>,
    pub run_logs: Vec<RunLog>,
}

fn idle_telemetry(motor_temp: f64, runtime: u64, efficiency: f64) -> TelemetryData {
    TelemetryData {
        rpm: 0.0,
        motor_temp,
        runtime,
        jams: 0,
        last_anti_jam: None,
        efficiency,
        speed: 0.0,
        current: 0.0,
        connection_status: ConnectionStatus::Live,
        last_seen: now_ms(),
    }
}

/// Parc d'exemple chargé quand aucun état persisté n'est disponible.
pub fn sample_machines() -> Vec<Machine> {
    let now = now_ms();
    vec![
        Machine {
            id: "m1".into(),
            name: "JRM 350".into(),
            model: "Ribbon Pro 2024".into(),
            status: MachineStatus::Stopped,
            current_mode: MachineMode::Eco,
            telemetry: idle_telemetry(24.0, 120, 95.0),
            thumbnail_url: None,
            rental_session: None,
        },
        Machine {
            id: "m2".into(),
            name: "Field Runner 3000".into(),
            model: "Ribbon Lite".into(),
            status: MachineStatus::Maintenance,
            current_mode: MachineMode::Idle,
            telemetry: TelemetryData {
                connection_status: ConnectionStatus::Offline,
                last_seen: now - 3_600_000, // vue il y a une heure
                ..idle_telemetry(22.0, 0, 100.0)
            },
            thumbnail_url: None,
            rental_session: None,
        },
        Machine {
            id: "m3".into(),
            name: "Community Share #1".into(),
            model: "Ribbon Eco 200 (Rented)".into(),
            status: MachineStatus::Running,
            current_mode: MachineMode::Auto,
            telemetry: TelemetryData {
                rpm: 1850.0,
                motor_temp: 42.0,
                runtime: 2450,
                jams: 0,
                last_anti_jam: None,
                efficiency: 88.0,
                speed: 55.0,
                current: 3.8,
                connection_status: ConnectionStatus::Live,
                last_seen: now,
            },
            thumbnail_url: None,
            rental_session: Some(RentalSession {
                start_time: now - 45 * 60 * 1000, // location démarrée il y a 45 min
                duration: 4.0,
                duration_unit: DurationUnit::Hours,
                renter_id: Some("borrower-123".into()),
            }),
        },
    ]
}
