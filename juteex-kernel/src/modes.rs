/**
 * MODE CONTROLLER - Machine à états des modes de fonctionnement
 *
 * RÔLE : Règles de transition ECO / POWER / AUTO / IDLE, évaluées comme
 * effets de bord de setSpeed et du tick télémétrie (jamais rejetées).
 *
 * ARCHITECTURE : Fonctions pures (mode, signal) -> mode, testables
 * indépendamment du timing et des I/O.
 */

use crate::models::MachineMode;

/// Règles de mode appliquées quand la consigne de vitesse change.
///
/// Les trois règles s'évaluent dans l'ordre, sans exclusion mutuelle,
/// sur la valeur de mode courante (la dernière règle déclenchée gagne) :
/// 1. AUTO dérive le mode de la vitesse (> 65 -> POWER, sinon ECO)
/// 2. ECO avec vitesse > 65 force POWER
/// 3. POWER avec vitesse < 50 force ECO
///
/// IDLE n'est jamais atteint par ces règles.
pub fn apply_speed_rules(mut mode: MachineMode, speed: f64) -> MachineMode {
    if mode == MachineMode::Auto {
        mode = if speed > 65.0 {
            MachineMode::Power
        } else {
            MachineMode::Eco
        };
    }
    if mode == MachineMode::Eco && speed > 65.0 {
        mode = MachineMode::Power;
    }
    if mode == MachineMode::Power && speed < 50.0 {
        mode = MachineMode::Eco;
    }
    mode
}

/// Rétrogradation de protection évaluée à chaque tick : une machine en
/// POWER dont le RPM passe sous 50 redescend en ECO (moteur calé).
pub fn stall_downgrade(mode: MachineMode, rpm: f64) -> MachineMode {
    if mode == MachineMode::Power && rpm < 50.0 {
        MachineMode::Eco
    } else {
        mode
    }
}
