/**
 * JUTEEX KERNEL - Backend simulé du parc machines JuteEX
 *
 * RÔLE : Service de simulation et de gestion d'état qui tient lieu de vrai
 * backend : état canonique des machines, télémétrie avancée sur tick fixe,
 * règles de changement de mode, run logs à l'arrêt, sessions de location,
 * persistance JSON et notifications aux abonnés.
 *
 * ARCHITECTURE : Store central + bus de snapshots synchrone + tasks tokio
 * périodiques (tick télémétrie, autosave). Les consommateurs (dashboard,
 * CLI, tests) ne voient que des copies en lecture seule.
 */

pub mod bus;
pub mod config;
pub mod models;
pub mod modes;
pub mod persist;
pub mod store;
pub mod telemetry;
