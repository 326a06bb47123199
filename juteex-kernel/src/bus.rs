/**
 * SNAPSHOT BUS - Diffusion synchrone des snapshots du parc
 *
 * RÔLE : Pub/sub typé : chaque mutation du store publie un snapshot complet
 * (machines + run logs) à tous les abonnés, de manière synchrone.
 *
 * FONCTIONNEMENT : Liste d'abonnés indexée par UUID ; la désinscription est
 * idempotente et reste sans effet (pas d'erreur) après disparition du bus.
 * La diffusion invoque les callbacks hors verrou : un abonné peut se
 * désinscrire, s'abonner ou muter le store depuis son propre callback.
 */

use crate::models::FleetState;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use uuid::Uuid;

type Listener = Arc<dyn Fn(&FleetState) + Send + Sync>;
type ListenerMap = Arc<Mutex<HashMap<Uuid, Listener>>>;

pub struct SnapshotBus {
    listeners: ListenerMap,
}

impl SnapshotBus {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Enregistre un abonné ; la livraison immédiate du snapshot courant
    /// est de la responsabilité du store (qui connaît l'état).
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&FleetState) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        self.listeners.lock().insert(id, Arc::new(listener));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Diffuse un snapshot à tous les abonnés, dans le flot d'exécution
    /// appelant. Les abonnés sont copiés hors du verrou avant l'appel :
    /// un callback qui rappelle le bus (désinscription, nouvel abonnement,
    /// mutation du store qui re-publie) ne s'interbloque pas. Un abonné
    /// ajouté pendant une diffusion n'est livré qu'à partir de la suivante.
    pub fn publish(&self, snapshot: &FleetState) {
        let listeners: Vec<Listener> = self.listeners.lock().values().cloned().collect();
        for listener in &listeners {
            listener(snapshot);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl Default for SnapshotBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Poignée de désinscription rendue par `subscribe`.
pub struct Subscription {
    id: Uuid,
    listeners: Weak<Mutex<HashMap<Uuid, Listener>>>,
}

impl Subscription {
    /// Désinscription idempotente : appeler plusieurs fois, ou après que le
    /// bus ait été détruit, est un no-op.
    pub fn unsubscribe(&self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.lock().remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_machines;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn snapshot() -> FleetState {
        FleetState {
            machines: sample_machines(),
            run_logs: vec![],
        }
    }

    #[test]
    fn publish_reaches_every_subscriber_synchronously() {
        let bus = SnapshotBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let h1 = hits.clone();
        let _s1 = bus.subscribe(move |_| {
            h1.fetch_add(1, Ordering::SeqCst);
        });
        let h2 = hits.clone();
        let _s2 = bus.subscribe(move |_| {
            h2.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(&snapshot());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unsubscribe_stops_delivery_and_is_idempotent() {
        let bus = SnapshotBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = hits.clone();
        let sub = bus.subscribe(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(&snapshot());
        sub.unsubscribe();
        sub.unsubscribe(); // double désinscription tolérée
        bus.publish(&snapshot());

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn listener_may_unsubscribe_itself_during_delivery() {
        let bus = SnapshotBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        // la poignée est déposée dans un slot partagé pour que le callback
        // puisse se désinscrire lui-même (observateur one-shot)
        let slot: Arc<parking_lot::Mutex<Option<Subscription>>> =
            Arc::new(parking_lot::Mutex::new(None));

        let h = hits.clone();
        let s = slot.clone();
        let sub = bus.subscribe(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
            if let Some(sub) = s.lock().take() {
                sub.unsubscribe();
            }
        });
        *slot.lock() = Some(sub);

        bus.publish(&snapshot());
        bus.publish(&snapshot());

        // une seule livraison : la désinscription depuis le callback a pris
        // effet sans interbloquer la diffusion
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn listener_may_subscribe_another_observer_during_delivery() {
        let bus = Arc::new(SnapshotBus::new());
        let hits = Arc::new(AtomicUsize::new(0));
        let held: Arc<parking_lot::Mutex<Vec<Subscription>>> =
            Arc::new(parking_lot::Mutex::new(Vec::new()));

        let b = bus.clone();
        let h = hits.clone();
        let keep = held.clone();
        let _sub = bus.subscribe(move |_| {
            let h2 = h.clone();
            keep.lock().push(b.subscribe(move |_| {
                h2.fetch_add(1, Ordering::SeqCst);
            }));
        });

        bus.publish(&snapshot()); // ajoute un abonné pendant la diffusion
        bus.publish(&snapshot()); // ... qui n'est livré qu'à partir d'ici

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_after_bus_dropped_is_a_noop() {
        let bus = SnapshotBus::new();
        let sub = bus.subscribe(|_| {});
        drop(bus);
        sub.unsubscribe(); // ne doit pas paniquer
    }
}
