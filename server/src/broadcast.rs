//! Periodic personalized state broadcast
//!
//! Every tick the scheduler copies the registry under its lock, releases the
//! lock, and then builds and sends one personalized [`ClientGameState`] per
//! connection. A connection whose sink is closed, or whose queue is full
//! because the peer stopped reading, is deregistered without affecting
//! delivery to anybody else.

use crate::registry::{ServerSnapshot, SharedRegistry};
use log::{debug, error, info, warn};
use shared::{encode_line, ClientGameState, Identity, Message, Position};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{interval, MissedTickBehavior};

/// Outcome of one broadcast tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections that were handed a snapshot
    pub delivered: usize,
    /// Connections whose sink was closed or full
    pub dropped: Vec<Identity>,
}

/// Builds the view of `positions` as seen by `id`
///
/// Returns None when `id` is not part of the snapshot.
pub fn personalize(id: &str, positions: &HashMap<Identity, Position>) -> Option<ClientGameState> {
    let you = *positions.get(id)?;
    let others = positions
        .iter()
        .filter(|(other, _)| other.as_str() != id)
        .map(|(other, position)| (other.clone(), *position))
        .collect();

    Some(ClientGameState { you, others })
}

/// Sends a personalized copy of `snapshot` to every recipient in it
///
/// Never waits on a slow peer. Returns the identities whose sink was closed or
/// full; nothing is deregistered here.
pub fn deliver(snapshot: &ServerSnapshot) -> BroadcastReport {
    let mut report = BroadcastReport::default();

    for (id, outbound) in &snapshot.recipients {
        let Some(state) = personalize(id, &snapshot.positions) else {
            continue;
        };

        let line = match encode_line(&Message::StateUpdate(state)) {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to encode state for {}: {}", id, e);
                continue;
            }
        };

        match outbound.try_send(line) {
            Ok(()) => report.delivered += 1,
            Err(TrySendError::Full(_)) => {
                warn!("{} is not reading its updates", id);
                report.dropped.push(id.clone());
            }
            Err(TrySendError::Closed(_)) => report.dropped.push(id.clone()),
        }
    }

    report
}

/// Runs one broadcast tick against the shared registry
pub async fn broadcast_once(registry: &SharedRegistry) -> BroadcastReport {
    // Lock is held only for the copy
    let snapshot = registry.lock().await.snapshot();

    let report = deliver(&snapshot);

    if !report.dropped.is_empty() {
        let mut registry = registry.lock().await;
        for id in &report.dropped {
            if registry.deregister(id) {
                info!("Dropped {} after its connection stopped accepting updates", id);
            }
        }
    }

    report
}

/// Fixed-cadence driver for [`broadcast_once`]
pub struct Broadcaster {
    registry: SharedRegistry,
    period: Duration,
}

impl Broadcaster {
    /// Creates a broadcaster firing `rate` times per second
    ///
    /// A rate of zero is treated as one broadcast per second.
    pub fn new(registry: SharedRegistry, rate: u32) -> Self {
        Self {
            registry,
            period: Self::period_for(rate),
        }
    }

    pub fn period_for(rate: u32) -> Duration {
        Duration::from_millis(1000 / u64::from(rate.max(1)))
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Broadcasts forever at the configured cadence
    pub async fn run(self) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Broadcasting state every {:?}", self.period);

        let mut tick: u64 = 0;
        loop {
            ticker.tick().await;
            tick += 1;

            let report = broadcast_once(&self.registry).await;

            // Periodic monitoring
            if tick % 50 == 0 {
                debug!(
                    "Tick {}: {} snapshots sent, {} dropped",
                    tick,
                    report.delivered,
                    report.dropped.len()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Registry, OUTBOUND_CAPACITY};
    use shared::{decode_state_update, MoveCommand};
    use std::net::SocketAddr;
    use tokio::sync::mpsc;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn positions(entries: &[(&str, Position)]) -> HashMap<Identity, Position> {
        entries
            .iter()
            .map(|(id, position)| (id.to_string(), *position))
            .collect()
    }

    #[test]
    fn test_personalize_separates_viewer() {
        let snapshot = positions(&[("id1", 10), ("id2", -5), ("id3", 40)]);

        let state = personalize("id2", &snapshot).unwrap();
        assert_eq!(state.you, -5);
        assert_eq!(state.others.len(), 2);
        assert!(!state.others.contains_key("id2"));
        assert_eq!(state.others.get("id1"), Some(&10));
        assert_eq!(state.others.get("id3"), Some(&40));
    }

    #[test]
    fn test_personalize_invariant_for_every_identity() {
        let snapshot = positions(&[("id1", 0), ("id2", 5), ("id3", 10), ("id4", -15)]);

        for (id, position) in &snapshot {
            let state = personalize(id, &snapshot).unwrap();
            assert_eq!(state.you, *position);
            assert!(!state.others.contains_key(id));
            assert_eq!(state.others.len(), snapshot.len() - 1);
        }
    }

    #[test]
    fn test_personalize_alone() {
        let state = personalize("id1", &positions(&[("id1", 25)])).unwrap();
        assert_eq!(state.you, 25);
        assert!(state.others.is_empty());
    }

    #[test]
    fn test_personalize_unknown_identity() {
        assert!(personalize("id9", &positions(&[("id1", 25)])).is_none());
    }

    #[test]
    fn test_broadcaster_period() {
        assert_eq!(Broadcaster::period_for(5), Duration::from_millis(200));
        assert_eq!(Broadcaster::period_for(20), Duration::from_millis(50));
        assert_eq!(Broadcaster::period_for(0), Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_broadcast_once_delivers_personalized_states() {
        let registry = Registry::shared();
        let (tx1, mut rx1) = mpsc::channel(OUTBOUND_CAPACITY);
        let (tx2, mut rx2) = mpsc::channel(OUTBOUND_CAPACITY);

        let (id1, id2) = {
            let mut registry = registry.lock().await;
            let id1 = registry.register(test_addr(), tx1);
            let id2 = registry.register(test_addr(), tx2);
            registry.apply_move(&id1, MoveCommand::MoveRight);
            (id1, id2)
        };

        let report = broadcast_once(&registry).await;
        assert_eq!(report.delivered, 2);
        assert!(report.dropped.is_empty());

        let line1 = rx1.try_recv().unwrap();
        assert!(line1.ends_with('\n'));
        let state1 = decode_state_update(line1.trim_end()).unwrap();
        assert_eq!(state1.you, 5);
        assert_eq!(state1.others.get(&id2), Some(&0));
        assert!(!state1.others.contains_key(&id1));

        let state2 = decode_state_update(rx2.try_recv().unwrap().trim_end()).unwrap();
        assert_eq!(state2.you, 0);
        assert_eq!(state2.others.get(&id1), Some(&5));
        assert!(!state2.others.contains_key(&id2));
    }

    #[tokio::test]
    async fn test_broadcast_once_isolates_closed_connection() {
        let registry = Registry::shared();
        let (tx_alive, mut rx_alive) = mpsc::channel(OUTBOUND_CAPACITY);
        let (tx_dead, rx_dead) = mpsc::channel(OUTBOUND_CAPACITY);

        let (alive, dead) = {
            let mut registry = registry.lock().await;
            (
                registry.register(test_addr(), tx_alive),
                registry.register(test_addr(), tx_dead),
            )
        };
        drop(rx_dead);

        let report = broadcast_once(&registry).await;
        assert_eq!(report.delivered, 1);
        assert_eq!(report.dropped, vec![dead.clone()]);

        // First tick still carried the dead peer, the snapshot predates its removal
        let first = decode_state_update(rx_alive.try_recv().unwrap().trim_end()).unwrap();
        assert!(first.others.contains_key(&dead));

        assert!(!registry.lock().await.contains(&dead));
        assert!(registry.lock().await.contains(&alive));

        let report = broadcast_once(&registry).await;
        assert_eq!(report.delivered, 1);
        assert!(report.dropped.is_empty());

        let second = decode_state_update(rx_alive.try_recv().unwrap().trim_end()).unwrap();
        assert!(second.others.is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_after_deregistration_omits_identity() {
        let registry = Registry::shared();
        let (tx1, mut rx1) = mpsc::channel(OUTBOUND_CAPACITY);
        let (tx2, _rx2) = mpsc::channel(OUTBOUND_CAPACITY);

        let (id1, id2) = {
            let mut registry = registry.lock().await;
            (
                registry.register(test_addr(), tx1),
                registry.register(test_addr(), tx2),
            )
        };
        assert_ne!(id1, id2);

        registry.lock().await.deregister(&id2);
        broadcast_once(&registry).await;

        let state = decode_state_update(rx1.try_recv().unwrap().trim_end()).unwrap();
        assert!(!state.others.contains_key(&id2));
    }

    #[tokio::test]
    async fn test_broadcast_drops_peer_that_stops_reading() {
        let registry = Registry::shared();
        let (tx_reader, mut rx_reader) = mpsc::channel(OUTBOUND_CAPACITY);
        let (tx_stalled, _rx_stalled) = mpsc::channel(OUTBOUND_CAPACITY);

        let (reader, stalled) = {
            let mut registry = registry.lock().await;
            (
                registry.register(test_addr(), tx_reader),
                registry.register(test_addr(), tx_stalled),
            )
        };

        // Fill the stalled queue, draining the other one as a live peer would
        for _ in 0..OUTBOUND_CAPACITY {
            let report = broadcast_once(&registry).await;
            assert!(report.dropped.is_empty());
            rx_reader.try_recv().unwrap();
        }

        let report = broadcast_once(&registry).await;
        assert_eq!(report.dropped, vec![stalled.clone()]);
        assert_eq!(report.delivered, 1);
        assert!(!registry.lock().await.contains(&stalled));
        assert!(registry.lock().await.contains(&reader));

        // Later ticks no longer touch the stalled queue
        for _ in 0..100 {
            let report = broadcast_once(&registry).await;
            assert!(report.dropped.is_empty());
            rx_reader.try_recv().unwrap();
        }
    }

    #[tokio::test]
    async fn test_broadcast_empty_registry() {
        let registry = Registry::shared();
        let report = broadcast_once(&registry).await;
        assert_eq!(report, BroadcastReport::default());
    }

    #[tokio::test]
    async fn test_broadcaster_runs_on_cadence() {
        let registry = Registry::shared();
        let (tx, mut rx) = mpsc::channel(OUTBOUND_CAPACITY);
        registry.lock().await.register(test_addr(), tx);

        let broadcaster = Broadcaster::new(registry.clone(), 5);
        let handle = tokio::spawn(broadcaster.run());

        // First tick fires immediately, then every 200ms
        tokio::time::sleep(Duration::from_millis(450)).await;
        handle.abort();

        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        // Ticks at 0, 200 and 400ms, give or take scheduler jitter
        assert!((2..=4).contains(&received), "received {} updates", received);
    }
}
