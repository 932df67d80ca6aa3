//! Performance benchmarks for the hot paths of server and client

use client::interpolation::{Interpolator, TimestampedSnapshot};
use server::broadcast::personalize;
use server::registry::{Registry, OUTBOUND_CAPACITY};
use shared::{decode_state_update, encode, ClientGameState, Identity, Message, Position};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

fn positions(count: usize) -> HashMap<Identity, Position> {
    (1..=count)
        .map(|i| (format!("id{}", i), (i as Position) * 5))
        .collect()
}

/// Benchmarks building one personalized state per connected client
#[test]
fn benchmark_personalize_all_clients() {
    let players = 200;
    let world = positions(players);

    let start = Instant::now();
    for id in world.keys() {
        let state = personalize(id, &world).unwrap();
        assert_eq!(state.others.len(), players - 1);
    }

    let duration = start.elapsed();
    println!(
        "Personalize: {} clients in {:?} ({:.2} μs/client)",
        players,
        duration,
        duration.as_micros() as f64 / players as f64
    );

    // Should complete in under 2 seconds even in debug builds
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks encoding and decoding a full state update
#[test]
fn benchmark_state_update_codec() {
    let message = Message::StateUpdate(ClientGameState::new(42, positions(100)));

    let iterations = 1_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let line = encode(&message).unwrap();
        let state = decode_state_update(&line).unwrap();
        assert_eq!(state.you, 42);
    }

    let duration = start.elapsed();
    println!(
        "State update codec: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 5000);
}

/// Benchmarks interpolation queries over a large snapshot pair
#[test]
fn benchmark_interpolation_queries() {
    let t0 = Instant::now();
    let prev = TimestampedSnapshot::at(ClientGameState::new(0, positions(100)), t0);
    let moved = positions(100)
        .into_iter()
        .map(|(id, x)| (id, x + 50))
        .collect();
    let curr = TimestampedSnapshot::at(
        ClientGameState::new(0, moved),
        t0 + Duration::from_millis(200),
    );
    let interpolator = Interpolator::new(prev, curr);

    let iterations = 10_000;
    let start = Instant::now();

    for i in 0..iterations {
        let t = t0 + Duration::from_millis(200 + (i % 200) as u64);
        assert!(!interpolator.interpolate(t).is_exhausted());
    }

    let duration = start.elapsed();
    println!(
        "Interpolation: {} queries in {:?} ({:.2} μs/query)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 5000);
}

/// Benchmarks registry moves and snapshots with many clients
#[test]
fn benchmark_registry_operations() {
    let mut registry = Registry::new();
    let addr = "127.0.0.1:8080".parse().unwrap();

    let (outbound, _outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
    let ids: Vec<Identity> = (0..500)
        .map(|_| registry.register(addr, outbound.clone()))
        .collect();

    let iterations = 100;
    let start = Instant::now();

    for _ in 0..iterations {
        for id in &ids {
            registry.apply_move(id, shared::MoveCommand::MoveRight);
        }
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.positions.len(), ids.len());
    }

    let duration = start.elapsed();
    println!(
        "Registry: {} rounds of {} moves + snapshot in {:?}",
        iterations,
        ids.len(),
        duration
    );

    assert_eq!(registry.position(&ids[0]), Some(5 * iterations as Position));
    assert!(duration.as_millis() < 5000);
}
