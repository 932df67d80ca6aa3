//! Velocity-based smoothing of remote positions between snapshots
//!
//! The server only broadcasts a few times per second. Given the two most
//! recent snapshots, the velocity of each remote entity is estimated from the
//! difference between them, and that motion is replayed during the interval
//! that follows the newer snapshot. Once the query time runs more than one
//! full interval past the newer snapshot the pair is exhausted and the caller
//! has to move on to the next pair.

use shared::{ClientGameState, Identity, Position};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Lower bound of the gap between two snapshots, keeps velocities finite
pub const MIN_UPDATE_GAP: Duration = Duration::from_millis(1);

/// A snapshot together with the local time it was received at
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampedSnapshot {
    pub received_at: Instant,
    pub state: ClientGameState,
}

impl TimestampedSnapshot {
    /// Stamps `state` with the current time
    pub fn new(state: ClientGameState) -> Self {
        Self::at(state, Instant::now())
    }

    pub fn at(state: ClientGameState, received_at: Instant) -> Self {
        Self { received_at, state }
    }
}

/// Velocity per remote identity, in position units per millisecond
pub type VelocityMap = HashMap<Identity, f64>;

/// Result of querying an [`Interpolator`]
#[derive(Debug, Clone, PartialEq)]
pub enum Interpolation {
    /// Smoothed position of every remote identity in the older snapshot
    Positions(HashMap<Identity, Position>),
    /// The query time is past the extrapolation window of this pair
    Exhausted,
}

impl Interpolation {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Interpolation::Exhausted)
    }
}

fn as_millis_f64(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000_000.0
}

/// Signed milliseconds from `origin` to `t`
fn signed_millis(t: Instant, origin: Instant) -> f64 {
    if t >= origin {
        as_millis_f64(t - origin)
    } else {
        -as_millis_f64(origin - t)
    }
}

/// Real-time interval between two snapshots, never below [`MIN_UPDATE_GAP`]
pub fn update_gap(prev: &TimestampedSnapshot, curr: &TimestampedSnapshot) -> Duration {
    curr.received_at
        .saturating_duration_since(prev.received_at)
        .max(MIN_UPDATE_GAP)
}

/// Estimates the velocity of every remote identity in `curr`
///
/// An identity missing from `prev` has just appeared and gets velocity 0.
pub fn compute_velocities(prev: &TimestampedSnapshot, curr: &TimestampedSnapshot) -> VelocityMap {
    let gap_ms = as_millis_f64(update_gap(prev, curr));

    curr.state
        .others
        .iter()
        .map(|(id, x)| {
            let dx = match prev.state.others.get(id) {
                Some(prev_x) => (x - prev_x) as f64,
                None => 0.0,
            };
            (id.clone(), dx / gap_ms)
        })
        .collect()
}

/// Interpolation over one pair of consecutive snapshots
#[derive(Debug, Clone)]
pub struct Interpolator {
    prev: TimestampedSnapshot,
    curr: TimestampedSnapshot,
    velocity: VelocityMap,
    update_gap: Duration,
}

impl Interpolator {
    pub fn new(prev: TimestampedSnapshot, curr: TimestampedSnapshot) -> Self {
        Self {
            velocity: compute_velocities(&prev, &curr),
            update_gap: update_gap(&prev, &curr),
            prev,
            curr,
        }
    }

    pub fn prev(&self) -> &TimestampedSnapshot {
        &self.prev
    }

    pub fn curr(&self) -> &TimestampedSnapshot {
        &self.curr
    }

    pub fn update_gap(&self) -> Duration {
        self.update_gap
    }

    /// Velocity of `id`, 0 for identities without an estimate
    pub fn velocity(&self, id: &str) -> f64 {
        self.velocity.get(id).copied().unwrap_or(0.0)
    }

    /// Last instant this pair can answer queries for
    pub fn window_end(&self) -> Instant {
        self.curr.received_at + self.update_gap()
    }

    /// Positions of the remote identities at time `t`
    ///
    /// Between `curr` and one update gap after it, the motion observed from
    /// `prev` to `curr` is replayed: each identity starts from its position in
    /// `prev` and moves at its velocity for the time elapsed since `curr` was
    /// received. Identities that only appear in `curr` are left out until the
    /// next pair.
    pub fn interpolate(&self, t: Instant) -> Interpolation {
        if t > self.window_end() {
            return Interpolation::Exhausted;
        }

        let elapsed_ms = signed_millis(t, self.curr.received_at);
        let positions = self
            .prev
            .state
            .others
            .iter()
            .map(|(id, x)| {
                let position = *x as f64 + elapsed_ms * self.velocity(id);
                (id.clone(), position as Position)
            })
            .collect();

        Interpolation::Positions(positions)
    }
}
