//! Displayed client state and the snapshot queue that drives it
//!
//! Snapshots are consumed in pairs: the oldest two feed an [`Interpolator`]
//! until it is exhausted, then the oldest is dropped and the next pair takes
//! over within the same frame.

use crate::interpolation::{Interpolation, Interpolator, TimestampedSnapshot};
use log::{debug, info};
use shared::{ClientGameState, MoveCommand};
use std::collections::VecDeque;
use std::time::Instant;

/// Whether a pair of snapshots is currently driving the remote positions
#[derive(Debug, Clone)]
pub enum InterpolationState {
    /// Fewer than two snapshots pending
    Idle,
    /// Interpolating over the two oldest pending snapshots
    Active(Interpolator),
}

/// Snapshot queued for display, numbered in arrival order
#[derive(Debug, Clone)]
struct PendingSnapshot {
    seq: u64,
    snapshot: TimestampedSnapshot,
}

/// What the client shows: its own position plus the smoothed remote ones
pub struct ClientGame {
    state: ClientGameState,
    pending: VecDeque<PendingSnapshot>,
    interpolation: InterpolationState,
    next_seq: u64,
    // Newest snapshot whose `you` has been adopted
    adopted_seq: Option<u64>,

    prediction_enabled: bool,
    interpolation_enabled: bool,
}

impl ClientGame {
    pub fn new() -> Self {
        Self {
            state: ClientGameState::default(),
            pending: VecDeque::new(),
            interpolation: InterpolationState::Idle,
            next_seq: 0,
            adopted_seq: None,
            prediction_enabled: true,
            interpolation_enabled: true,
        }
    }

    /// State to render this frame
    pub fn state(&self) -> &ClientGameState {
        &self.state
    }

    pub fn is_interpolating(&self) -> bool {
        matches!(self.interpolation, InterpolationState::Active(_))
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn prediction_enabled(&self) -> bool {
        self.prediction_enabled
    }

    pub fn interpolation_enabled(&self) -> bool {
        self.interpolation_enabled
    }

    pub fn toggle_prediction(&mut self) {
        self.prediction_enabled = !self.prediction_enabled;
        info!("Client-side prediction: {}", self.prediction_enabled);
    }

    pub fn toggle_interpolation(&mut self) {
        self.interpolation_enabled = !self.interpolation_enabled;
        info!("Interpolation: {}", self.interpolation_enabled);
    }

    /// Queues freshly received snapshots, oldest first
    pub fn receive<I>(&mut self, snapshots: I)
    where
        I: IntoIterator<Item = TimestampedSnapshot>,
    {
        for snapshot in snapshots {
            let seq = self.next_seq;
            self.next_seq += 1;
            self.pending.push_back(PendingSnapshot { seq, snapshot });
        }
    }

    /// Applies a move locally without waiting for the server
    ///
    /// The next authoritative snapshot overwrites the result.
    pub fn predict(&mut self, command: MoveCommand) {
        if self.prediction_enabled {
            self.state.you = command.apply(self.state.you);
        }
    }

    /// Advances the displayed state to time `now`
    pub fn update(&mut self, now: Instant) {
        if !self.interpolation_enabled {
            self.show_latest();
            return;
        }

        loop {
            match &self.interpolation {
                InterpolationState::Idle => {
                    if self.pending.len() < 2 {
                        self.show_single();
                        return;
                    }
                    self.activate_oldest_pair();
                }
                InterpolationState::Active(interpolator) => match interpolator.interpolate(now) {
                    Interpolation::Positions(positions) => {
                        self.state.others = positions;
                        return;
                    }
                    Interpolation::Exhausted => {
                        self.pending.pop_front();
                        self.interpolation = InterpolationState::Idle;
                    }
                },
            }
        }
    }

    fn activate_oldest_pair(&mut self) {
        let (prev, curr) = match (self.pending.front(), self.pending.get(1)) {
            (Some(prev), Some(curr)) => (prev.clone(), curr.clone()),
            _ => return,
        };

        debug!(
            "Interpolating snapshots {} -> {} ({} pending)",
            prev.seq,
            curr.seq,
            self.pending.len()
        );

        self.adopt_you(&curr);
        self.interpolation =
            InterpolationState::Active(Interpolator::new(prev.snapshot, curr.snapshot));
    }

    /// Shows a lone pending snapshot as received
    fn show_single(&mut self) {
        if let Some(only) = self.pending.front().cloned() {
            self.state.others = only.snapshot.state.others.clone();
            self.adopt_you(&only);
        }
    }

    /// Applies the newest snapshot directly and forgets the rest
    fn show_latest(&mut self) {
        self.interpolation = InterpolationState::Idle;
        if let Some(latest) = self.pending.pop_back() {
            self.pending.clear();
            self.state.others = latest.snapshot.state.others.clone();
            self.adopt_you(&latest);
            // Kept so interpolation can resume from here when re-enabled
            self.pending.push_back(latest);
        }
    }

    // Overwrites `you` once per snapshot so prediction made after it survives
    fn adopt_you(&mut self, pending: &PendingSnapshot) {
        if self.adopted_seq.map_or(true, |seq| pending.seq > seq) {
            self.state.you = pending.snapshot.state.you;
            self.adopted_seq = Some(pending.seq);
        }
    }
}

impl Default for ClientGame {
    fn default() -> Self {
        Self::new()
    }
}
