//! Simulation state, tuning parameters and the determinism hash.

use crate::fixed::{Fixed64, Ticks};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Simulation state
// ---------------------------------------------------------------------------

/// Mutable simulation bookkeeping tracked by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimState {
    /// Current tick counter. Incremented by 1 per `Engine::advance` call.
    pub tick: Ticks,
    /// Total sim-seconds advanced so far.
    pub elapsed: Fixed64,
}

impl SimState {
    pub fn new() -> Self {
        Self {
            tick: 0,
            elapsed: Fixed64::ZERO,
        }
    }
}

impl Default for SimState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tuning parameters
// ---------------------------------------------------------------------------

/// Sim tuning knobs. `dt` passed to `Engine::advance` is expected to be
/// pre-scaled by the caller's speed multiplier; everything here is in world
/// units and sim-seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Worker movement speed, world units per sim-second.
    pub worker_speed: Fixed64,
    /// Pause while a worker deposits a carried item at a drop point.
    pub deposit_duration: Fixed64,
    /// How long an IDLE worker waits between scheduler polls. Bounds the
    /// per-tick query cost instead of polling every frame.
    pub idle_poll_interval: Fixed64,
    /// IDLE cooldown after a task fails to path, preventing claim thrash.
    pub path_fail_cooldown: Fixed64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            worker_speed: Fixed64::from_num(120),
            deposit_duration: Fixed64::from_num(0.4),
            idle_poll_interval: Fixed64::from_num(0.5),
            path_fail_cooldown: Fixed64::from_num(1),
        }
    }
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A simple deterministic hash of simulation state for desync detection.
///
/// Uses FNV-1a (64-bit) for speed and simplicity. Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    /// Start a new hash.
    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    /// Feed bytes into the hash.
    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    /// Feed a u64 into the hash.
    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    /// Feed a u32 into the hash.
    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    /// Feed an i32 into the hash.
    pub fn write_i32(&mut self, v: i32) {
        self.write(&v.to_le_bytes());
    }

    /// Feed a Fixed64 into the hash.
    pub fn write_fixed64(&mut self, v: Fixed64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    /// Finalize and return the hash value.
    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_state_starts_at_zero() {
        let state = SimState::new();
        assert_eq!(state.tick, 0);
        assert_eq!(state.elapsed, Fixed64::ZERO);
    }

    #[test]
    fn state_hash_deterministic() {
        let mut h1 = StateHash::new();
        h1.write_u64(42);
        h1.write_fixed64(Fixed64::from_num(1.5));

        let mut h2 = StateHash::new();
        h2.write_u64(42);
        h2.write_fixed64(Fixed64::from_num(1.5));

        assert_eq!(h1.finish(), h2.finish());
    }

    #[test]
    fn state_hash_order_matters() {
        let mut h1 = StateHash::new();
        h1.write_u32(1);
        h1.write_u32(2);

        let mut h2 = StateHash::new();
        h2.write_u32(2);
        h2.write_u32(1);

        assert_ne!(h1.finish(), h2.finish());
    }
}
