//! Deterministic random number generation.
//!
//! RULE: Nothing in the simulation may call any platform RNG.
//! All randomness flows through `RandomSource` values. In production those
//! are `SubsystemRng` streams derived from the engine's master seed; tests
//! inject a `FixedSequence` to script every roll.
//!
//! Each subsystem gets its own RNG stream, seeded deterministically
//! from (master_seed XOR subsystem_index). Adding a new subsystem never
//! changes existing subsystems' streams.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

/// Uniform source of floats in `[0.0, 1.0)`.
pub trait RandomSource: Send {
    fn next_f64(&mut self) -> f64;
}

/// A named, deterministic RNG for a single subsystem.
pub struct SubsystemRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl SubsystemRng {
    /// Create a subsystem RNG from the master seed and a stable
    /// subsystem index. The index must never change once assigned.
    pub fn new(master_seed: u64, subsystem_index: u64) -> Self {
        let derived_seed = master_seed ^ (subsystem_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

impl RandomSource for SubsystemRng {
    fn next_f64(&mut self) -> f64 {
        SubsystemRng::next_f64(self)
    }
}

/// Replays a fixed list of rolls, cycling when exhausted.
/// Values are clamped into `[0.0, 1.0)`.
#[derive(Debug, Clone)]
pub struct FixedSequence {
    rolls:  Vec<f64>,
    cursor: usize,
}

impl FixedSequence {
    pub fn new(rolls: impl Into<Vec<f64>>) -> Self {
        Self { rolls: rolls.into(), cursor: 0 }
    }

    /// Always rolls `value`.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }
}

impl RandomSource for FixedSequence {
    fn next_f64(&mut self) -> f64 {
        if self.rolls.is_empty() {
            return 0.0;
        }
        let roll = self.rolls[self.cursor % self.rolls.len()];
        self.cursor += 1;
        roll.clamp(0.0, 1.0 - f64::EPSILON)
    }
}

/// All subsystem RNGs for a single run, indexed by stable slot.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    /// Long-lived stream for a slot.
    pub fn for_subsystem(&self, slot: SubsystemSlot) -> SubsystemRng {
        SubsystemRng::new(self.master_seed, slot as u64).with_name(slot.name())
    }

    /// Per-tick stream for a slot. Same (seed, slot, tick) ⇒ same rolls.
    pub fn for_subsystem_at_tick(&self, slot: SubsystemSlot, tick: u64) -> SubsystemRng {
        let tick_seed = self.master_seed ^ tick.wrapping_mul(0xd1b5_4a32_d192_ed03);
        SubsystemRng::new(tick_seed, slot as u64).with_name(slot.name())
    }
}

/// Stable subsystem slot assignments.
/// NEVER reorder or remove entries; only append.
/// Reordering changes every subsystem's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum SubsystemSlot {
    Production = 0,
    Regeneration = 1,
    Combat = 2,
    // Add new subsystems here; append only.
}

impl SubsystemSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Regeneration => "regeneration",
            Self::Combat => "combat",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let bank_a = RngBank::new(12345);
        let bank_b = RngBank::new(12345);
        let mut a = bank_a.for_subsystem(SubsystemSlot::Combat);
        let mut b = bank_b.for_subsystem(SubsystemSlot::Combat);
        for _ in 0..32 {
            assert_eq!(a.next_f64(), b.next_f64());
        }
    }

    #[test]
    fn rolls_stay_in_unit_interval() {
        let mut rng = RngBank::new(7).for_subsystem(SubsystemSlot::Combat);
        for _ in 0..10_000 {
            let r = rng.next_f64();
            assert!((0.0..1.0).contains(&r), "roll {r} outside [0, 1)");
        }
    }

    #[test]
    fn fixed_sequence_cycles_and_clamps() {
        let mut seq = FixedSequence::new(vec![0.25, 1.5]);
        assert_eq!(seq.next_f64(), 0.25);
        assert!(seq.next_f64() < 1.0);
        assert_eq!(seq.next_f64(), 0.25);
    }
}
