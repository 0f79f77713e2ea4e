//! Subsystem trait.
//!
//! RULE: Every tick-driven component implements SimSubsystem.
//! The engine calls update() on each registered subsystem
//! in registration order, every tick.
//! Execution order is fixed and documented in engine.rs.

use crate::{
    error::SimResult,
    event::SimEvent,
    rng::SubsystemRng,
    types::Tick,
    world::SimWorld,
};

/// The contract every subsystem must fulfill.
pub trait SimSubsystem: Send {
    /// Unique stable name for this subsystem.
    fn name(&self) -> &'static str;

    /// Called once per tick by the engine, after the clock has advanced.
    ///
    /// - `tick`:  the current tick number
    /// - `world`: the simulation context, mutable
    /// - `rng`:   this subsystem's deterministic RNG for this tick
    ///
    /// Returns the events produced this tick.
    fn update(
        &mut self,
        tick: Tick,
        world: &mut SimWorld,
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>>;
}
