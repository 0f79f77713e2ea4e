//! Production subsystem: per-tick building yield.
//!
//! yield[r] = Σ_buildings count × effect[yield(r)] × season_modifier
//!
//! The yield is recorded on the resource for display, then fed through the
//! ledger's saturating add. Deterministic; consumes no randomness.

use crate::{
    error::SimResult,
    event::SimEvent,
    rng::SubsystemRng,
    subsystem::SimSubsystem,
    types::{ResourceId, Tick},
    world::SimWorld,
};

pub struct ProductionSubsystem {
    season_modifiers: [f64; 4],
}

impl ProductionSubsystem {
    pub fn new(season_modifiers: [f64; 4]) -> Self {
        Self { season_modifiers }
    }

    pub fn modifier_for(&self, season_index: usize) -> f64 {
        self.season_modifiers.get(season_index).copied().unwrap_or(1.0)
    }
}

/// Yield for every resource in ledger order, before clamping.
pub fn compute_yields(world: &SimWorld, season_modifier: f64) -> Vec<(ResourceId, f64)> {
    world
        .ledger
        .iter()
        .map(|r| (r.id.clone(), world.market.yield_bonus(&r.id) * season_modifier))
        .collect()
}

/// Record and apply one tick of production.
pub fn compute_and_apply_yield(world: &mut SimWorld, season_modifier: f64) -> SimResult<()> {
    for (resource, amount) in compute_yields(world, season_modifier) {
        world.ledger.set_per_tick(&resource, amount)?;
        if amount != 0.0 {
            world.ledger.add(&resource, amount)?;
        }
    }
    Ok(())
}

impl SimSubsystem for ProductionSubsystem {
    fn name(&self) -> &'static str { "production" }

    fn update(
        &mut self,
        tick: Tick,
        world: &mut SimWorld,
        _rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let modifier = self.modifier_for(world.clock.season_index);
        compute_and_apply_yield(world, modifier)?;

        log::debug!(
            "tick={tick} production: season={} modifier={modifier:.2} catnip={:.2}",
            world.clock.season_index,
            world.ledger.amount("catnip")
        );
        Ok(vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

    #[test]
    fn winter_dampens_yield() {
        let config = SimConfig::default();
        let mut world = SimWorld::from_config(&config);
        world.market.restore_count("catnip_field", 4);

        let production = ProductionSubsystem::new(config.calendar.season_modifiers);
        let modifier = production.modifier_for(3);
        compute_and_apply_yield(&mut world, modifier).unwrap();

        let catnip = world.ledger.get("catnip").unwrap();
        assert!((catnip.per_tick - 0.65).abs() < 1e-9, "4 × 0.65 × 0.25 = 0.65");
        assert!((catnip.amount - 0.65).abs() < 1e-9);
    }

    #[test]
    fn resources_without_producers_report_zero_yield() {
        let config = SimConfig::default();
        let mut world = SimWorld::from_config(&config);
        world.market.restore_count("catnip_field", 2);
        compute_and_apply_yield(&mut world, 1.0).unwrap();
        assert_eq!(world.ledger.get("wood").unwrap().per_tick, 0.0);
        assert_eq!(world.ledger.amount("wood"), 0.0);
    }
}
