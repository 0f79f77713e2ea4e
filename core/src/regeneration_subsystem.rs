//! Regeneration subsystem: the explorer recovers hp on a fixed interval.
//!
//! Runs every `regen_interval` ticks regardless of encounter state, so a
//! defeated explorer (hp 0) always recovers over time.

use crate::{
    error::SimResult,
    event::SimEvent,
    rng::SubsystemRng,
    subsystem::SimSubsystem,
    types::Tick,
    world::SimWorld,
};

pub struct RegenerationSubsystem {
    interval: Tick,
    amount:   i32,
}

impl RegenerationSubsystem {
    pub fn new(interval: Tick, amount: i32) -> Self {
        Self { interval: interval.max(1), amount }
    }
}

impl SimSubsystem for RegenerationSubsystem {
    fn name(&self) -> &'static str { "regeneration" }

    fn update(
        &mut self,
        tick: Tick,
        world: &mut SimWorld,
        _rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        if tick % self.interval != 0 {
            return Ok(vec![]);
        }
        let restored = world.player.heal(self.amount);
        if restored == 0 {
            return Ok(vec![]);
        }
        log::debug!("tick={tick} regeneration: +{restored} hp -> {}", world.player.hp);
        Ok(vec![SimEvent::PlayerRegenerated { tick, hp: world.player.hp }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::SimConfig, rng::{RngBank, SubsystemSlot}};

    #[test]
    fn heals_only_on_interval_and_clamps_to_max() {
        let config = SimConfig::default();
        let mut world = SimWorld::from_config(&config);
        world.player.hp = 97;
        let mut regen = RegenerationSubsystem::new(5, 5);
        let mut rng = RngBank::new(1).for_subsystem(SubsystemSlot::Regeneration);

        assert!(regen.update(4, &mut world, &mut rng).unwrap().is_empty());
        assert_eq!(world.player.hp, 97);

        let events = regen.update(5, &mut world, &mut rng).unwrap();
        assert_eq!(events, vec![SimEvent::PlayerRegenerated { tick: 5, hp: 100 }]);
        assert!(regen.update(10, &mut world, &mut rng).unwrap().is_empty());
    }
}
