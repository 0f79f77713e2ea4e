//! The owned simulation context.
//!
//! `SimWorld` holds every piece of persistent simulation state. The engine
//! owns exactly one and lends it by reference to each component; there is no
//! global state.

use crate::{
    clock::SimClock,
    combat::CombatActor,
    config::SimConfig,
    ledger::ResourceLedger,
    market::BuildingMarket,
};

#[derive(Debug, Clone, PartialEq)]
pub struct SimWorld {
    pub clock:  SimClock,
    pub ledger: ResourceLedger,
    pub market: BuildingMarket,
    pub player: CombatActor,
}

impl SimWorld {
    /// Fresh state straight from the catalog.
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            clock:  SimClock::new(&config.calendar),
            ledger: ResourceLedger::from_defs(&config.resources),
            market: BuildingMarket::from_defs(&config.buildings),
            player: CombatActor::player(&config.player),
        }
    }
}
