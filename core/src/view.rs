//! Read-only projections for the UI collaborator.
//!
//! Nothing here mutates simulation state. The whole view serializes to JSON
//! for the IPC loop.

use crate::{
    clock::SimSpeed,
    combat::{CombatActor, CombatResolver, EncounterState},
    config::SimConfig,
    event::{EventLog, LogEntry},
    ledger::Resource,
    types::{BuildingId, CostMap, Tick},
    world::SimWorld,
};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BuildingView {
    pub id:          BuildingId,
    pub name:        String,
    pub description: String,
    pub count:       u32,
    pub price:       CostMap,
    pub affordable:  bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimeView {
    pub tick:            Tick,
    pub year:            u32,
    pub season_index:    usize,
    pub season:          String,
    pub season_modifier: f64,
    pub paused:          bool,
    pub speed:           SimSpeed,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CombatView {
    Idle,
    InCombat {
        encounter_id:    u64,
        enemy:           CombatActor,
        counter_pending: bool,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SimView {
    pub time:      TimeView,
    pub resources: Vec<Resource>,
    pub buildings: Vec<BuildingView>,
    pub player:    CombatActor,
    pub combat:    CombatView,
    /// Newest first.
    pub log:       Vec<LogEntry>,
}

impl SimView {
    pub fn capture(
        config: &SimConfig,
        world: &SimWorld,
        combat: &CombatResolver,
        log: &EventLog,
    ) -> Self {
        let clock = &world.clock;
        let season_index = clock.season_index;

        let buildings = world
            .market
            .iter()
            .map(|b| {
                let price = b.price();
                BuildingView {
                    id:          b.def.id.clone(),
                    name:        b.def.name.clone(),
                    description: b.def.description.clone(),
                    count:       b.count,
                    affordable:  world.market.affordable(&b.def.id, &world.ledger).unwrap_or(false),
                    price,
                }
            })
            .collect();

        let combat = match combat.state() {
            EncounterState::Idle => CombatView::Idle,
            EncounterState::InCombat(encounter) => CombatView::InCombat {
                encounter_id:    encounter.id,
                enemy:           encounter.enemy.clone(),
                counter_pending: encounter.pending_counter.is_some(),
            },
        };

        Self {
            time: TimeView {
                tick: clock.current_tick,
                year: clock.year,
                season_index,
                season: config.calendar.season_names.get(season_index).cloned().unwrap_or_default(),
                season_modifier: config.calendar.season_modifiers.get(season_index).copied().unwrap_or(1.0),
                paused: clock.paused,
                speed: clock.speed,
            },
            resources: world.ledger.iter().cloned().collect(),
            buildings,
            player: world.player.clone(),
            combat,
            log: log.recent().cloned().collect(),
        }
    }
}
