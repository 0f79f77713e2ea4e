//! Save snapshots: serialization and load-time reconciliation.
//!
//! A snapshot holds only mutable state: resource amounts and caps, building
//! counts, the tick counter and the explorer's stats. Names, costs and
//! effects always come from the current catalog.
//!
//! RULES:
//!   - Every field is optional. A key the snapshot lacks keeps its default.
//!   - A key the current catalog does not define is dropped.
//!   - The encounter state is never saved; a load always lands in Idle.
//!   - Unparsable input is `MalformedSnapshot`; the caller falls back to
//!     defaults.

use crate::{
    error::{SimError, SimResult},
    store::KeyValueStore,
    types::{BuildingId, ResourceId, Tick},
    world::SimWorld,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResourceSave {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cap:    Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BuildingSave {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeSave {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticks:        Option<Tick>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year:         Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerSave {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hp:           Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_hp:       Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attack_power: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SaveSnapshot {
    pub resources: BTreeMap<ResourceId, ResourceSave>,
    pub buildings: BTreeMap<BuildingId, BuildingSave>,
    pub time:      TimeSave,
    pub player:    PlayerSave,
}

impl SaveSnapshot {
    pub fn capture(world: &SimWorld) -> Self {
        let resources = world
            .ledger
            .iter()
            .map(|r| {
                (r.id.clone(), ResourceSave { amount: Some(r.amount), cap: Some(r.cap) })
            })
            .collect();
        let buildings = world
            .market
            .iter()
            .map(|b| (b.def.id.clone(), BuildingSave { count: Some(b.count) }))
            .collect();
        Self {
            resources,
            buildings,
            time: TimeSave {
                ticks:        Some(world.clock.current_tick),
                season_index: Some(world.clock.season_index),
                year:         Some(world.clock.year),
            },
            player: PlayerSave {
                hp:           Some(world.player.hp),
                max_hp:       Some(world.player.max_hp),
                attack_power: Some(world.player.attack_power),
            },
        }
    }

    /// Merge this snapshot onto `defaults`, entity by entity.
    pub fn reconcile(&self, mut defaults: SimWorld) -> SimWorld {
        reconcile_buildings(&mut defaults, &self.buildings);
        reconcile_resources(&mut defaults, &self.resources);
        reconcile_time(&mut defaults, &self.time);
        reconcile_player(&mut defaults, &self.player);
        defaults
    }
}

fn usable(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}

fn reconcile_buildings(world: &mut SimWorld, saved: &BTreeMap<BuildingId, BuildingSave>) {
    for (id, entry) in saved {
        if world.market.get(id).is_none() {
            log::debug!("snapshot: dropping unknown building '{id}'");
            continue;
        }
        if let Some(count) = entry.count {
            world.market.restore_count(id, count);
        }
    }
}

fn reconcile_resources(world: &mut SimWorld, saved: &BTreeMap<ResourceId, ResourceSave>) {
    for id in saved.keys().filter(|id| world.ledger.get(id).is_none()) {
        log::debug!("snapshot: dropping unknown resource '{id}'");
    }

    let known: Vec<(ResourceId, f64, f64)> =
        world.ledger.iter().map(|r| (r.id.clone(), r.amount, r.cap)).collect();
    for (id, default_amount, default_cap) in known {
        let entry = saved.get(&id).cloned().unwrap_or_default();
        // Without a saved cap, the catalog cap plus whatever the restored
        // buildings add. Applies to resources the save omits entirely.
        let cap = usable(entry.cap).unwrap_or(default_cap + world.market.cap_bonus(&id));
        let amount = usable(entry.amount).unwrap_or(default_amount);
        world.ledger.restore(&id, amount, cap);
    }
}

/// Saved ticks at or above this are treated as corrupt.
const MAX_RESTORED_TICK: Tick = u32::MAX as Tick;

fn reconcile_time(world: &mut SimWorld, saved: &TimeSave) {
    if let Some(ticks) = saved.ticks {
        if ticks >= MAX_RESTORED_TICK {
            log::warn!("snapshot: ignoring out-of-range tick {ticks}");
            return;
        }
        world.clock.restore_tick(ticks);
        let derived = (world.clock.season_index, world.clock.year);
        if saved.season_index.is_some_and(|s| s != derived.0) || saved.year.is_some_and(|y| y != derived.1) {
            log::warn!(
                "snapshot: stored season/year disagree with tick {ticks}; using derived {derived:?}"
            );
        }
    }
}

fn reconcile_player(world: &mut SimWorld, saved: &PlayerSave) {
    let player = &mut world.player;
    if let Some(max_hp) = saved.max_hp.filter(|v| *v > 0) {
        player.max_hp = max_hp;
    }
    if let Some(attack_power) = saved.attack_power.filter(|v| *v >= 0) {
        player.attack_power = attack_power;
    }
    let hp = saved.hp.unwrap_or(player.hp);
    player.hp = hp.clamp(0, player.max_hp);
}

// ── Save coordinator ───────────────────────────────────────────────

/// Moves snapshots between the world and a key/value store.
#[derive(Debug, Clone)]
pub struct SaveCoordinator {
    save_key: String,
}

impl SaveCoordinator {
    pub fn new(save_key: impl Into<String>) -> Self {
        Self { save_key: save_key.into() }
    }

    pub fn serialize(world: &SimWorld) -> SimResult<String> {
        Ok(serde_json::to_string(&SaveSnapshot::capture(world))?)
    }

    /// Parse `raw` and reconcile it onto `defaults`.
    pub fn deserialize(raw: &str, defaults: SimWorld) -> SimResult<SimWorld> {
        let value: serde_json::Value = serde_json::from_str(raw).map_err(SimError::malformed)?;
        if !value.is_object() {
            return Err(SimError::malformed("snapshot root is not an object"));
        }
        let snapshot: SaveSnapshot = serde_json::from_value(value).map_err(SimError::malformed)?;
        Ok(snapshot.reconcile(defaults))
    }

    pub fn save(&self, world: &SimWorld, store: &mut dyn KeyValueStore) -> SimResult<()> {
        let payload = Self::serialize(world)?;
        store.put(&self.save_key, &payload, world.clock.current_tick)?;
        log::debug!("Snapshot saved at tick {}", world.clock.current_tick);
        Ok(())
    }

    /// `Ok(None)` when nothing is stored under the save key.
    pub fn load(&self, store: &dyn KeyValueStore, defaults: SimWorld) -> SimResult<Option<SimWorld>> {
        match store.get(&self.save_key)? {
            Some(raw) => Self::deserialize(&raw, defaults).map(Some),
            None => Ok(None),
        }
    }

    pub fn clear(&self, store: &mut dyn KeyValueStore) -> SimResult<()> {
        store.remove(&self.save_key)
    }

    /// Text code for manual backup: base64 over the JSON snapshot.
    pub fn export_code(world: &SimWorld) -> SimResult<String> {
        Ok(STANDARD.encode(Self::serialize(world)?))
    }

    /// Reverse of `export_code`, yielding the JSON snapshot.
    pub fn decode_code(code: &str) -> SimResult<String> {
        let bytes = STANDARD.decode(code.trim()).map_err(SimError::malformed)?;
        String::from_utf8(bytes).map_err(SimError::malformed)
    }
}
