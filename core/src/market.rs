//! Building market: geometric cost curve and purchases.
//!
//! price[r] = floor(base_cost[r] * price_ratio ^ count), where `count` is the
//! number already owned. A purchase delegates the debit to
//! `ResourceLedger::spend`, so a refused purchase leaves everything unchanged.

use crate::{
    config::{BuildingDef, EffectTarget},
    error::{SimError, SimResult},
    ledger::ResourceLedger,
    types::{BuildingId, CostMap},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Building {
    pub def:   BuildingDef,
    pub count: u32,
}

impl Building {
    pub fn id(&self) -> &str {
        &self.def.id
    }

    pub fn price(&self) -> CostMap {
        let growth = self.def.price_ratio.powf(f64::from(self.count));
        self.def
            .base_cost
            .iter()
            .map(|(res, &base)| (res.clone(), (base * growth).floor()))
            .collect()
    }

    fn effect_total(&self, matches: impl Fn(&EffectTarget) -> bool) -> f64 {
        self.def
            .effects
            .iter()
            .filter(|e| matches(&e.target))
            .map(|e| f64::from(self.count) * e.amount)
            .sum()
    }
}

/// Result of a successful purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseReceipt {
    pub building_id: BuildingId,
    pub name:        String,
    pub new_count:   u32,
    pub paid:        CostMap,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildingMarket {
    buildings: Vec<Building>,
}

impl BuildingMarket {
    pub fn from_defs(defs: &[BuildingDef]) -> Self {
        let buildings = defs
            .iter()
            .map(|def| Building { def: def.clone(), count: 0 })
            .collect();
        Self { buildings }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Building> {
        self.buildings.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Building> {
        self.buildings.iter().find(|b| b.id() == id)
    }

    fn require(&self, id: &str) -> SimResult<&Building> {
        self.get(id).ok_or_else(|| SimError::unknown("building", id))
    }

    pub fn count(&self, id: &str) -> u32 {
        self.get(id).map_or(0, |b| b.count)
    }

    /// Price of the next unit at the current owned count.
    pub fn price_of(&self, id: &str) -> SimResult<CostMap> {
        Ok(self.require(id)?.price())
    }

    pub fn affordable(&self, id: &str, ledger: &ResourceLedger) -> SimResult<bool> {
        Ok(ledger.can_afford(&self.price_of(id)?))
    }

    /// Buy exactly one unit. Cap effects are applied to the ledger
    /// immediately; yield effects take effect from the next tick.
    pub fn purchase(&mut self, id: &str, ledger: &mut ResourceLedger) -> SimResult<PurchaseReceipt> {
        let price = self.price_of(id)?;
        ledger.spend(&price)?;

        let building = self
            .buildings
            .iter_mut()
            .find(|b| b.def.id == id)
            .ok_or_else(|| SimError::unknown("building", id))?;
        building.count += 1;

        for effect in &building.def.effects {
            if let EffectTarget::Cap(res) = &effect.target {
                ledger.raise_cap(res, effect.amount)?;
            }
        }

        Ok(PurchaseReceipt {
            building_id: building.def.id.clone(),
            name:        building.def.name.clone(),
            new_count:   building.count,
            paid:        price,
        })
    }

    /// Per-tick yield of `resource` from all owned buildings, before the
    /// seasonal modifier.
    pub fn yield_bonus(&self, resource: &str) -> f64 {
        self.buildings
            .iter()
            .map(|b| b.effect_total(|t| matches!(t, EffectTarget::Yield(r) if r == resource)))
            .sum()
    }

    /// Total cap added to `resource` by all owned buildings.
    pub fn cap_bonus(&self, resource: &str) -> f64 {
        self.buildings
            .iter()
            .map(|b| b.effect_total(|t| matches!(t, EffectTarget::Cap(r) if r == resource)))
            .sum()
    }

    /// Overwrite an owned count from a restored save. Effects are not
    /// re-applied; restored caps already include them.
    pub(crate) fn restore_count(&mut self, id: &str, count: u32) {
        if let Some(building) = self.buildings.iter_mut().find(|b| b.def.id == id) {
            building.count = count;
        }
    }
}
