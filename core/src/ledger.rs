//! Resource ledger: the only place resource amounts change.
//!
//! RULE: `0 <= amount <= cap` holds after every public method returns.
//! Increases are saturated at the cap, never refused.
//! `spend` is all-or-nothing: either every entry is debited or none is.

use crate::{
    config::ResourceDef,
    error::{Shortfall, SimError, SimResult},
    types::{CostMap, ResourceId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    pub id:       ResourceId,
    pub name:     String,
    pub amount:   f64,
    pub cap:      f64,
    /// Yield applied on the most recent tick, for display.
    pub per_tick: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceLedger {
    resources: Vec<Resource>,
}

impl ResourceLedger {
    pub fn from_defs(defs: &[ResourceDef]) -> Self {
        let resources = defs
            .iter()
            .map(|d| Resource {
                id:       d.id.clone(),
                name:     d.name.clone(),
                amount:   d.initial_amount.clamp(0.0, d.initial_cap),
                cap:      d.initial_cap,
                per_tick: 0.0,
            })
            .collect();
        Self { resources }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Resource> {
        self.resources.iter_mut().find(|r| r.id == id)
    }

    fn require_mut(&mut self, id: &str) -> SimResult<&mut Resource> {
        self.get_mut(id).ok_or_else(|| SimError::unknown("resource", id))
    }

    /// Current amount, or 0 for an unknown id.
    pub fn amount(&self, id: &str) -> f64 {
        self.get(id).map_or(0.0, |r| r.amount)
    }

    pub fn cap(&self, id: &str) -> f64 {
        self.get(id).map_or(0.0, |r| r.cap)
    }

    /// Saturating add. Negative deltas floor at 0, positive deltas stop at
    /// the cap. Returns the change actually applied.
    pub fn add(&mut self, id: &str, delta: f64) -> SimResult<f64> {
        if !delta.is_finite() {
            return Err(SimError::InvalidAmount { resource: id.to_string(), value: delta });
        }
        let resource = self.require_mut(id)?;
        let before = resource.amount;
        resource.amount = (before + delta).clamp(0.0, resource.cap);
        Ok(resource.amount - before)
    }

    /// Raise (or with a negative delta, lower) a cap. Amount is re-clamped.
    pub fn raise_cap(&mut self, id: &str, delta: f64) -> SimResult<()> {
        if !delta.is_finite() {
            return Err(SimError::InvalidAmount { resource: id.to_string(), value: delta });
        }
        let resource = self.require_mut(id)?;
        resource.cap = (resource.cap + delta).max(0.0);
        resource.amount = resource.amount.min(resource.cap);
        Ok(())
    }

    pub fn set_per_tick(&mut self, id: &str, per_tick: f64) -> SimResult<()> {
        self.require_mut(id)?.per_tick = per_tick;
        Ok(())
    }

    /// Entries of `cost` the ledger cannot currently cover.
    /// An unknown resource counts as zero available.
    pub fn shortfalls(&self, cost: &CostMap) -> Vec<Shortfall> {
        cost.iter()
            .filter_map(|(id, &required)| {
                let available = self.amount(id);
                (available < required).then(|| Shortfall {
                    resource: id.clone(),
                    required,
                    available,
                })
            })
            .collect()
    }

    pub fn can_afford(&self, cost: &CostMap) -> bool {
        self.shortfalls(cost).is_empty()
    }

    /// Atomic check-then-commit. Every entry is checked against the current
    /// amounts first; only if all pass is anything debited.
    pub fn spend(&mut self, cost: &CostMap) -> SimResult<()> {
        for (id, &required) in cost {
            if self.get(id).is_none() {
                return Err(SimError::unknown("resource", id.as_str()));
            }
            if !required.is_finite() || required < 0.0 {
                return Err(SimError::InvalidAmount { resource: id.clone(), value: required });
            }
        }

        let shortfalls = self.shortfalls(cost);
        if !shortfalls.is_empty() {
            return Err(SimError::InsufficientResources { shortfalls });
        }

        for (id, &required) in cost {
            if let Some(resource) = self.get_mut(id) {
                resource.amount = (resource.amount - required).clamp(0.0, resource.cap);
            }
        }
        Ok(())
    }

    /// Overwrite amount and cap from a restored save. Values are clamped so
    /// the ledger invariant holds.
    pub(crate) fn restore(&mut self, id: &str, amount: f64, cap: f64) {
        if let Some(resource) = self.get_mut(id) {
            resource.cap = cap.max(0.0);
            resource.amount = amount.clamp(0.0, resource.cap);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

    fn ledger() -> ResourceLedger {
        ResourceLedger::from_defs(&SimConfig::default().resources)
    }

    fn cost(entries: &[(&str, f64)]) -> CostMap {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn add_saturates_at_cap() {
        let mut ledger = ledger();
        let applied = ledger.add("catnip", 250.0).unwrap();
        assert_eq!(applied, 200.0);
        assert_eq!(ledger.amount("catnip"), 200.0);
    }

    #[test]
    fn negative_add_floors_at_zero() {
        let mut ledger = ledger();
        ledger.add("wood", 5.0).unwrap();
        ledger.add("wood", -20.0).unwrap();
        assert_eq!(ledger.amount("wood"), 0.0);
    }

    #[test]
    fn non_finite_delta_rejected_without_change() {
        let mut ledger = ledger();
        ledger.add("catnip", 3.0).unwrap();
        assert!(matches!(
            ledger.add("catnip", f64::NAN),
            Err(SimError::InvalidAmount { .. })
        ));
        assert!(ledger.add("catnip", f64::INFINITY).is_err());
        assert_eq!(ledger.amount("catnip"), 3.0);
    }

    #[test]
    fn unknown_resource_is_reported() {
        let mut ledger = ledger();
        assert!(matches!(
            ledger.add("unobtainium", 1.0),
            Err(SimError::UnknownIdentifier { kind: "resource", .. })
        ));
    }

    #[test]
    fn spend_is_all_or_nothing() {
        let mut ledger = ledger();
        ledger.add("catnip", 150.0).unwrap();
        ledger.add("wood", 4.0).unwrap();

        let err = ledger
            .spend(&cost(&[("catnip", 100.0), ("wood", 10.0)]))
            .unwrap_err();

        match err {
            SimError::InsufficientResources { shortfalls } => {
                assert_eq!(shortfalls.len(), 1);
                assert_eq!(shortfalls[0].resource, "wood");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(ledger.amount("catnip"), 150.0, "catnip must not be debited");
        assert_eq!(ledger.amount("wood"), 4.0);
    }

    #[test]
    fn spend_debits_every_entry_on_success() {
        let mut ledger = ledger();
        ledger.add("catnip", 150.0).unwrap();
        ledger.add("wood", 12.0).unwrap();
        ledger.spend(&cost(&[("catnip", 100.0), ("wood", 10.0)])).unwrap();
        assert_eq!(ledger.amount("catnip"), 50.0);
        assert_eq!(ledger.amount("wood"), 2.0);
    }

    #[test]
    fn lowering_cap_reclamps_amount() {
        let mut ledger = ledger();
        ledger.add("catnip", 200.0).unwrap();
        ledger.raise_cap("catnip", -50.0).unwrap();
        assert_eq!(ledger.cap("catnip"), 150.0);
        assert_eq!(ledger.amount("catnip"), 150.0);
    }
}
