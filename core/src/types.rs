//! Shared primitive types used across the entire simulation.

use std::collections::BTreeMap;

/// A simulation tick. One tick = one in-game second at normal speed.
pub type Tick = u64;

/// Stable identifier of a resource in the catalog (e.g. `"catnip"`).
pub type ResourceId = String;

/// Stable identifier of a building in the catalog (e.g. `"catnip_field"`).
pub type BuildingId = String;

/// Stable identifier of an enemy template (e.g. `"stray_dog"`).
pub type EnemyId = String;

/// Amount required (or granted) per resource. Ordered so that iteration,
/// logging and serialization are deterministic.
pub type CostMap = BTreeMap<ResourceId, f64>;

/// Milliseconds on the engine's monotonic pacing clock.
pub type Millis = u64;
