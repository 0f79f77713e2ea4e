use crate::types::{BuildingId, CostMap, EnemyId, Millis, ResourceId, Tick};
use serde::{Deserialize, Serialize};

// ── Catalog entries ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceDef {
    pub id: ResourceId,
    pub name: String,
    #[serde(default)]
    pub initial_amount: f64,
    pub initial_cap: f64,
}

/// What a single owned building does.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(tag = "kind", content = "resource", rename_all = "snake_case")]
pub enum EffectTarget {
    /// Adds to the resource's per-tick yield.
    Yield(ResourceId),
    /// Raises the resource's cap once, at purchase time.
    Cap(ResourceId),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildingEffect {
    pub target: EffectTarget,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildingDef {
    pub id: BuildingId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub base_cost: CostMap,
    pub price_ratio: f64,
    pub effects: Vec<BuildingEffect>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnemyTemplate {
    pub id: EnemyId,
    pub name: String,
    pub max_hp: i32,
    pub attack_power: i32,
    /// Share of explore draws that spawn this enemy. The catalog sums to 1.
    pub probability: f64,
    #[serde(default)]
    pub loot: CostMap,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerTemplate {
    pub name: String,
    pub max_hp: i32,
    pub attack_power: i32,
}

// ── Tuning ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarConfig {
    pub season_length: Tick,
    pub season_names: [String; 4],
    pub season_modifiers: [f64; 4],
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CombatConfig {
    /// Upper bound of the uniform bonus added to the player's attack.
    pub attack_variance: f64,
    /// Upper bound of the uniform bonus added to the enemy's reply.
    pub enemy_variance: f64,
    pub counter_attack_delay_ms: Millis,
    pub regen_interval: Tick,
    pub regen_amount: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EconomyConfig {
    pub gather_resource: ResourceId,
    pub gather_amount: f64,
    pub refine_input: ResourceId,
    pub refine_cost: f64,
    pub refine_output: ResourceId,
    pub refine_yield: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaveConfig {
    pub save_key: String,
    pub autosave_interval: Tick,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct TuningFile {
    tick_rate_ms: Millis,
    log_capacity: usize,
    calendar: CalendarConfig,
    combat: CombatConfig,
    economy: EconomyConfig,
    save: SaveConfig,
    player: PlayerTemplate,
}

#[derive(Debug, Clone, Deserialize)]
struct ResourcesFile {
    resources: Vec<ResourceDef>,
}

#[derive(Debug, Clone, Deserialize)]
struct BuildingsFile {
    buildings: Vec<BuildingDef>,
}

#[derive(Debug, Clone, Deserialize)]
struct EnemiesFile {
    enemies: Vec<EnemyTemplate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Real-time milliseconds per tick at normal speed.
    pub tick_rate_ms: Millis,
    /// Maximum number of lines kept in the recent-events log.
    pub log_capacity: usize,
    pub calendar: CalendarConfig,
    pub combat: CombatConfig,
    pub economy: EconomyConfig,
    pub save: SaveConfig,
    pub player: PlayerTemplate,
    /// Display order is catalog order.
    pub resources: Vec<ResourceDef>,
    pub buildings: Vec<BuildingDef>,
    /// Draw order is catalog order.
    pub enemies: Vec<EnemyTemplate>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: 1000,
            log_capacity: 8,
            calendar: CalendarConfig {
                season_length: 50,
                season_names: [
                    "Spring".into(),
                    "Summer".into(),
                    "Autumn".into(),
                    "Winter".into(),
                ],
                season_modifiers: [1.0, 1.0, 1.2, 0.25],
            },
            combat: CombatConfig {
                attack_variance: 5.0,
                enemy_variance: 3.0,
                counter_attack_delay_ms: 600,
                regen_interval: 5,
                regen_amount: 5,
            },
            economy: EconomyConfig {
                gather_resource: "catnip".into(),
                gather_amount: 1.0,
                refine_input: "catnip".into(),
                refine_cost: 100.0,
                refine_output: "wood".into(),
                refine_yield: 1.0,
            },
            save: SaveConfig {
                save_key: "kittens_lite_save".into(),
                autosave_interval: 10,
            },
            player: PlayerTemplate {
                name: "Explorer".into(),
                max_hp: 100,
                attack_power: 5,
            },
            resources: vec![
                ResourceDef {
                    id: "catnip".into(),
                    name: "Catnip".into(),
                    initial_amount: 0.0,
                    initial_cap: 200.0,
                },
                ResourceDef {
                    id: "wood".into(),
                    name: "Wood".into(),
                    initial_amount: 0.0,
                    initial_cap: 100.0,
                },
            ],
            buildings: vec![
                BuildingDef {
                    id: "catnip_field".into(),
                    name: "Catnip Field".into(),
                    description: "Improved soil that grows catnip on its own.".into(),
                    base_cost: [("catnip".to_string(), 10.0)].into_iter().collect(),
                    price_ratio: 1.12,
                    effects: vec![BuildingEffect {
                        target: EffectTarget::Yield("catnip".into()),
                        amount: 0.65,
                    }],
                },
                BuildingDef {
                    id: "pasture".into(),
                    name: "Pasture".into(),
                    description: "Raises the catnip storage limit.".into(),
                    base_cost: [("catnip".to_string(), 100.0), ("wood".to_string(), 10.0)]
                        .into_iter()
                        .collect(),
                    price_ratio: 1.15,
                    effects: vec![BuildingEffect {
                        target: EffectTarget::Cap("catnip".into()),
                        amount: 500.0,
                    }],
                },
            ],
            enemies: vec![
                EnemyTemplate {
                    id: "stray_dog".into(),
                    name: "Stray Dog".into(),
                    max_hp: 15,
                    attack_power: 2,
                    probability: 0.6,
                    loot: [("catnip".to_string(), 25.0)].into_iter().collect(),
                },
                EnemyTemplate {
                    id: "wild_fox".into(),
                    name: "Wild Fox".into(),
                    max_hp: 30,
                    attack_power: 4,
                    probability: 0.3,
                    loot: [("catnip".to_string(), 60.0), ("wood".to_string(), 2.0)]
                        .into_iter()
                        .collect(),
                },
                EnemyTemplate {
                    id: "forest_bear".into(),
                    name: "Forest Bear".into(),
                    max_hp: 60,
                    attack_power: 8,
                    probability: 0.1,
                    loot: [("catnip".to_string(), 150.0), ("wood".to_string(), 10.0)]
                        .into_iter()
                        .collect(),
                },
            ],
        }
    }
}

impl SimConfig {
    /// Load from the data/ directory.
    /// Without a data directory, use SimConfig::default().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let tuning: TuningFile = read_json(&format!("{data_dir}/tuning.json"))?;
        let resources: ResourcesFile = read_json(&format!("{data_dir}/catalog/resources.json"))?;
        let buildings: BuildingsFile = read_json(&format!("{data_dir}/catalog/buildings.json"))?;
        let enemies: EnemiesFile = read_json(&format!("{data_dir}/combat/enemies.json"))?;

        let config = Self {
            tick_rate_ms: tuning.tick_rate_ms,
            log_capacity: tuning.log_capacity,
            calendar: tuning.calendar,
            combat: tuning.combat,
            economy: tuning.economy,
            save: tuning.save,
            player: tuning.player,
            resources: resources.resources,
            buildings: buildings.buildings,
            enemies: enemies.enemies,
        };
        config.validate()?;
        log::info!(
            "loaded config from {data_dir}: {} resources, {} buildings, {} enemies",
            config.resources.len(),
            config.buildings.len(),
            config.enemies.len()
        );
        Ok(config)
    }

    /// Reject catalogs the engine cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.tick_rate_ms > 0, "tick_rate_ms must be positive");
        anyhow::ensure!(self.log_capacity > 0, "log_capacity must be positive");
        anyhow::ensure!(self.calendar.season_length > 0, "season_length must be positive");
        anyhow::ensure!(self.combat.regen_interval > 0, "regen_interval must be positive");
        anyhow::ensure!(self.save.autosave_interval > 0, "autosave_interval must be positive");
        anyhow::ensure!(self.player.max_hp > 0, "player max_hp must be positive");

        for r in &self.resources {
            anyhow::ensure!(
                r.initial_cap >= 0.0 && r.initial_amount >= 0.0 && r.initial_amount <= r.initial_cap,
                "resource '{}' must start within [0, cap]",
                r.id
            );
        }
        let known = |id: &str| self.resources.iter().any(|r| r.id == id);

        for b in &self.buildings {
            anyhow::ensure!(b.price_ratio > 1.0, "building '{}' price_ratio must exceed 1", b.id);
            for res in b.base_cost.keys() {
                anyhow::ensure!(known(res), "building '{}' costs unknown resource '{res}'", b.id);
            }
            for effect in &b.effects {
                let (EffectTarget::Yield(res) | EffectTarget::Cap(res)) = &effect.target;
                anyhow::ensure!(known(res), "building '{}' targets unknown resource '{res}'", b.id);
            }
        }

        anyhow::ensure!(!self.enemies.is_empty(), "enemy catalog is empty");
        let total: f64 = self.enemies.iter().map(|e| e.probability).sum();
        anyhow::ensure!(
            (total - 1.0).abs() < 1e-9,
            "enemy probabilities must sum to 1, got {total}"
        );
        for e in &self.enemies {
            anyhow::ensure!(e.max_hp > 0, "enemy '{}' max_hp must be positive", e.id);
        }

        for res in [
            &self.economy.gather_resource,
            &self.economy.refine_input,
            &self.economy.refine_output,
        ] {
            anyhow::ensure!(known(res), "economy references unknown resource '{res}'");
        }
        Ok(())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    serde_json::from_str(&content).map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))
}
