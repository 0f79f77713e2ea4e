//! Combat resolver: explore, attack, flee.
//!
//! STATE MACHINE:
//!   Idle --explore()--> InCombat
//!   InCombat --player_attack()--> Idle (victory) | InCombat (counter scheduled)
//!   InCombat --counter_attack()--> Idle (defeat) | InCombat
//!   InCombat --flee()--> Idle
//!
//! RULES:
//!   - The enemy's reply is a deferred task. Its handle lives on the
//!     encounter, and leaving the encounter for any reason cancels it.
//!   - While a reply is pending, player_attack() is ignored.
//!   - Loot is granted exactly once, on the victory transition.

use crate::{
    config::{EnemyTemplate, PlayerTemplate, SimConfig},
    error::{SimError, SimResult},
    event::SimEvent,
    rng::RandomSource,
    scheduler::{DeferredAction, DeferredQueue, TaskHandle},
    types::{CostMap, EnemyId, Millis},
    world::SimWorld,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CombatActor {
    pub name:         String,
    pub hp:           i32,
    pub max_hp:       i32,
    pub attack_power: i32,
}

impl CombatActor {
    pub fn player(template: &PlayerTemplate) -> Self {
        Self {
            name:         template.name.clone(),
            hp:           template.max_hp,
            max_hp:       template.max_hp,
            attack_power: template.attack_power,
        }
    }

    pub fn enemy(template: &EnemyTemplate) -> Self {
        Self {
            name:         template.name.clone(),
            hp:           template.max_hp,
            max_hp:       template.max_hp,
            attack_power: template.attack_power,
        }
    }

    /// Apply damage, flooring hp at 0. Returns remaining hp.
    pub fn take_damage(&mut self, damage: i32) -> i32 {
        self.hp = self.hp.saturating_sub(damage.max(0)).clamp(0, self.max_hp);
        self.hp
    }

    /// Restore up to `amount` hp. Returns the hp actually restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.hp;
        self.hp = self.hp.saturating_add(amount.max(0)).clamp(0, self.max_hp);
        self.hp - before
    }

    pub fn is_down(&self) -> bool {
        self.hp <= 0
    }
}

/// `floor(attack_power + uniform(0, variance))`.
pub fn roll_damage(attack_power: i32, variance: f64, rng: &mut dyn RandomSource) -> i32 {
    (f64::from(attack_power) + rng.next_f64() * variance).floor() as i32
}

// ── Enemy catalog ──────────────────────────────────────────────────

/// Enemy templates with a precomputed cumulative-probability table.
#[derive(Debug, Clone)]
pub struct EnemyCatalog {
    templates:  Vec<EnemyTemplate>,
    cumulative: Vec<f64>,
}

impl EnemyCatalog {
    pub fn new(templates: &[EnemyTemplate]) -> Self {
        let cumulative = templates
            .iter()
            .scan(0.0, |acc, t| {
                *acc += t.probability;
                Some(*acc)
            })
            .collect();
        Self { templates: templates.to_vec(), cumulative }
    }

    /// First template whose cumulative probability exceeds `roll`.
    /// Rounding slack at the top of the table falls to the last template.
    pub fn draw(&self, roll: f64) -> Option<&EnemyTemplate> {
        self.cumulative
            .iter()
            .position(|&threshold| threshold > roll)
            .and_then(|i| self.templates.get(i))
            .or_else(|| self.templates.last())
    }

    pub fn get(&self, id: &str) -> Option<&EnemyTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }
}

// ── Encounter state ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Encounter {
    pub id:              u64,
    pub template_id:     EnemyId,
    pub enemy:           CombatActor,
    pub pending_counter: Option<TaskHandle>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum EncounterState {
    #[default]
    Idle,
    InCombat(Encounter),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExploreOutcome {
    Started { encounter_id: u64 },
    AlreadyInCombat,
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackOutcome {
    /// Not in combat, or the enemy's reply is still pending.
    Ignored,
    Victory { encounter_id: u64 },
    CounterScheduled { encounter_id: u64, due_at: Millis },
}

pub struct CombatResolver {
    catalog:           EnemyCatalog,
    attack_variance:   f64,
    enemy_variance:    f64,
    counter_delay_ms:  Millis,
    state:             EncounterState,
    next_encounter_id: u64,
}

impl CombatResolver {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            catalog:           EnemyCatalog::new(&config.enemies),
            attack_variance:   config.combat.attack_variance,
            enemy_variance:    config.combat.enemy_variance,
            counter_delay_ms:  config.combat.counter_attack_delay_ms,
            state:             EncounterState::Idle,
            next_encounter_id: 1,
        }
    }

    pub fn state(&self) -> &EncounterState {
        &self.state
    }

    pub fn encounter(&self) -> Option<&Encounter> {
        match &self.state {
            EncounterState::InCombat(encounter) => Some(encounter),
            EncounterState::Idle => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, EncounterState::Idle)
    }

    pub fn counter_pending(&self) -> bool {
        self.encounter().is_some_and(|e| e.pending_counter.is_some())
    }

    /// Idle → InCombat with a freshly drawn enemy.
    pub fn explore(
        &mut self,
        world: &SimWorld,
        rng: &mut dyn RandomSource,
    ) -> SimResult<(ExploreOutcome, Vec<SimEvent>)> {
        if !self.is_idle() {
            return Ok((ExploreOutcome::AlreadyInCombat, vec![]));
        }
        if world.player.is_down() {
            let event = SimEvent::ExploreRefused {
                reason: "You are too exhausted to explore. Rest first.".into(),
            };
            return Ok((ExploreOutcome::Exhausted, vec![event]));
        }

        let roll = rng.next_f64();
        let template = self.catalog.draw(roll).ok_or(SimError::EmptyEnemyCatalog)?;
        let encounter_id = self.next_encounter_id;
        self.next_encounter_id += 1;

        let enemy = CombatActor::enemy(template);
        log::debug!(
            "tick={} combat: encounter {encounter_id} spawned {} (roll {roll:.3})",
            world.clock.current_tick,
            template.id
        );
        let event = SimEvent::EncounterStarted {
            encounter_id,
            enemy_id:   template.id.clone(),
            enemy_name: enemy.name.clone(),
            enemy_hp:   enemy.hp,
        };
        self.state = EncounterState::InCombat(Encounter {
            id: encounter_id,
            template_id: template.id.clone(),
            enemy,
            pending_counter: None,
        });
        Ok((ExploreOutcome::Started { encounter_id }, vec![event]))
    }

    /// Strike the current enemy. A kill resolves the encounter immediately;
    /// otherwise the enemy's reply is scheduled `counter_delay_ms` from `now`.
    pub fn player_attack(
        &mut self,
        world: &mut SimWorld,
        rng: &mut dyn RandomSource,
        deferred: &mut DeferredQueue<DeferredAction>,
        now: Millis,
    ) -> SimResult<(AttackOutcome, Vec<SimEvent>)> {
        let EncounterState::InCombat(encounter) = &mut self.state else {
            return Ok((AttackOutcome::Ignored, vec![]));
        };
        if encounter.pending_counter.is_some() {
            log::debug!("combat: attack ignored, counter-attack pending");
            return Ok((AttackOutcome::Ignored, vec![]));
        }

        let damage = roll_damage(world.player.attack_power, self.attack_variance, rng);
        let enemy_hp = encounter.enemy.take_damage(damage);
        let encounter_id = encounter.id;
        let mut events = vec![SimEvent::PlayerStruck { encounter_id, damage, enemy_hp }];

        if encounter.enemy.is_down() {
            let template_id = encounter.template_id.clone();
            let enemy_name = encounter.enemy.name.clone();
            self.state = EncounterState::Idle;
            events.extend(self.grant_loot(world, encounter_id, &template_id, enemy_name));
            return Ok((AttackOutcome::Victory { encounter_id }, events));
        }

        let due_at = now.saturating_add(self.counter_delay_ms);
        let handle = deferred.schedule(due_at, DeferredAction::EnemyCounterAttack { encounter_id });
        encounter.pending_counter = Some(handle);
        Ok((AttackOutcome::CounterScheduled { encounter_id, due_at }, events))
    }

    /// The deferred enemy reply. Dropped if the encounter it belongs to
    /// has already ended.
    pub fn counter_attack(
        &mut self,
        encounter_id: u64,
        world: &mut SimWorld,
        rng: &mut dyn RandomSource,
    ) -> SimResult<Vec<SimEvent>> {
        let encounter = match &mut self.state {
            EncounterState::InCombat(e) if e.id == encounter_id => e,
            _ => {
                log::debug!("combat: stale counter-attack for encounter {encounter_id} dropped");
                return Ok(vec![]);
            }
        };
        encounter.pending_counter = None;

        let damage = roll_damage(encounter.enemy.attack_power, self.enemy_variance, rng);
        let player_hp = world.player.take_damage(damage);
        let mut events = vec![SimEvent::EnemyStruck { encounter_id, damage, player_hp }];

        if world.player.is_down() {
            let enemy_name = encounter.enemy.name.clone();
            self.state = EncounterState::Idle;
            log::info!("combat: encounter {encounter_id} lost to {enemy_name}");
            events.push(SimEvent::EncounterLost { encounter_id, enemy_name });
        }
        Ok(events)
    }

    /// InCombat → Idle, no penalty. Cancels any pending reply.
    pub fn flee(&mut self, deferred: &mut DeferredQueue<DeferredAction>) -> Vec<SimEvent> {
        match std::mem::take(&mut self.state) {
            EncounterState::InCombat(encounter) => {
                if let Some(handle) = encounter.pending_counter {
                    deferred.cancel(handle);
                }
                vec![SimEvent::EncounterFled {
                    encounter_id: encounter.id,
                    enemy_name:   encounter.enemy.name,
                }]
            }
            EncounterState::Idle => vec![],
        }
    }

    /// Drop any encounter without a log line (used on load and reset).
    pub fn abandon(&mut self, deferred: &mut DeferredQueue<DeferredAction>) {
        if let EncounterState::InCombat(encounter) = std::mem::take(&mut self.state) {
            if let Some(handle) = encounter.pending_counter {
                deferred.cancel(handle);
            }
        }
    }

    fn grant_loot(
        &self,
        world: &mut SimWorld,
        encounter_id: u64,
        template_id: &str,
        enemy_name: String,
    ) -> Vec<SimEvent> {
        let mut events = Vec::new();
        let mut granted = CostMap::new();

        let loot = self.catalog.get(template_id).map(|t| t.loot.clone()).unwrap_or_default();
        for (resource, amount) in loot {
            match world.ledger.add(&resource, amount) {
                Ok(applied) => {
                    granted.insert(resource, applied);
                }
                Err(err) => {
                    log::warn!("combat: loot entry skipped for {template_id}: {err}");
                    events.push(SimEvent::UnknownIdentifier {
                        kind: "resource".into(),
                        id:   resource,
                    });
                }
            }
        }

        log::info!("combat: encounter {encounter_id} won against {enemy_name}");
        events.push(SimEvent::EncounterWon { encounter_id, enemy_name, loot: granted });
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::FixedSequence;

    #[test]
    fn draw_uses_cumulative_thresholds() {
        let catalog = EnemyCatalog::new(&SimConfig::default().enemies);
        assert_eq!(catalog.draw(0.0).unwrap().id, "stray_dog");
        assert_eq!(catalog.draw(0.59).unwrap().id, "stray_dog");
        assert_eq!(catalog.draw(0.6).unwrap().id, "wild_fox");
        assert_eq!(catalog.draw(0.89).unwrap().id, "wild_fox");
        assert_eq!(catalog.draw(0.95).unwrap().id, "forest_bear");
        assert_eq!(catalog.draw(0.999_999_999).unwrap().id, "forest_bear");
    }

    #[test]
    fn empty_catalog_draws_nothing() {
        assert!(EnemyCatalog::new(&[]).draw(0.5).is_none());
    }

    #[test]
    fn damage_roll_floors_attack_plus_variance() {
        let mut rng = FixedSequence::new(vec![0.0, 0.5, 0.99]);
        assert_eq!(roll_damage(5, 5.0, &mut rng), 5);
        assert_eq!(roll_damage(5, 5.0, &mut rng), 7);
        assert_eq!(roll_damage(5, 5.0, &mut rng), 9);
    }

    #[test]
    fn actor_hp_stays_within_bounds() {
        let mut actor = CombatActor::player(&SimConfig::default().player);
        actor.take_damage(250);
        assert_eq!(actor.hp, 0);
        assert!(actor.is_down());
        assert_eq!(actor.heal(500), 100);
        assert_eq!(actor.hp, actor.max_hp);
    }

    #[test]
    fn heal_and_damage_saturate_on_extreme_amounts() {
        let mut actor = CombatActor::player(&SimConfig::default().player);
        actor.hp = 50;
        assert_eq!(actor.heal(i32::MAX), 50);
        assert_eq!(actor.hp, 100);
        actor.hp = -5;
        assert_eq!(actor.take_damage(i32::MAX), 0);
    }

    #[test]
    fn victory_loot_records_what_the_ledger_accepted() {
        let config = SimConfig::default();
        let mut world = SimWorld::from_config(&config);
        world.ledger.add("catnip", 190.0).unwrap();
        world.player.attack_power = 15;
        let mut resolver = CombatResolver::new(&config);
        let mut deferred = DeferredQueue::new();
        let mut rng = FixedSequence::constant(0.0);

        resolver.explore(&world, &mut rng).unwrap();
        let (outcome, events) = resolver.player_attack(&mut world, &mut rng, &mut deferred, 0).unwrap();
        assert_eq!(outcome, AttackOutcome::Victory { encounter_id: 1 });
        let loot = events
            .iter()
            .find_map(|e| match e {
                SimEvent::EncounterWon { loot, .. } => Some(loot.clone()),
                _ => None,
            })
            .expect("victory event");
        assert_eq!(loot["catnip"], 10.0);
        assert_eq!(world.ledger.amount("catnip"), 200.0);
    }

    #[test]
    fn attack_while_counter_pending_is_ignored() {
        let config = SimConfig::default();
        let mut world = SimWorld::from_config(&config);
        let mut resolver = CombatResolver::new(&config);
        let mut deferred = DeferredQueue::new();
        let mut rng = FixedSequence::constant(0.0);

        resolver.explore(&world, &mut rng).unwrap();
        let (first, _) = resolver.player_attack(&mut world, &mut rng, &mut deferred, 0).unwrap();
        assert!(matches!(first, AttackOutcome::CounterScheduled { due_at: 600, .. }));

        let (second, events) = resolver.player_attack(&mut world, &mut rng, &mut deferred, 100).unwrap();
        assert_eq!(second, AttackOutcome::Ignored);
        assert!(events.is_empty());
        assert_eq!(resolver.encounter().unwrap().enemy.hp, 10);
        assert_eq!(deferred.len(), 1);
    }

    #[test]
    fn stale_counter_attack_is_dropped() {
        let config = SimConfig::default();
        let mut world = SimWorld::from_config(&config);
        let mut resolver = CombatResolver::new(&config);
        let mut rng = FixedSequence::constant(0.0);

        let events = resolver.counter_attack(42, &mut world, &mut rng).unwrap();
        assert!(events.is_empty());
        assert_eq!(world.player.hp, world.player.max_hp);
    }
}
