//! Simulation events and the bounded recent-events log.
//!
//! Every operation returns the events it produced. Events with a
//! player-facing `message()` are also appended to the `EventLog` ring
//! buffer, which the UI polls.

use crate::{
    error::Shortfall,
    types::{BuildingId, CostMap, EnemyId, ResourceId, Tick},
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Every event emitted during simulation.
/// Variants are added over time; never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Clock ─────────────────────────────────────
    TickCompleted {
        tick: Tick,
    },
    SeasonChanged {
        tick: Tick,
        season_index: usize,
        season: String,
    },
    YearStarted {
        tick: Tick,
        year: u32,
    },

    // ── Economy ───────────────────────────────────
    ResourceGathered {
        resource: ResourceId,
        amount: f64,
    },
    ResourceRefined {
        spent: CostMap,
        produced: ResourceId,
        amount: f64,
    },
    BuildingPurchased {
        building_id: BuildingId,
        name: String,
        count: u32,
    },
    PurchaseRefused {
        target: String,
        shortfalls: Vec<Shortfall>,
    },

    // ── Combat ────────────────────────────────────
    EncounterStarted {
        encounter_id: u64,
        enemy_id: EnemyId,
        enemy_name: String,
        enemy_hp: i32,
    },
    PlayerStruck {
        encounter_id: u64,
        damage: i32,
        enemy_hp: i32,
    },
    EnemyStruck {
        encounter_id: u64,
        damage: i32,
        player_hp: i32,
    },
    EncounterWon {
        encounter_id: u64,
        enemy_name: String,
        loot: CostMap,
    },
    EncounterLost {
        encounter_id: u64,
        enemy_name: String,
    },
    EncounterFled {
        encounter_id: u64,
        enemy_name: String,
    },
    ExploreRefused {
        reason: String,
    },
    PlayerRegenerated {
        tick: Tick,
        hp: i32,
    },

    // ── Persistence ───────────────────────────────
    GameSaved {
        tick: Tick,
        silent: bool,
    },
    GameLoaded {
        tick: Tick,
    },
    SnapshotRejected {
        reason: String,
    },
    GameReset,

    // ── Diagnostics ───────────────────────────────
    UnknownIdentifier {
        kind: String,
        id: String,
    },
}

impl SimEvent {
    /// Player-facing log line, if this event belongs in the log.
    pub fn message(&self) -> Option<String> {
        let text = match self {
            Self::TickCompleted { .. }
            | Self::PlayerRegenerated { .. }
            | Self::ResourceGathered { .. }
            | Self::PlayerStruck { .. }
            | Self::EnemyStruck { .. } => return None,
            Self::GameSaved { silent: true, .. } => return None,

            Self::SeasonChanged { season, .. } => format!("{season} has arrived."),
            Self::YearStarted { year, .. } => format!("A new year begins! Year {year}."),
            Self::ResourceRefined { produced, amount, .. } => {
                format!("Refined {amount} {produced}.")
            }
            Self::BuildingPurchased { name, count, .. } => {
                format!("Built {name} (total: {count}).")
            }
            Self::PurchaseRefused { target, shortfalls } => {
                let needs = shortfalls
                    .iter()
                    .map(|s| format!("{} {}", s.required, s.resource))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("Not enough resources for {target}! Need {needs}.")
            }
            Self::EncounterStarted { enemy_name, enemy_hp, .. } => {
                format!("A {enemy_name} appears! (HP {enemy_hp})")
            }
            Self::EncounterWon { enemy_name, loot, .. } => {
                let spoils = loot
                    .iter()
                    .map(|(res, amount)| format!("{amount} {res}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("Defeated the {enemy_name}! Loot: {spoils}.")
            }
            Self::EncounterLost { enemy_name, .. } => {
                format!("The {enemy_name} drove you off. Rest to recover.")
            }
            Self::EncounterFled { enemy_name, .. } => format!("You fled from the {enemy_name}."),
            Self::ExploreRefused { reason } => reason.clone(),
            Self::GameSaved { silent: false, .. } => "Game saved.".to_string(),
            Self::GameLoaded { .. } => "Welcome back!".to_string(),
            Self::SnapshotRejected { reason } => {
                format!("Save data could not be read ({reason}); starting fresh.")
            }
            Self::GameReset => "Progress reset.".to_string(),
            Self::UnknownIdentifier { kind, id } => format!("Unknown {kind} '{id}' ignored."),
        };
        Some(text)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub tick:    Tick,
    pub message: String,
}

/// Fixed-capacity log. Once full, each push silently drops the oldest line.
#[derive(Debug, Clone)]
pub struct EventLog {
    capacity: usize,
    entries:  VecDeque<LogEntry>,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { capacity, entries: VecDeque::with_capacity(capacity) }
    }

    pub fn push(&mut self, tick: Tick, message: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry { tick, message: message.into() });
    }

    /// Log every event that has a message.
    pub fn record(&mut self, tick: Tick, events: &[SimEvent]) {
        for event in events {
            if let Some(message) = event.message() {
                self.push(tick, message);
            }
        }
    }

    /// Newest first.
    pub fn recent(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_drops_oldest_when_full() {
        let mut log = EventLog::new(3);
        for i in 0..5 {
            log.push(i, format!("line {i}"));
        }
        assert_eq!(log.len(), 3);
        let lines: Vec<_> = log.recent().map(|e| e.message.as_str()).collect();
        assert_eq!(lines, vec!["line 4", "line 3", "line 2"]);
    }

    #[test]
    fn silent_saves_and_hits_stay_out_of_the_log() {
        let mut log = EventLog::new(8);
        log.record(
            10,
            &[
                SimEvent::GameSaved { tick: 10, silent: true },
                SimEvent::PlayerStruck { encounter_id: 1, damage: 6, enemy_hp: 9 },
                SimEvent::YearStarted { tick: 10, year: 2 },
            ],
        );
        assert_eq!(log.len(), 1);
        assert_eq!(log.recent().next().unwrap().message, "A new year begins! Year 2.");
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_string(&SimEvent::GameReset).unwrap();
        assert_eq!(json, r#"{"type":"game_reset"}"#);
    }
}
