use crate::clock::SimSpeed;
use crate::types::BuildingId;
use serde::{Deserialize, Serialize};

/// All player-issued commands.
/// Variants are added over time; never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum PlayerCommand {
    // ── Clock control ─────────────────────────────
    Pause,
    Resume,
    SetSpeed { speed: SimSpeed },

    // ── Economy ───────────────────────────────────
    Gather,
    RefineWood,
    Purchase { building_id: BuildingId },

    // ── Combat ────────────────────────────────────
    Explore,
    Attack,
    Flee,

    // ── Persistence ───────────────────────────────
    Save,
    Load,
    Reset,
    Export,
    Import { code: String },
}

/// What a command hands back besides its effect on state.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum CommandReply {
    Done,
    ExportCode { code: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_from_tagged_json() {
        let cmd: PlayerCommand =
            serde_json::from_str(r#"{"cmd":"purchase","building_id":"pasture"}"#).unwrap();
        assert_eq!(cmd, PlayerCommand::Purchase { building_id: "pasture".into() });

        let cmd: PlayerCommand =
            serde_json::from_str(r#"{"cmd":"set_speed","speed":"fast_forward"}"#).unwrap();
        assert_eq!(cmd, PlayerCommand::SetSpeed { speed: SimSpeed::FastForward });
    }
}
