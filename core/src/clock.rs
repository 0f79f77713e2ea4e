//! Simulation clock: owns tick state, the calendar, speed control, and pause.

use crate::{config::CalendarConfig, types::Tick};
use serde::{Deserialize, Serialize};

pub const SEASONS_PER_YEAR: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimClock {
    pub current_tick: Tick,
    pub season_index: usize,
    pub year:         u32,
    pub speed:        SimSpeed,
    pub paused:       bool,
    season_length:    Tick,
}

/// What changed on the calendar during one `advance()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockAdvance {
    pub tick:           Tick,
    pub season_changed: bool,
    pub year_changed:   bool,
}

impl SimClock {
    pub fn new(calendar: &CalendarConfig) -> Self {
        Self {
            current_tick: 0,
            season_index: 0,
            year: 1,
            speed: SimSpeed::Normal,
            paused: false,
            season_length: calendar.season_length.max(1),
        }
    }

    /// Advance one tick. Returns the new tick and any calendar rollover.
    pub fn advance(&mut self) -> ClockAdvance {
        let previous_season = self.season_index;
        let previous_year = self.year;

        self.current_tick = self.current_tick.saturating_add(1);
        self.derive_calendar();

        ClockAdvance {
            tick:           self.current_tick,
            season_changed: self.season_index != previous_season,
            year_changed:   self.year != previous_year,
        }
    }

    /// Jump to `tick` (used when a save is restored). Season and year are
    /// recomputed so they can never disagree with the tick count.
    pub fn restore_tick(&mut self, tick: Tick) {
        self.current_tick = tick;
        self.derive_calendar();
    }

    fn derive_calendar(&mut self) {
        let seasons_elapsed = self.current_tick / self.season_length;
        self.season_index = (seasons_elapsed % SEASONS_PER_YEAR as u64) as usize;
        let years_elapsed = seasons_elapsed / SEASONS_PER_YEAR as u64;
        self.year = 1 + u32::try_from(years_elapsed).unwrap_or(u32::MAX - 1);
    }

    pub fn pause(&mut self)  { self.paused = true;  }
    pub fn resume(&mut self) { self.paused = false; }

    pub fn set_speed(&mut self, speed: SimSpeed) {
        self.speed = speed;
    }

    pub fn ticks_per_real_second(&self) -> u32 {
        match self.speed {
            SimSpeed::Normal      => 1,
            SimSpeed::Accelerated => 4,
            SimSpeed::FastForward => 16,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SimSpeed {
    Normal,       // 1 tick per tick_rate_ms
    Accelerated,  // 4 ticks per tick_rate_ms
    FastForward,  // 16 ticks per tick_rate_ms
}
