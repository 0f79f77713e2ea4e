//! Clock: calendar rollover, pause, speed and the recent-events log.

use kingdom_core::{
    clock::SimSpeed,
    command::PlayerCommand,
    engine::SimEngine,
    error::SimError,
    event::SimEvent,
};

#[test]
fn year_increments_after_four_seasons() {
    let mut engine = SimEngine::build_test(1);
    engine.run_ticks(199).unwrap();
    assert_eq!(engine.world.clock.year, 1);
    assert_eq!(engine.world.clock.season_index, 3);

    let events = engine.tick().unwrap();
    assert_eq!(engine.world.clock.year, 2);
    assert_eq!(engine.world.clock.season_index, 0);
    assert!(events.contains(&SimEvent::YearStarted { tick: 200, year: 2 }));

    let log: Vec<String> = engine.recent_log().into_iter().map(|e| e.message).collect();
    assert_eq!(
        log,
        vec![
            "A new year begins! Year 2.".to_string(),
            "Spring has arrived.".to_string(),
            "Winter has arrived.".to_string(),
            "Autumn has arrived.".to_string(),
            "Summer has arrived.".to_string(),
        ]
    );
}

#[test]
fn season_changes_on_the_boundary_tick() {
    let mut engine = SimEngine::build_test(1);
    engine.run_ticks(49).unwrap();
    let events = engine.tick().unwrap();
    assert_eq!(
        events[0],
        SimEvent::SeasonChanged { tick: 50, season_index: 1, season: "Summer".into() }
    );
    assert_eq!(engine.view().time.season_modifier, 1.0);

    engine.run_ticks(50).unwrap();
    assert_eq!(engine.view().time.season, "Autumn");
    assert_eq!(engine.view().time.season_modifier, 1.2);
}

#[test]
fn paused_clock_refuses_ticks_but_fires_deferred_work() {
    let mut engine = SimEngine::build_test(1)
        .with_random_source(Box::new(kingdom_core::rng::FixedSequence::constant(0.0)));
    engine.explore().unwrap();
    engine.player_attack().unwrap();
    engine.apply_command(PlayerCommand::Pause).unwrap();

    assert!(matches!(engine.tick(), Err(SimError::ClockPaused)));
    engine.advance_millis(5_000).unwrap();
    assert_eq!(engine.current_tick(), 0);
    assert_eq!(engine.world.player.hp, 98);

    engine.run_ticks(3).unwrap();
    assert_eq!(engine.current_tick(), 3);
    assert!(engine.world.clock.paused, "run_ticks restores the pause");
}

#[test]
fn speed_scales_ticks_per_real_second() {
    let mut engine = SimEngine::build_test(1);
    engine.advance_millis(3_000).unwrap();
    assert_eq!(engine.current_tick(), 3);

    engine.apply_command(PlayerCommand::SetSpeed { speed: SimSpeed::Accelerated }).unwrap();
    engine.advance_millis(1_000).unwrap();
    assert_eq!(engine.current_tick(), 7);

    engine.apply_command(PlayerCommand::SetSpeed { speed: SimSpeed::FastForward }).unwrap();
    engine.advance_millis(1_000).unwrap();
    assert_eq!(engine.current_tick(), 23);
}

#[test]
fn log_keeps_only_the_newest_eight_lines() {
    let mut engine = SimEngine::build_test(1);
    for i in 0..12 {
        let _ = engine.purchase(&format!("tower_{i}"));
    }
    let log = engine.recent_log();
    assert_eq!(log.len(), 8);
    assert_eq!(log[0].message, "Unknown building 'tower_11' ignored.");
    assert_eq!(log[7].message, "Unknown building 'tower_4' ignored.");
}
