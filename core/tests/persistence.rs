//! Save, load, autosave, reset, export and import.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use kingdom_core::{
    command::{CommandReply, PlayerCommand},
    config::SimConfig,
    engine::SimEngine,
    error::SimError,
    store::{KeyValueStore, MemoryStore, SqliteStore},
};

const SAVE_KEY: &str = "kittens_lite_save";

fn engine_with_store(store: Box<dyn KeyValueStore>) -> SimEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    SimEngine::build(SimConfig::default(), 3, store)
}

/// Pasture, two fields and 37 ticks of play.
fn play_a_little(engine: &mut SimEngine) {
    engine.world.ledger.add("catnip", 150.0).unwrap();
    engine.world.ledger.add("wood", 10.0).unwrap();
    engine.purchase("pasture").expect("pasture");
    engine.purchase("catnip_field").expect("field 1");
    engine.purchase("catnip_field").expect("field 2");
    engine.world.player.hp = 80;
    engine.run_ticks(37).expect("ticks");
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn messages(engine: &SimEngine) -> Vec<String> {
    engine.recent_log().into_iter().map(|e| e.message).collect()
}

#[test]
fn save_then_load_restores_amounts_counts_and_time() {
    let mut engine = engine_with_store(Box::new(SqliteStore::in_memory().unwrap()));
    play_a_little(&mut engine);
    engine.save().expect("save");
    let saved = engine.world.clone();

    engine.click_gather().unwrap();
    engine.world.ledger.add("wood", 3.0).unwrap();
    engine.world.player.hp = 1;

    assert!(engine.load().expect("load"));
    for r in saved.ledger.iter() {
        assert!(close(engine.world.ledger.amount(&r.id), r.amount), "{} amount", r.id);
        assert!(close(engine.world.ledger.cap(&r.id), r.cap), "{} cap", r.id);
    }
    assert_eq!(engine.world.market.count("pasture"), 1);
    assert_eq!(engine.world.market.count("catnip_field"), 2);
    assert_eq!(engine.world.clock.current_tick, 37);
    assert_eq!(engine.world.clock.season_index, saved.clock.season_index);
    assert_eq!(engine.world.clock.year, saved.clock.year);
    assert_eq!(engine.world.player.hp, saved.player.hp);
    assert_eq!(messages(&engine)[0], "Welcome back!");
}

#[test]
fn load_without_a_save_changes_nothing() {
    let mut engine = engine_with_store(Box::new(MemoryStore::new()));
    engine.world.ledger.add("catnip", 12.0).unwrap();
    assert!(!engine.load().unwrap());
    assert_eq!(engine.world.ledger.amount("catnip"), 12.0);
}

#[test]
fn malformed_save_falls_back_to_defaults() {
    let mut store = MemoryStore::new();
    store.put(SAVE_KEY, "{ this is not json", 0).unwrap();
    let mut engine = engine_with_store(Box::new(store));
    engine.world.ledger.add("catnip", 30.0).unwrap();

    assert!(matches!(engine.load(), Err(SimError::MalformedSnapshot { .. })));
    assert_eq!(engine.world.ledger.amount("catnip"), 0.0);
    assert_eq!(engine.current_tick(), 0);
    assert!(messages(&engine)[0].starts_with("Save data could not be read"));

    // The stored payload is left alone.
    assert!(matches!(engine.load(), Err(SimError::MalformedSnapshot { .. })));
}

#[test]
fn autosave_is_silent_and_every_ten_ticks() {
    let mut engine = engine_with_store(Box::new(MemoryStore::new()));
    engine.run_ticks(9).unwrap();
    assert!(!engine.load().unwrap(), "nothing saved before tick 10");

    engine.run_ticks(1).unwrap();
    assert!(messages(&engine).iter().all(|m| m != "Game saved."));

    engine.click_gather().unwrap();
    assert!(engine.load().unwrap());
    assert_eq!(engine.current_tick(), 10);
    assert_eq!(engine.world.ledger.amount("catnip"), 0.0);
}

#[test]
fn manual_save_is_announced() {
    let mut engine = engine_with_store(Box::new(MemoryStore::new()));
    engine.save().unwrap();
    assert_eq!(messages(&engine), vec!["Game saved.".to_string()]);
}

#[test]
fn reset_wipes_the_save_and_the_log() {
    let mut engine = engine_with_store(Box::new(MemoryStore::new()));
    play_a_little(&mut engine);
    engine.save().unwrap();

    engine.reset().expect("reset");
    assert_eq!(engine.world.ledger.amount("catnip"), 0.0);
    assert_eq!(engine.world.ledger.cap("catnip"), 200.0);
    assert_eq!(engine.world.market.count("pasture"), 0);
    assert_eq!(engine.world.player.hp, 100);
    assert_eq!(engine.current_tick(), 0);
    assert_eq!(messages(&engine), vec!["Progress reset.".to_string()]);
    assert!(!engine.load().unwrap());
}

#[test]
fn export_code_imports_into_a_fresh_engine() {
    let mut source = engine_with_store(Box::new(MemoryStore::new()));
    play_a_little(&mut source);
    let code = source.export_snapshot().expect("export");

    let mut target = SimEngine::build_test(99);
    target.import_snapshot(&code).expect("import");
    for r in source.world.ledger.iter() {
        assert!(close(target.world.ledger.amount(&r.id), r.amount));
        assert!(close(target.world.ledger.cap(&r.id), r.cap));
    }
    assert_eq!(target.world.market.count("catnip_field"), 2);
    assert_eq!(target.current_tick(), 37);

    // Import persists.
    target.world.ledger.add("wood", 1.0).unwrap();
    assert!(target.load().unwrap());
    assert_eq!(target.world.ledger.amount("wood"), source.world.ledger.amount("wood"));
}

#[test]
fn import_reconciles_partial_and_unknown_entries() {
    let json = r#"{
        "resources": { "catnip": { "amount": 42.0 }, "gold": { "amount": 1.0 } },
        "buildings": { "castle": { "count": 9 } },
        "time": { "ticks": 420 }
    }"#;
    let mut engine = SimEngine::build_test(1);
    engine.import_snapshot(&STANDARD.encode(json)).expect("import");

    assert_eq!(engine.world.ledger.amount("catnip"), 42.0);
    assert_eq!(engine.world.ledger.cap("catnip"), 200.0);
    assert!(engine.world.ledger.get("gold").is_none());
    assert_eq!(engine.world.clock.year, 3);
    assert_eq!(engine.world.clock.season_index, 0);
    assert_eq!(engine.world.player.hp, 100);
}

#[test]
fn bad_import_codes_fall_back_to_defaults() {
    for code in ["%%% not base64 %%%".to_string(), STANDARD.encode("[1, 2, 3]")] {
        let mut engine = SimEngine::build_test(1);
        engine.world.ledger.add("catnip", 30.0).unwrap();
        assert!(
            matches!(engine.import_snapshot(&code), Err(SimError::MalformedSnapshot { .. })),
            "expected rejection for {code}"
        );
        assert_eq!(engine.world.ledger.amount("catnip"), 0.0);
        assert!(!engine.load().unwrap(), "a rejected import is not persisted");
    }
}

#[test]
fn export_and_import_commands_round_trip() {
    let mut engine = SimEngine::build_test(5);
    engine.world.ledger.add("catnip", 64.0).unwrap();
    let code = match engine.apply_command(PlayerCommand::Export).unwrap() {
        CommandReply::ExportCode { code } => code,
        other => panic!("expected an export code, got {other:?}"),
    };

    engine.apply_command(PlayerCommand::Reset).unwrap();
    assert_eq!(engine.world.ledger.amount("catnip"), 0.0);

    assert_eq!(engine.apply_command(PlayerCommand::Import { code }).unwrap(), CommandReply::Done);
    assert_eq!(engine.world.ledger.amount("catnip"), 64.0);
}

#[test]
fn out_of_range_tick_in_an_import_keeps_the_engine_running() {
    let json = format!(r#"{{ "time": {{ "ticks": {} }}, "resources": {{ "catnip": {{ "amount": 9.0 }} }} }}"#, u64::MAX);
    let mut engine = SimEngine::build_test(1);
    engine.import_snapshot(&STANDARD.encode(json)).expect("import");
    assert_eq!(engine.current_tick(), 0);
    assert_eq!(engine.world.ledger.amount("catnip"), 9.0);

    engine.tick().expect("tick after import");
    assert_eq!(engine.current_tick(), 1);
}
