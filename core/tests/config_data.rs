//! The shipped data/ directory must describe the built-in defaults.

use kingdom_core::config::SimConfig;

fn data_dir() -> String {
    format!("{}/../data", env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn data_directory_matches_defaults() {
    let loaded = SimConfig::load(&data_dir()).expect("load data/");
    assert_eq!(loaded, SimConfig::default());
}

#[test]
fn missing_directory_is_an_error() {
    let err = SimConfig::load("/nonexistent/kingdom-data").unwrap_err();
    assert!(err.to_string().contains("Cannot read"));
}
