//! kingdom-core: the idle-kingdom simulation.
//!
//! `engine::SimEngine` owns one `world::SimWorld` and is the only entry
//! point for mutation. Everything else is a component it lends the world to.

pub mod clock;
pub mod combat;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod ledger;
pub mod market;
pub mod production_subsystem;
pub mod regeneration_subsystem;
pub mod rng;
pub mod scheduler;
pub mod snapshot;
pub mod store;
pub mod subsystem;
pub mod types;
pub mod view;
pub mod world;
