pub mod actions;
pub mod catalog;
pub mod components;
pub mod engine;
pub mod rng;
pub mod scenario;
pub mod selection;
pub mod snapshot;
pub mod suitability;
pub mod systems;
pub mod web;
pub mod world;

pub use engine::{Engine, EngineBuilder, EngineSettings, TickReport};
pub use scenario::Scenario;
pub use world::Farm;
