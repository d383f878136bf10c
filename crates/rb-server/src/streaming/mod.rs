//! Live station streaming: queue, engine, and registry.

pub mod engine;
pub mod queue;
pub mod registry;

pub use engine::StationEngine;
pub use registry::EngineRegistry;
