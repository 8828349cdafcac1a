pub mod engine;

pub use engine::{ImpactResult, QueryEngine};
