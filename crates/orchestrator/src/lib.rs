pub mod engine;

pub use engine::{OrchestrateRequest, Orchestrator, OrchestratorConfig};
