pub mod handlers;
pub mod heuristic;
pub mod orchestrator;
