//! Application layer - Services that use ports.

pub mod orchestrator;
pub mod retry;
pub mod search;
pub mod worker;
