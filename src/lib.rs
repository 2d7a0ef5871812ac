//! Mediafetch - Media search and fetch job service
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (jobs, search results, media naming)
//! - ports/: Trait definitions
//! - adapters/: Concrete implementations (Redis, memory, filesystem, yt-dlp, HTTP)
//! - application/: Services (search, orchestrator, download worker)
//! - config: Environment configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports for convenience
pub use adapters::local::http::{router, AppState};
pub use config::LocalConfig;
