//! Session management and storage.
//!
//! Provides the in-memory session backend and [`ActiveSession`], the
//! per-request session handle the possession engine works against.

mod active;
mod config;
mod in_memory;

pub use active::ActiveSession;
pub use config::SessionConfig;
pub use in_memory::InMemorySessionStore;
