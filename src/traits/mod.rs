//! Trait definitions for the collaborators of the possession engine
//!
//! These traits let applications plug in their own identity stores,
//! session backends and authentication guards.

pub mod guard;
pub mod identity;
pub mod session;

pub use guard::AuthContext;
pub use identity::IdentityProvider;
pub use session::{SessionData, SessionHandle, SessionStore};
