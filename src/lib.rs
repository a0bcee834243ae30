//! Possession - session-based user impersonation
//!
//! Lets an authorized administrator temporarily act as another principal
//! within their own client session, then return to their own identity.
//! Admins and targets may live in different authentication realms backed by
//! unrelated identity stores.
//!
//! # Features
//!
//! - **Engine**: [`PossessionManager`] / [`PossessionScope`] with start, stop
//!   and status queries
//! - **Realms**: [`RealmResolver`] maps realm names to identity providers,
//!   with a default-provider fallback for cross-realm targets
//! - **Sessions**: [`ActiveSession`] over a pluggable [`SessionStore`],
//!   regenerated on every transition
//! - **Events**: [`PossessionListener`] notifications, fire-and-forget
//! - **HTTP** (feature `http`, default): axum session layer, routes and
//!   middleware
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use possession::{ConfigBuilder, InMemoryIdentityProvider, PossessionManager, RealmResolver};
//!
//! possession::init_tracing();
//!
//! let config = ConfigBuilder::new().from_env().build()?;
//! let resolver = RealmResolver::new()
//!     .with_realm("admin", admins)
//!     .with_default_provider(users);
//!
//! let manager = Arc::new(PossessionManager::new(config, resolver));
//!
//! // Per request
//! let auth = manager.guard(session.clone());
//! let scope = manager.scope(session.as_ref(), &auth);
//! scope.possess("user@example.com", None).await?;
//! ```

pub mod auth;
pub mod capability;
mod config;
mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod principal;
pub mod session;
pub mod testing;
pub mod traits;
mod utils;

// Re-exports for public API
pub use auth::{
    BroadcastListener, InMemoryIdentityProvider, PossessionEvent, PossessionListener,
    PossessionManager, PossessionScope, RealmResolver, SessionGuard,
};
pub use capability::Possessable;
pub use config::{
    ConfigBuilder, LoggingConfig, PossessionConfig, RoutesConfig, SessionKeys,
};
pub use error::{PossessionError, Result};
pub use principal::{Lookup, Principal, PrincipalId, PrincipalRef, Target, same_principal};
pub use session::{ActiveSession, InMemorySessionStore, SessionConfig};
pub use traits::{AuthContext, IdentityProvider, SessionData, SessionHandle, SessionStore};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "possession=debug")
/// - `POSSESSION_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("POSSESSION_LOG_JSON")
        .ok()
        .and_then(|v| utils::parse_bool(&v))
        .unwrap_or(false);

    install(env_filter, json_logs);
}

/// Initialize tracing with a custom configuration
pub fn init_tracing_with_config(config: &LoggingConfig) {
    install(EnvFilter::new(&config.level), config.json);
}

fn install(env_filter: EnvFilter, json: bool) {
    let registry = tracing_subscriber::registry().with(env_filter);

    // Ignore "already initialized" so embedding applications keep their subscriber.
    let _ = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
}
