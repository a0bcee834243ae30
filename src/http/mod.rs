//! HTTP surface for axum applications.
//!
//! Provides the cookie session layer, the possess/leave routes and
//! middleware that restricts or annotates requests during a possession.
//!
//! Middleware order matters: [`SessionLayer`] must run before anything that
//! reads the session, so add it last (outermost).

mod middleware;
mod routes;
mod session_layer;

pub use middleware::{
    PossessionState, ensure_not_possessing, forbid_during_possession, share_possession_state,
};
pub use routes::{PossessRequest, PossessionRoutes};
pub use session_layer::SessionLayer;
