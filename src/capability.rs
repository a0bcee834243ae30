//! Capability predicates attached to every principal type.
//!
//! A principal type opts in to acting as an admin by overriding
//! [`Possessable::can_possess`], and opts out of being impersonated by
//! overriding [`Possessable::can_be_possessed`]. With no overrides a
//! principal can be impersonated but cannot impersonate anyone.
//!
//! The session-level "is currently impersonated" predicate depends on the
//! client session rather than the principal, so it lives on
//! [`PossessionScope::is_possessed`](crate::PossessionScope::is_possessed).
//!
//! # Example
//!
//! ```rust,ignore
//! impl Possessable for Admin {
//!     fn can_possess(&self) -> bool {
//!         self.role == Role::Support
//!     }
//!
//!     fn can_be_possessed(&self) -> bool {
//!         false
//!     }
//! }
//! ```

/// Capability interface the possession engine dispatches on.
///
/// Both predicates are evaluated on every call, never cached, so a change in
/// the underlying data (a revoked role, for instance) is observed the next
/// time the engine asks.
pub trait Possessable {
    /// Whether this principal may impersonate others.
    fn can_possess(&self) -> bool {
        false
    }

    /// Whether this principal may be impersonated.
    fn can_be_possessed(&self) -> bool {
        true
    }
}
