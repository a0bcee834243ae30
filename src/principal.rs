//! Principal identity types.
//!
//! A principal is any authenticatable identity. It is identified by a
//! realm-scoped [`PrincipalId`] together with its `kind`, the identity space
//! it belongs to. Two principals with the same id but different kinds are
//! different identities.

use crate::capability::Possessable;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Realm-scoped principal identifier.
///
/// Stored as a string so that numeric, UUID and slug identifiers all fit
/// in a session value without loss.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the identifier consists only of ASCII digits.
    pub fn is_numeric(&self) -> bool {
        !self.0.is_empty() && self.0.bytes().all(|b| b.is_ascii_digit())
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for PrincipalId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<u32> for PrincipalId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for PrincipalId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PrincipalId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// An authenticatable identity.
///
/// Implement this for each user model that can log in to a realm. The
/// capability predicates come from the [`Possessable`] supertrait.
pub trait Principal: Possessable + Send + Sync + fmt::Debug {
    /// Identifier within the principal's identity space.
    fn id(&self) -> PrincipalId;

    /// Stable name of the identity space (e.g. `"admin"`, `"customer"`).
    fn kind(&self) -> &str;

    /// Email address, if the principal has one.
    fn email(&self) -> Option<&str> {
        None
    }
}

/// Shared handle to a resolved principal.
pub type PrincipalRef = Arc<dyn Principal>;

/// Whether two principals are the same identity: equal kind and equal id.
pub fn same_principal(a: &dyn Principal, b: &dyn Principal) -> bool {
    a.kind() == b.kind() && a.id() == b.id()
}

/// What a caller asks to impersonate.
#[derive(Clone, Debug)]
pub enum Target {
    /// An already resolved principal; used as-is.
    Principal(PrincipalRef),
    /// A raw identifier: numeric id, email address or other identifier.
    Identifier(String),
}

impl Target {
    /// How a raw identifier should be looked up; `None` for resolved handles.
    pub fn lookup(&self) -> Option<Lookup> {
        match self {
            Self::Principal(_) => None,
            Self::Identifier(raw) => Some(Lookup::parse(raw)),
        }
    }

    /// Human-readable description used in errors and logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Principal(p) => format!("{}:{}", p.kind(), p.id()),
            Self::Identifier(raw) => raw.clone(),
        }
    }
}

impl From<PrincipalRef> for Target {
    fn from(principal: PrincipalRef) -> Self {
        Self::Principal(principal)
    }
}

impl From<&PrincipalRef> for Target {
    fn from(principal: &PrincipalRef) -> Self {
        Self::Principal(Arc::clone(principal))
    }
}

impl From<u64> for Target {
    fn from(id: u64) -> Self {
        Self::Identifier(id.to_string())
    }
}

impl From<&str> for Target {
    fn from(raw: &str) -> Self {
        Self::Identifier(raw.to_string())
    }
}

impl From<String> for Target {
    fn from(raw: String) -> Self {
        Self::Identifier(raw)
    }
}

impl From<PrincipalId> for Target {
    fn from(id: PrincipalId) -> Self {
        Self::Identifier(id.0)
    }
}

/// A single identity-provider query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    Id(PrincipalId),
    Email(String),
}

impl Lookup {
    /// Classify a raw identifier.
    ///
    /// Digits-only input is an id, email-shaped input is an email, anything
    /// else is treated as an id.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let id = PrincipalId::new(raw);

        if id.is_numeric() {
            return Self::Id(id);
        }

        if is_email_shaped(raw) {
            return Self::Email(raw.to_string());
        }

        Self::Id(id)
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id={id}"),
            Self::Email(email) => write!(f, "email={email}"),
        }
    }
}

/// Basic email shape check: one `@`, non-empty local part, dotted domain.
fn is_email_shaped(value: &str) -> bool {
    let parts: Vec<&str> = value.split('@').collect();
    if parts.len() != 2 {
        return false;
    }

    let local = parts[0];
    let domain = parts[1];

    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.contains(char::is_whitespace)
}
