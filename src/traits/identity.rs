//! Identity provider trait
//!
//! An identity provider resolves principals for one realm. Implement it for
//! whatever holds your users (a database table, a directory service, ...).

use crate::error::Result;
use crate::principal::{Lookup, PrincipalId, PrincipalRef};
use async_trait::async_trait;

/// Resolves principals by identifier.
///
/// `Ok(None)` means "no such principal" and is distinct from `Err`, which
/// reports a backend failure.
///
/// # Example
///
/// ```rust,ignore
/// #[async_trait]
/// impl IdentityProvider for CustomerTable {
///     async fn find_by_id(&self, id: &PrincipalId) -> Result<Option<PrincipalRef>> {
///         let row = self.db.customer(id.as_str()).await.map_err(PossessionError::backend)?;
///         Ok(row.map(|c| Arc::new(c) as PrincipalRef))
///     }
///
///     async fn find_by_email(&self, email: &str) -> Result<Option<PrincipalRef>> {
///         let row = self.db.customer_by_email(email).await.map_err(PossessionError::backend)?;
///         Ok(row.map(|c| Arc::new(c) as PrincipalRef))
///     }
/// }
/// ```
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn find_by_id(&self, id: &PrincipalId) -> Result<Option<PrincipalRef>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<PrincipalRef>>;

    /// Run a classified lookup.
    async fn find(&self, lookup: &Lookup) -> Result<Option<PrincipalRef>> {
        match lookup {
            Lookup::Id(id) => self.find_by_id(id).await,
            Lookup::Email(email) => self.find_by_email(email).await,
        }
    }
}
