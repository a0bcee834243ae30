pub mod events;
pub mod guard;
pub mod impersonation;
pub mod in_memory;
pub mod resolver;

pub use events::{BroadcastListener, PossessionEvent, PossessionListener};
pub use guard::SessionGuard;
pub use impersonation::{PossessionManager, PossessionScope};
pub use in_memory::InMemoryIdentityProvider;
pub use resolver::RealmResolver;
