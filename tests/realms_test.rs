use possession::testing::TestPrincipal;
use possession::{
    ActiveSession, AuthContext, ConfigBuilder, InMemoryIdentityProvider, InMemorySessionStore,
    PossessionError, PossessionManager, PrincipalId, PrincipalRef, RealmResolver, SessionGuard,
    SessionHandle,
};
use std::sync::Arc;
use std::time::Duration;

/// Admins, customers and regular users live in three separate identity stores.
struct Realms {
    manager: PossessionManager,
    session: Arc<ActiveSession>,
    guard: SessionGuard,
    admin: Arc<TestPrincipal>,
    users: InMemoryIdentityProvider,
}

impl Realms {
    async fn new() -> Self {
        let admins = InMemoryIdentityProvider::new();
        let admin = admins.insert(TestPrincipal::admin(1, "admin").with_email("root@example.com"));

        let customers = InMemoryIdentityProvider::new();
        customers.insert(TestPrincipal::new(1, "customer").with_email("c1@example.com"));
        customers.insert(TestPrincipal::new(7, "customer").with_email("c7@example.com"));

        let users = InMemoryIdentityProvider::new();
        users.insert(TestPrincipal::new(1, "user").with_email("u1@example.com"));
        users.insert(TestPrincipal::new(5, "user").with_email("u5@example.com"));

        let config = ConfigBuilder::new()
            .with_admin_realm("admin")
            .with_default_realm("web")
            .build()
            .unwrap();
        let resolver = RealmResolver::new()
            .with_realm("admin", admins)
            .with_realm("customer", customers)
            .with_default_provider(users.clone());
        let manager = PossessionManager::new(config, resolver);

        let session = Arc::new(ActiveSession::start(
            Arc::new(InMemorySessionStore::new()),
            Duration::from_secs(600),
        ));
        let guard = manager.guard(session.clone());

        let admin_ref: PrincipalRef = admin.clone();
        guard.login("admin", &admin_ref).await.unwrap();

        Self {
            manager,
            session,
            guard,
            admin,
            users,
        }
    }

    /// Log a regular user who may possess into the admin realm instead.
    async fn login_user_as_admin(&self) {
        let user: PrincipalRef = self.users.insert(TestPrincipal::admin(1, "user"));
        self.guard.logout("admin").await.unwrap();
        self.guard.login("admin", &user).await.unwrap();
    }

    fn scope(&self) -> possession::PossessionScope<'_> {
        self.manager.scope(self.session.as_ref(), &self.guard)
    }

    async fn current(&self, realm: &str) -> Option<(String, PrincipalId)> {
        self.guard
            .user(realm)
            .await
            .unwrap()
            .map(|p| (p.kind().to_string(), p.id()))
    }
}

#[tokio::test]
async fn test_same_id_in_another_realm_is_not_self() {
    let r = Realms::new().await;

    let target = r.scope().possess(1u64, Some("customer")).await.unwrap();

    assert_eq!(target.kind(), "customer");
    assert_eq!(
        r.current("customer").await,
        Some(("customer".to_string(), PrincipalId::from(1u64)))
    );
    assert!(r.current("admin").await.is_none());
    assert_eq!(
        r.session
            .get(&r.manager.config().session_keys.impersonated_realm)
            .as_deref(),
        Some("customer")
    );
}

#[tokio::test]
async fn test_leave_restores_admin_realm_only() {
    let r = Realms::new().await;
    r.scope().possess("c7@example.com", Some("customer")).await.unwrap();

    let admin = r.scope().unpossess().await.unwrap();

    assert_eq!(admin.kind(), "admin");
    assert_eq!(
        r.current("admin").await,
        Some(("admin".to_string(), PrincipalId::from(1u64)))
    );
    assert!(r.current("customer").await.is_none());
    assert!(!r.scope().is_possessing());
}

#[tokio::test]
async fn test_target_found_through_default_provider() {
    let r = Realms::new().await;

    let target = r.scope().possess("u5@example.com", Some("customer")).await.unwrap();

    assert_eq!(target.kind(), "user");
    assert_eq!(
        r.current("customer").await,
        Some(("user".to_string(), PrincipalId::from(5u64)))
    );
    assert!(r.scope().is_possessed(target.as_ref()).await.unwrap());

    r.scope().unpossess().await.unwrap();
    assert!(r.current("customer").await.is_none());
}

#[tokio::test]
async fn test_default_realm_uses_default_provider() {
    let r = Realms::new().await;

    let target = r.scope().possess(1u64, None).await.unwrap();

    assert_eq!(target.kind(), "user");
    assert_eq!(r.scope().impersonated_realm().as_deref(), Some("web"));
    assert_eq!(
        r.current("web").await,
        Some(("user".to_string(), PrincipalId::from(1u64)))
    );

    let original = r.scope().original_principal().await.unwrap().unwrap();
    assert_eq!(original.kind(), "admin");
}

#[tokio::test]
async fn test_admin_must_be_logged_into_admin_realm() {
    let r = Realms::new().await;
    r.guard.logout("admin").await.unwrap();

    let admin: PrincipalRef = r.admin.clone();
    r.guard.login("web", &admin).await.unwrap();

    let err = r.scope().possess(5u64, None).await.unwrap_err();
    assert!(matches!(err, PossessionError::NotAuthenticated));
}

#[tokio::test]
async fn test_unknown_target_in_every_store() {
    let r = Realms::new().await;

    let err = r.scope().possess(42u64, Some("customer")).await.unwrap_err();
    assert!(matches!(err, PossessionError::TargetNotFound(_)));
    assert_eq!(
        r.current("admin").await,
        Some(("admin".to_string(), PrincipalId::from(1u64)))
    );
}

#[tokio::test]
async fn test_leave_restores_admin_of_the_recorded_kind() {
    let r = Realms::new().await;
    r.login_user_as_admin().await;
    assert_eq!(
        r.current("admin").await,
        Some(("user".to_string(), PrincipalId::from(1u64)))
    );

    r.scope().possess(5u64, None).await.unwrap();
    let original = r.scope().original_principal().await.unwrap().unwrap();
    assert_eq!(original.kind(), "user");

    let restored = r.scope().unpossess().await.unwrap();

    assert_eq!(restored.kind(), "user");
    assert_eq!(
        r.current("admin").await,
        Some(("user".to_string(), PrincipalId::from(1u64)))
    );
}

#[tokio::test]
async fn test_equal_id_of_another_kind_is_not_restored() {
    let r = Realms::new().await;
    r.login_user_as_admin().await;
    r.scope().possess(5u64, None).await.unwrap();

    r.users.remove(&PrincipalId::from(1u64));

    assert!(r.scope().original_principal().await.unwrap().is_none());
    let err = r.scope().unpossess().await.unwrap_err();
    assert!(matches!(err, PossessionError::AdminNotFound(ref id) if id == "1"));
    assert!(r.scope().is_possessing());
    assert_eq!(
        r.current("web").await,
        Some(("user".to_string(), PrincipalId::from(5u64)))
    );
}
