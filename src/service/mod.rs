//! Authentication service: registration, login with role selection, token
//! refresh, role switching and administrative role grants.
//!
//! The service holds no state of its own. Every operation reads the account
//! and role stores and, on success, mints a fresh token pair.

mod error;
mod resolver;

use std::sync::Arc;

use tracing::{error, info, warn};

pub use error::{AuthError, INVALID_CREDENTIALS, SELECT_ROLE, StoreResultExt};
pub use resolver::RoleResolver;

use crate::db::{Database, Role};
use crate::jwt::{JwtConfig, TokenPair, TokenPayload};
use crate::password::{CredentialMatch, CredentialVerifier, hash_password};

/// Role given to every newly registered account.
pub const DEFAULT_ROLE: Role = Role::Viewer;

#[derive(Clone)]
pub struct AuthService {
    db: Database,
    jwt: Arc<JwtConfig>,
    verifier: CredentialVerifier,
}

impl AuthService {
    pub fn new(db: Database, jwt: Arc<JwtConfig>, verifier: CredentialVerifier) -> Self {
        Self { db, jwt, verifier }
    }

    pub fn roles(&self) -> RoleResolver {
        RoleResolver::new(self.db.clone())
    }

    /// Create an account holding the default role. Returns the new account ID.
    pub async fn register(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let existing = self
            .db
            .users()
            .get_by_email(email)
            .await
            .store_err("Failed to look up user")?;

        if existing.is_some() {
            return Err(AuthError::Conflict("User already exist!".into()));
        }

        let hash = hash_blocking(password).await?;

        let id = self
            .db
            .users()
            .create(email, &hash, &[DEFAULT_ROLE])
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    AuthError::Conflict("User already exist!".into())
                }
                e => AuthError::store("Failed to create user", e),
            })?;

        info!(user_id = %id, "User registered");
        Ok(id)
    }

    /// Authenticate and issue tokens for one role.
    ///
    /// With `requested` set, the account must hold that role. Without it, the
    /// account must hold exactly one role; otherwise the caller gets the list of
    /// candidates to choose from.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        requested: Option<Role>,
    ) -> Result<TokenPair, AuthError> {
        let account = self
            .db
            .users()
            .get_credentials(email)
            .await
            .store_err("Failed to look up user")?;

        let verifier = self.verifier.clone();
        let stored = account
            .as_ref()
            .map(|a| (a.email.clone(), a.password.clone()));
        let plaintext = password.to_owned();
        let matched = run_blocking(move || match stored {
            Some((email, stored)) => verifier.verify(&email, &stored, &plaintext),
            None => verifier.verify_unknown(&plaintext),
        })
        .await?;

        let (Some(account), Some(matched)) = (account, matched) else {
            return Err(AuthError::invalid_credentials());
        };

        let roles = self.roles().roles_of(&account.id).await?;

        let role = match requested {
            Some(role) if roles.contains(&role) => role,
            Some(_) => return Err(AuthError::role_not_held()),
            None if roles.len() == 1 => roles[0],
            None => return Err(AuthError::AmbiguousRole { roles }),
        };

        if matched == CredentialMatch::BootstrapLiteral {
            self.rotate_bootstrap_credential(&account.id, password).await?;
        }

        info!(user_id = %account.id, role = %role, "User logged in");
        self.issue(TokenPayload::new(account.id, role)).await
    }

    /// Reissue a pair for the same subject and role.
    ///
    /// The role is taken from the presented token, not re-derived from the store.
    pub async fn refresh(&self, payload: &TokenPayload) -> Result<TokenPair, AuthError> {
        let exists = self
            .db
            .users()
            .exists(&payload.id)
            .await
            .store_err("Failed to look up user")?;

        if !exists {
            return Err(AuthError::BadRequest("User not exist!".into()));
        }

        self.issue(payload.clone()).await
    }

    /// Switch the active role of the current subject.
    pub async fn change_role(
        &self,
        payload: &TokenPayload,
        desired: Role,
    ) -> Result<TokenPair, AuthError> {
        if !self.roles().has_role(&payload.id, desired).await? {
            return Err(AuthError::role_not_held());
        }

        info!(user_id = %payload.id, from = %payload.role, to = %desired, "Role changed");
        self.issue(TokenPayload::new(payload.id.clone(), desired)).await
    }

    /// Grant a role to another account. Granting a role twice is a no-op.
    pub async fn add_role_to_user(
        &self,
        target_user_id: &str,
        role: Role,
    ) -> Result<(), AuthError> {
        self.roles().by_name(role).await?;

        let exists = self
            .db
            .users()
            .exists(target_user_id)
            .await
            .store_err("Failed to look up user")?;

        if !exists {
            return Err(AuthError::NotFound("User not exist!".into()));
        }

        let added = self
            .db
            .users()
            .add_role(target_user_id, role)
            .await
            .store_err("Failed to add role")?;

        if added {
            info!(user_id = %target_user_id, role = %role, "Role granted");
        }
        Ok(())
    }

    async fn issue(&self, payload: TokenPayload) -> Result<TokenPair, AuthError> {
        Ok(self.jwt.issue(&payload).await?)
    }

    /// Replace the bootstrap admin's literal credential with its hash so the
    /// literal path cannot match again.
    async fn rotate_bootstrap_credential(&self, id: &str, password: &str) -> Result<(), AuthError> {
        let hash = hash_blocking(password).await?;
        self.db
            .users()
            .set_password(id, &hash)
            .await
            .store_err("Failed to rotate bootstrap credential")?;
        warn!(user_id = %id, "Bootstrap admin credential used and rotated into a hash");
        Ok(())
    }
}

/// Run argon2 work off the async workers.
async fn run_blocking<T, F>(f: F) -> Result<T, AuthError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!(error = %e, "Password task failed");
        AuthError::Internal("Failed to process password".to_string())
    })
}

async fn hash_blocking(password: &str) -> Result<String, AuthError> {
    let password = password.to_owned();
    Ok(run_blocking(move || hash_password(&password)).await??)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::{TokenKind, TokenSettings};
    use crate::password::is_password_hash;
    use std::time::Duration;

    async fn setup() -> (AuthService, Database, Arc<JwtConfig>) {
        let db = Database::open(":memory:").await.unwrap();
        let jwt = Arc::new(JwtConfig::new(
            TokenSettings::new(b"test-access-secret", Duration::from_secs(900)),
            TokenSettings::new(b"test-refresh-secret", Duration::from_secs(3600)),
        ));
        let service = AuthService::new(
            db.clone(),
            jwt.clone(),
            CredentialVerifier::new("admin@test.com"),
        );
        (service, db, jwt)
    }

    #[tokio::test]
    async fn test_register_twice_conflicts() {
        let (service, db, _) = setup().await;

        let id = service.register("a@example.com", "secret").await.unwrap();
        assert_eq!(db.roles().roles_of(&id).await.unwrap(), vec![Role::Viewer]);

        let second = service.register("a@example.com", "other").await;
        assert!(matches!(second, Err(AuthError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_register_stores_hash() {
        let (service, db, _) = setup().await;

        service.register("a@example.com", "secret").await.unwrap();
        let creds = db
            .users()
            .get_credentials("a@example.com")
            .await
            .unwrap()
            .unwrap();

        assert_ne!(creds.password, "secret");
        assert!(is_password_hash(&creds.password));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (service, _, _) = setup().await;
        service.register("a@example.com", "secret").await.unwrap();

        let wrong_password = service.login("a@example.com", "nope", None).await;
        let unknown_email = service.login("b@example.com", "secret", None).await;

        match (wrong_password, unknown_email) {
            (Err(AuthError::Unauthorized(a)), Err(AuthError::Unauthorized(b))) => {
                assert_eq!(a, b);
                assert_eq!(a, INVALID_CREDENTIALS);
            }
            other => panic!("expected two Unauthorized errors, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_login_single_role() {
        let (service, db, jwt) = setup().await;
        let hash = hash_password("secret").unwrap();
        let id = db
            .users()
            .create("boss@example.com", &hash, &[Role::Admin])
            .await
            .unwrap();

        let pair = service
            .login("boss@example.com", "secret", None)
            .await
            .unwrap();

        let payload = jwt.verify(TokenKind::Access, &pair.access_token).unwrap();
        assert_eq!(payload, TokenPayload::new(id, Role::Admin));
    }

    #[tokio::test]
    async fn test_login_multiple_roles_is_ambiguous() {
        let (service, _, _) = setup().await;
        let id = service.register("multi@example.com", "secret").await.unwrap();
        service.add_role_to_user(&id, Role::Editor).await.unwrap();

        let result = service.login("multi@example.com", "secret", None).await;
        match result {
            Err(AuthError::AmbiguousRole { roles }) => {
                assert_eq!(roles, vec![Role::Viewer, Role::Editor]);
            }
            other => panic!("expected AmbiguousRole, got {:?}", other.map(|_| ())),
        }

        let pair = service
            .login("multi@example.com", "secret", Some(Role::Editor))
            .await
            .unwrap();
        assert!(!pair.access_token.is_empty());
    }

    #[tokio::test]
    async fn test_login_zero_roles_is_ambiguous() {
        let (service, db, _) = setup().await;
        let hash = hash_password("secret").unwrap();
        db.users()
            .create("nobody@example.com", &hash, &[])
            .await
            .unwrap();

        let result = service.login("nobody@example.com", "secret", None).await;
        match result {
            Err(AuthError::AmbiguousRole { roles }) => assert!(roles.is_empty()),
            other => panic!("expected AmbiguousRole, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_login_requested_role_not_held() {
        let (service, _, _) = setup().await;
        service.register("v@example.com", "secret").await.unwrap();

        let result = service
            .login("v@example.com", "secret", Some(Role::Admin))
            .await;
        assert!(matches!(result, Err(AuthError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_bootstrap_literal_login_rotates() {
        let (service, db, _) = setup().await;
        db.users()
            .create("admin@test.com", "one-time-credential", &[Role::Admin])
            .await
            .unwrap();

        service
            .login("admin@test.com", "one-time-credential", None)
            .await
            .unwrap();

        let creds = db
            .users()
            .get_credentials("admin@test.com")
            .await
            .unwrap()
            .unwrap();
        assert!(is_password_hash(&creds.password));

        // Same password keeps working through the hash
        service
            .login("admin@test.com", "one-time-credential", None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_failed_bootstrap_role_check_does_not_rotate() {
        let (service, db, _) = setup().await;
        db.users()
            .create("admin@test.com", "one-time-credential", &[Role::Admin])
            .await
            .unwrap();

        let result = service
            .login("admin@test.com", "one-time-credential", Some(Role::Editor))
            .await;
        assert!(matches!(result, Err(AuthError::Forbidden(_))));

        let creds = db
            .users()
            .get_credentials("admin@test.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(creds.password, "one-time-credential");
    }

    #[tokio::test]
    async fn test_refresh_keeps_payload() {
        let (service, _, jwt) = setup().await;
        let id = service.register("r@example.com", "secret").await.unwrap();
        let payload = TokenPayload::new(id, Role::Viewer);

        let pair = service.refresh(&payload).await.unwrap();

        assert_eq!(jwt.verify(TokenKind::Access, &pair.access_token).unwrap(), payload);
        assert_eq!(jwt.verify(TokenKind::Refresh, &pair.refresh_token).unwrap(), payload);
    }

    #[tokio::test]
    async fn test_refresh_unknown_subject() {
        let (service, _, _) = setup().await;
        let payload = TokenPayload::new("00000000-0000-0000-0000-000000000000", Role::Viewer);

        let result = service.refresh(&payload).await;
        assert!(matches!(result, Err(AuthError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_refresh_keeps_revoked_role() {
        let (service, db, jwt) = setup().await;
        let id = service.register("rv@example.com", "secret").await.unwrap();
        service.add_role_to_user(&id, Role::Editor).await.unwrap();
        db.users()
            .update(&id, None, Some(&[Role::Viewer]))
            .await
            .unwrap();

        let payload = TokenPayload::new(id, Role::Editor);
        let pair = service.refresh(&payload).await.unwrap();

        let refreshed = jwt.verify(TokenKind::Access, &pair.access_token).unwrap();
        assert_eq!(refreshed.role, Role::Editor);
    }

    #[tokio::test]
    async fn test_change_role() {
        let (service, _, jwt) = setup().await;
        let id = service.register("c@example.com", "secret").await.unwrap();
        service.add_role_to_user(&id, Role::Editor).await.unwrap();

        let before = TokenPayload::new(id.clone(), Role::Viewer);
        let pair = service.change_role(&before, Role::Editor).await.unwrap();
        let after = jwt.verify(TokenKind::Access, &pair.access_token).unwrap();

        assert_eq!(after.id, before.id);
        assert_ne!(after.role, before.role);
        assert_eq!(after.role, Role::Editor);

        let denied = service.change_role(&before, Role::Admin).await;
        assert!(matches!(denied, Err(AuthError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_change_role_unknown_subject() {
        let (service, _, _) = setup().await;
        let payload = TokenPayload::new("missing", Role::Viewer);

        let result = service.change_role(&payload, Role::Viewer).await;
        assert!(matches!(result, Err(AuthError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_add_role_to_missing_user() {
        let (service, _, _) = setup().await;

        let result = service.add_role_to_user("missing", Role::Editor).await;
        assert!(matches!(result, Err(AuthError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_add_role_twice_keeps_single_entry() {
        let (service, db, _) = setup().await;
        let id = service.register("d@example.com", "secret").await.unwrap();

        service.add_role_to_user(&id, Role::Editor).await.unwrap();
        service.add_role_to_user(&id, Role::Editor).await.unwrap();

        assert_eq!(
            db.roles().roles_of(&id).await.unwrap(),
            vec![Role::Viewer, Role::Editor]
        );
    }

    #[tokio::test]
    async fn test_hashing_does_not_block_runtime() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = tokio::spawn({
            let ticks = ticks.clone();
            async move {
                loop {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    ticks.fetch_add(1, Ordering::SeqCst);
                }
            }
        });

        // The test runtime has a single worker, so the ticker only advances
        // while the hash is computed elsewhere.
        let hash = hash_blocking("secret").await.unwrap();
        ticker.abort();

        assert!(is_password_hash(&hash));
        assert!(ticks.load(Ordering::SeqCst) > 0);
    }
}
