use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::auth::password::{hash_password, verify_password};
use crate::store::StoreError;
use crate::users::model::{NewUser, Role, User};
use crate::users::repo::UserStore;

/// Recoverable input problems, surfaced to the caller for a re-prompt.
/// These are expected conditions, never logged as security incidents.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid email address")]
    InvalidEmail,
    #[error("email is already registered")]
    EmailTaken,
    #[error("passwords do not match")]
    PasswordMismatch,
}

/// Protocol outcome taxonomy: recoverable input errors on one side,
/// store-level failures on the other, so callers can pattern-match
/// instead of catching a single exception type.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("credential store failure")]
    Store(#[from] StoreError),
}

/// Raw registration input as collected by the front-end.
#[derive(Debug, Clone)]
pub struct Registration {
    pub nom: String,
    pub prenom: String,
    pub email: String,
    pub password: String,
    pub confirm: String,
    pub numero_telephone: String,
    pub date_naissance: String,
    pub adresse: String,
    /// Raw role input; coerced onto the closed role set by `register`.
    pub role: String,
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registration/authentication protocol over an injected user store.
///
/// No password strength policy is enforced here; the original system had
/// none and adding one silently would change the contract.
pub struct AuthService {
    users: Arc<dyn UserStore>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Register a new account.
    ///
    /// The uniqueness pre-check is a UX optimization; the store's unique
    /// constraint is the real guarantee, and losing that race reports the
    /// same `EmailTaken` the pre-check does.
    #[instrument(skip(self, input))]
    pub async fn register(&self, input: Registration) -> Result<(), AuthError> {
        let email = normalize_email(&input.email);

        if !is_valid_email(&email) {
            warn!(email = %email, "registration with invalid email");
            return Err(ValidationError::InvalidEmail.into());
        }
        if self.users.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "registration with taken email");
            return Err(ValidationError::EmailTaken.into());
        }
        if input.password != input.confirm {
            warn!(email = %email, "registration password confirmation mismatch");
            return Err(ValidationError::PasswordMismatch.into());
        }

        let role = Role::from_input(&input.role);
        let user = NewUser {
            nom: input.nom,
            prenom: input.prenom,
            email: email.clone(),
            password_hash: hash_password(&input.password),
            numero_telephone: input.numero_telephone,
            date_naissance: input.date_naissance,
            adresse: input.adresse,
            role,
        };

        match self.users.create(user).await {
            Ok(()) => {
                info!(email = %email, role = %role, "user registered");
                Ok(())
            }
            Err(StoreError::DuplicateEmail) => {
                // Pre-check raced with a concurrent registration; same
                // outcome for the caller as the pre-check itself.
                warn!(email = %email, "registration lost uniqueness race");
                Err(ValidationError::EmailTaken.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// One-shot credential check.
    ///
    /// Unknown email and wrong password both come back `Ok(None)`; the
    /// caller cannot tell them apart (anti-enumeration). A malformed
    /// stored hash also denies rather than erroring.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, AuthError> {
        let email = normalize_email(email);
        let user = match self.users.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                info!(email = %email, "authentication failed");
                return Ok(None);
            }
        };

        if verify_password(&user.password_hash, password) {
            info!(email = %email, role = %user.role, "authentication succeeded");
            Ok(Some(user))
        } else {
            info!(email = %email, "authentication failed");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::*;
    use crate::users::model::KYC_PENDING;

    /// In-memory `UserStore` enforcing the email unique constraint, like
    /// the real relation does.
    #[derive(Default)]
    struct MemStore {
        users: Mutex<Vec<User>>,
    }

    #[async_trait]
    impl UserStore for MemStore {
        async fn create(&self, user: NewUser) -> Result<(), StoreError> {
            let mut users = self.users.lock().unwrap();
            if users.iter().any(|u| u.email == user.email) {
                return Err(StoreError::DuplicateEmail);
            }
            users.push(User {
                id: Uuid::new_v4(),
                nom: user.nom,
                prenom: user.prenom,
                email: user.email,
                password_hash: user.password_hash,
                numero_telephone: user.numero_telephone,
                date_naissance: user.date_naissance,
                adresse: user.adresse,
                kyc_status: KYC_PENDING.into(),
                role: user.role,
                niveau_verification: 0,
                date_inscription: OffsetDateTime::now_utc(),
            });
            Ok(())
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            let users = self.users.lock().unwrap();
            Ok(users.iter().find(|u| u.email == email).cloned())
        }
    }

    /// Store whose pre-check sees nothing but whose insert reports a
    /// duplicate, simulating a registration race lost at the database.
    struct RacyStore;

    #[async_trait]
    impl UserStore for RacyStore {
        async fn create(&self, _user: NewUser) -> Result<(), StoreError> {
            Err(StoreError::DuplicateEmail)
        }

        async fn find_by_email(&self, _email: &str) -> Result<Option<User>, StoreError> {
            Ok(None)
        }
    }

    fn registration(email: &str, password: &str, role: &str) -> Registration {
        Registration {
            nom: "Durand".into(),
            prenom: "Alice".into(),
            email: email.into(),
            password: password.into(),
            confirm: password.into(),
            numero_telephone: "0600000000".into(),
            date_naissance: "1990-01-01".into(),
            adresse: "1 rue de la Paix".into(),
            role: role.into(),
        }
    }

    fn service() -> (AuthService, Arc<MemStore>) {
        let store = Arc::new(MemStore::default());
        (AuthService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn register_then_authenticate_roundtrip() {
        let (auth, _) = service();
        auth.register(registration("a@b.com", "Secr3t!", "MARCHAND"))
            .await
            .expect("registration should succeed");

        // Email lookup is case-insensitive via normalization.
        let user = auth
            .authenticate("A@B.com", "Secr3t!")
            .await
            .expect("store should not fail")
            .expect("credentials should match");
        assert_eq!(user.role, Role::Marchand);
        assert_eq!(user.email, "a@b.com");
        assert_eq!(user.kyc_status, KYC_PENDING);
        assert_eq!(user.niveau_verification, 0);
    }

    #[tokio::test]
    async fn register_rejects_invalid_email() {
        let (auth, _) = service();
        let err = auth
            .register(registration("not-an-email", "pw", "CLIENT"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::Validation(ValidationError::InvalidEmail)
        ));
    }

    #[tokio::test]
    async fn register_rejects_taken_email() {
        let (auth, _) = service();
        auth.register(registration("a@b.com", "pw", "CLIENT"))
            .await
            .unwrap();
        let err = auth
            .register(registration("  A@B.com ", "other", "CLIENT"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::Validation(ValidationError::EmailTaken)
        ));
    }

    #[tokio::test]
    async fn register_rejects_password_mismatch() {
        let (auth, _) = service();
        let mut input = registration("a@b.com", "pw", "CLIENT");
        input.confirm = "different".into();
        let err = auth.register(input).await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::Validation(ValidationError::PasswordMismatch)
        ));
    }

    #[tokio::test]
    async fn lost_uniqueness_race_reports_email_taken() {
        let auth = AuthService::new(Arc::new(RacyStore));
        let err = auth
            .register(registration("a@b.com", "pw", "CLIENT"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::Validation(ValidationError::EmailTaken)
        ));
    }

    #[tokio::test]
    async fn unknown_role_is_coerced_to_client() {
        let (auth, store) = service();
        auth.register(registration("a@b.com", "pw", "guest"))
            .await
            .unwrap();
        let user = store.find_by_email("a@b.com").await.unwrap().unwrap();
        assert_eq!(user.role, Role::Client);
    }

    #[tokio::test]
    async fn lowercase_role_input_is_coerced_to_client() {
        let (auth, store) = service();
        auth.register(registration("a@b.com", "pw", "admin"))
            .await
            .unwrap();
        let user = store.find_by_email("a@b.com").await.unwrap().unwrap();
        assert_eq!(user.role, Role::Client);
    }

    #[tokio::test]
    async fn plaintext_password_is_never_persisted() {
        let (auth, store) = service();
        auth.register(registration("a@b.com", "Secr3t!", "CLIENT"))
            .await
            .unwrap();
        let user = store.find_by_email("a@b.com").await.unwrap().unwrap();
        assert_ne!(user.password_hash, "Secr3t!");
        assert!(verify_password(&user.password_hash, "Secr3t!"));
    }

    #[tokio::test]
    async fn authenticate_denies_unknown_email_and_wrong_password_alike() {
        let (auth, _) = service();
        auth.register(registration("a@b.com", "Secr3t!", "CLIENT"))
            .await
            .unwrap();

        let unknown = auth.authenticate("nobody@b.com", "Secr3t!").await.unwrap();
        let wrong = auth.authenticate("a@b.com", "not-it").await.unwrap();
        assert!(unknown.is_none());
        assert!(wrong.is_none());
    }

    #[tokio::test]
    async fn email_validation_matches_minimal_pattern() {
        assert!(is_valid_email("local@domain.tld"));
        assert!(is_valid_email("a+b@sub.domain.co"));
        assert!(!is_valid_email("missing-at.tld"));
        assert!(!is_valid_email("no-dot@domain"));
        assert!(!is_valid_email("spaces in@domain.tld"));
    }
}
