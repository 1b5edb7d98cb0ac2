use std::sync::Arc;

use async_trait::async_trait;
use sqlx::Connection;
use time::OffsetDateTime;
use tracing::debug;

use crate::store::pool::StorePool;
use crate::store::postgres::PgManager;
use crate::store::StoreError;
use crate::users::model::{NewUser, User};

/// Create/find operations on the persisted user relation.
///
/// The protocol layer depends on this seam rather than on Postgres, so
/// tests can substitute an in-memory store.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a new user. A uniqueness race lost at the database surfaces
    /// as [`StoreError::DuplicateEmail`].
    async fn create(&self, user: NewUser) -> Result<(), StoreError>;

    /// Look up a user by (already normalized) email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}

/// Postgres-backed [`UserStore`] on top of the connection pool.
///
/// Each operation runs on one scoped session; writes go through an
/// explicit transaction so an error path rolls back before the connection
/// returns to the pool.
pub struct UserRepository {
    pool: Arc<StorePool<PgManager>>,
}

impl UserRepository {
    pub fn new(pool: Arc<StorePool<PgManager>>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn create(&self, user: NewUser) -> Result<(), StoreError> {
        let mut session = self.pool.acquire().await?;
        let mut tx = session.begin().await.map_err(StoreError::Query)?;
        sqlx::query(
            r#"
            INSERT INTO utilisateur (
                nom, prenom, email, mot_de_passe,
                numero_telephone, date_naissance, adresse,
                kyc_status, role, niveau_verification, date_inscription
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'EN_ATTENTE', $8, 0, $9)
            "#,
        )
        .bind(&user.nom)
        .bind(&user.prenom)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.numero_telephone)
        .bind(&user.date_naissance)
        .bind(&user.adresse)
        .bind(user.role)
        .bind(OffsetDateTime::now_utc())
        .execute(&mut *tx)
        .await
        .map_err(map_insert_error)?;
        tx.commit().await.map_err(StoreError::Query)?;
        debug!(email = %user.email, "user row inserted");
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let mut session = self.pool.acquire().await?;
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, nom, prenom, email, mot_de_passe,
                   numero_telephone, date_naissance, adresse,
                   kyc_status, role, niveau_verification, date_inscription
            FROM utilisateur
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&mut *session)
        .await
        .map_err(StoreError::Query)?;
        Ok(user)
    }
}

fn map_insert_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateEmail,
        _ => StoreError::Query(e),
    }
}
