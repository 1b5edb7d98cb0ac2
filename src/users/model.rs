use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// KYC status every account starts in; not mutated by this crate.
pub const KYC_PENDING: &str = "EN_ATTENTE";

/// Account roles accepted at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "TEXT", rename_all = "UPPERCASE")]
pub enum Role {
    Client,
    Marchand,
    Admin,
}

impl Role {
    /// Map raw registration input onto the closed role set.
    ///
    /// Membership is case-sensitive: `"ADMIN"` is accepted, `"admin"` is
    /// not and falls back to the default, like any other unknown value.
    pub fn from_input(value: &str) -> Role {
        match value {
            "CLIENT" => Role::Client,
            "MARCHAND" => Role::Marchand,
            "ADMIN" => Role::Admin,
            _ => Role::Client,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "CLIENT",
            Role::Marchand => "MARCHAND",
            Role::Admin => "ADMIN",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User record persisted in the `utilisateur` relation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid, // assigned by the store at insert
    pub nom: String,
    pub prenom: String,
    pub email: String, // unique key, stored normalized
    #[serde(skip_serializing)]
    #[sqlx(rename = "mot_de_passe")]
    pub password_hash: String, // iterations$salt$key, never plaintext
    pub numero_telephone: String,
    pub date_naissance: String,
    pub adresse: String,
    pub kyc_status: String, // EN_ATTENTE at creation
    pub role: Role,
    pub niveau_verification: i32, // 0 at creation
    #[serde(with = "time::serde::rfc3339")]
    pub date_inscription: OffsetDateTime,
}

/// Insert shape for registration. The repository supplies the
/// store-assigned id, the fixed creation fields and the insert timestamp.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub nom: String,
    pub prenom: String,
    pub email: String,
    pub password_hash: String,
    pub numero_telephone: String,
    pub date_naissance: String,
    pub adresse: String,
    pub role: Role,
}
