use std::io;
use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::Context;

use ebpay_auth::auth::service::{AuthError, AuthService, Registration, ValidationError};
use ebpay_auth::config::StoreConfig;
use ebpay_auth::store::pool::StorePool;
use ebpay_auth::store::postgres::PgManager;
use ebpay_auth::users::repo::UserRepository;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "ebpay_auth=info,sqlx=warn".to_string());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = StoreConfig::from_env()?;
    let pool = Arc::new(
        StorePool::connect(PgManager::new(&config), config.pool_min, config.pool_max)
            .await
            .context("connect to the credential store")?,
    );

    // Run migrations if present
    {
        let mut session = pool.acquire().await?;
        if let Err(e) = sqlx::migrate!("./migrations").run(&mut *session).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }
    }

    let auth = AuthService::new(Arc::new(UserRepository::new(pool.clone())));

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        println!();
        println!("=== EBPAY ===");
        println!("1. Inscription");
        println!("2. Connexion");
        println!("0. Quitter");
        match prompt(&mut lines, "Choix : ")?.as_str() {
            "1" => inscription(&auth, &mut lines).await?,
            "2" => connexion(&auth, &mut lines).await?,
            "0" => break,
            _ => println!("Choix invalide."),
        }
    }

    pool.shutdown().await;
    Ok(())
}

fn prompt(
    lines: &mut impl Iterator<Item = io::Result<String>>,
    label: &str,
) -> anyhow::Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let line = lines.next().context("stdin closed")??;
    Ok(line.trim().to_string())
}

async fn inscription(
    auth: &AuthService,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> anyhow::Result<()> {
    println!();
    println!("=== INSCRIPTION ===");
    let input = Registration {
        nom: prompt(lines, "Nom : ")?,
        prenom: prompt(lines, "Prénom : ")?,
        email: prompt(lines, "Email : ")?,
        password: prompt(lines, "Mot de passe : ")?,
        confirm: prompt(lines, "Confirmer : ")?,
        numero_telephone: prompt(lines, "Numéro de téléphone : ")?,
        date_naissance: prompt(lines, "Date de naissance (YYYY-MM-DD) : ")?,
        adresse: prompt(lines, "Adresse : ")?,
        role: prompt(lines, "Rôle (CLIENT/MARCHAND/ADMIN) [CLIENT] : ")?,
    };

    match auth.register(input).await {
        Ok(()) => println!("Compte créé avec succès."),
        Err(AuthError::Validation(ValidationError::InvalidEmail)) => {
            println!("Email invalide.");
        }
        Err(AuthError::Validation(ValidationError::EmailTaken)) => {
            println!("Cet email existe déjà.");
        }
        Err(AuthError::Validation(ValidationError::PasswordMismatch)) => {
            println!("Les mots de passe ne correspondent pas.");
        }
        Err(AuthError::Store(e)) => {
            tracing::error!(error = %e, "registration store failure");
            println!("Erreur technique, veuillez réessayer.");
        }
    }
    Ok(())
}

async fn connexion(
    auth: &AuthService,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> anyhow::Result<()> {
    println!();
    println!("=== CONNEXION ===");
    let email = prompt(lines, "Email : ")?;
    let password = prompt(lines, "Mot de passe : ")?;

    match auth.authenticate(&email, &password).await {
        Ok(Some(user)) => {
            println!("Bienvenue {} {} ({})", user.prenom, user.nom, user.role);
        }
        Ok(None) => println!("Identifiants invalides."),
        Err(e) => {
            tracing::error!(error = %e, "authentication store failure");
            println!("Erreur technique, veuillez réessayer.");
        }
    }
    Ok(())
}
