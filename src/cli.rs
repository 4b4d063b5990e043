//! CLI argument parsing, validation, and startup helpers.

use std::time::Duration;

use clap::Parser;
use rand::Rng;
use tracing::{error, info, warn};

use crate::ServerConfig;
use crate::db::{Database, Role};
use crate::rate_limit::RateLimitSettings;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const BOOTSTRAP_PASSWORD_LENGTH: usize = 24;
const BOOTSTRAP_PASSWORD_CHARSET: &[u8] =
    b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789";

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "rolegate", about = "Role-based authentication in front of a small CRUD API")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "DATABASE_PATH", default_value = "rolegate.db")]
    pub database: String,

    /// Access token lifetime (e.g. "30s", "15m")
    #[arg(
        long,
        env = "JWT_ACCESS_EXPIRES_IN",
        default_value = "15m",
        value_parser = humantime::parse_duration
    )]
    pub jwt_access_expires_in: Duration,

    /// Refresh token lifetime (e.g. "7d")
    #[arg(
        long,
        env = "JWT_REFRESH_EXPIRES_IN",
        default_value = "7d",
        value_parser = humantime::parse_duration
    )]
    pub jwt_refresh_expires_in: Duration,

    /// Path to file containing the access token secret. Prefer JWT_ACCESS_SECRET
    #[arg(long)]
    pub jwt_access_secret_file: Option<String>,

    /// Path to file containing the refresh token secret. Prefer JWT_REFRESH_SECRET
    #[arg(long)]
    pub jwt_refresh_secret_file: Option<String>,

    /// Email of the admin account seeded on first start
    #[arg(long, env = "BOOTSTRAP_ADMIN_EMAIL", default_value = "admin@test.com")]
    pub bootstrap_admin_email: String,

    /// Login attempts allowed per second per client IP
    #[arg(long, default_value = "10")]
    pub login_rate_per_second: u32,

    /// Registrations allowed per minute per client IP
    #[arg(long, default_value = "5")]
    pub register_rate_per_minute: u32,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Read an environment variable and remove it from the process environment.
fn take_env(name: &str) -> Option<String> {
    let value = std::env::var(name).ok()?;
    // SAFETY: called during single-threaded startup before the runtime spawns
    // tasks that could read the environment.
    unsafe { std::env::remove_var(name) };
    Some(value)
}

/// Load a signing secret from `env_var` or, failing that, from `file`.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_secret(env_var: &str, file: Option<&str>) -> Option<String> {
    let secret = if let Some(secret) = take_env(env_var) {
        secret
    } else if let Some(path) = file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read secret file");
                return None;
            }
        }
    } else {
        error!(
            "{} is required. Set the environment variable (recommended) or pass a secret file",
            env_var
        );
        return None;
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "{} is shorter than {} characters. Use a longer secret",
            env_var, MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

fn generate_password() -> String {
    let mut rng = rand::rng();
    (0..BOOTSTRAP_PASSWORD_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..BOOTSTRAP_PASSWORD_CHARSET.len());
            BOOTSTRAP_PASSWORD_CHARSET[idx] as char
        })
        .collect()
}

/// Seed the bootstrap admin if no account with its email exists.
///
/// The one-time credential comes from BOOTSTRAP_ADMIN_PASSWORD or is generated,
/// and is stored as-is until its first use. Returns the credential when an
/// account was created.
pub async fn ensure_bootstrap_admin(
    db: &Database,
    email: &str,
) -> Result<Option<String>, sqlx::Error> {
    if db.users().get_by_email(email).await?.is_some() {
        info!(email = %email, "Bootstrap admin already exists");
        return Ok(None);
    }

    let password = take_env("BOOTSTRAP_ADMIN_PASSWORD")
        .filter(|p| !p.is_empty())
        .unwrap_or_else(generate_password);

    let id = db.users().create(email, &password, &[Role::Admin]).await?;
    warn!(user_id = %id, email = %email, "Bootstrap admin created with a one-time credential");

    Ok(Some(password))
}

/// Run [`ensure_bootstrap_admin`] and print a newly created credential once.
/// Returns None and logs an error on failure.
pub async fn handle_bootstrap_admin(db: &Database, email: &str) -> Option<()> {
    match ensure_bootstrap_admin(db, email).await {
        Ok(Some(password)) => {
            println!();
            println!("Bootstrap admin created: {}", email);
            println!("One-time password: {}", password);
            println!("It is replaced by a hash after the first login.");
            println!();
            Some(())
        }
        Ok(None) => Some(()),
        Err(e) => {
            error!(error = %e, "Failed to create bootstrap admin");
            None
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    args: &Args,
    db: Database,
    jwt_access_secret: String,
    jwt_refresh_secret: String,
) -> ServerConfig {
    ServerConfig {
        db,
        jwt_access_secret: jwt_access_secret.into_bytes(),
        jwt_access_expires_in: args.jwt_access_expires_in,
        jwt_refresh_secret: jwt_refresh_secret.into_bytes(),
        jwt_refresh_expires_in: args.jwt_refresh_expires_in,
        bootstrap_admin_email: args.bootstrap_admin_email.clone(),
        rate_limits: RateLimitSettings {
            login_per_second: args.login_rate_per_second,
            register_per_minute: args.register_rate_per_minute,
        },
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
