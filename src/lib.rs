pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod password;
pub mod rate_limit;
pub mod service;

use api::create_api_router;
use axum::Router;
use db::Database;
use jwt::{JwtConfig, TokenSettings};
use password::CredentialVerifier;
use rate_limit::{RateLimitConfig, RateLimitSettings};
use service::AuthService;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Secret for signing access tokens
    pub jwt_access_secret: Vec<u8>,
    pub jwt_access_expires_in: Duration,
    /// Secret for signing refresh tokens
    pub jwt_refresh_secret: Vec<u8>,
    pub jwt_refresh_expires_in: Duration,
    /// Email of the seeded admin whose one-time credential is accepted literally
    pub bootstrap_admin_email: String,
    pub rate_limits: RateLimitSettings,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::new(
        TokenSettings::new(&config.jwt_access_secret, config.jwt_access_expires_in),
        TokenSettings::new(&config.jwt_refresh_secret, config.jwt_refresh_expires_in),
    ));

    let service = AuthService::new(
        config.db.clone(),
        jwt.clone(),
        CredentialVerifier::new(config.bootstrap_admin_email.clone()),
    );

    let rate_limit_config = Arc::new(RateLimitConfig::new(config.rate_limits));

    create_api_router(config.db.clone(), service, jwt, rate_limit_config)
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let
/// the OS choose a random port.
/// Returns the actual address the server is listening on.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        run_server(config, listener).await.ok();
    });

    Ok((handle, local_addr))
}
