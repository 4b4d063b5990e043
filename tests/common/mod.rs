#![allow(dead_code)]

use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use rolegate::{
    ServerConfig, create_app,
    db::{Database, Role},
    jwt::{JwtConfig, TokenKind, TokenPayload, TokenSettings},
    password::hash_password,
    rate_limit::RateLimitSettings,
};
use serde_json::Value;
use tower::ServiceExt;

pub const ACCESS_SECRET: &[u8] = b"integration-access-secret-0123456789";
pub const REFRESH_SECRET: &[u8] = b"integration-refresh-secret-0123456789";
pub const BOOTSTRAP_EMAIL: &str = "admin@test.com";
pub const PASSWORD: &str = "PsWd1924";

/// Token credential attached to a test request.
pub enum Credential<'a> {
    None,
    Cookie(TokenKind, &'a str),
    Bearer(&'a str),
    /// Access cookie and bearer header together
    Both { cookie: &'a str, bearer: &'a str },
}

pub struct TestApp {
    pub router: Router,
    pub db: Database,
    pub jwt: JwtConfig,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub cookies: Vec<String>,
    pub json: Value,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_rate_limits(RateLimitSettings {
            login_per_second: 10_000,
            register_per_minute: 10_000,
        })
        .await
    }

    pub async fn with_rate_limits(rate_limits: RateLimitSettings) -> Self {
        let db = Database::open(":memory:")
            .await
            .expect("Failed to open test database");

        let config = ServerConfig {
            db: db.clone(),
            jwt_access_secret: ACCESS_SECRET.to_vec(),
            jwt_access_expires_in: Duration::from_secs(900),
            jwt_refresh_secret: REFRESH_SECRET.to_vec(),
            jwt_refresh_expires_in: Duration::from_secs(3600),
            bootstrap_admin_email: BOOTSTRAP_EMAIL.to_string(),
            rate_limits,
        };

        let jwt = JwtConfig::new(
            TokenSettings::new(ACCESS_SECRET, Duration::from_secs(900)),
            TokenSettings::new(REFRESH_SECRET, Duration::from_secs(3600)),
        );

        Self {
            router: create_app(&config),
            db,
            jwt,
        }
    }

    /// Create an account directly in the store with a hashed password.
    pub async fn create_user(&self, email: &str, roles: &[Role]) -> String {
        let hash = hash_password(PASSWORD).unwrap();
        self.db.users().create(email, &hash, roles).await.unwrap()
    }

    pub fn token(&self, kind: TokenKind, id: &str, role: Role) -> String {
        self.jwt.sign(kind, &TokenPayload::new(id, role)).unwrap()
    }

    pub fn access_token(&self, id: &str, role: Role) -> String {
        self.token(TokenKind::Access, id, role)
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        credential: Credential<'_>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);

        builder = match credential {
            Credential::None => builder,
            Credential::Cookie(kind, token) => {
                builder.header(header::COOKIE, format!("{}={}", kind.cookie_name(), token))
            }
            Credential::Bearer(token) => {
                builder.header(header::AUTHORIZATION, format!("Bearer {}", token))
            }
            Credential::Both { cookie, bearer } => builder
                .header(header::COOKIE, format!("access_token={}", cookie))
                .header(header::AUTHORIZATION, format!("Bearer {}", bearer)),
        };

        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        TestResponse::read(response).await
    }

    pub async fn get(&self, uri: &str, credential: Credential<'_>) -> TestResponse {
        self.send("GET", uri, credential, None).await
    }

    pub async fn post(&self, uri: &str, credential: Credential<'_>, body: Value) -> TestResponse {
        self.send("POST", uri, credential, Some(body)).await
    }

    pub async fn login(&self, email: &str, password: &str, role: Option<&str>) -> TestResponse {
        let mut body = serde_json::json!({ "email": email, "password": password });
        if let Some(role) = role {
            body["role"] = Value::from(role);
        }
        self.post("/auth/login", Credential::None, body).await
    }
}

impl TestResponse {
    async fn read(response: Response<Body>) -> Self {
        let status = response.status();
        let cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };

        Self {
            status,
            cookies,
            json,
        }
    }

    /// Value of a cookie set by this response.
    pub fn cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{}=", name);
        self.cookies.iter().find_map(|c| {
            c.strip_prefix(&prefix)
                .and_then(|rest| rest.split(';').next())
                .map(str::to_string)
        })
    }
}
