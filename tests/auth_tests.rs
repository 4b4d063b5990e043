mod common;

use axum::http::StatusCode;
use common::{BOOTSTRAP_EMAIL, Credential, PASSWORD, TestApp};
use rolegate::{
    cli::ensure_bootstrap_admin,
    db::Role,
    jwt::{TokenKind, TokenPayload},
    password::is_password_hash,
    rate_limit::RateLimitSettings,
};
use serde_json::json;

#[tokio::test]
async fn test_register_then_duplicate() {
    let app = TestApp::new().await;
    let body = json!({ "email": "new@example.com", "password": PASSWORD });

    let first = app.post("/auth/register", Credential::None, body.clone()).await;
    assert_eq!(first.status, StatusCode::CREATED);
    let id = first.json["id"].as_str().unwrap().to_string();

    assert_eq!(app.db.roles().roles_of(&id).await.unwrap(), vec![Role::Viewer]);

    let second = app.post("/auth/register", Credential::None, body).await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.json["error"], "User already exist!");
}

#[tokio::test]
async fn test_register_validation() {
    let app = TestApp::new().await;

    let bad_email = app
        .post(
            "/auth/register",
            Credential::None,
            json!({ "email": "not-an-email", "password": PASSWORD }),
        )
        .await;
    assert_eq!(bad_email.status, StatusCode::BAD_REQUEST);

    let empty_password = app
        .post(
            "/auth/register",
            Credential::None,
            json!({ "email": "a@example.com", "password": "" }),
        )
        .await;
    assert_eq!(empty_password.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_sets_cookies_and_body() {
    let app = TestApp::new().await;
    let id = app.create_user("boss@example.com", &[Role::Admin]).await;

    let response = app.login("boss@example.com", PASSWORD, None).await;
    assert_eq!(response.status, StatusCode::OK);

    let access = response.cookie("access_token").unwrap();
    let refresh = response.cookie("refresh_token").unwrap();
    assert_eq!(response.json["accessToken"], access.as_str());
    assert_eq!(response.json["refreshToken"], refresh.as_str());

    for cookie in &response.cookies {
        assert!(cookie.contains("Max-Age=2592000"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Path=/"));
        assert!(!cookie.contains("Secure"));
    }

    let payload = app.jwt.verify(TokenKind::Access, &access).unwrap();
    assert_eq!(payload, TokenPayload::new(id, Role::Admin));
}

#[tokio::test]
async fn test_login_failures_look_the_same() {
    let app = TestApp::new().await;
    app.create_user("user@example.com", &[Role::Viewer]).await;

    let wrong_password = app.login("user@example.com", "wrong", None).await;
    let unknown_email = app.login("ghost@example.com", PASSWORD, None).await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.json, unknown_email.json);
    assert!(wrong_password.cookies.is_empty());
}

#[tokio::test]
async fn test_login_ambiguous_role_lists_candidates() {
    let app = TestApp::new().await;
    app.create_user("multi@example.com", &[Role::Viewer, Role::Editor]).await;

    let response = app.login("multi@example.com", PASSWORD, None).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json["error"], "Please, select a role from the list");
    assert_eq!(response.json["roles"], json!(["Viewer", "Editor"]));
    assert!(response.cookies.is_empty());
}

#[tokio::test]
async fn test_login_zero_roles_is_ambiguous() {
    let app = TestApp::new().await;
    app.create_user("none@example.com", &[]).await;

    let response = app.login("none@example.com", PASSWORD, None).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json["roles"], json!([]));
}

#[tokio::test]
async fn test_login_with_explicit_role() {
    let app = TestApp::new().await;
    app.create_user("multi@example.com", &[Role::Viewer, Role::Editor]).await;

    let chosen = app.login("multi@example.com", PASSWORD, Some("Editor")).await;
    assert_eq!(chosen.status, StatusCode::OK);
    let access = chosen.cookie("access_token").unwrap();
    assert_eq!(
        app.jwt.verify(TokenKind::Access, &access).unwrap().role,
        Role::Editor
    );

    let not_held = app.login("multi@example.com", PASSWORD, Some("Admin")).await;
    assert_eq!(not_held.status, StatusCode::FORBIDDEN);

    let unknown = app.login("multi@example.com", PASSWORD, Some("Owner")).await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_reissues_same_payload() {
    let app = TestApp::new().await;
    let id = app.create_user("r@example.com", &[Role::Editor]).await;
    let refresh = app.token(TokenKind::Refresh, &id, Role::Editor);

    let response = app
        .get(
            "/auth/refresh",
            Credential::Cookie(TokenKind::Refresh, &refresh),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let access = response.cookie("access_token").unwrap();
    let new_refresh = response.cookie("refresh_token").unwrap();
    let expected = TokenPayload::new(id, Role::Editor);

    assert_eq!(app.jwt.verify(TokenKind::Access, &access).unwrap(), expected);
    assert_eq!(
        app.jwt.verify(TokenKind::Refresh, &new_refresh).unwrap(),
        expected
    );
}

#[tokio::test]
async fn test_refresh_accepts_bearer() {
    let app = TestApp::new().await;
    let id = app.create_user("r@example.com", &[Role::Viewer]).await;
    let refresh = app.token(TokenKind::Refresh, &id, Role::Viewer);

    let response = app
        .get("/auth/refresh", Credential::Bearer(&refresh))
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let app = TestApp::new().await;
    let id = app.create_user("r@example.com", &[Role::Viewer]).await;
    let access = app.access_token(&id, Role::Viewer);

    let response = app.get("/auth/refresh", Credential::Bearer(&access)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_role() {
    let app = TestApp::new().await;
    let id = app
        .create_user("c@example.com", &[Role::Viewer, Role::Editor])
        .await;
    let access = app.access_token(&id, Role::Viewer);

    let response = app
        .post(
            "/auth/change-role",
            Credential::Cookie(TokenKind::Access, &access),
            json!({ "role": "Editor" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let new_access = response.cookie("access_token").unwrap();
    let payload = app.jwt.verify(TokenKind::Access, &new_access).unwrap();
    assert_eq!(payload.id, id);
    assert_eq!(payload.role, Role::Editor);

    let denied = app
        .post(
            "/auth/change-role",
            Credential::Cookie(TokenKind::Access, &access),
            json!({ "role": "Admin" }),
        )
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_add_role_to_user() {
    let app = TestApp::new().await;
    let admin = app.create_user("boss@example.com", &[Role::Admin]).await;
    let target = app.create_user("t@example.com", &[Role::Viewer]).await;
    let token = app.access_token(&admin, Role::Admin);
    let body = json!({ "userId": target, "role": "Editor" });

    let first = app
        .post("/auth/add-role-to-user", Credential::Bearer(&token), body.clone())
        .await;
    assert_eq!(first.status, StatusCode::CREATED);

    let again = app
        .post("/auth/add-role-to-user", Credential::Bearer(&token), body)
        .await;
    assert_eq!(again.status, StatusCode::CREATED);

    assert_eq!(
        app.db.roles().roles_of(&target).await.unwrap(),
        vec![Role::Viewer, Role::Editor]
    );

    // Both roles now held, so a bare login is ambiguous
    let login = app.login("t@example.com", PASSWORD, None).await;
    assert_eq!(login.json["roles"], json!(["Viewer", "Editor"]));
}

#[tokio::test]
async fn test_add_role_to_missing_user() {
    let app = TestApp::new().await;
    let admin = app.create_user("boss@example.com", &[Role::Admin]).await;
    let token = app.access_token(&admin, Role::Admin);

    let response = app
        .post(
            "/auth/add-role-to-user",
            Credential::Bearer(&token),
            json!({ "userId": uuid::Uuid::new_v4().to_string(), "role": "Editor" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_add_role_requires_admin() {
    let app = TestApp::new().await;
    let editor = app.create_user("e@example.com", &[Role::Editor]).await;
    let token = app.access_token(&editor, Role::Editor);

    let response = app
        .post(
            "/auth/add-role-to-user",
            Credential::Bearer(&token),
            json!({ "userId": editor, "role": "Admin" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(
        app.db.roles().roles_of(&editor).await.unwrap(),
        vec![Role::Editor]
    );
}

#[tokio::test]
async fn test_bootstrap_admin_one_time_login() {
    let app = TestApp::new().await;
    let password = ensure_bootstrap_admin(&app.db, BOOTSTRAP_EMAIL)
        .await
        .unwrap()
        .unwrap();

    let response = app.login(BOOTSTRAP_EMAIL, &password, None).await;
    assert_eq!(response.status, StatusCode::OK);
    let access = response.cookie("access_token").unwrap();
    assert_eq!(
        app.jwt.verify(TokenKind::Access, &access).unwrap().role,
        Role::Admin
    );

    let stored = app
        .db
        .users()
        .get_credentials(BOOTSTRAP_EMAIL)
        .await
        .unwrap()
        .unwrap();
    assert!(is_password_hash(&stored.password));

    let again = app.login(BOOTSTRAP_EMAIL, &password, None).await;
    assert_eq!(again.status, StatusCode::OK);
}

#[tokio::test]
async fn test_literal_password_rejected_for_other_accounts() {
    let app = TestApp::new().await;
    app.db
        .users()
        .create("plain@example.com", "stored-literal", &[Role::Viewer])
        .await
        .unwrap();

    let response = app
        .login("plain@example.com", "stored-literal", None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_rate_limited() {
    let app = TestApp::with_rate_limits(RateLimitSettings {
        login_per_second: 100,
        register_per_minute: 1,
    })
    .await;

    let first = app
        .post(
            "/auth/register",
            Credential::None,
            json!({ "email": "a@example.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(first.status, StatusCode::CREATED);

    let second = app
        .post(
            "/auth/register",
            Credential::None,
            json!({ "email": "b@example.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(second.status, StatusCode::TOO_MANY_REQUESTS);
    assert!(second.json["error"].as_str().is_some());
}
