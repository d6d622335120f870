mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

use common::TestApp;
use easylease_api::database::models::Role;
use easylease_api::store::RentalStore;

#[tokio::test]
async fn health_and_root_are_public() -> Result<()> {
    let app = TestApp::new();

    let res = app.request(Method::GET, "/api/health", None, None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.data()["store"], "memory");

    let res = app.request(Method::GET, "/", None, None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["name"], "EasyLease API");
    Ok(())
}

#[tokio::test]
async fn login_issues_token_and_hides_password_hash() -> Result<()> {
    let app = TestApp::new();
    app.seed_user("ana@example.com", "secret-1", Role::Manager).await?;

    let res = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ANA@example.com", "password": "secret-1" })),
        )
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.data()["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(res.data()["user"]["role"], "manager");
    assert!(res.data()["user"].get("password_hash").is_none());

    let user = app.store.find_user_by_email("ana@example.com").await?.expect("user");
    assert!(user.last_login.is_some());
    Ok(())
}

#[tokio::test]
async fn bad_credentials_are_401_and_missing_fields_400() -> Result<()> {
    let app = TestApp::new();
    app.seed_user("ana@example.com", "secret-1", Role::Manager).await?;

    let wrong = json!({ "email": "ana@example.com", "password": "nope" });
    let res = app.request(Method::POST, "/api/auth/login", None, Some(wrong)).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["success"], false);
    assert_eq!(res.body["message"], "Invalid credentials");

    let unknown = json!({ "email": "who@example.com", "password": "secret-1" });
    let res = app.request(Method::POST, "/api/auth/login", None, Some(unknown)).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let missing = json!({ "email": "ana@example.com" });
    let res = app.request(Method::POST, "/api/auth/login", None, Some(missing)).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_valid_bearer_token() -> Result<()> {
    let app = TestApp::new();

    let res = app.request(Method::GET, "/api/contracts", None, None).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["success"], false);
    assert_eq!(res.body["code"], "UNAUTHORIZED");

    let res = app.get("/api/contracts", "not-a-jwt").await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn deactivated_account_loses_access() -> Result<()> {
    let app = TestApp::new();
    let token = app.manager().await?;
    assert_eq!(app.get("/api/auth/me", &token).await?.status, StatusCode::OK);

    let mut user = app.store.find_user_by_email("manager@easylease.test").await?.expect("user");
    user.is_active = false;
    app.store.update_user(user).await?;

    let res = app.get("/api/auth/me", &token).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn change_password_checks_current_and_length() -> Result<()> {
    let app = TestApp::new();
    let token = app.manager().await?;

    let res = app
        .post(
            "/api/auth/change-password",
            &token,
            json!({ "currentPassword": "manager-pass", "newPassword": "abc" }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .post(
            "/api/auth/change-password",
            &token,
            json!({ "currentPassword": "wrong-pass", "newPassword": "brand-new" }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app
        .post(
            "/api/auth/change-password",
            &token,
            json!({ "current_password": "manager-pass", "new_password": "brand-new" }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::OK);

    app.login("manager@easylease.test", "brand-new").await?;
    Ok(())
}

#[tokio::test]
async fn create_admin_refuses_existing_email() -> Result<()> {
    let app = TestApp::new();
    let body = json!({ "email": "boss@example.com", "password": "boss-pass", "name": "Boss" });

    let res = app
        .request(Method::POST, "/api/auth/admin/create", None, Some(body.clone()))
        .await?;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.data()["role"], "manager");

    let res = app.request(Method::POST, "/api/auth/admin/create", None, Some(body)).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    app.login("boss@example.com", "boss-pass").await?;
    Ok(())
}

#[tokio::test]
async fn malformed_json_gets_the_error_envelope() -> Result<()> {
    let app = TestApp::new();
    let token = app.manager().await?;

    let res = app.post("/api/contracts", &token, json!({ "listing_id": "not-a-uuid" })).await?;
    assert!(res.status.is_client_error());
    assert_eq!(res.body["success"], false);
    assert_eq!(res.body["code"], "INVALID_JSON");
    Ok(())
}
