mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn owner_emails_are_unique() -> Result<()> {
    let app = TestApp::new();
    let manager = app.manager().await?;
    app.owner(&manager, "olive@example.com").await?;

    let res = app
        .post("/api/owners", &manager, json!({ "name": "Other Olive", "email": "OLIVE@example.com" }))
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["message"], "Email already exists");

    let res = app.post("/api/owners", &manager, json!({ "name": "O", "email": "o@example.com" })).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn owner_login_is_reported_and_works() -> Result<()> {
    let app = TestApp::new();
    let manager = app.manager().await?;
    let res = app
        .post(
            "/api/owners",
            &manager,
            json!({
                "name": "Olive Owner",
                "email": "olive@example.com",
                "create_user_account": true,
                "user_password": "owner-pass"
            }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CREATED);
    assert!(res.body["user"].is_object(), "{}", res.body);

    let token = app.login("olive@example.com", "owner-pass").await?;
    let me = app.get("/api/auth/me", &token).await?;
    assert_eq!(me.data()["role"], "owner");
    assert_eq!(me.data()["owner_id"], json!(res.id()?));

    // No password supplied, no login
    let res = app
        .post(
            "/api/owners",
            &manager,
            json!({ "name": "Oscar Owner", "email": "oscar@example.com", "create_user_account": true }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CREATED);
    assert!(res.body.get("user").is_none());
    Ok(())
}

#[tokio::test]
async fn owner_visibility_and_write_access() -> Result<()> {
    let app = TestApp::new();
    let manager = app.manager().await?;
    let (olive_id, olive) = app.owner(&manager, "olive@example.com").await?;
    let (oscar_id, _) = app.owner(&manager, "oscar@example.com").await?;
    let listing_id = app.listing(&manager, "Sunny room", Some(olive_id)).await?;
    app.post(
        "/api/tenants",
        &manager,
        json!({
            "name": "Tom",
            "email": "tom@example.com",
            "listing_id": listing_id,
            "create_user_account": true,
            "user_password": "tenant-pass"
        }),
    )
    .await?;
    let tom = app.login("tom@example.com", "tenant-pass").await?;

    let res = app.get("/api/owners", &manager).await?;
    assert_eq!(res.body["count"], 2);

    let res = app.get("/api/owners", &olive).await?;
    assert_eq!(res.body["count"], 1);
    assert_eq!(res.data()[0]["id"], json!(olive_id));

    let res = app.get(&format!("/api/owners/{}", oscar_id), &olive).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.get("/api/owners", &tom).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .put(&format!("/api/owners/{}", olive_id), &olive, json!({ "company": "Olive Holdings" }))
        .await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["message"], "Access denied. Manager role required.");
    Ok(())
}

#[tokio::test]
async fn owner_status_and_deletion() -> Result<()> {
    let app = TestApp::new();
    let manager = app.manager().await?;
    let (owner_id, _) = app.owner(&manager, "olive@example.com").await?;
    let listing_id = app.listing(&manager, "Sunny room", Some(owner_id)).await?;

    let res = app
        .patch(&format!("/api/owners/{}/status", owner_id), &manager, json!({ "status": "inactive" }))
        .await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.data()["status"], "inactive");

    let res = app.get("/api/owners?status=active", &manager).await?;
    assert_eq!(res.body["count"], 0);

    let res = app.delete(&format!("/api/owners/{}", owner_id), &manager).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        res.body["message"],
        "Cannot delete owner with 1 active listing(s). Please delete or reassign the listings first."
    );

    app.delete(&format!("/api/listings/{}", listing_id), &manager).await?;
    let res = app.delete(&format!("/api/owners/{}", owner_id), &manager).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);

    // The owner's login goes with it
    let res = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "olive@example.com", "password": "owner-pass" })),
        )
        .await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn public_enquiries_land_as_new_leads() -> Result<()> {
    let app = TestApp::new();
    let manager = app.manager().await?;
    let (owner_id, _) = app.owner(&manager, "olive@example.com").await?;
    let listing_id = app.listing(&manager, "Sunny room", Some(owner_id)).await?;

    let res = app
        .request(
            Method::POST,
            "/api/leads",
            None,
            Some(json!({
                "name": "Ana",
                "email": "ana@example.com",
                "message": "Can I visit on Saturday?",
                "listing_id": listing_id
            })),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.data()["status"], "new");
    let lead_id = res.id()?;

    let res = app
        .request(Method::POST, "/api/leads", None, Some(json!({ "name": "Bo", "email": "not-an-email" })))
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app.get(&format!("/api/leads/{}", lead_id), &manager).await?;
    assert_eq!(res.data()["listing"]["id"], json!(listing_id));
    Ok(())
}

#[tokio::test]
async fn staff_work_the_lead_pipeline() -> Result<()> {
    let app = TestApp::new();
    let manager = app.manager().await?;
    let (owner_id, _) = app.owner(&manager, "olive@example.com").await?;
    let listing_id = app.listing(&manager, "Sunny room", Some(owner_id)).await?;
    app.post(
        "/api/tenants",
        &manager,
        json!({
            "name": "Tom",
            "email": "tom@example.com",
            "listing_id": listing_id,
            "create_user_account": true,
            "user_password": "tenant-pass"
        }),
    )
    .await?;
    let tom = app.login("tom@example.com", "tenant-pass").await?;

    for (name, email) in [("Ana", "ana@example.com"), ("Bo", "bo@example.com")] {
        app.request(Method::POST, "/api/leads", None, Some(json!({ "name": name, "email": email })))
            .await?;
    }

    let res = app.get("/api/leads", &tom).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.get("/api/leads", &manager).await?;
    assert_eq!(res.data().as_array().map(Vec::len), Some(2));
    let lead_id = res.data()[0]["id"].as_str().unwrap_or_default().to_string();

    let res = app
        .patch(&format!("/api/leads/{}/status", lead_id), &manager, json!({ "status": "contacted" }))
        .await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.data()["status"], "contacted");

    let res = app.get("/api/leads?status=new", &manager).await?;
    assert_eq!(res.data().as_array().map(Vec::len), Some(1));

    let res = app.delete(&format!("/api/leads/{}", lead_id), &manager).await?;
    assert_eq!(res.status, StatusCode::OK);
    let res = app.get(&format!("/api/leads/{}", lead_id), &manager).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}
