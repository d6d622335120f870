mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn public_search_shows_published_rooms_only() -> Result<()> {
    let app = TestApp::new();
    let manager = app.manager().await?;
    let (owner_id, _) = app.owner(&manager, "olive@example.com").await?;
    let free = app.listing(&manager, "Sunny room", Some(owner_id)).await?;
    let taken = app.listing(&manager, "Quiet room", Some(owner_id)).await?;
    let tenant_id = app.tenant(&manager, "Tom", "tom@example.com", taken).await?;

    let mut body = TestApp::lease(taken, Some(tenant_id), 0, 180);
    body["status"] = json!("active");
    app.post("/api/contracts", &manager, body).await?;

    let res = app.request(Method::GET, "/api/listings", None, None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["count"], 1);
    assert_eq!(res.data()[0]["id"], json!(free));

    let res = app.request(Method::GET, "/api/listings?suburb=Carlton", None, None).await?;
    assert_eq!(res.body["count"], 0);
    Ok(())
}

#[tokio::test]
async fn slug_lookup_is_public() -> Result<()> {
    let app = TestApp::new();
    let manager = app.manager().await?;
    let (owner_id, _) = app.owner(&manager, "olive@example.com").await?;
    let id = app.listing(&manager, "Sunny room", Some(owner_id)).await?;

    let admin = app.get(&format!("/api/listings/admin/{}", id), &manager).await?;
    let slug = admin.data()["slug"].as_str().unwrap_or_default().to_string();
    assert!(!slug.is_empty());

    let res = app
        .request(Method::GET, &format!("/api/listings/slug/{}", slug), None, None)
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["id"], json!(id));

    let res = app.request(Method::GET, "/api/listings/slug/no-such-room", None, None).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn admin_view_embeds_active_contract() -> Result<()> {
    let app = TestApp::new();
    let manager = app.manager().await?;
    let (owner_id, _) = app.owner(&manager, "olive@example.com").await?;
    let listing_id = app.listing(&manager, "Sunny room", Some(owner_id)).await?;
    let tenant_id = app.tenant(&manager, "Tom", "tom@example.com", listing_id).await?;

    let mut body = TestApp::lease(listing_id, Some(tenant_id), 0, 180);
    body["status"] = json!("active");
    let contract_id = app.post("/api/contracts", &manager, body).await?.id()?;

    let res = app.get(&format!("/api/listings/admin/{}", listing_id), &manager).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["status"], "reserved");
    assert_eq!(res.data()["active_contract"]["id"], json!(contract_id));
    assert_eq!(res.data()["active_contract"]["tenant"]["name"], "Tom");
    assert_eq!(res.data()["contracts"].as_array().map(Vec::len), Some(1));
    assert_eq!(res.data()["owner"]["id"], json!(owner_id));
    Ok(())
}

#[tokio::test]
async fn owners_are_fenced_to_their_own_listings() -> Result<()> {
    let app = TestApp::new();
    let manager = app.manager().await?;
    let (olive_id, olive) = app.owner(&manager, "olive@example.com").await?;
    let (_, oscar) = app.owner(&manager, "oscar@example.com").await?;

    // Owners create under their own id whatever the body says
    let own = app.listing(&olive, "Sunny room", None).await?;
    let res = app.get(&format!("/api/listings/admin/{}", own), &olive).await?;
    assert_eq!(res.data()["owner_id"], json!(olive_id));

    let res = app.get(&format!("/api/listings/admin/{}", own), &oscar).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["message"], "Access denied. This property belongs to another owner.");

    let res = app
        .put(&format!("/api/listings/{}", own), &oscar, json!({ "title": "Stolen room" }))
        .await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .put(&format!("/api/listings/{}", own), &olive, json!({ "title": "Sunnier room" }))
        .await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.data()["title"], "Sunnier room");

    let res = app.get("/api/listings/admin/all", &oscar).await?;
    assert_eq!(res.data().as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn delete_is_refused_while_a_contract_is_open() -> Result<()> {
    let app = TestApp::new();
    let manager = app.manager().await?;
    let (owner_id, _) = app.owner(&manager, "olive@example.com").await?;
    let listing_id = app.listing(&manager, "Sunny room", Some(owner_id)).await?;

    let contract_id = app
        .post("/api/contracts", &manager, TestApp::lease(listing_id, None, 0, 90))
        .await?
        .id()?;

    let res = app.delete(&format!("/api/listings/{}", listing_id), &manager).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        res.body["message"],
        "Cannot delete a listing with an open contract. Terminate or delete the contract first."
    );

    app.delete(&format!("/api/contracts/{}", contract_id), &manager).await?;
    let res = app.delete(&format!("/api/listings/{}", listing_id), &manager).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    Ok(())
}

#[tokio::test]
async fn image_deletion_checks_role_and_url() -> Result<()> {
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

    let res = app
        .request(
            Method::DELETE,
            "/api/listings/delete-image",
            Some(&manager),
            Some(json!({ "image_url": "" })),
        )
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["message"], "Image URL is required");

    let res = app
        .request(
            Method::DELETE,
            "/api/listings/delete-image",
            Some(&tom),
            Some(json!({ "imageUrl": "https://cdn.example.com/a.jpg" })),
        )
        .await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .post(
            "/api/listings",
            &tom,
            json!({ "title": "My room", "address": "1 Long Road" }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    Ok(())
}
