mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn manager_sees_global_counts() -> Result<()> {
    let app = TestApp::new();
    let manager = app.manager().await?;
    let (owner_id, _) = app.owner(&manager, "olive@example.com").await?;
    let rented = app.listing(&manager, "Sunny room", Some(owner_id)).await?;
    app.listing(&manager, "Quiet room", Some(owner_id)).await?;
    let tenant_id = app.tenant(&manager, "Tom", "tom@example.com", rented).await?;

    let mut body = TestApp::lease(rented, Some(tenant_id), 0, 180);
    body["status"] = json!("active");
    app.post("/api/contracts", &manager, body).await?;
    app.request(Method::POST, "/api/leads", None, Some(json!({ "name": "Ana", "email": "ana@example.com" })))
        .await?;

    let res = app.get("/api/dashboard/stats", &manager).await?;
    assert_eq!(res.status, StatusCode::OK);
    let stats = &res.data()["stats"];
    assert_eq!(stats["listings"]["total"], 2);
    assert_eq!(stats["listings"]["active"], 1);
    assert_eq!(stats["leads"]["new"], 1);
    assert_eq!(stats["owners"]["total"], 1);
    assert_eq!(stats["tenants"]["active"], 1);
    assert_eq!(stats["tenants"]["ending_soon"], 0);
    assert_eq!(res.data()["recentLeads"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn owner_sees_portfolio_income() -> Result<()> {
    let app = TestApp::new();
    let manager = app.manager().await?;
    let (owner_id, olive) = app.owner(&manager, "olive@example.com").await?;
    let rented = app.listing(&manager, "Sunny room", Some(owner_id)).await?;
    app.listing(&manager, "Quiet room", Some(owner_id)).await?;
    let tenant_id = app.tenant(&manager, "Tom", "tom@example.com", rented).await?;

    let mut body = TestApp::lease(rented, Some(tenant_id), 0, 180);
    body["status"] = json!("active");
    app.post("/api/contracts", &manager, body).await?;

    let res = app.get("/api/dashboard/stats", &olive).await?;
    assert_eq!(res.status, StatusCode::OK);
    let stats = &res.data()["stats"];
    assert_eq!(stats["listings"]["total"], 2);
    assert_eq!(stats["listings"]["active"], 1);
    assert_eq!(stats["tenants"]["total"], 1);
    assert_eq!(stats["income"]["monthly"].as_f64(), Some(1000.0));
    Ok(())
}

#[tokio::test]
async fn tenant_sees_own_lease() -> Result<()> {
    let app = TestApp::new();
    let manager = app.manager().await?;
    let (owner_id, _) = app.owner(&manager, "olive@example.com").await?;
    let listing_id = app.listing(&manager, "Sunny room", Some(owner_id)).await?;
    let res = app
        .post(
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
    let tenant_id = res.id()?;
    let tom = app.login("tom@example.com", "tenant-pass").await?;

    let res = app.get("/api/dashboard/stats", &tom).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["stats"]["tenant"]["status"], "available");
    assert!(res.data()["stats"]["nextPayment"].is_null());

    let mut body = TestApp::lease(listing_id, Some(tenant_id), -3, 180);
    body["status"] = json!("active");
    app.post("/api/contracts", &manager, body).await?;

    let res = app.get("/api/dashboard/stats", &tom).await?;
    let stats = &res.data()["stats"];
    assert_eq!(stats["tenant"]["status"], "active");
    assert_eq!(stats["tenant"]["weekly_rent"].as_f64(), Some(250.0));
    assert_eq!(stats["property"]["title"], "Sunny room");
    assert_eq!(stats["nextPayment"]["amount"].as_f64(), Some(250.0));
    assert_eq!(res.data()["tenantData"]["id"], json!(tenant_id));
    Ok(())
}
