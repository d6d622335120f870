use anyhow::{anyhow, Context};
use serde_json::json;

use crate::cli::utils::{output_fields, output_success};
use crate::cli::OutputFormat;
use crate::config::config;
use crate::services::auth_service::CreateAdminRequest;
use crate::services::AuthService;
use crate::store;

pub async fn create_admin(
    email: String,
    name: String,
    password: String,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let settings = config();
    let store = store::open(settings).await.context("failed to open store")?;
    let auth = AuthService::new(store, settings.security.clone());

    let user = auth
        .create_admin(CreateAdminRequest { email, password, name })
        .await
        .map_err(|e| anyhow!("{}", e))?;

    if let OutputFormat::Text = output_format {
        output_fields(&[("id", user.id.to_string()), ("email", user.email.clone())]);
    }
    output_success(
        &output_format,
        "Admin user created successfully",
        Some(json!({ "id": user.id, "email": user.email, "role": user.role })),
    )
}

pub async fn token(email: String, output_format: OutputFormat) -> anyhow::Result<()> {
    let settings = config();
    let store = store::open(settings).await.context("failed to open store")?;

    let user = store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(|| anyhow!("No account with email '{}'", email))?;
    if !user.is_active {
        return Err(anyhow!("Account '{}' is inactive", user.email));
    }

    let auth = AuthService::new(store, settings.security.clone());
    let token = auth.issue_token(&user).map_err(|e| anyhow!("{}", e))?;

    match output_format {
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
        OutputFormat::Json => output_success(
            &output_format,
            "Token issued",
            Some(json!({ "token": token, "role": user.role, "expires_in_hours": settings.security.jwt_expiry_hours })),
        ),
    }
}
