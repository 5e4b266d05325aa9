// Account handlers: registration, directory and session endpoints
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::account_for_identity;
use crate::authz;
use crate::error::ApiError;
use crate::router::{HandlerResult, RequestContext};
use crate::storage::{AccountRecord, NewAccount, Storage, StorageResult};
use crate::token::{session_cookie, Claims};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateAccountRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email_address: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    pub enabled: Option<bool>,
    // accepted on the wire but never honored: signup cannot mint admins
    pub admin_user: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateAccountRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email_address: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
    pub enabled: Option<bool>,
    pub admin_user: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Account payload. The flags only appear where the endpoint explicitly
/// discloses them; directory listings stay flag-free.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: u64,
    pub uuid: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_user: Option<bool>,
}

impl AccountResponse {
    fn from_record(record: &AccountRecord) -> Self {
        Self {
            id: record.id,
            uuid: record.uuid,
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            email_address: record.email_address.clone(),
            enabled: None,
            admin_user: None,
        }
    }

    fn with_enabled(record: &AccountRecord) -> Self {
        Self {
            enabled: Some(record.enabled),
            ..Self::from_record(record)
        }
    }

    fn with_flags(record: &AccountRecord) -> Self {
        Self {
            admin_user: Some(record.admin),
            ..Self::with_enabled(record)
        }
    }
}

/// POST /users - register an account
pub async fn create(ctx: RequestContext) -> HandlerResult {
    let payload: CreateAccountRequest = ctx.json()?;
    let storage = ctx.state.storage.as_ref();

    check_password(&payload.password, &payload.confirm_password)?;
    check_email(storage, &payload.email_address).await?;

    let password_hash = hash_password(&payload.password)?;
    let account = storage
        .create_account(NewAccount {
            first_name: payload.first_name,
            last_name: payload.last_name,
            email_address: payload.email_address,
            password_hash,
            enabled: payload.enabled.unwrap_or(true),
            admin: false,
        })
        .await?;

    Ok((StatusCode::OK, Json(AccountResponse::with_flags(&account))).into_response())
}

/// GET /users/{id} - account detail, self or administrator only
pub async fn show(ctx: RequestContext) -> HandlerResult {
    let claims = ctx.state.tokens.check(&ctx.headers)?;
    let uuid = ctx.uuid_param("id")?;
    let storage = ctx.state.storage.as_ref();

    let target = storage.account_by_uuid(uuid).await?;
    require_self_or_admin(storage, &claims, &target, "Permission denied").await?;

    Ok((StatusCode::OK, Json(AccountResponse::from_record(&target))).into_response())
}

/// GET /users - directory listing; administrators see everyone, other
/// callers see a list containing just themselves
pub async fn list(ctx: RequestContext) -> HandlerResult {
    let claims = ctx.state.tokens.check(&ctx.headers)?;
    let storage = ctx.state.storage.as_ref();

    let accounts = if authz::is_administrator(storage, &claims.sub).await? {
        storage.list_accounts().await?
    } else {
        vec![account_for_identity(storage, &claims.sub).await?]
    };

    let listing: Vec<AccountResponse> =
        accounts.iter().map(AccountResponse::from_record).collect();
    Ok((StatusCode::OK, Json(listing)).into_response())
}

/// PATCH /users/{id} - partial update; absent fields stay as they are
pub async fn update(ctx: RequestContext) -> HandlerResult {
    let claims = ctx.state.tokens.check(&ctx.headers)?;
    let uuid = ctx.uuid_param("id")?;
    let payload: UpdateAccountRequest = ctx.json()?;
    let storage = ctx.state.storage.as_ref();

    let mut target = storage.account_by_uuid(uuid).await?;
    let is_admin = authz::is_administrator(storage, &claims.sub).await?;
    if !is_admin && !claims.sub.eq_ignore_ascii_case(&target.email_address) {
        return Err(ApiError::forbidden("User can not modify another user account"));
    }

    let password = payload.password.as_deref().unwrap_or("");
    let confirm = payload.confirm_password.as_deref().unwrap_or("");
    if password != confirm {
        return Err(ApiError::bad_request("Passwords do not match"));
    }
    if !password.is_empty() {
        target.password_hash = hash_password(password)?;
    }

    if let Some(email) = payload.email_address {
        if !email.eq_ignore_ascii_case(&target.email_address) {
            check_email(storage, &email).await?;
        }
        target.email_address = email;
    }
    if let Some(first_name) = payload.first_name {
        target.first_name = first_name;
    }
    if let Some(last_name) = payload.last_name {
        target.last_name = last_name;
    }
    if let Some(enabled) = payload.enabled {
        target.enabled = enabled;
    }
    // only administrators hand out or revoke the admin flag; for everyone
    // else the field is silently ignored
    if is_admin {
        if let Some(admin) = payload.admin_user {
            target.admin = admin;
        }
    }

    let updated = storage.update_account(target).await?;
    Ok((StatusCode::OK, Json(AccountResponse::with_enabled(&updated))).into_response())
}

/// DELETE /users/{id} - remove an account and everything it owns
pub async fn delete(ctx: RequestContext) -> HandlerResult {
    let claims = ctx.state.tokens.check(&ctx.headers)?;
    let uuid = ctx.uuid_param("id")?;
    let storage = ctx.state.storage.as_ref();

    let target = storage.account_by_uuid(uuid).await?;
    // the seeded administrator is permanent, no matter who asks
    if target.id == 1 {
        return Err(ApiError::bad_request("Admin Account can not be deleted"));
    }
    require_self_or_admin(storage, &claims, &target, "Access Denied").await?;

    storage.delete_account(target.id).await?;
    Ok((
        StatusCode::OK,
        Json(json!({ "message": "Record Successfully Deleted" })),
    )
        .into_response())
}

/// POST /users/signin - exchange credentials for a session cookie
pub async fn signin(ctx: RequestContext) -> HandlerResult {
    let credentials: Credentials = ctx.json()?;
    let purpose = ctx
        .headers
        .get("X-Authentication-Type")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    let storage = ctx.state.storage.as_ref();
    let Ok(account) = storage.account_by_email(&credentials.username).await else {
        return Err(ApiError::unauthorized("Invalid credentials"));
    };
    if !bcrypt::verify(&credentials.password, &account.password_hash).unwrap_or(false) {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let claims = Claims::new(account.email_address, purpose);
    let token = ctx.state.tokens.issue(&claims)?;

    Ok((
        StatusCode::ACCEPTED,
        [(header::SET_COOKIE, session_cookie(&token, claims.exp))],
        Json(json!({ "message": "Signed in" })),
    )
        .into_response())
}

/// POST /users/refreshToken - re-issue the session cookie on a short expiry
pub async fn refresh_token(ctx: RequestContext) -> HandlerResult {
    let claims = ctx.state.tokens.check(&ctx.headers)?;
    let refreshed = claims.refreshed();
    let token = ctx.state.tokens.issue(&refreshed)?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie(&token, refreshed.exp))],
        Json(json!({ "message": "Token refreshed" })),
    )
        .into_response())
}

async fn require_self_or_admin(
    storage: &dyn Storage,
    claims: &Claims,
    target: &AccountRecord,
    denial: &'static str,
) -> Result<(), ApiError> {
    if claims.sub.eq_ignore_ascii_case(&target.email_address) {
        return Ok(());
    }
    if authz::is_administrator(storage, &claims.sub).await? {
        return Ok(());
    }
    Err(ApiError::forbidden(denial))
}

fn check_password(password: &str, confirm: &str) -> Result<(), ApiError> {
    if password.is_empty() && confirm.is_empty() {
        return Err(ApiError::bad_request("Blank Password"));
    }
    if password != confirm {
        return Err(ApiError::bad_request("Passwords do not match"));
    }
    Ok(())
}

async fn check_email(storage: &dyn Storage, email: &str) -> Result<(), ApiError> {
    if email.is_empty() {
        return Err(ApiError::bad_request("Missing Email Address"));
    }
    storage.account_by_email(email).await.conflict_or_ok("Account")?;
    Ok(())
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|err| {
        tracing::error!("password hashing failed: {}", err);
        ApiError::internal_server_error("Failed to encrypt password")
    })
}
