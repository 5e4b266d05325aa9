use std::process::exit;
use std::sync::Arc;

use tracksync_api_rust::config::AppConfig;
use tracksync_api_rust::storage::{MemoryStorage, NewAccount, Storage};
use tracksync_api_rust::token::TokenService;
use tracksync_api_rust::{app, AppState};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up JWT_KEY, ADMIN_EMAIL, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            exit(1);
        }
    };

    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    if let Err(err) = seed_admin(storage.as_ref(), &config).await {
        eprintln!("{}", err);
        exit(2);
    }

    let state = AppState::new(storage, Arc::new(TokenService::new(&config.signing_key)));
    let app = app(state);

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("tracksync server listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

/// Make sure account id 1, the permanent administrator, exists.
///
/// On an empty store the admin is created from ADMIN_EMAIL and
/// ADMIN_PASSWORD; without those the server refuses to start.
async fn seed_admin(storage: &dyn Storage, config: &AppConfig) -> anyhow::Result<()> {
    if storage.account_by_id(1).await.is_ok() {
        return Ok(());
    }

    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        anyhow::bail!("No Admin User Defined");
    };

    let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
    let admin = storage
        .create_account(NewAccount {
            first_name: "Admin".into(),
            last_name: "User".into(),
            email_address: email.clone(),
            password_hash,
            enabled: true,
            admin: true,
        })
        .await?;

    tracing::info!("Created Admin User: {}", admin.id);
    Ok(())
}
