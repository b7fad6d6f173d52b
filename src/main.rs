// src/main.rs

use std::sync::Arc;
use std::time::Duration;

use exam_backend::config::Config;
use exam_backend::error::AppError;
use exam_backend::models::user::{NewUser, ROLE_ADMIN, UserProfile};
use exam_backend::routes;
use exam_backend::state::AppState;
use exam_backend::store::{PgStore, UserDirectory};
use exam_backend::utils::hash::hash_password;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load configuration from environment (.env is read by `from_env`)
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to connect to database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    let store = Arc::new(PgStore::new(pool));

    if let Err(e) = seed_admin_user(store.as_ref(), &config).await {
        tracing::error!("Failed to seed admin user: {:?}", e);
    }

    let addr = config.bind_addr.clone();
    let app = routes::create_router(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind {addr}: {e}"));
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await.expect("Server error");
}

/// Creates the configured admin account if its username is free.
/// An existing account is left untouched, password included.
async fn seed_admin_user(users: &dyn UserDirectory, config: &Config) -> Result<(), AppError> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        return Ok(());
    };

    if users.find_by_username(username).await?.is_some() {
        tracing::info!(username = %username, "admin account already exists, not seeding");
        return Ok(());
    }

    let created = users
        .create_user(NewUser {
            username: username.clone(),
            password_hash: hash_password(password)?,
            role: ROLE_ADMIN.to_string(),
            profile: UserProfile::default(),
        })
        .await?;

    match created {
        Some(user) => tracing::info!(user_id = user.id, username = %username, "admin account seeded"),
        None => tracing::info!(username = %username, "admin account created concurrently, not seeding"),
    }
    Ok(())
}
