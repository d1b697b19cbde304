mod prune;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use souk_api::auth::{self, AppState, AppStateInner};
use souk_api::media::{self, CdnConfig};
use souk_api::middleware::{require_admin, require_auth};
use souk_api::{admin, favorites, listings, messages, notifications, profile};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "souk=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret = std::env::var("SOUK_JWT_SECRET").unwrap_or_default();
    if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
        eprintln!("FATAL: SOUK_JWT_SECRET is unset or still a placeholder.");
        eprintln!("       Set it in your .env file and restart.");
        std::process::exit(1);
    }

    let db_path = std::env::var("SOUK_DB_PATH").unwrap_or_else(|_| "souk.db".into());
    let host = std::env::var("SOUK_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("SOUK_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let retention_days: u32 = std::env::var("SOUK_NOTIFICATION_RETENTION_DAYS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(30);

    // CDN credentials are optional; without them the upload endpoint
    // answers 503 instead of using a baked-in fallback.
    let cdn = match (
        std::env::var("SOUK_CDN_UPLOAD_URL"),
        std::env::var("SOUK_CDN_API_KEY"),
    ) {
        (Ok(upload_url), Ok(api_key)) if !upload_url.is_empty() && !api_key.is_empty() => {
            Some(CdnConfig { upload_url, api_key })
        }
        _ => {
            info!("No CDN credentials configured; image uploads disabled");
            None
        }
    };

    // Init database
    let db = souk_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret,
        http: reqwest::Client::new(),
        cdn,
    });

    // Background notification pruning (runs every hour)
    tokio::spawn(prune::run_prune_loop(state.clone(), retention_days, 3600));

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/listings", get(listings::feed))
        .route("/listings/{listing_id}", get(listings::get_listing))
        .route("/categories", get(listings::categories))
        .route("/health", get(health))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/listings", post(listings::create_listing))
        .route("/listings/{listing_id}", put(listings::update_listing))
        .route("/listings/{listing_id}", delete(listings::delete_listing))
        .route("/me/listings", get(listings::my_listings))
        .route("/me/favorites", get(favorites::my_favorites))
        .route("/listings/{listing_id}/favorite", put(favorites::add_favorite))
        .route("/listings/{listing_id}/favorite", delete(favorites::remove_favorite))
        .route("/conversations", get(messages::list_conversations))
        .route("/conversations/{peer_id}/messages", get(messages::get_messages))
        .route("/conversations/{peer_id}/messages", post(messages::send_message))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/{notification_id}/read", post(notifications::mark_read))
        .route("/notifications/{notification_id}", delete(notifications::delete_notification))
        .route("/profile", get(profile::get_profile))
        .route("/profile", put(profile::update_profile))
        .route("/upload", post(media::upload))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/listings", get(admin::list_listings))
        .route("/listings/{listing_id}", delete(admin::delete_listing))
        .route("/listings/{listing_id}/status", post(admin::toggle_listing_status))
        .route("/users", get(admin::list_users))
        .route("/users/{user_id}/block", post(admin::toggle_user_block))
        .route("/users/{user_id}", delete(admin::delete_user))
        .layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest("/admin", admin_routes)
        .layer(DefaultBodyLimit::max(8 * 1024 * 1024)) // headroom over the 5 MB image cap
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Souk server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
