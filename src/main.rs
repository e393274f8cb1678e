mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::{Config, RecordStoreKind};
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::core::{database, middleware, server};
use crate::features::auth::{self, IdentityProvider};
use crate::features::files::services::{ExpiryPolicy, TransferOptions, UploadRules};
use crate::features::files::store::{FileRecordStore, InMemoryFileRecordStore, PgFileRecordStore};
use crate::features::files::{routes as files_routes, TransferService};
use crate::shared::clock::SystemClock;
use axum::{middleware::from_fn, Router};
use std::sync::Arc;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        worker_threads,
        pid = std::process::id(),
        store = ?config.database.store,
        "Configuration loaded"
    );

    let store = open_record_store(&config).await?;

    // Initialize auth
    let jwks_client = Arc::new(auth::JwksClient::new(
        &config.auth.jwks_url,
        config.auth.jwks_cache_ttl,
    ));
    let identity: Arc<dyn IdentityProvider> = Arc::new(auth::JwtValidator::new(
        jwks_client,
        config.auth.issuer.clone(),
        config.auth.audience.clone(),
        config.auth.jwt_leeway,
    ));
    tracing::info!("Auth configuration initialized");

    // Initialize MinIO client for storage
    let minio_client = Arc::new(
        modules::storage::MinIOClient::new(config.minio.clone())
            .map_err(|e| anyhow::anyhow!("Failed to initialize MinIO client: {}", e))?,
    );
    // Ensure bucket exists (create if not)
    minio_client
        .ensure_bucket_exists()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to ensure MinIO bucket exists: {}", e))?;
    tracing::info!(
        "MinIO client initialized for bucket: {}",
        minio_client.bucket_name()
    );

    // Initialize Transfer Service
    let policy = ExpiryPolicy::from_config(&config.transfer).map_err(|e| anyhow::anyhow!(e))?;
    let transfer_service = Arc::new(TransferService::new(
        store,
        minio_client,
        policy,
        Arc::new(SystemClock),
        TransferOptions {
            upload_prefix: config.minio.upload_prefix.clone(),
            allow_anonymous_upload: config.transfer.allow_anonymous_upload,
            upstream_timeout: config.transfer.upstream_timeout,
            upload_rules: UploadRules {
                max_upload_size: config.transfer.max_upload_size,
                forbidden_extensions: config.transfer.forbidden_extensions.clone(),
            },
        },
    ));
    tracing::info!(
        "Transfer service initialized (anonymous uploads: {})",
        config.transfer.allow_anonymous_upload
    );

    let app = Router::new()
        .merge(swagger_router(&config))
        .merge(files_routes(transfer_service, identity))
        .route("/health", axum::routing::get(health_check))
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid));

    // Start server
    let addr = config.app.server_address();
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    let listener = server::bind_listener(socket_addr)?;
    tracing::info!("Server listening on {}", format!("http://{}", addr));
    tracing::info!(
        "Swagger UI available at {}",
        format!("http://{}/swagger-ui/", addr)
    );

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> axum::http::StatusCode {
    axum::http::StatusCode::OK
}

/// Postgres when `RECORD_STORE=postgres` (migrations applied), otherwise the in-memory store
async fn open_record_store(config: &Config) -> anyhow::Result<Arc<dyn FileRecordStore>> {
    match config.database.store {
        RecordStoreKind::Postgres => {
            let url = config
                .database
                .url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for RECORD_STORE=postgres"))?;
            let pool = database::create_pool(&config.database, url).await?;
            tracing::info!("Database connection pool created");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
            tracing::info!("File record migrations applied");

            Ok(Arc::new(PgFileRecordStore::new(pool)))
        }
        RecordStoreKind::Memory => {
            tracing::warn!("Using in-memory record store; file records are lost on restart");
            Ok(Arc::new(InMemoryFileRecordStore::new()))
        }
    }
}

/// Swagger UI plus the OpenAPI document, behind basic auth when credentials are set
fn swagger_router(config: &Config) -> Router {
    let mut openapi = ApiDoc::openapi();
    SwaggerInfoModifier {
        title: config.swagger.title.clone(),
        version: config.swagger.version.clone(),
        description: config.swagger.description.clone(),
    }
    .modify(&mut openapi);

    let swagger = Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi));
    match config.swagger.credentials() {
        Some(credentials) => {
            tracing::info!("Swagger UI basic auth enabled");
            swagger.layer(from_fn(middleware::basic_auth_middleware(Arc::new(credentials))))
        }
        None => {
            tracing::info!("Swagger UI basic auth disabled (no credentials configured)");
            swagger
        }
    }
}
