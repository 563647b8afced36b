use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use vault_api::{create_router, AppState};
use vault_core::ports::{BlobStore, CompletionClient};
use vault_core::repositories::{
    AuditRepository, ChatRepository, DocumentRepository, FundRepository, UserRepository,
};
use vault_core::services::{
    AuditService, AuthService, ChatOptions, ChatService, DocumentService, FundService,
    LifecyclePolicy, UserService,
};
use vault_infrastructure::{
    create_pool, run_migrations, LocalBlobStore, MemoryDatabase, OpenAiCompletionClient,
    PgAuditRepository, PgChatRepository, PgDocumentRepository, PgFundRepository,
    PgUserRepository,
};
use vault_security::JwtService;
use vault_shared::config::{AppConfig, DatabaseDriver};

struct Repositories {
    users: Arc<dyn UserRepository>,
    funds: Arc<dyn FundRepository>,
    documents: Arc<dyn DocumentRepository>,
    audit: Arc<dyn AuditRepository>,
    chat: Arc<dyn ChatRepository>,
}

async fn connect_repositories(config: &AppConfig) -> anyhow::Result<Repositories> {
    match config.database.driver {
        DatabaseDriver::Postgres => {
            info!("Connecting to database...");
            let pool = create_pool(&config.database)
                .await
                .context("Failed to connect to database")?;
            info!("Database connection established.");

            if config.database.run_migrations {
                run_migrations(&pool).await.context("Failed to run migrations")?;
                info!("Migrations applied.");
            }

            Ok(Repositories {
                users: Arc::new(PgUserRepository::new(pool.clone())),
                funds: Arc::new(PgFundRepository::new(pool.clone())),
                documents: Arc::new(PgDocumentRepository::new(pool.clone())),
                audit: Arc::new(PgAuditRepository::new(pool.clone())),
                chat: Arc::new(PgChatRepository::new(pool)),
            })
        }
        DatabaseDriver::Memory => {
            warn!("Using in-memory storage, data is lost on restart");
            let db = Arc::new(MemoryDatabase::new());
            Ok(Repositories {
                users: db.clone(),
                funds: db.clone(),
                documents: db.clone(),
                audit: db.clone(),
                chat: db,
            })
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize telemetry, the guard flushes file logs on exit
    let _log_guard = vault_shared::telemetry::init_telemetry(&config.logging)?;

    info!("Audit Vault starting ({})...", config.app.env);
    if config.is_production() && config.jwt.secret == "change-me-in-production" {
        warn!("JWT secret is the built-in default, set APP__JWT__SECRET");
    }

    let repos = connect_repositories(&config).await?;

    // Adapters
    let blobs: Arc<dyn BlobStore> = Arc::new(
        LocalBlobStore::new(&config.storage.upload_dir)
            .await
            .context("Failed to prepare upload directory")?,
    );
    let completion: Arc<dyn CompletionClient> = Arc::new(
        OpenAiCompletionClient::new(&config.chat).context("Failed to build completion client")?,
    );
    if config.chat.api_key.is_none() {
        warn!("No completion API key configured, chat completions will be unavailable");
    }

    // Services
    let jwt = JwtService::new(config.jwt.secret.clone(), config.jwt.access_token_expiry);
    let audit = Arc::new(AuditService::new(repos.audit.clone()));
    let policy = LifecyclePolicy::from_settings(&config.storage, &config.workflow);

    let state = AppState {
        auth: Arc::new(AuthService::new(repos.users.clone(), jwt)),
        users: Arc::new(UserService::new(repos.users.clone())),
        funds: Arc::new(FundService::new(repos.funds.clone(), repos.users.clone())),
        documents: Arc::new(DocumentService::new(
            repos.documents.clone(),
            repos.funds.clone(),
            repos.users.clone(),
            audit,
            blobs,
            policy,
        )),
        chat: Arc::new(ChatService::new(
            repos.chat,
            repos.documents,
            repos.funds,
            completion,
            ChatOptions::from(&config.chat),
        )),
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);

    // Bind address
    let host: std::net::IpAddr = config.app.host.parse().context("Invalid app.host")?;
    let addr = SocketAddr::from((host, config.app.port));
    info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Audit Vault stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
