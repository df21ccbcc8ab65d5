use std::sync::Arc;

use tower_http::{request_id::MakeRequestUuid, trace::TraceLayer};

use code_structure_service::analyzer::DynAnalyzer;
use code_structure_service::analyzer::external::ExternalAnalyzer;
use code_structure_service::config::Config;
use code_structure_service::persistence::DynStore;
use code_structure_service::persistence::memory::InMemoryRepositoryStore;
use code_structure_service::persistence::postgres_store::PostgresRepositoryStore;
use code_structure_service::web::server::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = Config::from_env()?;

    let store: DynStore = match &cfg.database_url {
        Some(url) => Arc::new(PostgresRepositoryStore::connect(url).await?),
        None => {
            tracing::warn!("DATABASE_URL not set, repositories are kept in memory");
            Arc::new(InMemoryRepositoryStore::new())
        }
    };
    let analyzer: DynAnalyzer = Arc::new(ExternalAnalyzer::new(cfg.analyzer.clone()));

    let router = app(AppState::from_config(&cfg, store, analyzer))
        .layer(TraceLayer::new_for_http())
        .layer(tower_http::request_id::SetRequestIdLayer::x_request_id(
            MakeRequestUuid,
        ));

    let listener = tokio::net::TcpListener::bind(cfg.bind_addr).await?;
    tracing::info!(
        storage_root = %cfg.storage_root.display(),
        "code-structure-service listening on {}",
        cfg.bind_addr
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
