use std::future::Future;
use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::config::{Config, LimitsConfig};
use crate::error::{ChronicleError, Result};
use crate::routes::{analytics, conversations, episodes, members, metrics, service, team};
use crate::store::CareStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CareStore>,
    pub limits: LimitsConfig,
}

impl AppState {
    pub fn new(store: Arc<CareStore>, limits: LimitsConfig) -> Self {
        Self { store, limits }
    }
}

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/test-db", get(service::test_db))
        .route("/members", get(members::list).post(members::create))
        .route("/members/full", get(members::full))
        .route(
            "/members/:id",
            get(members::show)
                .put(members::update)
                .delete(members::remove),
        )
        .route("/members/:id/dashboard", get(members::dashboard))
        .route("/members/:id/health-metrics", get(members::health_metrics))
        .route("/members/:id/episodes", get(members::episodes))
        .route("/health-metrics", get(metrics::list).post(metrics::create))
        .route("/health-metrics/:id", axum::routing::delete(metrics::remove))
        .route(
            "/conversations",
            get(conversations::list).post(conversations::create),
        )
        .route(
            "/conversations/:id",
            get(conversations::show).put(conversations::update),
        )
        .route(
            "/conversations/:id/messages",
            post(conversations::add_message),
        )
        .route("/episodes", get(episodes::list).post(episodes::create))
        .route("/episodes/:id", put(episodes::update))
        .route("/team-members", get(team::list).post(team::create))
        .route("/analytics/overview", get(analytics::overview));

    Router::new()
        .route("/", get(service::index))
        .route("/health", get(service::health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(config: Config) -> Result<()> {
    run_with_shutdown(config, futures::future::pending::<()>()).await
}

pub async fn run_with_shutdown<F>(config: Config, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    config.validate()?;
    let store = Arc::new(CareStore::open(&config.database).await?);
    let app = build_router(AppState::new(store.clone(), config.limits.clone()));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ChronicleError::Runtime(e.to_string()))?;
    info!(%addr, "care chronicle listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ChronicleError::Runtime(e.to_string()))?;

    info!("server stopped");
    match Arc::try_unwrap(store) {
        Ok(store) => store.close(),
        Err(_) => debug!("record store still shared at shutdown; leaving pool to drop"),
    }
    Ok(())
}
