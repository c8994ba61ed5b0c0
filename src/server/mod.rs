//! Server initialization and routing

use crate::api;
use crate::config::Config;
use crate::middleware::{site_binding_middleware, SiteBindingState, SiteContext};
use crate::repository::{
    CollectionRepositoryImpl, DomainRepositoryImpl, GroupRepositoryImpl, SiteRepositoryImpl,
    SiteVarRepositoryImpl,
};
use crate::service::{SiteCache, SiteResolver, SiteService, SiteVarService, VisibilityService};
use anyhow::Result;
use axum::{
    middleware,
    routing::{get, put},
    Extension, Json, Router,
};
use sqlx::{mysql::MySqlPoolOptions, MySqlPool};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: MySqlPool,
    pub site_service: Arc<SiteService<SiteRepositoryImpl, DomainRepositoryImpl>>,
    pub sitevar_service: Arc<SiteVarService<SiteVarRepositoryImpl>>,
    pub visibility_service: Arc<VisibilityService<GroupRepositoryImpl, CollectionRepositoryImpl>>,
    pub resolver: Arc<SiteResolver<DomainRepositoryImpl, SiteRepositoryImpl>>,
    pub domain_repo: Arc<DomainRepositoryImpl>,
    pub cache: Arc<SiteCache>,
}

/// Wire repositories, services and the resolver cache into one state value.
pub fn build_state(config: Config, db_pool: MySqlPool) -> AppState {
    let site_repo = Arc::new(SiteRepositoryImpl::new(db_pool.clone()));
    let domain_repo = Arc::new(DomainRepositoryImpl::new(db_pool.clone()));
    let group_repo = Arc::new(GroupRepositoryImpl::new(db_pool.clone()));
    let collection_repo = Arc::new(CollectionRepositoryImpl::new(db_pool.clone()));
    let sitevar_repo = Arc::new(SiteVarRepositoryImpl::new(db_pool.clone()));

    let cache = Arc::new(SiteCache::new());

    let resolver = Arc::new(SiteResolver::new(
        domain_repo.clone(),
        site_repo.clone(),
        cache.clone(),
        config.sites.clone(),
    ));

    let site_service = Arc::new(SiteService::new(
        site_repo,
        domain_repo.clone(),
        cache.clone(),
        config.sites.clone(),
    ));

    let sitevar_service = Arc::new(SiteVarService::new(sitevar_repo, config.sites.clone()));

    let visibility_service = Arc::new(VisibilityService::new(group_repo, collection_repo));

    AppState {
        config: Arc::new(config),
        db_pool,
        site_service,
        sitevar_service,
        visibility_service,
        resolver,
        domain_repo,
        cache,
    }
}

/// Run the server
pub async fn run(config: Config) -> Result<()> {
    let db_pool = MySqlPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;

    info!("Connected to database");

    crate::migration::run_migrations(&db_pool).await?;

    let http_addr = config.http_addr();
    let state = build_state(config, db_pool);
    let app = build_router(state);

    let listener = TcpListener::bind(&http_addr).await?;
    info!("HTTP server started on {}", http_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the HTTP router.
///
/// Admin and health routes are served for any host; the front routes pass
/// through the site-binding middleware, which resolves the Host header to a
/// tenant site before the handler runs.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let binding_state = SiteBindingState {
        resolver: state.resolver.clone(),
        redirect_exempt_hosts: Arc::new(state.config.sites.redirect_exempt_hosts.clone()),
    };

    let front = Router::new()
        .route("/", get(site_home))
        .layer(middleware::from_fn_with_state(
            binding_state,
            site_binding_middleware,
        ));

    Router::new()
        // Health endpoints
        .route("/health", get(api::health::health))
        .route("/ready", get(api::health::ready))
        // Site administration endpoints
        .route(
            "/api/v1/sites",
            get(api::site::list).post(api::site::create),
        )
        .route(
            "/api/v1/sites/{id}",
            get(api::site::get)
                .put(api::site::update)
                .delete(api::site::archive),
        )
        .route(
            "/api/v1/sites/{id}/domains",
            get(api::site::list_domains).post(api::site::add_domain),
        )
        .route("/api/v1/sites/{id}/vars", get(api::site::list_vars))
        .route(
            "/api/v1/sites/{id}/vars/{name}",
            put(api::site::set_var).delete(api::site::delete_var),
        )
        .merge(front)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(cors)
        .with_state(state)
}

/// Front-of-site handler: echoes the binding the middleware established.
/// Content rendering hangs off this same extension.
async fn site_home(Extension(context): Extension<SiteContext>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "site": context.site(),
        "domain": context.domain(),
    }))
}
