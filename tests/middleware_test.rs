//! Request-binding middleware tests against the full router

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use quillpress_core::config::{Config, DatabaseConfig};
use quillpress_core::domain::CreateSiteInput;
use quillpress_core::server::{build_router, build_state, AppState};
use tower::ServiceExt;

mod common;

async fn test_state(pool: &sqlx::MySqlPool) -> AppState {
    let config = Config {
        http_host: "127.0.0.1".to_string(),
        http_port: 0,
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 5,
            min_connections: 1,
        },
        sites: common::test_sites_config(),
    };
    build_state(config, pool.clone())
}

async fn provision(state: &AppState, subdomain: &str, pool: &sqlx::MySqlPool) -> quillpress_core::domain::Site {
    let owner = common::create_owner(pool, &format!("{}@example.com", subdomain)).await;
    state
        .site_service
        .create_site(CreateSiteInput {
            owner_id: owner.id,
            name: subdomain.to_string(),
            subdomain: subdomain.to_string(),
        })
        .await
        .unwrap()
}

fn get_with_host(path: &str, host: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header(header::HOST, host)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_answers_for_any_host() {
    let pool = match common::get_test_pool().await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Skipping test: could not connect to database: {}", e);
            return;
        }
    };
    common::setup_database(&pool).await.unwrap();

    let app = build_router(test_state(&pool).await);
    let response = app
        .oneshot(get_with_host("/health", "anything.anywhere"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_host_is_rejected() {
    let pool = match common::get_test_pool().await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Skipping test: could not connect to database: {}", e);
            return;
        }
    };
    common::setup_database(&pool).await.unwrap();

    let app = build_router(test_state(&pool).await);
    let response = app
        .oneshot(get_with_host("/", "nowhere.net"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_primary_host_is_served() {
    let pool = match common::get_test_pool().await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Skipping test: could not connect to database: {}", e);
            return;
        }
    };
    common::setup_database(&pool).await.unwrap();

    let state = test_state(&pool).await;
    provision(&state, "served", &pool).await;

    let app = build_router(state);
    let response = app
        .oneshot(get_with_host("/", "served.example.com"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_alias_host_redirects_to_primary() {
    let pool = match common::get_test_pool().await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Skipping test: could not connect to database: {}", e);
            return;
        }
    };
    common::setup_database(&pool).await.unwrap();

    let state = test_state(&pool).await;
    let site = provision(&state, "redir", &pool).await;
    state
        .site_service
        .add_domain(site.id, "alias-of-redir.net", false, false)
        .await
        .unwrap();

    let app = build_router(state);
    let response = app
        .oneshot(get_with_host("/articles/1?draft=true", "alias-of-redir.net"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    assert_eq!(location, "http://redir.example.com/articles/1?draft=true");
}

#[tokio::test]
async fn test_archived_site_stops_serving() {
    let pool = match common::get_test_pool().await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Skipping test: could not connect to database: {}", e);
            return;
        }
    };
    common::setup_database(&pool).await.unwrap();

    let state = test_state(&pool).await;
    let site = provision(&state, "gone", &pool).await;

    let app = build_router(state.clone());
    let response = app
        .clone()
        .oneshot(get_with_host("/", "gone.example.com"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Archiving clears the resolver cache, so the next request misses.
    state.site_service.archive_site(site.id).await.unwrap();
    let response = app
        .oneshot(get_with_host("/", "gone.example.com"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
