//! api-server: local development HTTP API over the mock record store.
//!
//! Seeds a [`mock_store::Store`] from a fixture file and serves the food and
//! recipe routes through write-capable collections, so frontends can be
//! exercised against deterministic data without a database. Writes live until
//! the process exits.
//!
//! Run:
//! ```bash
//! # pretty logs (default); PORT optional
//! FIXTURES_PATH=fixtures.json cargo run -p api-server
//!
//! # structured logs
//! LOG_FORMAT=json FIXTURES_PATH=fixtures.json cargo run -p api-server
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.

mod config;
mod error;
mod food;
mod models;
mod recipes;
mod validate;

use std::net::SocketAddr;

use axum::http::HeaderValue;
use axum::{
    routing::{get, put},
    Router,
};
use mock_store::{Collection, Fixtures, Store, StoreError};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use models::{Food, Recipe};

/// Collections the handlers read and write through.
#[derive(Clone)]
pub struct AppState {
    pub food: Collection<Food>,
    pub recipes: Collection<Recipe>,
}

impl AppState {
    fn new() -> Self {
        Self {
            food: Collection::new("Food"),
            recipes: Collection::new("Recipe"),
        }
    }
}

#[tokio::main]
async fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);
    cfg.warn_if_empty();

    let fixtures = match &cfg.fixtures_path {
        Some(path) => match Fixtures::load(path) {
            Ok(f) => f,
            Err(e) => {
                error!(err = %e, "failed to load fixtures");
                std::process::exit(1);
            }
        },
        None => Fixtures::default(),
    };

    let state = AppState::new();
    let store = match build_store(fixtures, &state) {
        Ok(s) => s,
        Err(e) => {
            error!(err = %e, "failed to seed the mock store");
            std::process::exit(1);
        }
    };

    // Request ID header name
    let x_request_id = axum::http::HeaderName::from_static("x-request-id");

    let mut app = routes(state)
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid));

    // CORS - already validated in Config::from_env()
    let cors = if cfg.cors_allow_origin == HeaderValue::from_static("*") {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list([cfg.cors_allow_origin.clone()]))
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::PUT,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    };
    app = app.layer(cors);

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, err = %e, "failed to bind");
            std::process::exit(1);
        }
    };
    info!(%addr, "api-server listening");
    if let Err(e) = axum::serve(listener, app).await {
        error!(err = %e, "server error");
    }

    if let Err(e) = store.dispose() {
        warn!(err = %e, "failed to dispose the mock store");
    }
}

fn routes(state: AppState) -> Router {
    Router::new()
        .route("/food", get(food::list_food))
        .route("/food/:id", get(food::get_food).put(food::update_food))
        .route(
            "/recipes/:id",
            get(recipes::get_recipe)
                .put(recipes::update_recipe)
                .delete(recipes::delete_recipe),
        )
        .route("/recipes/at/:page", get(recipes::list_recipes_page))
        .with_state(state)
}

/// Register the routed models from `fixtures` and bind their collections.
fn build_store(mut fixtures: Fixtures, state: &AppState) -> Result<Store, StoreError> {
    let mut store = Store::new();
    store.register(&state.food, "food", fixtures.take("food"))?;
    store.register(&state.recipes, "recipes", fixtures.take("recipes"))?;
    for model in fixtures.model_names() {
        warn!(model, "fixture model has no routes; ignored");
    }
    store.reset()?;
    Ok(store)
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}
