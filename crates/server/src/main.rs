use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use catalog::{CatalogHandle, CatalogStore};
use serde::Deserialize;
use serde_json::Value;
use server_api::{list_items, replace_order, replace_selection, ApiContext, RawPageQuery};
use shared::{
    error::ApiError,
    protocol::{ItemPage, SelectAccepted, SortAccepted},
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer};
use tracing::info;

mod config;

use config::load_settings;

#[derive(Clone)]
struct AppState {
    api: ApiContext,
}

/// Raw query-string view of `GET /items`. Everything is optional text so
/// malformed numerics reach the coercion step instead of a rejection.
#[derive(Debug, Default, Deserialize)]
struct ItemsQuery {
    page: Option<String>,
    limit: Option<String>,
    search: Option<String>,
}

const MAX_BODY_BYTES: usize = 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let store = CatalogStore::seed(settings.catalog_size);
    info!(items = store.len(), "catalog seeded");

    let state = AppState {
        api: ApiContext {
            catalog: CatalogHandle::new(store),
        },
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/items", get(http_list_items))
        .route("/sort", post(http_replace_order))
        .route("/select", post(http_replace_selection))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn http_list_items(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ItemsQuery>,
) -> Json<ItemPage> {
    Json(list_items(
        &state.api,
        RawPageQuery {
            page: q.page,
            limit: q.limit,
            search: q.search,
        },
    ))
}

async fn http_replace_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> Result<Json<SortAccepted>, (StatusCode, Json<ApiError>)> {
    let sorted = replace_order(&state.api, &payload)
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(e)))?;
    Ok(Json(SortAccepted {
        success: true,
        sorted,
    }))
}

async fn http_replace_selection(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> Result<Json<SelectAccepted>, (StatusCode, Json<ApiError>)> {
    replace_selection(&state.api, &payload).map_err(|e| (StatusCode::BAD_REQUEST, Json(e)))?;
    Ok(Json(SelectAccepted { success: true }))
}
