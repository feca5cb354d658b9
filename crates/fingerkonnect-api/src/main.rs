//! FingerKonnect - rule editing and device sync API server

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use device_sync::{DeviceStatus, SyncClient, SyncError, WatchConnectivity};
use rule_engine::{FileBackend, Rule, RuleStore, StoreError, StoredRule};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod input;
mod websocket;

use config::Config;
use input::RuleInput;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RuleStore>,
    pub sync: Arc<SyncClient>,
    pub connectivity: Arc<WatchConnectivity>,
}

/// API response wrapper using serde_json::Value for flexibility
#[derive(Serialize)]
struct ApiResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ApiResponse {
    fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: Some(serde_json::to_value(data).unwrap_or(serde_json::Value::Null)),
            error: None,
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// A rule with its current list position
#[derive(Serialize)]
struct RuleView {
    index: usize,
    #[serde(flatten)]
    rule: Rule,
}

impl From<StoredRule> for RuleView {
    fn from(stored: StoredRule) -> Self {
        Self {
            index: stored.index,
            rule: stored.rule,
        }
    }
}

/// Delete query parameters
#[derive(Deserialize)]
struct DeleteParams {
    /// Id of the rule currently open in the editor
    #[serde(default)]
    editing: Option<String>,
}

/// System info response
#[derive(Serialize)]
struct SystemInfo {
    name: String,
    version: String,
    device: String,
}

fn store_error(e: StoreError) -> (StatusCode, Json<ApiResponse>) {
    let status = match &e {
        StoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        StoreError::Index { .. } | StoreError::NotFound(_) | StoreError::TemplateNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        StoreError::Load(_) | StoreError::Persist { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let message = match &e {
        StoreError::Persist { .. } => format!("{e}. The change may not survive a restart."),
        _ => e.to_string(),
    };
    (status, Json(ApiResponse::error(message)))
}

fn input_error(message: impl Into<String>) -> (StatusCode, Json<ApiResponse>) {
    (StatusCode::BAD_REQUEST, Json(ApiResponse::error(message)))
}

/// Unwrap a rule payload, answering malformed JSON inside the envelope
fn rule_input(
    payload: Result<Json<RuleInput>, JsonRejection>,
) -> Result<RuleInput, (StatusCode, Json<ApiResponse>)> {
    payload
        .map(|Json(input)| input)
        .map_err(|rejection| input_error(rejection.body_text()))
}

fn sync_error(e: &SyncError) -> (StatusCode, Json<ApiResponse>) {
    let status = match e {
        SyncError::NothingToSync => StatusCode::BAD_REQUEST,
        SyncError::Busy => StatusCode::CONFLICT,
        SyncError::RemoteError { .. } => StatusCode::BAD_GATEWAY,
        SyncError::ConnectionError(_) => StatusCode::GATEWAY_TIMEOUT,
        SyncError::Setup(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiResponse::error(e.guidance())))
}

/// Get system info
async fn system_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(SystemInfo {
        name: "FingerKonnect".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        device: state.sync.endpoint().to_string(),
    }))
}

/// List all rules
async fn list_rules(State(state): State<AppState>) -> impl IntoResponse {
    let rules: Vec<RuleView> = state
        .store
        .list()
        .await
        .into_iter()
        .enumerate()
        .map(|(index, rule)| RuleView { index, rule })
        .collect();
    Json(ApiResponse::success(rules))
}

/// Get a specific rule
async fn get_rule(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.store.get(&id).await {
        Some(stored) => (
            StatusCode::OK,
            Json(ApiResponse::success(RuleView::from(stored))),
        ),
        None => store_error(StoreError::NotFound(id)),
    }
}

/// Create a rule from form fields
async fn create_rule(
    State(state): State<AppState>,
    payload: Result<Json<RuleInput>, JsonRejection>,
) -> impl IntoResponse {
    let input = match rule_input(payload) {
        Ok(input) => input,
        Err(response) => return response,
    };
    let draft = match input.into_draft(state.store.policy().default_repeat) {
        Ok(draft) => draft,
        Err(e) => return input_error(e.to_string()),
    };

    match state.store.create(draft).await {
        Ok(stored) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(RuleView::from(stored))),
        ),
        Err(e) => store_error(e),
    }
}

/// Replace a rule from form fields
async fn update_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<RuleInput>, JsonRejection>,
) -> impl IntoResponse {
    let input = match rule_input(payload) {
        Ok(input) => input,
        Err(response) => return response,
    };
    let draft = match input.into_draft(state.store.policy().default_repeat) {
        Ok(draft) => draft,
        Err(e) => return input_error(e.to_string()),
    };

    match state.store.update_by_id(&id, draft).await {
        Ok(stored) => (
            StatusCode::OK,
            Json(ApiResponse::success(RuleView::from(stored))),
        ),
        Err(e) => store_error(e),
    }
}

/// Delete a rule
async fn delete_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> impl IntoResponse {
    match state
        .store
        .delete_by_id(&id, params.editing.as_deref())
        .await
    {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "index": outcome.index,
                "removed": outcome.removed,
                "exit_edit": outcome.exit_edit,
            }))),
        ),
        Err(e) => store_error(e),
    }
}

/// List the built-in templates the active policy accepts
async fn list_templates(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(rule_engine::templates::available(
        state.store.policy(),
    )))
}

/// Add a built-in template as a new rule
async fn add_template(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    match state.store.add_template(&slug).await {
        Ok(stored) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(RuleView::from(stored))),
        ),
        Err(e) => store_error(e),
    }
}

/// Push all rules to the device
async fn sync_rules(State(state): State<AppState>) -> impl IntoResponse {
    let rules = state.store.list().await;
    match state.sync.sync(&rules).await {
        Ok(report) => (StatusCode::OK, Json(ApiResponse::success(report))),
        Err(e) => {
            tracing::warn!("Sync failed: {}", e);
            sync_error(&e)
        }
    }
}

/// Device address, current network and busy flag
async fn device_status(State(state): State<AppState>) -> impl IntoResponse {
    let status = DeviceStatus::new(state.connectivity.as_ref(), state.sync.endpoint());
    Json(ApiResponse::success(serde_json::json!({
        "endpoint": status.endpoint,
        "network": status.network,
        "on_device_network": status.on_device_network,
        "syncing": state.sync.is_busy(),
    })))
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| websocket::handle_socket(socket, state))
}

/// Health check
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/system/info", get(system_info))
        .route("/api/v1/rules", get(list_rules).post(create_rule))
        .route(
            "/api/v1/rules/:id",
            get(get_rule).put(update_rule).delete(delete_rule),
        )
        .route("/api/v1/templates", get(list_templates))
        .route("/api/v1/templates/:slug", post(add_template))
        .route("/api/v1/sync", post(sync_rules))
        .route("/api/v1/device/status", get(device_status))
        // WebSocket
        .route("/ws", get(ws_handler))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "fingerkonnect_api=debug,rule_engine=debug,device_sync=debug,info".into()
            }),
        )
        .init();

    tracing::info!("Starting FingerKonnect API server");

    let config = Config::from_env()?;
    tracing::info!(
        "Data directory {:?}, device {}, policy {:?}",
        config.data_dir,
        config.sync.endpoint,
        config.policy.checks
    );

    let backend = Arc::new(FileBackend::new(config.data_dir.clone()));
    let store = RuleStore::new(backend, config.policy.clone());
    if let Err(e) = store.load().await {
        tracing::warn!("Starting with no rules: {}", e);
    }

    let state = AppState {
        store: Arc::new(store),
        sync: Arc::new(SyncClient::new(config.sync.clone())?),
        connectivity: Arc::new(WatchConnectivity::new(config.ssid.clone())),
    };

    let app = router(state);

    tracing::info!("Listening on http://{}", config.listen);
    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
