use crate::config::{self, ForecastSettings};
use crate::error::DashboardError;
use crate::pipeline::{self, DashboardReport, DashboardRequest};
use crate::provider::MarketDataProvider;
use crate::view::DashboardView;
use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const INDEX_HTML: &str = include_str!("../web/index.html");
const APP_JS: &str = include_str!("../web/app.js");

#[derive(Clone)]
struct WebState {
    provider: Arc<dyn MarketDataProvider>,
    settings: ForecastSettings,
    /// Request the page starts from; also fills any missing query field.
    initial: DashboardRequest,
}

#[derive(Clone, Debug, Serialize)]
struct ApiError {
    error: String,
}

type ApiResult<T> = std::result::Result<T, (StatusCode, Json<ApiError>)>;

/// Query string of the dashboard endpoint. Missing fields fall back to the
/// server's initial request.
#[derive(Debug, Default, Deserialize)]
struct DashboardQuery {
    ticker: Option<String>,
    start: Option<String>,
    end: Option<String>,
}

impl DashboardQuery {
    fn to_request(&self, defaults: &DashboardRequest) -> ApiResult<DashboardRequest> {
        let start = self
            .start
            .clone()
            .unwrap_or_else(|| defaults.start.format(config::DATE_FORMAT).to_string());
        let end = self
            .end
            .clone()
            .unwrap_or_else(|| defaults.end.format(config::DATE_FORMAT).to_string());
        let ticker = self.ticker.as_deref().unwrap_or(&defaults.symbol);

        DashboardRequest::parse(ticker, &start, &end)
            .map_err(|e| api_err(StatusCode::BAD_REQUEST, &e.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct DefaultsResponse {
    ticker: String,
    start: String,
    end: String,
}

impl From<&DashboardRequest> for DefaultsResponse {
    fn from(request: &DashboardRequest) -> Self {
        Self {
            ticker: request.symbol.clone(),
            start: request.start.format(config::DATE_FORMAT).to_string(),
            end: request.end.format(config::DATE_FORMAT).to_string(),
        }
    }
}

pub async fn run_webui_server(
    port: u16,
    provider: Arc<dyn MarketDataProvider>,
    settings: ForecastSettings,
    initial: DashboardRequest,
) -> Result<()> {
    let app = router(WebState {
        provider,
        settings,
        initial,
    });

    let addr = format!("0.0.0.0:{}", port);
    info!("WebUI listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: WebState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/app.js", get(app_js))
        .route("/api/health", get(health))
        .route("/api/defaults", get(defaults))
        .route("/api/dashboard", get(dashboard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn app_js() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/javascript; charset=utf-8")], APP_JS)
}

async fn health(State(state): State<WebState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true, "provider": state.provider.name() }))
}

async fn defaults(State(state): State<WebState>) -> Json<DefaultsResponse> {
    Json(DefaultsResponse::from(&state.initial))
}

async fn fetch_report(state: &WebState, query: &DashboardQuery) -> ApiResult<DashboardReport> {
    let request = query.to_request(&state.initial)?;
    pipeline::run_dashboard(state.provider.as_ref(), &request, &state.settings)
        .await
        .map_err(dashboard_err)
}

async fn dashboard(
    State(state): State<WebState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<DashboardView>> {
    let report = fetch_report(&state, &query).await?;
    let view = DashboardView::from_report(&report).map_err(internal_err)?;
    Ok(Json(view))
}

fn dashboard_err(err: DashboardError) -> (StatusCode, Json<ApiError>) {
    let status = match &err {
        DashboardError::Input(_) => StatusCode::BAD_REQUEST,
        DashboardError::Provider { .. } => StatusCode::BAD_GATEWAY,
        DashboardError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!("Dashboard request failed: {}", err);
    api_err(status, &err.to_string())
}

fn api_err(status: StatusCode, message: &str) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            error: message.to_string(),
        }),
    )
}

fn internal_err<E: std::fmt::Display>(err: E) -> (StatusCode, Json<ApiError>) {
    api_err(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
}
