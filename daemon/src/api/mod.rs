//! デーモンHTTP APIモジュール
//!
//! コア操作を薄く公開するエンドポイント群

pub mod services;
pub mod stats;

use crate::fleet::FleetOperations;
use crate::launcher::LaunchCoordinator;
use crate::reconciler::ServiceReconciler;
use crate::stats::StatsReporter;
use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use prem_daemon_common::error::DaemonError;
use tracing::error;

/// アプリケーション状態
#[derive(Clone)]
pub struct AppState {
    /// サービス状態リコンサイラ
    pub reconciler: ServiceReconciler,
    /// 起動コーディネータ
    pub launcher: LaunchCoordinator,
    /// フリート操作
    pub fleet: FleetOperations,
    /// 統計レポーター
    pub stats: StatsReporter,
}

/// APIルーターを作成
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/services", get(services::list_services))
        .route("/v1/services/:id", get(services::get_service))
        .route("/v1/run-service", post(services::run_service))
        .route("/v1/stop-all-services", post(services::stop_all))
        .route("/v1/stats", get(stats::system_stats))
        .route("/v1/gpu-stats", get(stats::gpu_stats))
        .route("/v1/stats/:id", get(stats::container_stats))
        .route("/v1/system-prune", post(stats::system_prune))
        .with_state(state)
}

/// GET /health - 稼働確認
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Axum用のエラーレスポンス型
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// 404レスポンスを作る
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<DaemonError> for ApiError {
    fn from(err: DaemonError) -> Self {
        let status = match &err {
            DaemonError::RuntimeUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            DaemonError::ImageNotDownloaded(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        error!("API error: {}", self.message);
        (
            self.status,
            Json(serde_json::json!({
                "error": self.message
            })),
        )
            .into_response()
    }
}
