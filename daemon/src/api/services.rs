//! サービス照会・起動APIハンドラー

use super::{ApiError, AppState};
use crate::launcher::LaunchReport;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use prem_daemon_common::types::ServiceState;
use serde::{Deserialize, Serialize};
use tracing::info;

/// サービス一覧クエリ
#[derive(Debug, Deserialize)]
pub struct ListServicesQuery {
    /// インターフェースタグによる絞り込み
    pub interface: Option<String>,
}

/// サービス起動リクエスト
#[derive(Debug, Deserialize)]
pub struct RunServiceRequest {
    /// 起動するサービスID
    pub id: String,
}

/// 全停止レスポンス
#[derive(Debug, Serialize)]
pub struct StopAllResponse {
    /// 削除したコンテナ名
    pub stopped: Vec<String>,
}

/// GET /v1/services - エンリッチ済みサービス一覧
pub async fn list_services(
    State(state): State<AppState>,
    Query(query): Query<ListServicesQuery>,
) -> Result<Json<Vec<ServiceState>>, ApiError> {
    let services = state.reconciler.services(query.interface.as_deref()).await?;
    Ok(Json(services))
}

/// GET /v1/services/{id} - 単一サービスのエンリッチ済み状態
pub async fn get_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ServiceState>, ApiError> {
    match state.reconciler.service(&id).await? {
        Some(service) => Ok(Json(service)),
        None => Err(ApiError::not_found(format!("Unknown service: {id}"))),
    }
}

/// POST /v1/run-service - サービスのコンテナを起動
pub async fn run_service(
    State(state): State<AppState>,
    Json(request): Json<RunServiceRequest>,
) -> Result<Json<LaunchReport>, ApiError> {
    let Some(service) = state.reconciler.service(&request.id).await? else {
        return Err(ApiError::not_found(format!(
            "Unknown service: {}",
            request.id
        )));
    };

    info!("Launching service {}", request.id);
    let report = state.launcher.launch(&service).await?;
    Ok(Json(report))
}

/// POST /v1/stop-all-services - カタログ既知のコンテナを全停止
pub async fn stop_all(State(state): State<AppState>) -> Result<Json<StopAllResponse>, ApiError> {
    let stopped = state.fleet.stop_all().await?;
    Ok(Json(StopAllResponse { stopped }))
}
