//! 統計・プルーンAPIハンドラー

use super::{ApiError, AppState};
use crate::stats::{ContainerStatsReport, SystemStatsReport};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::info;

/// プルーンレスポンス
#[derive(Debug, Serialize)]
pub struct PruneResponse {
    /// 結果メッセージ
    pub message: String,
}

/// GET /v1/stats - ホスト全体の統計
pub async fn system_stats(
    State(state): State<AppState>,
) -> Result<Json<SystemStatsReport>, ApiError> {
    let report = state.stats.system_stats()?;
    Ok(Json(report))
}

/// GET /v1/gpu-stats - GPU統計（非搭載ホストは空オブジェクト）
pub async fn gpu_stats(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let value = match state.stats.gpu_stats()? {
        Some(report) => serde_json::to_value(report)
            .map_err(|err| prem_daemon_common::error::DaemonError::Internal(err.to_string()))?,
        None => serde_json::json!({}),
    };
    Ok(Json(value))
}

/// GET /v1/stats/{id} - コンテナ統計
pub async fn container_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ContainerStatsReport>, ApiError> {
    match state.stats.container_stats(&id).await? {
        Some(report) => Ok(Json(report)),
        None => Err(ApiError::not_found(format!("No container named {id}"))),
    }
}

/// POST /v1/system-prune - 未使用リソースの解放
pub async fn system_prune(State(state): State<AppState>) -> Result<Json<PruneResponse>, ApiError> {
    info!("Running system prune");
    state.fleet.prune().await?;
    Ok(Json(PruneResponse {
        message: "System pruned".to_string(),
    }))
}
