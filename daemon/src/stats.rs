//! リソース統計レポート
//!
//! コンテナ単位・ホスト全体・GPUの統計をAPI向けの形に整形する。
//! 各フィールドの単位は名前に明示する（GiB / パーセント）。

use crate::probe::{HostResourceProbe, MIB};
use crate::runtime::ContainerRuntimeGateway;
use chrono::{DateTime, Utc};
use prem_daemon_common::error::DaemonResult;
use serde::Serialize;
use std::sync::Arc;

const GIB: f64 = (1024 * 1024 * 1024) as f64;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// コンテナ統計レポート
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerStatsReport {
    /// CPU使用率 (0.0-100.0)
    pub cpu_percentage: f64,
    /// メモリ使用量（GiB）
    pub memory_usage_gib: f64,
    /// メモリ上限（GiB）
    pub memory_limit_gib: f64,
    /// メモリ使用率 (0.0-100.0)
    pub memory_percentage: f64,
    /// イメージがディスク全体に占める割合 (0.0-100.0)
    pub storage_percentage: f64,
    /// イメージサイズ（GiB、切り捨て）
    pub storage_usage_gib: u64,
    /// ディスク総容量（GiB、切り捨て）
    pub storage_limit_gib: u64,
    /// 収集時刻
    pub timestamp: DateTime<Utc>,
}

/// ホスト全体の統計レポート
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemStatsReport {
    /// CPU使用率 (0.0-100.0)
    pub cpu_percentage: f64,
    /// メモリ使用量（GiB）
    pub memory_usage_gib: f64,
    /// メモリ総容量（GiB）
    pub memory_limit_gib: f64,
    /// メモリ使用率 (0.0-100.0)
    pub memory_percentage: f64,
    /// ディスク使用率 (0.0-100.0)
    pub storage_percentage: f64,
    /// ディスク使用量（GiB、切り捨て）
    pub storage_usage_gib: u64,
    /// ディスク総容量（GiB、切り捨て）
    pub storage_limit_gib: u64,
    /// 収集時刻
    pub timestamp: DateTime<Utc>,
}

/// GPU統計レポート
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpuStatsReport {
    /// GPUモデル名
    pub gpu_name: String,
    /// メモリ総容量（GiB）
    pub total_memory_gib: f64,
    /// 使用中メモリ（GiB）
    pub used_memory_gib: f64,
    /// メモリ使用率 (0.0-100.0)
    pub memory_percentage: f64,
    /// 収集時刻
    pub timestamp: DateTime<Utc>,
}

/// 統計レポートの組み立て役
#[derive(Clone)]
pub struct StatsReporter {
    gateway: Arc<dyn ContainerRuntimeGateway>,
    probe: Arc<dyn HostResourceProbe>,
}

impl StatsReporter {
    /// レポーターを作る
    pub fn new(
        gateway: Arc<dyn ContainerRuntimeGateway>,
        probe: Arc<dyn HostResourceProbe>,
    ) -> Self {
        Self { gateway, probe }
    }

    /// コンテナ統計を取得する（コンテナが無ければ None）
    pub async fn container_stats(
        &self,
        name: &str,
    ) -> DaemonResult<Option<ContainerStatsReport>> {
        if self.gateway.get_container(name).await?.is_none() {
            return Ok(None);
        }

        let sample = self.gateway.container_stats(name).await?;
        let (disk_total, _) = self.probe.disk_usage()?;

        let memory_percentage = if sample.memory_limit_bytes == 0 {
            0.0
        } else {
            sample.memory_usage_bytes as f64 / sample.memory_limit_bytes as f64 * 100.0
        };
        let storage_percentage = if disk_total == 0 {
            0.0
        } else {
            sample.image_size_bytes as f64 / disk_total as f64 * 100.0
        };

        Ok(Some(ContainerStatsReport {
            cpu_percentage: round2(sample.cpu_percentage),
            memory_usage_gib: round2(sample.memory_usage_bytes as f64 / GIB),
            memory_limit_gib: round2(sample.memory_limit_bytes as f64 / GIB),
            memory_percentage: round2(memory_percentage),
            storage_percentage: round2(storage_percentage),
            storage_usage_gib: sample.image_size_bytes / (GIB as u64),
            storage_limit_gib: disk_total / (GIB as u64),
            timestamp: Utc::now(),
        }))
    }

    /// ホスト全体の統計を取得する
    pub fn system_stats(&self) -> DaemonResult<SystemStatsReport> {
        let snapshot = self.probe.system_snapshot()?;
        let (disk_total, disk_used) = self.probe.disk_usage()?;

        let memory_percentage = if snapshot.memory_total_bytes == 0 {
            0.0
        } else {
            snapshot.memory_used_bytes as f64 / snapshot.memory_total_bytes as f64 * 100.0
        };
        let storage_percentage = if disk_total == 0 {
            0.0
        } else {
            disk_used as f64 / disk_total as f64 * 100.0
        };

        Ok(SystemStatsReport {
            cpu_percentage: round2(snapshot.cpu_percentage),
            memory_usage_gib: round2(snapshot.memory_used_bytes as f64 / GIB),
            memory_limit_gib: round2(snapshot.memory_total_bytes as f64 / GIB),
            memory_percentage: round2(memory_percentage),
            storage_percentage: round2(storage_percentage),
            storage_usage_gib: disk_used / (GIB as u64),
            storage_limit_gib: disk_total / (GIB as u64),
            timestamp: Utc::now(),
        })
    }

    /// GPU統計を取得する（GPU非搭載ホストは None）
    pub fn gpu_stats(&self) -> DaemonResult<Option<GpuStatsReport>> {
        let Some(snapshot) = self.probe.gpu_snapshot()? else {
            return Ok(None);
        };

        Ok(Some(GpuStatsReport {
            memory_percentage: round2(snapshot.memory_percentage()),
            total_memory_gib: round2(snapshot.total_mib as f64 * MIB as f64 / GIB),
            used_memory_gib: round2(snapshot.used_mib as f64 * MIB as f64 / GIB),
            gpu_name: snapshot.name,
            timestamp: Utc::now(),
        }))
    }
}
