//! コンテナ起動コーディネータ
//!
//! ポート再試行・ボリューム準備・デバイス要求構築を含む起動プロトコル。
//! ベストエフォート工程の失敗は `DegradedStep` として報告に残し、
//! 起動自体は続行する。

use crate::probe::HostResourceProbe;
use crate::runtime::{ContainerRuntimeGateway, DeviceRequestSpec, RunSpec, VolumeBinding};
use prem_daemon_common::error::{DaemonError, DaemonResult};
use prem_daemon_common::types::ServiceState;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// コンテナ起動の最大試行回数
pub const LAUNCH_ATTEMPTS: usize = 10;

/// ベストエフォート工程の劣化記録
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "step", content = "detail")]
pub enum DegradedStep {
    /// 残存コンテナの削除に失敗（起動は続行）
    StaleRemoval(String),
    /// ボリューム作成に失敗（ボリューム無しで続行）
    VolumeCreation(String),
}

/// 起動結果レポート
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchReport {
    /// 割り当てられたホストポート
    pub port: u16,
    /// 劣化したベストエフォート工程
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<DegradedStep>,
}

/// 起動プロトコルの実行役
#[derive(Clone)]
pub struct LaunchCoordinator {
    gateway: Arc<dyn ContainerRuntimeGateway>,
    probe: Arc<dyn HostResourceProbe>,
}

impl LaunchCoordinator {
    /// コーディネータを作る
    pub fn new(
        gateway: Arc<dyn ContainerRuntimeGateway>,
        probe: Arc<dyn HostResourceProbe>,
    ) -> Self {
        Self { gateway, probe }
    }

    /// サービスのコンテナを起動し、割り当てたホストポートを返す
    ///
    /// 起動イメージはローカルで解決済みの `downloadedDockerImage` のみを
    /// 使う。カタログ上の未固定な参照では起動しない。
    pub async fn launch(&self, service: &ServiceState) -> DaemonResult<LaunchReport> {
        let id = service.id();
        let image = service
            .downloaded_docker_image
            .clone()
            .ok_or_else(|| DaemonError::ImageNotDownloaded(id.to_string()))?;

        let mut degraded = Vec::new();

        // 同名の残存コンテナを強制削除する。失敗しても新規起動を妨げない。
        match self.gateway.get_container(id).await {
            Ok(Some(_)) => {
                if let Err(err) = self.gateway.remove_container(id, true).await {
                    info!("Failed to remove container {err}.");
                    degraded.push(DegradedStep::StaleRemoval(err.to_string()));
                }
            }
            Ok(None) => {}
            Err(err) => {
                info!("Failed to inspect stale container {err}.");
                degraded.push(DegradedStep::StaleRemoval(err.to_string()));
            }
        }

        let device_requests = if self.probe.gpu_available() {
            vec![DeviceRequestSpec::all_gpus()]
        } else {
            Vec::new()
        };

        let mut volumes = Vec::new();
        if let Some(path) = &service.descriptor.volume_path {
            let volume_name = service.descriptor.volume_name();
            match self.gateway.create_volume(&volume_name).await {
                Ok(name) => volumes.push(VolumeBinding {
                    volume: name,
                    container_path: path.clone(),
                    read_only: false,
                }),
                Err(err) => {
                    error!("Failed to create volume {err}");
                    degraded.push(DegradedStep::VolumeCreation(err.to_string()));
                }
            }
        }

        let mut host_port = service.descriptor.default_port + 1;
        for attempt in 1..=LAUNCH_ATTEMPTS {
            let spec = RunSpec {
                image: image.clone(),
                name: id.to_string(),
                container_port: service.descriptor.default_port,
                host_port,
                auto_remove: true,
                volumes: volumes.clone(),
                device_requests: device_requests.clone(),
            };

            match self.gateway.run_container(&spec).await {
                Ok(_) => {
                    info!(service = %id, port = host_port, "Service started");
                    return Ok(LaunchReport {
                        port: host_port,
                        degraded,
                    });
                }
                Err(err) => {
                    error!(service = %id, attempt, port = host_port, "Failed to start {err}");
                    host_port += 1;
                }
            }
        }

        Err(DaemonError::LaunchExhausted {
            service: id.to_string(),
            attempts: LAUNCH_ATTEMPTS,
        })
    }
}
