//! フリート操作
//!
//! リコンサイラとゲートウェイの上に構築された一括操作。

use crate::reconciler::ServiceReconciler;
use crate::runtime::ContainerRuntimeGateway;
use prem_daemon_common::error::DaemonResult;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// 全停止・プルーンの実行役
#[derive(Clone)]
pub struct FleetOperations {
    reconciler: ServiceReconciler,
    gateway: Arc<dyn ContainerRuntimeGateway>,
}

impl FleetOperations {
    /// フリート操作を作る
    pub fn new(reconciler: ServiceReconciler, gateway: Arc<dyn ContainerRuntimeGateway>) -> Self {
        Self {
            reconciler,
            gateway,
        }
    }

    /// カタログ既知のidと同名の稼働中コンテナをすべて強制削除する
    ///
    /// カタログに無い名前のコンテナには触れない。削除した名前を返す。
    pub async fn stop_all(&self) -> DaemonResult<Vec<String>> {
        let services = self.reconciler.services(None).await?;
        let known: HashSet<&str> = services.iter().map(|service| service.id()).collect();

        let containers = self.gateway.list_containers().await?;
        let mut stopped = Vec::new();
        for container in containers {
            if known.contains(container.name.as_str()) {
                info!("Stopping container {}", container.name);
                self.gateway.remove_container(&container.name, true).await?;
                stopped.push(container.name);
            }
        }
        Ok(stopped)
    }

    /// 未使用リソースを解放する
    ///
    /// コンテナ→ボリューム→イメージ→ネットワークの順で実行する。
    /// コンテナを先に消さないとボリューム/イメージが回収できない。
    pub async fn prune(&self) -> DaemonResult<()> {
        self.gateway.prune_containers().await?;
        self.gateway.prune_volumes().await?;
        self.gateway.prune_images().await?;
        self.gateway.prune_networks().await?;
        Ok(())
    }
}
