//! サービス状態リコンサイラ
//!
//! カタログの静的メタデータとランタイム/ホストの観測値を突き合わせ、
//! 導出状態（ServiceState）をクエリ毎に新規構築する。記述子は一切
//! 変更しない。

use crate::catalog::ServiceCatalog;
use crate::probe::{HostResourceProbe, MIB};
use crate::runtime::{ContainerRuntimeGateway, LocalImage, RunningContainer};
use prem_daemon_common::error::DaemonResult;
use prem_daemon_common::types::{ServiceDescriptor, ServiceState};
use std::collections::HashMap;
use std::sync::Arc;

/// ランタイムとホストの観測スナップショット
///
/// 1クエリにつき1回取得され、エンリッチ中は不変。
pub struct RuntimeObservation {
    /// コンテナ名 -> 稼働中コンテナ
    pub containers: HashMap<String, RunningContainer>,
    /// ローカルイメージ一覧
    pub images: Vec<LocalImage>,
    /// 空きメモリ（MiB）
    pub free_mib: u64,
    /// 総メモリ（MiB）
    pub total_mib: u64,
}

impl RuntimeObservation {
    /// 一覧からスナップショットを構築する（コンテナは名前で索引化）
    pub fn new(
        containers: Vec<RunningContainer>,
        images: Vec<LocalImage>,
        free_mib: u64,
        total_mib: u64,
    ) -> Self {
        let containers = containers
            .into_iter()
            .map(|container| (container.name.clone(), container))
            .collect();
        Self {
            containers,
            images,
            free_mib,
            total_mib,
        }
    }
}

/// 一括エンリッチ
///
/// `interface` 指定時は対応する記述子のみを対象にする。
/// ポート/ボリューム名は抽出しない（単一照会専用の情報）。
pub fn enrich_all(
    descriptors: &[ServiceDescriptor],
    interface: Option<&str>,
    observation: &RuntimeObservation,
) -> Vec<ServiceState> {
    descriptors
        .iter()
        .filter(|descriptor| match interface {
            Some(tag) => descriptor.supports_interface(tag),
            None => true,
        })
        .map(|descriptor| enrich(descriptor, observation, false))
        .collect()
}

/// 単一エンリッチ（稼働中ならポートと先頭マウントのボリューム名も取り込む）
pub fn enrich_one(
    descriptor: &ServiceDescriptor,
    observation: &RuntimeObservation,
) -> ServiceState {
    enrich(descriptor, observation, true)
}

fn enrich(
    descriptor: &ServiceDescriptor,
    observation: &RuntimeObservation,
    with_runtime_details: bool,
) -> ServiceState {
    let mut state = ServiceState::base(descriptor.clone());

    if let Some(required_bytes) = descriptor.model_info.memory_requirements {
        // プローブはMiB、要求量はバイト。単位換算はここで一度だけ行う。
        state.enough_memory = observation.free_mib.saturating_mul(MIB) >= required_bytes;
        state.enough_system_memory = observation.total_mib.saturating_mul(MIB) >= required_bytes;
    }

    if let Some(container) = observation.containers.get(&descriptor.id) {
        state.running = true;
        if with_runtime_details {
            state.running_port = container.host_port;
            // マウントが無いコンテナは None のまま（エラーにしない）
            state.volume_name = container.volume_name.clone();
        }
    }

    let repository = descriptor.image_repository();
    let local_tags: Vec<&str> = observation
        .images
        .iter()
        .filter_map(LocalImage::primary_tag)
        .filter(|tag| tag.split(':').next() == Some(repository))
        .collect();

    if !local_tags.is_empty() {
        state.downloaded = true;
        if local_tags.iter().any(|tag| *tag == descriptor.docker_image) {
            state.needs_update = Some(false);
            state.downloaded_docker_image = Some(descriptor.docker_image.clone());
        } else {
            state.needs_update = Some(true);
        }
    }

    state
}

/// カタログ・ゲートウェイ・プローブを束ねるリコンサイラ
#[derive(Clone)]
pub struct ServiceReconciler {
    catalog: Arc<ServiceCatalog>,
    gateway: Arc<dyn ContainerRuntimeGateway>,
    probe: Arc<dyn HostResourceProbe>,
}

impl ServiceReconciler {
    /// リコンサイラを作る
    pub fn new(
        catalog: Arc<ServiceCatalog>,
        gateway: Arc<dyn ContainerRuntimeGateway>,
        probe: Arc<dyn HostResourceProbe>,
    ) -> Self {
        Self {
            catalog,
            gateway,
            probe,
        }
    }

    /// 観測スナップショットを取得する
    ///
    /// ゲートウェイ呼び出しのいずれかが失敗した場合は呼び出し全体が
    /// 失敗する（部分的な結果は返さない）。
    pub async fn observe(&self) -> DaemonResult<RuntimeObservation> {
        let images = self.gateway.list_images().await?;
        let containers = self.gateway.list_containers().await?;
        let (free_mib, total_mib) = self.probe.free_total_memory()?;
        Ok(RuntimeObservation::new(
            containers, images, free_mib, total_mib,
        ))
    }

    /// 全サービス（またはインターフェースで絞った集合）のエンリッチ済み状態
    pub async fn services(&self, interface: Option<&str>) -> DaemonResult<Vec<ServiceState>> {
        let observation = self.observe().await?;
        Ok(enrich_all(self.catalog.all(), interface, &observation))
    }

    /// idで単一サービスのエンリッチ済み状態を取得する（未知のidは None）
    pub async fn service(&self, id: &str) -> DaemonResult<Option<ServiceState>> {
        let Some(descriptor) = self.catalog.get(id) else {
            return Ok(None);
        };
        let observation = self.observe().await?;
        Ok(Some(enrich_one(descriptor, &observation)))
    }
}
