//! テストハーネス
//!
//! インメモリゲートウェイと固定プローブでAPIルーターを組み立てる。

use async_trait::async_trait;
use axum::Router;
use prem_daemon_common::error::{DaemonError, DaemonResult};
use premd::api::{create_router, AppState};
use premd::catalog::ServiceCatalog;
use premd::fleet::FleetOperations;
use premd::launcher::LaunchCoordinator;
use premd::probe::{GpuSnapshot, HostResourceProbe, SystemSnapshot, MIB};
use premd::reconciler::ServiceReconciler;
use premd::runtime::{
    ContainerRuntimeGateway, ContainerStatsSample, LocalImage, RunSpec, RunningContainer,
};
use premd::stats::StatsReporter;
use std::sync::{Arc, Mutex};

/// 標準のテストカタログ（whisper: ボリューム付き / vicuna-7b: メモリ要求付き）
pub const CATALOG_JSON: &str = r#"[
    {
        "id": "whisper",
        "name": "Whisper",
        "interfaces": ["audio-to-text"],
        "dockerImage": "ghcr.io/premai-io/whisper:1.0.1",
        "defaultPort": 8000,
        "volumePath": "/usr/src/models"
    },
    {
        "id": "vicuna-7b",
        "name": "Vicuna 7B",
        "interfaces": ["chat"],
        "dockerImage": "ghcr.io/premai-io/vicuna-7b:1.0.2",
        "defaultPort": 8100,
        "modelInfo": {"memoryRequirements": 17179869184}
    }
]"#;

/// 状態を持つインメモリゲートウェイ
///
/// `run_container` は成功時にコンテナ一覧へ追加し、`remove_container` は
/// 一覧から取り除く。起動失敗の注入は先頭N回に適用される。
#[derive(Default)]
pub struct InMemoryGateway {
    /// ローカルイメージ
    pub images: Vec<LocalImage>,
    /// コンテナ一覧（名前・ポート・ボリューム）
    pub containers: Mutex<Vec<RunningContainer>>,
    /// 先頭N回の起動を失敗させる
    pub fail_first_runs: usize,
    /// ボリューム作成を失敗させる
    pub fail_volume: bool,
    /// 試行されたホストポート
    pub attempted_ports: Mutex<Vec<u16>>,
    /// 削除されたコンテナ名
    pub removed: Mutex<Vec<String>>,
    /// 作成されたボリューム名
    pub created_volumes: Mutex<Vec<String>>,
    /// プルーン呼び出し順
    pub pruned: Mutex<Vec<&'static str>>,
}

impl InMemoryGateway {
    /// イメージ一覧つきでゲートウェイを作る
    pub fn with_images(tags: &[&str]) -> Self {
        Self {
            images: tags
                .iter()
                .map(|tag| LocalImage {
                    tags: vec![tag.to_string()],
                })
                .collect(),
            ..Default::default()
        }
    }

    /// 稼働中コンテナを追加する
    pub fn add_container(&self, name: &str, port: Option<u16>) {
        self.containers.lock().unwrap().push(RunningContainer {
            name: name.to_string(),
            host_port: port,
            volume_name: None,
        });
    }
}

#[async_trait]
impl ContainerRuntimeGateway for InMemoryGateway {
    async fn list_images(&self) -> DaemonResult<Vec<LocalImage>> {
        Ok(self.images.clone())
    }

    async fn list_containers(&self) -> DaemonResult<Vec<RunningContainer>> {
        Ok(self.containers.lock().unwrap().clone())
    }

    async fn get_container(&self, name: &str) -> DaemonResult<Option<RunningContainer>> {
        Ok(self
            .containers
            .lock()
            .unwrap()
            .iter()
            .find(|container| container.name == name)
            .cloned())
    }

    async fn remove_container(&self, name: &str, _force: bool) -> DaemonResult<()> {
        self.containers
            .lock()
            .unwrap()
            .retain(|container| container.name != name);
        self.removed.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn run_container(&self, spec: &RunSpec) -> DaemonResult<RunningContainer> {
        let attempt = {
            let mut ports = self.attempted_ports.lock().unwrap();
            ports.push(spec.host_port);
            ports.len()
        };
        if attempt <= self.fail_first_runs {
            return Err(DaemonError::RuntimeUnavailable(format!(
                "port {} already allocated",
                spec.host_port
            )));
        }

        let container = RunningContainer {
            name: spec.name.clone(),
            host_port: Some(spec.host_port),
            volume_name: spec.volumes.first().map(|binding| binding.volume.clone()),
        };
        self.containers.lock().unwrap().push(container.clone());
        Ok(container)
    }

    async fn create_volume(&self, name: &str) -> DaemonResult<String> {
        if self.fail_volume {
            return Err(DaemonError::RuntimeUnavailable(format!(
                "cannot create volume {name}"
            )));
        }
        self.created_volumes.lock().unwrap().push(name.to_string());
        Ok(name.to_string())
    }

    async fn container_stats(&self, _name: &str) -> DaemonResult<ContainerStatsSample> {
        Ok(ContainerStatsSample {
            cpu_percentage: 7.25,
            memory_usage_bytes: 1024 * 1024 * 1024,
            memory_limit_bytes: 4 * 1024 * 1024 * 1024,
            image_size_bytes: 5 * 1024 * 1024 * 1024,
        })
    }

    async fn prune_containers(&self) -> DaemonResult<()> {
        self.pruned.lock().unwrap().push("containers");
        Ok(())
    }

    async fn prune_volumes(&self) -> DaemonResult<()> {
        self.pruned.lock().unwrap().push("volumes");
        Ok(())
    }

    async fn prune_images(&self) -> DaemonResult<()> {
        self.pruned.lock().unwrap().push("images");
        Ok(())
    }

    async fn prune_networks(&self) -> DaemonResult<()> {
        self.pruned.lock().unwrap().push("networks");
        Ok(())
    }
}

/// 固定観測値のプローブ
pub struct TestProbe {
    /// 空きメモリ（MiB）
    pub free_mib: u64,
    /// 総メモリ（MiB）
    pub total_mib: u64,
    /// GPU搭載扱いにするか
    pub gpu: bool,
}

impl Default for TestProbe {
    fn default() -> Self {
        Self {
            free_mib: 8192,
            total_mib: 16384,
            gpu: false,
        }
    }
}

impl HostResourceProbe for TestProbe {
    fn gpu_available(&self) -> bool {
        self.gpu
    }

    fn free_total_memory(&self) -> DaemonResult<(u64, u64)> {
        Ok((self.free_mib, self.total_mib))
    }

    fn disk_usage(&self) -> DaemonResult<(u64, u64)> {
        Ok((500 * 1024 * MIB, 200 * 1024 * MIB))
    }

    fn gpu_snapshot(&self) -> DaemonResult<Option<GpuSnapshot>> {
        if self.gpu {
            Ok(Some(GpuSnapshot {
                name: "Test GPU".to_string(),
                total_mib: self.total_mib,
                used_mib: self.total_mib - self.free_mib,
            }))
        } else {
            Ok(None)
        }
    }

    fn system_snapshot(&self) -> DaemonResult<SystemSnapshot> {
        Ok(SystemSnapshot {
            cpu_percentage: 10.0,
            memory_used_bytes: (self.total_mib - self.free_mib) * MIB,
            memory_total_bytes: self.total_mib * MIB,
        })
    }
}

/// ゲートウェイとプローブからAPIルーターを組み立てる
pub fn build_router(gateway: Arc<InMemoryGateway>, probe: Arc<TestProbe>) -> Router {
    let catalog = Arc::new(ServiceCatalog::from_json(CATALOG_JSON).expect("valid test catalog"));
    let gateway: Arc<dyn ContainerRuntimeGateway> = gateway;
    let probe: Arc<dyn HostResourceProbe> = probe;

    let reconciler = ServiceReconciler::new(catalog, gateway.clone(), probe.clone());
    let launcher = LaunchCoordinator::new(gateway.clone(), probe.clone());
    let fleet = FleetOperations::new(reconciler.clone(), gateway.clone());
    let stats = StatsReporter::new(gateway, probe);

    create_router(AppState {
        reconciler,
        launcher,
        fleet,
        stats,
    })
}
