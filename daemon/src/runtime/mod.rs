//! コンテナランタイムゲートウェイ
//!
//! コンテナエンジンに対する狭いケーパビリティインターフェース。
//! 実装はDocker（bollard）だが、上位コンポーネントはこのトレイトのみに依存する。

pub mod docker;

use async_trait::async_trait;
use prem_daemon_common::error::DaemonResult;

/// ローカルに存在するイメージ（先頭タグをプライマリタグとして扱う）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalImage {
    /// `repo:tag` 形式のタグ一覧
    pub tags: Vec<String>,
}

impl LocalImage {
    /// プライマリタグ（先頭タグ）を返す
    pub fn primary_tag(&self) -> Option<&str> {
        self.tags.first().map(String::as_str)
    }
}

/// 稼働中コンテナの要約
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningContainer {
    /// コンテナ名（先頭の `/` は除去済み）
    pub name: String,
    /// 最初に公開されているホストポート
    pub host_port: Option<u16>,
    /// 先頭マウントのボリューム名
    pub volume_name: Option<String>,
}

/// GPUデバイス要求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRequestSpec {
    /// 対象デバイスID（"all" で全デバイス）
    pub device_ids: Vec<String>,
    /// 要求ケーパビリティ
    pub capabilities: Vec<Vec<String>>,
}

impl DeviceRequestSpec {
    /// 全GPUデバイスをGPUケーパビリティ付きで要求する
    pub fn all_gpus() -> Self {
        Self {
            device_ids: vec!["all".to_string()],
            capabilities: vec![vec!["gpu".to_string()]],
        }
    }
}

/// 名前付きボリュームのバインディング
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeBinding {
    /// ボリューム名
    pub volume: String,
    /// コンテナ内マウントパス
    pub container_path: String,
    /// 読み取り専用か
    pub read_only: bool,
}

/// コンテナ起動仕様
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    /// 起動するイメージ参照（ローカルで解決済みのタグ）
    pub image: String,
    /// コンテナ名
    pub name: String,
    /// コンテナ内ポート
    pub container_port: u16,
    /// 公開するホストポート
    pub host_port: u16,
    /// 終了時に自動削除するか
    pub auto_remove: bool,
    /// ボリュームバインディング
    pub volumes: Vec<VolumeBinding>,
    /// デバイス要求
    pub device_requests: Vec<DeviceRequestSpec>,
}

/// コンテナ統計のサンプル
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerStatsSample {
    /// CPU使用率 (0.0-100.0)
    pub cpu_percentage: f64,
    /// メモリ使用量（バイト）
    pub memory_usage_bytes: u64,
    /// メモリ上限（バイト）
    pub memory_limit_bytes: u64,
    /// イメージサイズ（バイト）
    pub image_size_bytes: u64,
}

/// コンテナエンジンへの読み書き操作
#[async_trait]
pub trait ContainerRuntimeGateway: Send + Sync {
    /// ローカルイメージ一覧を取得する
    async fn list_images(&self) -> DaemonResult<Vec<LocalImage>>;

    /// 稼働中コンテナ一覧を取得する
    async fn list_containers(&self) -> DaemonResult<Vec<RunningContainer>>;

    /// 名前でコンテナを照会する（存在しなければ None）
    async fn get_container(&self, name: &str) -> DaemonResult<Option<RunningContainer>>;

    /// コンテナを削除する
    async fn remove_container(&self, name: &str, force: bool) -> DaemonResult<()>;

    /// 仕様に従ってコンテナを起動する
    async fn run_container(&self, spec: &RunSpec) -> DaemonResult<RunningContainer>;

    /// 名前付きボリュームを作成（既存なら再利用）し、ボリューム名を返す
    async fn create_volume(&self, name: &str) -> DaemonResult<String>;

    /// コンテナの統計サンプルを取得する
    async fn container_stats(&self, name: &str) -> DaemonResult<ContainerStatsSample>;

    /// 未使用コンテナを削除する
    async fn prune_containers(&self) -> DaemonResult<()>;

    /// 未使用ボリュームを削除する
    async fn prune_volumes(&self) -> DaemonResult<()>;

    /// 未使用イメージを削除する
    async fn prune_images(&self) -> DaemonResult<()>;

    /// 未使用ネットワークを削除する
    async fn prune_networks(&self) -> DaemonResult<()>;
}
