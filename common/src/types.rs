//! 共通型定義
//!
//! ServiceDescriptor, ServiceState等のコアデータ型

use serde::{Deserialize, Serialize};

/// モデル情報（カタログ記載のメタデータ）
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// 必要メモリ量（バイト）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_requirements: Option<u64>,
    /// 重みファイルサイズ（バイト）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights_size: Option<u64>,
}

/// サービス記述子（カタログエントリ、読み取り専用）
///
/// `id` はコンテナ名としてそのまま使用される。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    /// 一意識別子（コンテナ名を兼ねる）
    pub id: String,
    /// 表示名
    pub name: String,
    /// 説明文
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// 対応インターフェースのタグ集合
    #[serde(default)]
    pub interfaces: Vec<String>,
    /// Dockerイメージ参照 `repo[:tag]`
    pub docker_image: String,
    /// 優先ポート番号
    pub default_port: u16,
    /// モデル情報
    #[serde(default)]
    pub model_info: ModelInfo,
    /// コンテナ内マウントパス（管理ボリュームが必要な場合のみ）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_path: Option<String>,
}

impl ServiceDescriptor {
    /// イメージ参照のリポジトリ部分（最初の `:` より前）を返す
    pub fn image_repository(&self) -> &str {
        self.docker_image
            .split(':')
            .next()
            .unwrap_or(&self.docker_image)
    }

    /// 管理ボリューム名（`prem-<id>-data`）を返す
    pub fn volume_name(&self) -> String {
        format!("prem-{}-data", self.id)
    }

    /// 指定インターフェースに対応しているか
    pub fn supports_interface(&self, interface: &str) -> bool {
        self.interfaces.iter().any(|tag| tag == interface)
    }
}

/// 導出されたサービス状態（クエリ毎に再構築、永続化しない）
///
/// 記述子をflattenして埋め込むため、ワイヤ形式はカタログエントリに
/// 導出フィールドを足した形になる。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceState {
    /// 元の記述子
    #[serde(flatten)]
    pub descriptor: ServiceDescriptor,
    /// `id` と同名のコンテナが稼働中か
    pub running: bool,
    /// 公開ホストポート（単一サービス照会時のみ設定）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running_port: Option<u16>,
    /// 先頭マウントのボリューム名（マウント無しは None のまま）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_name: Option<String>,
    /// ローカルに同リポジトリのイメージが存在するか
    pub downloaded: bool,
    /// タグ一致の有無（downloaded=true のときのみ意味を持つ）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_update: Option<bool>,
    /// ローカルで解決済みの正確なイメージ参照
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloaded_docker_image: Option<String>,
    /// 空きメモリが要求量を満たすか（要求未宣言なら true）
    pub enough_memory: bool,
    /// 総メモリが要求量を満たすか（要求未宣言なら true）
    pub enough_system_memory: bool,
}

impl ServiceState {
    /// 初期状態（未稼働・未ダウンロード・メモリ十分）を作る
    pub fn base(descriptor: ServiceDescriptor) -> Self {
        Self {
            descriptor,
            running: false,
            running_port: None,
            volume_name: None,
            downloaded: false,
            needs_update: None,
            downloaded_docker_image: None,
            enough_memory: true,
            enough_system_memory: true,
        }
    }

    /// サービスID
    pub fn id(&self) -> &str {
        &self.descriptor.id
    }
}
