//! 設定管理
//!
//! DaemonConfig等の設定構造体

use serde::{Deserialize, Serialize};

/// デーモン設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// ホストアドレス (デフォルト: "127.0.0.1")
    #[serde(default = "default_host")]
    pub host: String,

    /// ポート番号 (デフォルト: 8400)
    #[serde(default = "default_port")]
    pub port: u16,

    /// サービスカタログのマニフェストURL
    #[serde(default = "default_registry_url")]
    pub registry_url: String,

    /// ローカルカタログファイル（設定時はregistry_urlより優先）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services_file: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8400
}

fn default_registry_url() -> String {
    "https://prem-registry.fly.dev/manifests/".to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            registry_url: default_registry_url(),
            services_file: None,
        }
    }
}

impl DaemonConfig {
    /// バインド先アドレス文字列を返す
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
