//! サービスカタログ
//!
//! 起動時に一度だけロードされる読み取り専用のサービス記述子一覧。
//! ローカルJSONファイルまたはレジストリのマニフェストURLから取得する。

use prem_daemon_common::config::DaemonConfig;
use prem_daemon_common::error::{DaemonError, DaemonResult};
use prem_daemon_common::types::ServiceDescriptor;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// 読み取り専用のサービスカタログ
#[derive(Debug)]
pub struct ServiceCatalog {
    services: Vec<ServiceDescriptor>,
}

impl ServiceCatalog {
    /// 記述子一覧からカタログを作る（idの一意性を検証）
    pub fn new(services: Vec<ServiceDescriptor>) -> DaemonResult<Self> {
        let mut seen = HashSet::new();
        for service in &services {
            if !seen.insert(service.id.as_str()) {
                return Err(DaemonError::Catalog(format!(
                    "Duplicate service id: {}",
                    service.id
                )));
            }
        }
        Ok(Self { services })
    }

    /// JSON文字列からカタログを作る
    pub fn from_json(json: &str) -> DaemonResult<Self> {
        let services: Vec<ServiceDescriptor> = serde_json::from_str(json)
            .map_err(|err| DaemonError::Catalog(format!("Invalid catalog JSON: {err}")))?;
        Self::new(services)
    }

    /// ローカルファイルからカタログを読み込む
    pub fn from_file(path: impl AsRef<Path>) -> DaemonResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|err| {
            DaemonError::Catalog(format!("Failed to read {}: {err}", path.display()))
        })?;
        let catalog = Self::from_json(&content)?;
        info!(
            "Loaded {} services from {}",
            catalog.services.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// レジストリのマニフェストURLからカタログを取得する
    pub async fn fetch(url: &str) -> DaemonResult<Self> {
        let response = reqwest::get(url)
            .await
            .map_err(|err| DaemonError::Catalog(format!("Failed to fetch {url}: {err}")))?
            .error_for_status()
            .map_err(|err| DaemonError::Catalog(format!("Registry rejected request: {err}")))?;

        let services: Vec<ServiceDescriptor> = response
            .json()
            .await
            .map_err(|err| DaemonError::Catalog(format!("Invalid registry manifest: {err}")))?;

        let catalog = Self::new(services)?;
        info!("Loaded {} services from {}", catalog.services.len(), url);
        Ok(catalog)
    }

    /// 設定に従ってカタログをロードする（ファイル指定がURLより優先）
    pub async fn load(config: &DaemonConfig) -> DaemonResult<Self> {
        match &config.services_file {
            Some(path) => Self::from_file(path),
            None => Self::fetch(&config.registry_url).await,
        }
    }

    /// 全記述子を返す
    pub fn all(&self) -> &[ServiceDescriptor] {
        &self.services
    }

    /// idで記述子を照会する
    pub fn get(&self, id: &str) -> Option<&ServiceDescriptor> {
        self.services.iter().find(|service| service.id == id)
    }

    /// カタログ中の全idを返す
    pub fn ids(&self) -> HashSet<&str> {
        self.services
            .iter()
            .map(|service| service.id.as_str())
            .collect()
    }

    /// 登録サービス数
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// 空かどうか
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
