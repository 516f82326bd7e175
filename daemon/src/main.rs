//! Prem Daemon Entry Point

use clap::Parser;
use prem_daemon_common::config::DaemonConfig;
use premd::{
    api::{self, AppState},
    catalog::ServiceCatalog,
    fleet::FleetOperations,
    launcher::LaunchCoordinator,
    logging,
    probe::{HostProbe, HostResourceProbe},
    reconciler::ServiceReconciler,
    runtime::{docker::DockerGateway, ContainerRuntimeGateway},
    stats::StatsReporter,
};
use std::sync::Arc;
use tracing::{error, info};

/// コマンドライン引数（環境変数でも指定可能）
#[derive(Debug, Parser)]
#[command(name = "premd", version, about = "Local control plane for Prem AI services")]
struct Args {
    /// バインドするホストアドレス
    #[arg(long, env = "PREMD_HOST")]
    host: Option<String>,

    /// バインドするポート番号
    #[arg(long, env = "PREMD_PORT")]
    port: Option<u16>,

    /// サービスカタログのマニフェストURL
    #[arg(long, env = "PREMD_REGISTRY_URL")]
    registry_url: Option<String>,

    /// ローカルカタログファイル（指定時はURLより優先）
    #[arg(long, env = "PREMD_SERVICES_FILE")]
    services_file: Option<String>,
}

impl Args {
    fn into_config(self) -> DaemonConfig {
        let mut config = DaemonConfig::default();
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(registry_url) = self.registry_url {
            config.registry_url = registry_url;
        }
        if self.services_file.is_some() {
            config.services_file = self.services_file;
        }
        config
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = logging::init() {
        eprintln!("Failed to initialize logging: {err}");
    }

    let config = Args::parse().into_config();
    info!("premd v{} starting", env!("CARGO_PKG_VERSION"));

    let catalog = match ServiceCatalog::load(&config).await {
        Ok(catalog) => Arc::new(catalog),
        Err(err) => {
            error!("Failed to load service catalog: {err}");
            std::process::exit(1);
        }
    };
    info!("Catalog loaded with {} services", catalog.len());

    let gateway: Arc<dyn ContainerRuntimeGateway> = match DockerGateway::connect() {
        Ok(gateway) => Arc::new(gateway),
        Err(err) => {
            error!("Failed to connect to container engine: {err}");
            std::process::exit(1);
        }
    };

    let probe: Arc<dyn HostResourceProbe> = Arc::new(HostProbe::new());
    info!(gpu = probe.gpu_available(), "Host probe initialized");

    let reconciler = ServiceReconciler::new(catalog, gateway.clone(), probe.clone());
    let launcher = LaunchCoordinator::new(gateway.clone(), probe.clone());
    let fleet = FleetOperations::new(reconciler.clone(), gateway.clone());
    let stats = StatsReporter::new(gateway, probe);

    let app = api::create_router(AppState {
        reconciler,
        launcher,
        fleet,
        stats,
    });

    let addr = config.bind_addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Failed to bind {addr}: {err}");
            std::process::exit(1);
        }
    };
    info!("Listening on {addr}");

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {err}");
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
