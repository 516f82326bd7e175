//! Dockerゲートウェイ実装（bollard使用）
//!
//! エンジン由来のエラーはすべて `DaemonError::RuntimeUnavailable` に写像する。

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, ListContainersOptions,
    PruneContainersOptions, RemoveContainerOptions, StartContainerOptions, StatsOptions,
};
use bollard::image::{ListImagesOptions, PruneImagesOptions};
use bollard::models::{ContainerSummary, DeviceRequest, HostConfig, PortBinding};
use bollard::network::PruneNetworksOptions;
use bollard::volume::{CreateVolumeOptions, PruneVolumesOptions};
use bollard::Docker;
use futures::TryStreamExt;
use prem_daemon_common::error::{DaemonError, DaemonResult};
use std::collections::HashMap;
use tracing::debug;

use super::{ContainerRuntimeGateway, ContainerStatsSample, LocalImage, RunSpec, RunningContainer};

/// Docker Engineへのゲートウェイ
pub struct DockerGateway {
    docker: Docker,
}

impl DockerGateway {
    /// ローカルデフォルト（Unixソケット等）でDockerに接続する
    pub fn connect() -> DaemonResult<Self> {
        let docker = Docker::connect_with_local_defaults().map_err(engine_error)?;
        Ok(Self { docker })
    }

    /// エンジンへの疎通を確認する
    pub async fn ping(&self) -> DaemonResult<()> {
        self.docker.ping().await.map_err(engine_error)?;
        Ok(())
    }
}

fn engine_error(err: bollard::errors::Error) -> DaemonError {
    DaemonError::RuntimeUnavailable(err.to_string())
}

fn is_not_found(err: &bollard::errors::Error) -> bool {
    matches!(
        err,
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}

/// コンテナ一覧エントリを要約に変換する（名前が無いものは読み飛ばす）
fn summarize(summary: ContainerSummary) -> Option<RunningContainer> {
    let name = summary
        .names
        .as_ref()
        .and_then(|names| names.first())
        .map(|name| name.trim_start_matches('/').to_string())?;

    let host_port = summary
        .ports
        .as_ref()
        .and_then(|ports| ports.iter().find_map(|port| port.public_port));

    let volume_name = summary
        .mounts
        .as_ref()
        .and_then(|mounts| mounts.first())
        .and_then(|mount| mount.name.clone());

    Some(RunningContainer {
        name,
        host_port,
        volume_name,
    })
}

#[async_trait]
impl ContainerRuntimeGateway for DockerGateway {
    async fn list_images(&self) -> DaemonResult<Vec<LocalImage>> {
        let images = self
            .docker
            .list_images(Some(ListImagesOptions::<String> {
                all: false,
                ..Default::default()
            }))
            .await
            .map_err(engine_error)?;

        Ok(images
            .into_iter()
            .map(|image| LocalImage {
                tags: image.repo_tags,
            })
            .collect())
    }

    async fn list_containers(&self) -> DaemonResult<Vec<RunningContainer>> {
        let containers = self
            .docker
            .list_containers(Some(ListContainersOptions::<String> {
                all: false,
                ..Default::default()
            }))
            .await
            .map_err(engine_error)?;

        Ok(containers.into_iter().filter_map(summarize).collect())
    }

    async fn get_container(&self, name: &str) -> DaemonResult<Option<RunningContainer>> {
        let inspect = match self
            .docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
        {
            Ok(inspect) => inspect,
            Err(err) if is_not_found(&err) => return Ok(None),
            Err(err) => return Err(engine_error(err)),
        };

        let host_port = inspect
            .network_settings
            .as_ref()
            .and_then(|settings| settings.ports.as_ref())
            .and_then(|ports| {
                ports.values().flatten().flatten().find_map(|binding| {
                    binding
                        .host_port
                        .as_ref()
                        .and_then(|port| port.parse::<u16>().ok())
                })
            });

        let volume_name = inspect
            .mounts
            .as_ref()
            .and_then(|mounts| mounts.first())
            .and_then(|mount| mount.name.clone());

        Ok(Some(RunningContainer {
            name: name.to_string(),
            host_port,
            volume_name,
        }))
    }

    async fn remove_container(&self, name: &str, force: bool) -> DaemonResult<()> {
        self.docker
            .remove_container(
                name,
                Some(RemoveContainerOptions {
                    force,
                    ..Default::default()
                }),
            )
            .await
            .map_err(engine_error)?;
        Ok(())
    }

    async fn run_container(&self, spec: &RunSpec) -> DaemonResult<RunningContainer> {
        let mut port_bindings = HashMap::new();
        port_bindings.insert(
            format!("{}/tcp", spec.container_port),
            Some(vec![PortBinding {
                host_ip: None,
                host_port: Some(spec.host_port.to_string()),
            }]),
        );

        let binds: Vec<String> = spec
            .volumes
            .iter()
            .map(|binding| {
                let mode = if binding.read_only { "ro" } else { "rw" };
                format!("{}:{}:{}", binding.volume, binding.container_path, mode)
            })
            .collect();

        let device_requests: Vec<DeviceRequest> = spec
            .device_requests
            .iter()
            .map(|request| DeviceRequest {
                device_ids: Some(request.device_ids.clone()),
                capabilities: Some(request.capabilities.clone()),
                ..Default::default()
            })
            .collect();

        let host_config = HostConfig {
            auto_remove: Some(spec.auto_remove),
            port_bindings: Some(port_bindings),
            binds: if binds.is_empty() { None } else { Some(binds) },
            device_requests: if device_requests.is_empty() {
                None
            } else {
                Some(device_requests)
            },
            ..Default::default()
        };

        let config = Config {
            image: Some(spec.image.clone()),
            exposed_ports: Some(HashMap::from([(
                format!("{}/tcp", spec.container_port),
                HashMap::new(),
            )])),
            host_config: Some(host_config),
            ..Default::default()
        };

        let create = self
            .docker
            .create_container(
                Some(CreateContainerOptions {
                    name: spec.name.clone(),
                    platform: None,
                }),
                config,
            )
            .await
            .map_err(engine_error)?;

        if let Err(err) = self
            .docker
            .start_container(&create.id, None::<StartContainerOptions<String>>)
            .await
        {
            // 起動に失敗した作成済みコンテナは残さない
            let _ = self
                .docker
                .remove_container(
                    &create.id,
                    Some(RemoveContainerOptions {
                        force: true,
                        ..Default::default()
                    }),
                )
                .await;
            return Err(engine_error(err));
        }

        debug!(container = %spec.name, port = spec.host_port, "Container started");

        Ok(RunningContainer {
            name: spec.name.clone(),
            host_port: Some(spec.host_port),
            volume_name: spec.volumes.first().map(|binding| binding.volume.clone()),
        })
    }

    async fn create_volume(&self, name: &str) -> DaemonResult<String> {
        let volume = self
            .docker
            .create_volume(CreateVolumeOptions {
                name: name.to_string(),
                ..Default::default()
            })
            .await
            .map_err(engine_error)?;
        Ok(volume.name)
    }

    async fn container_stats(&self, name: &str) -> DaemonResult<ContainerStatsSample> {
        let mut stats_stream = self.docker.stats(
            name,
            Some(StatsOptions {
                stream: false,
                ..Default::default()
            }),
        );
        let stats = stats_stream
            .try_next()
            .await
            .map_err(engine_error)?
            .ok_or_else(|| {
                DaemonError::RuntimeUnavailable(format!("no stats sample for {name}"))
            })?;

        let cpu = stats.cpu_stats;
        let precpu = stats.precpu_stats;
        let cpu_delta = cpu
            .cpu_usage
            .total_usage
            .saturating_sub(precpu.cpu_usage.total_usage) as f64;
        let system_delta = cpu
            .system_cpu_usage
            .unwrap_or(0)
            .saturating_sub(precpu.system_cpu_usage.unwrap_or(0)) as f64;
        let online_cpus = cpu.online_cpus.unwrap_or(1) as f64;
        let cpu_percentage = if system_delta > 0.0 {
            (cpu_delta / system_delta) * online_cpus * 100.0
        } else {
            0.0
        };

        let memory_usage_bytes = stats.memory_stats.usage.unwrap_or(0);
        let memory_limit_bytes = stats.memory_stats.limit.unwrap_or(0);

        let inspect = self
            .docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
            .map_err(engine_error)?;
        let image_size_bytes = match inspect.image {
            Some(image_id) => self
                .docker
                .inspect_image(&image_id)
                .await
                .map_err(engine_error)?
                .size
                .unwrap_or(0) as u64,
            None => 0,
        };

        Ok(ContainerStatsSample {
            cpu_percentage,
            memory_usage_bytes,
            memory_limit_bytes,
            image_size_bytes,
        })
    }

    async fn prune_containers(&self) -> DaemonResult<()> {
        self.docker
            .prune_containers(None::<PruneContainersOptions<String>>)
            .await
            .map_err(engine_error)?;
        Ok(())
    }

    async fn prune_volumes(&self) -> DaemonResult<()> {
        self.docker
            .prune_volumes(None::<PruneVolumesOptions<String>>)
            .await
            .map_err(engine_error)?;
        Ok(())
    }

    async fn prune_images(&self) -> DaemonResult<()> {
        self.docker
            .prune_images(None::<PruneImagesOptions<String>>)
            .await
            .map_err(engine_error)?;
        Ok(())
    }

    async fn prune_networks(&self) -> DaemonResult<()> {
        self.docker
            .prune_networks(None::<PruneNetworksOptions<String>>)
            .await
            .map_err(engine_error)?;
        Ok(())
    }
}
