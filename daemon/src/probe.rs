//! ホストリソースプローブ
//!
//! メモリ・ディスク・GPUの観測値を提供する。GPU搭載ホストでは
//! メモリ判定にGPUメモリを採用し、システムRAMは使わない（方針）。

use nvml_wrapper::{error::NvmlError, Nvml};
use prem_daemon_common::error::{DaemonError, DaemonResult};
use serde::Serialize;
use std::env;
use std::path::PathBuf;
use std::sync::Mutex;
use sysinfo::{Disks, System};
use tracing::debug;

/// 1 MiB（バイト）
pub const MIB: u64 = 1024 * 1024;

/// GPUメモリ観測値
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpuSnapshot {
    /// GPUモデル名
    pub name: String,
    /// メモリ総容量（MiB）
    pub total_mib: u64,
    /// 使用中メモリ（MiB）
    pub used_mib: u64,
}

impl GpuSnapshot {
    /// メモリ使用率 (0.0-100.0)
    pub fn memory_percentage(&self) -> f64 {
        if self.total_mib == 0 {
            0.0
        } else {
            self.used_mib as f64 / self.total_mib as f64 * 100.0
        }
    }
}

/// システムRAM/CPU観測値
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemSnapshot {
    /// CPU使用率 (0.0-100.0)
    pub cpu_percentage: f64,
    /// 使用中メモリ（バイト）
    pub memory_used_bytes: u64,
    /// メモリ総容量（バイト）
    pub memory_total_bytes: u64,
}

/// ホストリソースの読み取り専用プローブ
///
/// メモリは全経路で **MiB** 単位で報告する。バイト単位への換算は
/// リコンサイラ境界で一度だけ行う。
pub trait HostResourceProbe: Send + Sync {
    /// GPUが利用可能か
    fn gpu_available(&self) -> bool;

    /// (空きメモリ, 総メモリ) をMiBで返す。
    /// GPU搭載時はGPUメモリ、非搭載時はシステムRAM。
    fn free_total_memory(&self) -> DaemonResult<(u64, u64)>;

    /// ディスク使用量 (総容量, 使用量) をバイトで返す
    fn disk_usage(&self) -> DaemonResult<(u64, u64)>;

    /// GPU観測値（GPU無しは None）
    fn gpu_snapshot(&self) -> DaemonResult<Option<GpuSnapshot>>;

    /// システムRAM/CPU観測値
    fn system_snapshot(&self) -> DaemonResult<SystemSnapshot>;
}

/// sysinfo + NVML によるプローブ実装
pub struct HostProbe {
    system: Mutex<System>,
    gpu: Option<GpuProbe>,
}

impl HostProbe {
    /// プローブを初期化する（GPU検出を含む）
    pub fn new() -> Self {
        let mut system = System::new_all();
        system.refresh_all();

        let gpu = GpuProbe::detect();

        Self {
            system: Mutex::new(system),
            gpu,
        }
    }
}

impl Default for HostProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HostResourceProbe for HostProbe {
    fn gpu_available(&self) -> bool {
        self.gpu.is_some()
    }

    fn free_total_memory(&self) -> DaemonResult<(u64, u64)> {
        if let Some(gpu) = &self.gpu {
            let snapshot = gpu.snapshot()?;
            let free = snapshot.total_mib.saturating_sub(snapshot.used_mib);
            return Ok((free, snapshot.total_mib));
        }

        let snapshot = self.system_snapshot()?;
        let free = snapshot
            .memory_total_bytes
            .saturating_sub(snapshot.memory_used_bytes)
            / MIB;
        Ok((free, snapshot.memory_total_bytes / MIB))
    }

    fn disk_usage(&self) -> DaemonResult<(u64, u64)> {
        let disks = Disks::new_with_refreshed_list();
        let root = disks
            .list()
            .iter()
            .find(|disk| disk.mount_point() == std::path::Path::new("/"))
            .or_else(|| disks.list().first())
            .ok_or_else(|| DaemonError::Metrics("No disks reported".to_string()))?;

        let total = root.total_space();
        let used = total.saturating_sub(root.available_space());
        Ok((total, used))
    }

    fn gpu_snapshot(&self) -> DaemonResult<Option<GpuSnapshot>> {
        match &self.gpu {
            Some(gpu) => Ok(Some(gpu.snapshot()?)),
            None => Ok(None),
        }
    }

    fn system_snapshot(&self) -> DaemonResult<SystemSnapshot> {
        let mut system = self
            .system
            .lock()
            .map_err(|_| DaemonError::Metrics("System probe lock poisoned".to_string()))?;

        system.refresh_cpu();
        // 少し待ってから再度リフレッシュすることで正確な値を取得
        std::thread::sleep(std::time::Duration::from_millis(200));
        system.refresh_cpu();

        let cpu_count = system.cpus().len();
        if cpu_count == 0 {
            return Err(DaemonError::Metrics("No CPUs reported".to_string()));
        }
        let cpu_percentage = system
            .cpus()
            .iter()
            .map(|cpu| cpu.cpu_usage() as f64)
            .sum::<f64>()
            / cpu_count as f64;

        system.refresh_memory();
        let memory_total_bytes = system.total_memory();
        if memory_total_bytes == 0 {
            return Err(DaemonError::Metrics("Total memory is zero".to_string()));
        }

        Ok(SystemSnapshot {
            cpu_percentage,
            memory_used_bytes: system.used_memory(),
            memory_total_bytes,
        })
    }
}

/// GPUプローブ（優先順位: 環境変数 → NVIDIA）
enum GpuProbe {
    Env(EnvGpuProbe),
    Nvidia(Box<NvidiaGpuProbe>),
}

impl GpuProbe {
    fn detect() -> Option<Self> {
        // 環境変数で明示的に無効化されている場合は検出しない
        if let Ok(available) = env::var("PREM_GPU_AVAILABLE") {
            if let Ok(false) = available.parse::<bool>() {
                debug!("GPU explicitly disabled via environment variable");
                return None;
            }
        }

        if let Some(probe) = EnvGpuProbe::from_env() {
            debug!("Detected GPU from environment variables");
            return Some(GpuProbe::Env(probe));
        }

        if let Ok(probe) = NvidiaGpuProbe::new() {
            debug!("Detected NVIDIA GPU");
            return Some(GpuProbe::Nvidia(Box::new(probe)));
        }

        debug!("No GPU detected");
        None
    }

    fn snapshot(&self) -> DaemonResult<GpuSnapshot> {
        match self {
            GpuProbe::Env(probe) => Ok(probe.snapshot()),
            GpuProbe::Nvidia(probe) => probe
                .snapshot()
                .map_err(|err| DaemonError::Metrics(format!("NVML query failed: {err}"))),
        }
    }
}

/// 環境変数からGPU情報を読むプローブ（テスト・コンテナ環境用）
struct EnvGpuProbe {
    name: String,
    total_mib: u64,
    used_mib: u64,
}

impl EnvGpuProbe {
    fn from_env() -> Option<Self> {
        let name = env::var("PREM_GPU_NAME").ok()?;
        let total_mib = env::var("PREM_GPU_TOTAL_MIB")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(0);
        let used_mib = env::var("PREM_GPU_USED_MIB")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(0);
        Some(Self {
            name,
            total_mib,
            used_mib,
        })
    }

    fn snapshot(&self) -> GpuSnapshot {
        GpuSnapshot {
            name: self.name.clone(),
            total_mib: self.total_mib,
            used_mib: self.used_mib,
        }
    }
}

/// NVIDIA GPUプローブ（NVML使用）
struct NvidiaGpuProbe {
    nvml: Nvml,
}

impl NvidiaGpuProbe {
    fn new() -> Result<Self, NvmlError> {
        // 事前チェック: デバイスファイルでNVIDIA GPUの存在を確認
        if !Self::is_nvidia_gpu_present() {
            return Err(NvmlError::NotSupported);
        }

        let nvml = Nvml::init()?;
        if nvml.device_count()? == 0 {
            return Err(NvmlError::NotSupported);
        }
        Ok(Self { nvml })
    }

    fn is_nvidia_gpu_present() -> bool {
        let device_path = env::var("PREM_TEST_NVIDIA_DEVICE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/dev/nvidia0"));
        if device_path.exists() {
            return true;
        }

        let version_path = env::var("PREM_TEST_NVIDIA_VERSION_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/proc/driver/nvidia/version"));
        version_path.exists()
    }

    /// 先頭デバイスの名前とメモリ状況を返す
    fn snapshot(&self) -> Result<GpuSnapshot, NvmlError> {
        let device = self.nvml.device_by_index(0)?;
        let name = device.name()?;
        let memory = device.memory_info()?;
        Ok(GpuSnapshot {
            name,
            total_mib: memory.total / MIB,
            used_mib: memory.used / MIB,
        })
    }
}
