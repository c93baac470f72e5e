//! Hardware inventory readers.
//!
//! One reader per domain, each probing its external tools once at
//! construction and degrading field-by-field when a source is missing.

pub mod cpu;
pub mod gpu;
pub mod memory;
pub mod sensors;
pub mod storage;

use serde::{Deserialize, Serialize};

pub use cpu::{CpuInfo, CpuReader};
pub use gpu::{GpuDevice, GpuInfo, GpuReader};
pub use memory::{BoardInfo, MemoryInfo, MemoryModule, MemoryReader};
pub use sensors::{SensorInfo, SensorReader};
pub use storage::{Partition, StorageDevice, StorageInfo, StorageReader};

/// Sentinel for any scalar field no source could resolve.
pub const UNKNOWN: &str = "Unknown";

/// The full cross-domain inventory, collected fresh on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub cpu: CpuInfo,
    pub memory: MemoryInfo,
    pub storage: StorageInfo,
    pub gpu: GpuInfo,
    pub sensors: SensorInfo,
    pub motherboard: BoardInfo,
}

impl Snapshot {
    /// Collect every domain sequentially. Blocks for the duration of all
    /// external invocations; the only bounded calls are the GPU and sensor
    /// probes.
    pub fn collect() -> Self {
        let memory_reader = MemoryReader::new();
        Self {
            cpu: CpuReader::new().collect(),
            memory: memory_reader.collect(),
            storage: StorageReader::new().collect(),
            gpu: GpuReader::new().collect(),
            sensors: SensorReader::new().collect(),
            motherboard: memory_reader.motherboard(),
        }
    }
}
