//! Report export.
//!
//! Serializes a full [`Snapshot`] either as a JSON document (with generation
//! metadata) or as a fixed-layout plain-text report. The write failure is
//! the only error any collection path surfaces to the user.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::hardware::{Snapshot, UNKNOWN};

/// Identity stamped into every export.
pub const GENERATOR: &str = concat!("lxz v", env!("CARGO_PKG_VERSION"));

const BANNER: &str =
    "================================================================================";
const FLAG_WRAP_WIDTH: usize = 76;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write report to {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize report")]
    Serialize(#[from] serde_json::Error),
}

/// The exported JSON shape: per-domain info plus generation metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub generated_at: String,
    pub generator: String,
    pub system_info: Snapshot,
}

impl ExportDocument {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            generated_at: Local::now().to_rfc3339(),
            generator: GENERATOR.to_string(),
            system_info: snapshot,
        }
    }
}

/// Write the JSON document into `dir` and return the path written.
pub fn export_json(snapshot: &Snapshot, dir: &Path) -> Result<PathBuf, ExportError> {
    let path = dir.join(format!("lxz_report_{}.json", timestamp()));
    let document = ExportDocument::new(snapshot.clone());
    let json = serde_json::to_string_pretty(&document)?;
    write_report(&path, &json)?;
    Ok(path)
}

/// Write the plain-text report into `dir` and return the path written.
pub fn export_txt(snapshot: &Snapshot, dir: &Path) -> Result<PathBuf, ExportError> {
    let path = dir.join(format!("lxz_report_{}.txt", timestamp()));
    let generated = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    write_report(&path, &render_text(snapshot, &generated))?;
    Ok(path)
}

fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

fn write_report(path: &Path, content: &str) -> Result<(), ExportError> {
    fs::write(path, content).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Fixed-layout text report: banner-delimited sections in the order CPU,
/// Memory, Storage, GPU, Motherboard, Sensors, with a closing footer.
fn render_text(snapshot: &Snapshot, generated: &str) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{BANNER}");
    let _ = writeln!(out, "lxz - Linux Hardware Analyzer Report");
    let _ = writeln!(out, "{BANNER}");
    let _ = writeln!(out, "Generated: {generated}");
    let _ = writeln!(out, "{BANNER}");
    let _ = writeln!(out);

    section(&mut out, "CPU INFORMATION");
    let cpu = &snapshot.cpu;
    let _ = writeln!(out, "Model: {}", cpu.model);
    let _ = writeln!(out, "Architecture: {}", cpu.architecture);
    let _ = writeln!(out, "Vendor ID: {}", cpu.vendor_id);
    let _ = writeln!(out, "CPU Family: {}", cpu.cpu_family);
    let _ = writeln!(out, "Cores: {}", cpu.cores);
    let _ = writeln!(out, "Threads: {}", cpu.threads);
    let _ = writeln!(out, "Current Frequency: {}", cpu.current_freq);
    let _ = writeln!(out, "Max Frequency: {}", cpu.max_freq);
    let _ = writeln!(out, "L1d Cache: {}", cpu.l1d_cache);
    let _ = writeln!(out, "L1i Cache: {}", cpu.l1i_cache);
    let _ = writeln!(out, "L2 Cache: {}", cpu.l2_cache);
    let _ = writeln!(out, "L3 Cache: {}", cpu.l3_cache);
    if !cpu.flags.is_empty() {
        let _ = writeln!(out, "\nCPU Flags ({} total):", cpu.flags.len());
        for chunk in wrap_flags(&cpu.flags, FLAG_WRAP_WIDTH) {
            let _ = writeln!(out, "  {chunk}");
        }
    }

    section(&mut out, "MEMORY INFORMATION");
    let mem = &snapshot.memory;
    let _ = writeln!(out, "Total RAM: {}", mem.total);
    let _ = writeln!(out, "Available RAM: {}", mem.available);
    let _ = writeln!(out, "Used RAM: {}", mem.used);
    let _ = writeln!(out, "Free RAM: {}", mem.free);
    let _ = writeln!(out, "Usage: {}", mem.percent);
    let _ = writeln!(out, "\nSwap Total: {}", mem.swap_total);
    let _ = writeln!(out, "Swap Used: {}", mem.swap_used);
    let _ = writeln!(out, "Swap Free: {}", mem.swap_free);
    if !mem.modules.is_empty() {
        let _ = writeln!(out, "\nMemory Modules:");
        for (idx, module) in mem.modules.iter().enumerate() {
            let _ = writeln!(out, "  Module {}:", idx + 1);
            let _ = writeln!(out, "    Locator: {}", module.locator);
            let _ = writeln!(out, "    Size: {}", module.size);
            let _ = writeln!(out, "    Type: {}", module.module_type);
            let _ = writeln!(out, "    Speed: {}", module.speed);
            let _ = writeln!(out, "    Manufacturer: {}", module.manufacturer);
        }
    }

    section(&mut out, "STORAGE INFORMATION");
    let storage = &snapshot.storage;
    if !storage.devices.is_empty() {
        let _ = writeln!(out, "\nBlock Devices:");
        for device in &storage.devices {
            let _ = writeln!(out, "  {}:", device.name);
            let _ = writeln!(out, "    Path: {}", device.path);
            let _ = writeln!(out, "    Model: {}", device.model);
            let _ = writeln!(out, "    Size: {}", device.size);
            let _ = writeln!(out, "    Type: {}", device.device_type);
            let _ = writeln!(out, "    Health: {}", device.health);
        }
    }
    if !storage.partitions.is_empty() {
        let _ = writeln!(out, "\nPartitions:");
        for part in &storage.partitions {
            let _ = writeln!(out, "  {}:", part.device);
            let _ = writeln!(out, "    Mount Point: {}", part.mountpoint);
            let _ = writeln!(out, "    Filesystem: {}", part.fstype);
            let _ = writeln!(out, "    Size: {}", part.size);
            let _ = writeln!(out, "    Used: {}", part.used);
            let _ = writeln!(out, "    Free: {}", part.free);
            let _ = writeln!(out, "    Usage: {}", part.percent);
        }
    }

    section(&mut out, "GPU INFORMATION");
    let gpu = &snapshot.gpu;
    for (idx, device) in gpu.gpus.iter().enumerate() {
        let _ = writeln!(out, "\nGPU #{}:", idx + 1);
        let _ = writeln!(out, "  Vendor: {}", device.vendor);
        let _ = writeln!(out, "  Model: {}", device.model);
        let _ = writeln!(out, "  Driver: {}", device.driver);
        let _ = writeln!(out, "  Driver Version: {}", device.driver_version);
        if device.vram != UNKNOWN {
            let _ = writeln!(out, "  VRAM: {}", device.vram);
        }
    }
    let _ = writeln!(out, "\nGraphics API Support:");
    let _ = writeln!(out, "  OpenGL: {}", gpu.opengl);
    let _ = writeln!(out, "  Vulkan: {}", gpu.vulkan);

    section(&mut out, "MOTHERBOARD & BIOS INFORMATION");
    let board = &snapshot.motherboard;
    let _ = writeln!(out, "Manufacturer: {}", board.manufacturer);
    let _ = writeln!(out, "Product: {}", board.product);
    let _ = writeln!(out, "Version: {}", board.version);
    let _ = writeln!(out, "Serial Number: {}", board.serial);
    let _ = writeln!(out, "\nBIOS Vendor: {}", board.bios_vendor);
    let _ = writeln!(out, "BIOS Version: {}", board.bios_version);
    let _ = writeln!(out, "BIOS Date: {}", board.bios_date);

    section(&mut out, "SENSOR INFORMATION");
    let sensors = &snapshot.sensors;
    if !sensors.temperatures.is_empty() {
        let _ = writeln!(out, "\nTemperatures:");
        for (sensor, temp) in &sensors.temperatures {
            let _ = writeln!(out, "  {sensor}: {temp}");
        }
    }
    if !sensors.fans.is_empty() {
        let _ = writeln!(out, "\nFans:");
        for (fan, speed) in &sensors.fans {
            let _ = writeln!(out, "  {fan}: {speed}");
        }
    }
    if !sensors.battery.is_empty() {
        let _ = writeln!(out, "\nBattery:");
        for (key, value) in &sensors.battery {
            let _ = writeln!(out, "  {key}: {value}");
        }
    }

    let _ = writeln!(out, "\n{BANNER}");
    let _ = writeln!(out, "End of Report");
    let _ = writeln!(out, "{BANNER}");

    out
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n{BANNER}");
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{BANNER}");
}

/// Join flags with commas and break into fixed-width lines. Flags are ASCII
/// tokens, so a byte-wise chunking is safe.
fn wrap_flags(flags: &[String], width: usize) -> Vec<String> {
    let joined = flags.join(", ");
    joined
        .as_bytes()
        .chunks(width)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{
        BoardInfo, CpuInfo, GpuDevice, GpuInfo, MemoryInfo, MemoryModule, Partition, SensorInfo,
        StorageDevice, StorageInfo,
    };
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn fixture() -> Snapshot {
        let mut temperatures = BTreeMap::new();
        temperatures.insert("Core 0".to_string(), "+45.0°C".to_string());
        let mut fans = BTreeMap::new();
        fans.insert("fan1".to_string(), "3012 RPM".to_string());

        Snapshot {
            cpu: CpuInfo {
                model: "Intel(R) Core(TM) i7-8650U CPU @ 1.90GHz".to_string(),
                architecture: "x86_64".to_string(),
                vendor_id: "GenuineIntel".to_string(),
                cpu_family: "6".to_string(),
                model_number: "142".to_string(),
                stepping: "10".to_string(),
                cores: 4,
                threads: 8,
                sockets: 1,
                flags: vec!["fpu".to_string(), "vme".to_string(), "sse2".to_string()],
                l1d_cache: "128 KiB".to_string(),
                l1i_cache: "128 KiB".to_string(),
                l2_cache: "1 MiB".to_string(),
                l3_cache: "8 MiB".to_string(),
                current_freq: "2112.00 MHz".to_string(),
                max_freq: "4200.00 MHz".to_string(),
                min_freq: "400.00 MHz".to_string(),
            },
            memory: MemoryInfo {
                total: "15.62 GB".to_string(),
                available: "7.81 GB".to_string(),
                used: "11.72 GB".to_string(),
                free: "3.91 GB".to_string(),
                percent: "75.0%".to_string(),
                swap_total: "1.95 GB".to_string(),
                swap_used: "0.00 B".to_string(),
                swap_free: "1.95 GB".to_string(),
                swap_percent: "0.0%".to_string(),
                modules: vec![MemoryModule {
                    size: "8 GB".to_string(),
                    locator: "DIMM_A1".to_string(),
                    module_type: "DDR4".to_string(),
                    speed: "3200 MT/s".to_string(),
                    manufacturer: "Kingston".to_string(),
                }],
            },
            storage: StorageInfo {
                devices: vec![StorageDevice {
                    name: "nvme0n1".to_string(),
                    path: "/dev/nvme0n1".to_string(),
                    size: "953.87 GB".to_string(),
                    device_type: "SSD".to_string(),
                    model: "KINGSTON SNVS1000G".to_string(),
                    removable: "No".to_string(),
                    readonly: "No".to_string(),
                    health: "PASSED".to_string(),
                }],
                partitions: vec![Partition {
                    device: "/dev/nvme0n1p2".to_string(),
                    mountpoint: "/".to_string(),
                    fstype: "ext4".to_string(),
                    size: "930.51 GB".to_string(),
                    used: "412.00 GB".to_string(),
                    free: "518.51 GB".to_string(),
                    percent: "44.3%".to_string(),
                }],
            },
            gpu: GpuInfo {
                gpus: vec![GpuDevice {
                    device: "00:02.0".to_string(),
                    vendor: "Intel".to_string(),
                    model: "HD Graphics 620".to_string(),
                    driver: "i915".to_string(),
                    driver_version: UNKNOWN.to_string(),
                    vram: UNKNOWN.to_string(),
                }],
                opengl: "4.6 Mesa 23.0.4".to_string(),
                vulkan: "1.3.255".to_string(),
            },
            sensors: SensorInfo {
                temperatures,
                fans,
                battery: BTreeMap::new(),
            },
            motherboard: BoardInfo {
                manufacturer: "LENOVO".to_string(),
                product: "20KHCTO1WW".to_string(),
                version: "ThinkPad X1 Carbon 6th".to_string(),
                serial: UNKNOWN.to_string(),
                bios_vendor: "LENOVO".to_string(),
                bios_version: "N23ET75W".to_string(),
                bios_date: "10/28/2021".to_string(),
            },
        }
    }

    #[test]
    fn json_export_round_trips_exactly() {
        let dir = tempdir().unwrap();
        let snapshot = fixture();
        let path = export_json(&snapshot, dir.path()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let document: ExportDocument = serde_json::from_str(&content).unwrap();
        assert_eq!(document.system_info, snapshot);
        assert_eq!(document.generator, GENERATOR);
        assert!(!document.generated_at.is_empty());
    }

    #[test]
    fn json_export_path_is_timestamped() {
        let dir = tempdir().unwrap();
        let path = export_json(&fixture(), dir.path()).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("lxz_report_"));
        assert!(name.ends_with(".json"));
    }

    #[test]
    fn text_export_has_all_section_banners_in_order() {
        let text = render_text(&fixture(), "2026-01-01 12:00:00");
        let positions: Vec<usize> = [
            "CPU INFORMATION",
            "MEMORY INFORMATION",
            "STORAGE INFORMATION",
            "GPU INFORMATION",
            "MOTHERBOARD & BIOS INFORMATION",
            "SENSOR INFORMATION",
            "End of Report",
        ]
        .iter()
        .map(|header| text.find(header).unwrap_or_else(|| panic!("missing {header}")))
        .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn text_export_omits_unknown_vram() {
        let text = render_text(&fixture(), "2026-01-01 12:00:00");
        assert!(!text.contains("VRAM:"));
        assert!(text.contains("OpenGL: 4.6 Mesa 23.0.4"));
    }

    #[test]
    fn text_export_writes_file() {
        let dir = tempdir().unwrap();
        let path = export_txt(&fixture(), dir.path()).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("lxz - Linux Hardware Analyzer Report"));
        assert!(content.ends_with(&format!("{BANNER}\n")));
    }

    #[test]
    fn export_to_unwritable_directory_fails() {
        let err = export_json(&fixture(), Path::new("/nonexistent/nowhere")).unwrap_err();
        assert!(matches!(err, ExportError::Write { .. }));
    }

    #[test]
    fn flag_wrapping_respects_width() {
        let flags: Vec<String> = (0..40).map(|i| format!("flag{i}")).collect();
        let lines = wrap_flags(&flags, 76);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|line| line.len() <= 76));
    }
}
