//! Storage detection module.
//!
//! Block devices come from `lsblk` when present, else a `/sys/block` walk.
//! Mounted filesystems come from `/proc/mounts` with usage from statvfs.
//! SMART health is a best-effort smartctl query per device.

use serde::{Deserialize, Serialize};
use std::ffi::CString;
use std::fs;
use std::path::Path;
use tracing::debug;

use super::UNKNOWN;
use crate::probe;
use crate::units;

const SYS_BLOCK_DIR: &str = "/sys/block";
const MOUNTS_PATH: &str = "/proc/mounts";

/// Filesystem types that never correspond to a physical partition.
const PSEUDO_FSTYPES: [&str; 6] = ["tmpfs", "devtmpfs", "proc", "sysfs", "cgroup", "cgroup2"];

/// Device-name prefixes recognized by the /sys/block fallback.
const DISK_PREFIXES: [&str; 3] = ["sd", "nvme", "vd"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageInfo {
    pub devices: Vec<StorageDevice>,
    pub partitions: Vec<Partition>,
}

/// One physical block device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageDevice {
    pub name: String,
    pub path: String,
    pub size: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub model: String,
    pub removable: String,
    pub readonly: String,
    pub health: String,
}

/// One mounted filesystem backed by a device node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    pub device: String,
    pub mountpoint: String,
    pub fstype: String,
    pub size: String,
    pub used: String,
    pub free: String,
    pub percent: String,
}

impl StorageInfo {
    /// Headline fields for the overview screen: device count with a
    /// per-type breakdown, and partition count.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let mut type_counts: Vec<(String, usize)> = Vec::new();
        for device in &self.devices {
            match type_counts
                .iter_mut()
                .find(|(kind, _)| *kind == device.device_type)
            {
                Some((_, count)) => *count += 1,
                None => type_counts.push((device.device_type.clone(), 1)),
            }
        }
        let breakdown = type_counts
            .iter()
            .map(|(kind, count)| format!("{count} {kind}"))
            .collect::<Vec<_>>()
            .join(", ");

        let devices = if breakdown.is_empty() {
            self.devices.len().to_string()
        } else {
            format!("{} ({breakdown})", self.devices.len())
        };

        vec![
            ("Devices", devices),
            ("Partitions", self.partitions.len().to_string()),
        ]
    }
}

pub struct StorageReader {
    lsblk: bool,
    smartctl: bool,
}

impl StorageReader {
    pub fn new() -> Self {
        Self {
            lsblk: probe::command_available("lsblk"),
            smartctl: probe::command_available("smartctl"),
        }
    }

    pub fn collect(&self) -> StorageInfo {
        let mut devices = self.block_devices();
        for device in &mut devices {
            device.health = self.smart_health(&device.path);
        }
        StorageInfo {
            devices,
            partitions: partitions(),
        }
    }

    fn block_devices(&self) -> Vec<StorageDevice> {
        if !self.lsblk {
            debug!("lsblk unavailable, walking /sys/block");
            return sys_block_devices();
        }
        let output = probe::run("lsblk", &["-b", "-d", "-o", "NAME,SIZE,TYPE,MODEL,ROTA,RO"]);
        let devices = parse_lsblk(&output);
        if devices.is_empty() {
            // lsblk can be installed but still fail inside containers
            return sys_block_devices();
        }
        devices
    }

    /// SMART overall-health self-assessment for one device node.
    fn smart_health(&self, device_path: &str) -> String {
        if !self.smartctl {
            return UNKNOWN.to_string();
        }
        let mut output = probe::run("sudo", &["-n", "smartctl", "-H", device_path]);
        if output.is_empty() {
            output = probe::run("smartctl", &["-H", device_path]);
        }
        parse_smart_health(&output)
    }
}

impl Default for StorageReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `lsblk -b -d -o NAME,SIZE,TYPE,MODEL,ROTA,RO` output, keeping only
/// rows of kind "disk". The MODEL column may contain spaces, so it spans
/// everything between TYPE and the trailing ROTA/RO columns.
fn parse_lsblk(output: &str) -> Vec<StorageDevice> {
    let mut devices = Vec::new();
    for line in output.lines().skip(1) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            continue;
        }
        let name = parts[0];
        let size = parts[1].parse::<u64>().unwrap_or(0);
        let kind = parts[2];
        if kind != "disk" {
            continue;
        }
        let model = if parts.len() > 5 {
            parts[3..parts.len() - 2].join(" ")
        } else {
            UNKNOWN.to_string()
        };
        let rotational = if parts.len() >= 5 {
            parts[parts.len() - 2]
        } else {
            "0"
        };
        let readonly = if parts.len() >= 6 {
            parts[parts.len() - 1]
        } else {
            "0"
        };

        devices.push(StorageDevice {
            name: name.to_string(),
            path: format!("/dev/{name}"),
            size: units::format_bytes(size),
            device_type: disk_kind(rotational == "0"),
            model,
            removable: "No".to_string(),
            readonly: yes_no(readonly == "1"),
            health: UNKNOWN.to_string(),
        });
    }
    devices
}

/// Fallback enumeration straight from /sys/block: size is the sector count
/// times 512, rotational comes from the queue flag file.
fn sys_block_devices() -> Vec<StorageDevice> {
    let entries = match fs::read_dir(SYS_BLOCK_DIR) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut names: Vec<String> = entries
        .flatten()
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| DISK_PREFIXES.iter().any(|prefix| name.starts_with(prefix)))
        .collect();
    names.sort();

    names
        .into_iter()
        .map(|name| {
            let device_dir = Path::new(SYS_BLOCK_DIR).join(&name);
            let sectors = read_file(device_dir.join("size"))
                .parse::<u64>()
                .unwrap_or(0);
            let removable = read_file(device_dir.join("removable")) == "1";
            let rotational = read_file(device_dir.join("queue/rotational"));
            // unreadable flag file defaults to SSD, same as a "0" reading
            let is_ssd = rotational != "1";

            StorageDevice {
                path: format!("/dev/{name}"),
                name,
                size: units::format_bytes(sectors * 512),
                device_type: disk_kind(is_ssd),
                model: UNKNOWN.to_string(),
                removable: yes_no(removable),
                readonly: "No".to_string(),
                health: UNKNOWN.to_string(),
            }
        })
        .collect()
}

/// Mounted filesystems from /proc/mounts, restricted to real device nodes
/// and real filesystem types, with usage from statvfs.
fn partitions() -> Vec<Partition> {
    let content = fs::read_to_string(MOUNTS_PATH).unwrap_or_default();
    parse_mounts(&content)
        .into_iter()
        .filter_map(|(device, mountpoint, fstype)| {
            let (total, free) = filesystem_usage(&mountpoint)?;
            let used = total.saturating_sub(free);
            Some(Partition {
                device,
                mountpoint,
                fstype,
                size: units::format_bytes(total),
                used: units::format_bytes(used),
                free: units::format_bytes(free),
                percent: units::format_percent(used, total),
            })
        })
        .collect()
}

/// Filter /proc/mounts rows down to device-backed, non-pseudo filesystems.
fn parse_mounts(content: &str) -> Vec<(String, String, String)> {
    content
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let device = parts.next()?;
            let mountpoint = parts.next()?;
            let fstype = parts.next()?;
            parts.next()?; // options column must exist

            if !device.starts_with("/dev/") {
                return None;
            }
            if PSEUDO_FSTYPES.contains(&fstype) {
                return None;
            }
            Some((
                device.to_string(),
                mountpoint.to_string(),
                fstype.to_string(),
            ))
        })
        .collect()
}

/// Total and free bytes for a mountpoint via statvfs (blocks times fragment
/// size). Returns None when the mountpoint cannot be statted.
fn filesystem_usage(mountpoint: &str) -> Option<(u64, u64)> {
    let path = CString::new(mountpoint).ok()?;
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(path.as_ptr(), &mut stat) };
    if rc != 0 {
        return None;
    }
    let total = stat.f_blocks as u64 * stat.f_frsize as u64;
    let free = stat.f_bfree as u64 * stat.f_frsize as u64;
    Some((total, free))
}

fn parse_smart_health(output: &str) -> String {
    if output.contains("PASSED") {
        "PASSED".to_string()
    } else if output.contains("FAILED") {
        "FAILED".to_string()
    } else {
        UNKNOWN.to_string()
    }
}

fn disk_kind(is_ssd: bool) -> String {
    let kind = if is_ssd { "SSD" } else { "HDD" };
    kind.to_string()
}

fn yes_no(flag: bool) -> String {
    let answer = if flag { "Yes" } else { "No" };
    answer.to_string()
}

fn read_file(path: impl AsRef<Path>) -> String {
    fs::read_to_string(path)
        .map(|content| content.trim().to_string())
        .unwrap_or_default()
}
