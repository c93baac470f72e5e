//! Memory detection module.
//!
//! Totals come from `/proc/meminfo`, which is always readable. DIMM module
//! records and motherboard/BIOS identity come from dmidecode, which usually
//! needs root; the reader tries with sudo first and then without, and simply
//! reports nothing when both fail.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use tracing::debug;

use super::UNKNOWN;
use crate::probe;
use crate::units;

const MEMINFO_PATH: &str = "/proc/meminfo";

/// Aggregated memory information, all byte values pre-formatted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryInfo {
    pub total: String,
    pub available: String,
    pub used: String,
    pub free: String,
    pub percent: String,
    pub swap_total: String,
    pub swap_used: String,
    pub swap_free: String,
    pub swap_percent: String,
    pub modules: Vec<MemoryModule>,
}

/// One populated DIMM slot from the SMBIOS memory device table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryModule {
    pub size: String,
    pub locator: String,
    #[serde(rename = "type")]
    pub module_type: String,
    pub speed: String,
    pub manufacturer: String,
}

/// Motherboard and BIOS identity from the SMBIOS baseboard/bios tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardInfo {
    pub manufacturer: String,
    pub product: String,
    pub version: String,
    pub serial: String,
    pub bios_vendor: String,
    pub bios_version: String,
    pub bios_date: String,
}

impl BoardInfo {
    fn unknown() -> Self {
        Self {
            manufacturer: UNKNOWN.to_string(),
            product: UNKNOWN.to_string(),
            version: UNKNOWN.to_string(),
            serial: UNKNOWN.to_string(),
            bios_vendor: UNKNOWN.to_string(),
            bios_version: UNKNOWN.to_string(),
            bios_date: UNKNOWN.to_string(),
        }
    }
}

impl MemoryInfo {
    /// Headline fields for the overview screen.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Total RAM", self.total.clone()),
            ("Available", self.available.clone()),
            ("Usage", self.percent.clone()),
        ]
    }
}

pub struct MemoryReader {
    dmidecode: bool,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self {
            dmidecode: probe::command_available("dmidecode"),
        }
    }

    pub fn collect(&self) -> MemoryInfo {
        let meminfo = parse_meminfo(&read_meminfo());
        let counter = |key: &str| meminfo.get(key).copied().unwrap_or(0) * 1024;

        let total = counter("MemTotal");
        let available = meminfo
            .get("MemAvailable")
            .or_else(|| meminfo.get("MemFree"))
            .copied()
            .unwrap_or(0)
            * 1024;
        let free = counter("MemFree");
        let used = total.saturating_sub(free);

        let swap_total = counter("SwapTotal");
        let swap_free = counter("SwapFree");
        let swap_used = swap_total.saturating_sub(swap_free);

        MemoryInfo {
            total: units::format_bytes(total),
            available: units::format_bytes(available),
            used: units::format_bytes(used),
            free: units::format_bytes(free),
            percent: units::format_percent(used, total),
            swap_total: units::format_bytes(swap_total),
            swap_used: units::format_bytes(swap_used),
            swap_free: units::format_bytes(swap_free),
            swap_percent: units::format_percent(swap_used, swap_total),
            modules: self.memory_modules(),
        }
    }

    /// DIMM records from `dmidecode -t memory`, empty when the tool is
    /// missing or access is denied.
    fn memory_modules(&self) -> Vec<MemoryModule> {
        if !self.dmidecode {
            debug!("dmidecode unavailable, skipping DIMM inventory");
            return Vec::new();
        }
        let output = run_dmidecode("memory");
        parse_memory_devices(&output)
    }

    /// Motherboard and BIOS identity, sentinel-filled when dmidecode is
    /// missing or denied.
    pub fn motherboard(&self) -> BoardInfo {
        let mut board = BoardInfo::unknown();
        if !self.dmidecode {
            debug!("dmidecode unavailable, skipping baseboard/bios tables");
            return board;
        }

        for line in run_dmidecode("baseboard").lines() {
            if let Some((key, value)) = split_record_line(line) {
                match key.as_str() {
                    "manufacturer" => board.manufacturer = value,
                    "product name" => board.product = value,
                    "version" => board.version = value,
                    "serial number" => {
                        board.serial = if value.is_empty() {
                            UNKNOWN.to_string()
                        } else {
                            value
                        }
                    }
                    _ => {}
                }
            }
        }

        for line in run_dmidecode("bios").lines() {
            if let Some((key, value)) = split_record_line(line) {
                match key.as_str() {
                    "vendor" => board.bios_vendor = value,
                    "version" => board.bios_version = value,
                    "release date" => board.bios_date = value,
                    _ => {}
                }
            }
        }

        board
    }
}

impl Default for MemoryReader {
    fn default() -> Self {
        Self::new()
    }
}

fn read_meminfo() -> String {
    fs::read_to_string(MEMINFO_PATH).unwrap_or_default()
}

/// dmidecode needs root on most systems; try the sudo prefix first and fall
/// back to a plain invocation (some distros grant read access via groups).
fn run_dmidecode(table: &str) -> String {
    let output = probe::run("sudo", &["-n", "dmidecode", "-t", table]);
    if !output.is_empty() {
        return output;
    }
    probe::run("dmidecode", &["-t", table])
}

fn split_record_line(line: &str) -> Option<(String, String)> {
    let (key, value) = line.trim().split_once(':')?;
    Some((key.trim().to_lowercase(), value.trim().to_string()))
}

/// Parse `/proc/meminfo` into a map of counter name to kB value.
fn parse_meminfo(content: &str) -> HashMap<String, u64> {
    let mut data = HashMap::new();
    for line in content.lines() {
        if let Some((key, value)) = line.split_once(':') {
            if let Some(number) = value.split_whitespace().next() {
                if let Ok(kb) = number.parse::<u64>() {
                    data.insert(key.trim().to_string(), kb);
                }
            }
        }
    }
    data
}

/// Scan dmidecode memory-table output for `Memory Device` records, skipping
/// empty slots.
fn parse_memory_devices(output: &str) -> Vec<MemoryModule> {
    let mut modules = Vec::new();
    let mut current: Option<HashMap<String, String>> = None;

    for raw in output.lines() {
        let line = raw.trim();
        if line.starts_with("Memory Device") {
            if let Some(record) = current.take() {
                push_module(&mut modules, record);
            }
            current = Some(HashMap::new());
        } else if let Some(record) = current.as_mut() {
            if let Some((key, value)) = split_record_line(line) {
                match key.as_str() {
                    "size" | "locator" | "type" | "speed" | "manufacturer" => {
                        record.insert(key, value);
                    }
                    _ => {}
                }
            }
        }
    }
    if let Some(record) = current.take() {
        push_module(&mut modules, record);
    }

    modules
}

fn push_module(modules: &mut Vec<MemoryModule>, record: HashMap<String, String>) {
    if record.is_empty() || record.get("size").map(String::as_str) == Some("No Module Installed") {
        return;
    }
    let get = |key: &str| {
        record
            .get(key)
            .cloned()
            .unwrap_or_else(|| UNKNOWN.to_string())
    };
    modules.push(MemoryModule {
        size: get("size"),
        locator: get("locator"),
        module_type: get("type"),
        speed: get("speed"),
        manufacturer: get("manufacturer"),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_MEMINFO: &str = "\
MemTotal:       16384000 kB
MemFree:         4096000 kB
MemAvailable:    8192000 kB
Buffers:          512000 kB
SwapTotal:       2048000 kB
SwapFree:        2048000 kB
";

    const SAMPLE_DMIDECODE: &str = "\
# dmidecode 3.3
Handle 0x0040, DMI type 17, 40 bytes
Memory Device
\tSize: 8 GB
\tLocator: DIMM_A1
\tType: DDR4
\tSpeed: 3200 MT/s
\tManufacturer: Kingston
Handle 0x0041, DMI type 17, 40 bytes
Memory Device
\tSize: No Module Installed
\tLocator: DIMM_A2
Handle 0x0042, DMI type 17, 40 bytes
Memory Device
\tSize: 8 GB
\tLocator: DIMM_B1
\tType: DDR4
\tSpeed: 3200 MT/s
\tManufacturer: Kingston
";

    #[test]
    fn meminfo_parse_extracts_kb_counters() {
        let data = parse_meminfo(SAMPLE_MEMINFO);
        assert_eq!(data.get("MemTotal"), Some(&16_384_000));
        assert_eq!(data.get("MemAvailable"), Some(&8_192_000));
        assert_eq!(data.get("SwapFree"), Some(&2_048_000));
    }

    #[test]
    fn dimm_scan_skips_empty_slots() {
        let modules = parse_memory_devices(SAMPLE_DMIDECODE);
        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].locator, "DIMM_A1");
        assert_eq!(modules[0].module_type, "DDR4");
        assert_eq!(modules[1].locator, "DIMM_B1");
    }

    #[test]
    fn dimm_scan_fills_missing_attributes() {
        let output = "Memory Device\n\tSize: 4 GB\n";
        let modules = parse_memory_devices(output);
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].manufacturer, UNKNOWN);
    }

    #[test]
    fn dimm_scan_handles_empty_output() {
        assert!(parse_memory_devices("").is_empty());
    }

    #[test]
    fn collect_fills_every_schema_field() {
        let info = MemoryReader::new().collect();
        assert!(!info.total.is_empty());
        assert!(info.percent.ends_with('%'));
        assert!(info.swap_percent.ends_with('%'));
    }

    #[test]
    fn motherboard_defaults_are_sentinels() {
        let board = BoardInfo::unknown();
        assert_eq!(board.manufacturer, UNKNOWN);
        assert_eq!(board.bios_date, UNKNOWN);
    }

    #[test]
    fn summary_projects_headline_fields() {
        let info = MemoryReader::new().collect();
        let summary = info.summary();
        assert_eq!(summary.len(), 3);
        assert_eq!(summary[0].0, "Total RAM");
    }
}
