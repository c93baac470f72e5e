//! CPU detection module.
//!
//! Sources, in preference order:
//! - `lscpu` structured output (architecture, cache sizes, topology)
//! - `/proc/cpuinfo` first processor block
//! - cpufreq sysfs files for live frequencies

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use super::UNKNOWN;
use crate::probe;
use crate::units;

const CPUINFO_PATH: &str = "/proc/cpuinfo";
const CPUFREQ_DIR: &str = "/sys/devices/system/cpu/cpu0/cpufreq";
const CACHE_DIR: &str = "/sys/devices/system/cpu/cpu0/cache";

/// Aggregated CPU information. Every scalar is sentinel-filled, so callers
/// never need to existence-check a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuInfo {
    pub model: String,
    pub architecture: String,
    pub vendor_id: String,
    pub cpu_family: String,
    pub model_number: String,
    pub stepping: String,
    pub cores: usize,
    pub threads: usize,
    pub sockets: usize,
    pub flags: Vec<String>,
    pub l1d_cache: String,
    pub l1i_cache: String,
    pub l2_cache: String,
    pub l3_cache: String,
    pub current_freq: String,
    pub max_freq: String,
    pub min_freq: String,
}

impl CpuInfo {
    /// Headline fields for the overview screen.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Processor", self.model.clone()),
            (
                "Cores",
                format!("{} cores, {} threads", self.cores, self.threads),
            ),
            ("Frequency", self.current_freq.clone()),
            ("Cache L3", self.l3_cache.clone()),
        ]
    }
}

pub struct CpuReader {
    lscpu: bool,
}

impl CpuReader {
    pub fn new() -> Self {
        Self {
            lscpu: probe::command_available("lscpu"),
        }
    }

    /// Gather everything the schema defines, falling back source by source.
    pub fn collect(&self) -> CpuInfo {
        let cpuinfo = parse_cpuinfo(&read_file(CPUINFO_PATH));
        let lscpu = if self.lscpu {
            parse_lscpu(&probe::run("lscpu", &[]))
        } else {
            debug!("lscpu unavailable, relying on /proc/cpuinfo");
            HashMap::new()
        };

        let cache = cache_sizes(&lscpu);
        let (current_freq, max_freq, min_freq) = frequencies(&cpuinfo);
        let (cores, threads, sockets) = topology(&lscpu);

        let field = |primary: Option<&String>, secondary: Option<&String>| {
            primary
                .or(secondary)
                .cloned()
                .unwrap_or_else(|| UNKNOWN.to_string())
        };

        CpuInfo {
            model: field(cpuinfo.get("model_name"), lscpu.get("model_name")),
            architecture: field(lscpu.get("architecture"), cpuinfo.get("architecture")),
            vendor_id: field(cpuinfo.get("vendor_id"), None),
            cpu_family: field(cpuinfo.get("cpu_family"), None),
            model_number: field(cpuinfo.get("model"), None),
            stepping: field(cpuinfo.get("stepping"), None),
            cores,
            threads,
            sockets,
            flags: cpuinfo
                .get("flags")
                .map(|raw| raw.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            l1d_cache: cache.l1d,
            l1i_cache: cache.l1i,
            l2_cache: cache.l2,
            l3_cache: cache.l3,
            current_freq,
            max_freq,
            min_freq,
        }
    }

}

impl Default for CpuReader {
    fn default() -> Self {
        Self::new()
    }
}

struct CacheSizes {
    l1d: String,
    l1i: String,
    l2: String,
    l3: String,
}

impl CacheSizes {
    fn unknown() -> Self {
        Self {
            l1d: UNKNOWN.to_string(),
            l1i: UNKNOWN.to_string(),
            l2: UNKNOWN.to_string(),
            l3: UNKNOWN.to_string(),
        }
    }
}

fn read_file(path: impl AsRef<Path>) -> String {
    fs::read_to_string(path)
        .map(|content| content.trim().to_string())
        .unwrap_or_default()
}

/// Cache sizes from the lscpu map when it actually carries cache keys,
/// else the cpu0 sysfs cache tree. An installed lscpu can still produce
/// nothing usable (containers, stub builds), so the gate is the parsed
/// content, not tool presence.
fn cache_sizes(lscpu: &HashMap<String, String>) -> CacheSizes {
    let mut cache = CacheSizes::unknown();
    let has_cache_keys = ["l1d_cache", "l1i_cache", "l2_cache", "l3_cache"]
        .iter()
        .any(|key| lscpu.contains_key(*key));
    if has_cache_keys {
        let get = |key: &str| {
            lscpu
                .get(key)
                .cloned()
                .unwrap_or_else(|| UNKNOWN.to_string())
        };
        cache.l1d = get("l1d_cache");
        cache.l1i = get("l1i_cache");
        cache.l2 = get("l2_cache");
        cache.l3 = get("l3_cache");
    } else if let Ok(entries) = fs::read_dir(CACHE_DIR) {
        for entry in entries.flatten() {
            let index = entry.path();
            if !index.is_dir() {
                continue;
            }
            let level = read_file(index.join("level"));
            let size = read_file(index.join("size"));
            if level.is_empty() || size.is_empty() {
                continue;
            }
            let slot = match (level.as_str(), read_file(index.join("type")).as_str()) {
                ("1", "Data") => &mut cache.l1d,
                ("1", "Instruction") => &mut cache.l1i,
                ("2", _) => &mut cache.l2,
                ("3", _) => &mut cache.l3,
                _ => continue,
            };
            *slot = size;
        }
    }
    cache
}

/// Core/thread/socket counts. lscpu fields win when the CPU count parsed;
/// otherwise the fallback counts `processor` lines and reads `cpu cores`
/// from /proc/cpuinfo. Core count defaults to the thread count, never zero.
fn topology(lscpu: &HashMap<String, String>) -> (usize, usize, usize) {
    let parse = |key: &str| lscpu.get(key).and_then(|v| v.parse::<usize>().ok());
    if let Some(threads) = parse("cpu") {
        let cores = parse("core_per_socket").unwrap_or(0);
        let sockets = parse("socket").unwrap_or(1);
        return normalize_topology(cores, threads, sockets);
    }
    let content = read_file(CPUINFO_PATH);
    let (cores, threads) = count_cores_threads(&content);
    normalize_topology(cores, threads, 1)
}

/// Live frequencies from cpufreq sysfs; current falls back to the
/// `cpu MHz` field of /proc/cpuinfo.
fn frequencies(cpuinfo: &HashMap<String, String>) -> (String, String, String) {
    let read_freq = |name: &str| {
        read_file(Path::new(CPUFREQ_DIR).join(name))
            .parse::<u64>()
            .ok()
            .map(units::khz_to_mhz)
    };

    let current = read_freq("scaling_cur_freq")
        .or_else(|| cpuinfo.get("cpu_mhz").map(|mhz| format!("{mhz} MHz")))
        .unwrap_or_else(|| UNKNOWN.to_string());
    let max = read_freq("scaling_max_freq").unwrap_or_else(|| UNKNOWN.to_string());
    let min = read_freq("scaling_min_freq").unwrap_or_else(|| UNKNOWN.to_string());
    (current, max, min)
}

/// Parse the first processor block of /proc/cpuinfo into a normalized map
/// (keys lower-cased, spaces replaced with underscores).
fn parse_cpuinfo(content: &str) -> HashMap<String, String> {
    let first_block = content.split("\n\n").next().unwrap_or("");
    let mut data = HashMap::new();
    for line in first_block.lines() {
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim().replace(' ', "_").to_lowercase();
            data.insert(key, value.trim().to_string());
        }
    }
    data
}

/// Parse lscpu output: keys lower-cased, `(s)` suffixes stripped, spaces
/// replaced ("Core(s) per socket" becomes "core_per_socket").
fn parse_lscpu(output: &str) -> HashMap<String, String> {
    let mut data = HashMap::new();
    for line in output.lines() {
        if let Some((key, value)) = line.split_once(':') {
            let key = key
                .trim()
                .replace("(s)", "")
                .replace(' ', "_")
                .to_lowercase();
            data.insert(key, value.trim().to_string());
        }
    }
    data
}

/// Topology from a raw /proc/cpuinfo dump: threads from repeated
/// `processor` lines, cores from the `cpu cores` field.
fn count_cores_threads(content: &str) -> (usize, usize) {
    let threads = content.matches("processor\t:").count();
    let cores = content
        .lines()
        .find(|line| line.starts_with("cpu cores"))
        .and_then(|line| line.split_once(':'))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    (cores, threads)
}

fn normalize_topology(cores: usize, threads: usize, sockets: usize) -> (usize, usize, usize) {
    let threads = threads.max(1);
    let cores = if cores > 0 { cores } else { threads };
    let sockets = sockets.max(1);
    (cores, threads, sockets)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CPUINFO: &str = "\
processor\t: 0
vendor_id\t: GenuineIntel
cpu family\t: 6
model\t\t: 142
model name\t: Intel(R) Core(TM) i7-8650U CPU @ 1.90GHz
stepping\t: 10
cpu MHz\t\t: 2112.007
cache size\t: 8192 KB
cpu cores\t: 4
flags\t\t: fpu vme de pse tsc msr sse sse2 avx2

processor\t: 1
vendor_id\t: GenuineIntel
model name\t: Intel(R) Core(TM) i7-8650U CPU @ 1.90GHz
";

    const SAMPLE_LSCPU: &str = "\
Architecture:        x86_64
CPU op-mode(s):      32-bit, 64-bit
CPU(s):              8
Core(s) per socket:  4
Socket(s):           1
Model name:          Intel(R) Core(TM) i7-8650U CPU @ 1.90GHz
L1d cache:           128 KiB
L1i cache:           128 KiB
L2 cache:            1 MiB
L3 cache:            8 MiB
";

    #[test]
    fn cpuinfo_parse_normalizes_keys_and_stops_at_first_block() {
        let data = parse_cpuinfo(SAMPLE_CPUINFO);
        assert_eq!(
            data.get("model_name").unwrap(),
            "Intel(R) Core(TM) i7-8650U CPU @ 1.90GHz"
        );
        assert_eq!(data.get("vendor_id").unwrap(), "GenuineIntel");
        assert_eq!(data.get("cpu_family").unwrap(), "6");
        assert_eq!(data.get("cpu_mhz").unwrap(), "2112.007");
        // the second processor block must not bleed in
        assert_eq!(data.get("processor").unwrap(), "0");
    }

    #[test]
    fn lscpu_parse_strips_plural_markers() {
        let data = parse_lscpu(SAMPLE_LSCPU);
        assert_eq!(data.get("cpu").unwrap(), "8");
        assert_eq!(data.get("core_per_socket").unwrap(), "4");
        assert_eq!(data.get("socket").unwrap(), "1");
        assert_eq!(data.get("architecture").unwrap(), "x86_64");
        assert_eq!(data.get("l3_cache").unwrap(), "8 MiB");
    }

    #[test]
    fn fallback_topology_counts_processor_lines() {
        let (cores, threads) = count_cores_threads(SAMPLE_CPUINFO);
        assert_eq!(cores, 4);
        assert_eq!(threads, 2);
    }

    #[test]
    fn topology_uses_lscpu_fields_when_they_parse() {
        let data = parse_lscpu(SAMPLE_LSCPU);
        assert_eq!(topology(&data), (4, 8, 1));
    }

    #[test]
    fn empty_lscpu_map_falls_back_to_cpuinfo_topology() {
        // installed-but-broken lscpu parses to nothing; counts must still
        // come from /proc/cpuinfo instead of collapsing to 1/1/1
        let (cores, threads, sockets) = topology(&HashMap::new());
        assert!(cores >= 1);
        assert!(threads >= 1);
        assert!(sockets >= 1);
        let real_threads = count_cores_threads(&read_file(CPUINFO_PATH)).1.max(1);
        assert_eq!(threads, real_threads);
    }

    #[test]
    fn cache_sizes_use_lscpu_keys_when_present() {
        let data = parse_lscpu(SAMPLE_LSCPU);
        let cache = cache_sizes(&data);
        assert_eq!(cache.l1d, "128 KiB");
        assert_eq!(cache.l3, "8 MiB");
    }

    #[test]
    fn cache_sizes_ignore_lscpu_map_without_cache_keys() {
        let mut data = HashMap::new();
        data.insert("architecture".to_string(), "x86_64".to_string());
        let cache = cache_sizes(&data);
        // sysfs fills these in where present; sentinels otherwise, but
        // never an empty string sourced from the useless lscpu map
        assert!(!cache.l1d.is_empty());
        assert!(!cache.l3.is_empty());
    }

    #[test]
    fn topology_never_reports_zero_cores() {
        assert_eq!(normalize_topology(0, 8, 1), (8, 8, 1));
        assert_eq!(normalize_topology(0, 0, 0), (1, 1, 1));
        assert_eq!(normalize_topology(4, 8, 2), (4, 8, 2));
    }

    #[test]
    fn frequency_falls_back_to_cpuinfo_mhz() {
        // no cpufreq sysfs in most CI containers, so the cpuinfo field wins
        let cpuinfo = parse_cpuinfo(SAMPLE_CPUINFO);
        let (current, _, _) = frequencies(&cpuinfo);
        assert!(current.ends_with(" MHz") || current == UNKNOWN);
    }

    #[test]
    fn collect_fills_every_schema_field() {
        let info = CpuReader::new().collect();
        assert!(!info.model.is_empty());
        assert!(!info.architecture.is_empty());
        assert!(info.cores >= 1);
        assert!(info.threads >= 1);
        assert!(info.sockets >= 1);
        assert!(!info.current_freq.is_empty());
        assert!(!info.l3_cache.is_empty());
    }

    #[test]
    fn summary_projects_headline_fields() {
        let mut info = CpuReader::new().collect();
        info.model = "Test CPU".to_string();
        info.cores = 4;
        info.threads = 8;
        let summary = info.summary();
        assert_eq!(summary[0], ("Processor", "Test CPU".to_string()));
        assert_eq!(summary[1].1, "4 cores, 8 threads");
    }
}
