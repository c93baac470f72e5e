//! Sensor detection module.
//!
//! lm-sensors formatted output is preferred for temperatures and fan
//! speeds. When it yields no temperatures, the thermal-zone and hwmon sysfs
//! trees are scanned and merged, hwmon winning on key collision because its
//! labels are more specific. Battery attributes come from the first BAT*
//! power-supply directory only.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use super::UNKNOWN;
use crate::probe;
use crate::units;

const THERMAL_DIR: &str = "/sys/class/thermal";
const HWMON_DIR: &str = "/sys/class/hwmon";
const POWER_SUPPLY_DIR: &str = "/sys/class/power_supply";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorInfo {
    pub temperatures: BTreeMap<String, String>,
    pub fans: BTreeMap<String, String>,
    pub battery: BTreeMap<String, String>,
}

impl SensorInfo {
    /// Headline fields for the overview screen.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let mut summary = Vec::new();
        if !self.temperatures.is_empty() {
            summary.push(("Temperature Sensors", self.temperatures.len().to_string()));
        }
        if !self.fans.is_empty() {
            summary.push(("Fans Detected", self.fans.len().to_string()));
        }
        if !self.battery.is_empty() {
            let capacity = self
                .battery
                .get("Capacity")
                .cloned()
                .unwrap_or_else(|| UNKNOWN.to_string());
            summary.push(("Battery", capacity));
        }
        if summary.is_empty() {
            summary.push(("Sensors", "No data available".to_string()));
        }
        summary
    }
}

pub struct SensorReader {
    sensors: bool,
}

impl SensorReader {
    pub fn new() -> Self {
        Self {
            sensors: probe::command_available("sensors"),
        }
    }

    pub fn collect(&self) -> SensorInfo {
        let (mut temperatures, fans) = if self.sensors {
            let output = probe::run_with_timeout("sensors", &[], probe::PROBE_TIMEOUT);
            parse_sensors_output(&output)
        } else {
            debug!("lm-sensors unavailable, scanning sysfs");
            (BTreeMap::new(), BTreeMap::new())
        };

        if temperatures.is_empty() {
            temperatures = merge_temperatures(thermal_zone_temps(), hwmon_temps());
        }

        SensorInfo {
            temperatures,
            fans,
            battery: battery_info(),
        }
    }
}

impl Default for SensorReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract temperatures (Celsius-suffixed) and fan speeds (RPM-suffixed)
/// from `sensors` output.
fn parse_sensors_output(output: &str) -> (BTreeMap<String, String>, BTreeMap<String, String>) {
    let mut temperatures = BTreeMap::new();
    let mut fans = BTreeMap::new();

    for raw in output.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("Adapter:") {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let (name, value) = (name.trim(), value.trim());

        if let Some(temp) = extract_celsius(value) {
            temperatures.insert(name.to_string(), temp);
        } else if let Some(rpm) = extract_rpm(value) {
            fans.insert(name.to_string(), rpm);
        }
    }

    (temperatures, fans)
}

/// Pull a `+45.0°C`-style reading out of a sensor value column.
fn extract_celsius(value: &str) -> Option<String> {
    let end = value.find("°C")?;
    let head = &value[..end];
    let mut start = end;
    for (pos, ch) in head.char_indices().rev() {
        if ch.is_ascii_digit() || ch == '.' || ch == '+' || ch == '-' {
            start = pos;
        } else {
            break;
        }
    }
    let number = &value[start..end];
    if number.contains('.') && number.chars().any(|c| c.is_ascii_digit()) {
        Some(format!("{number}°C"))
    } else {
        None
    }
}

/// Pull a `1200 RPM`-style reading out of a sensor value column.
fn extract_rpm(value: &str) -> Option<String> {
    let end = value.find("RPM")?;
    let digits: String = value[..end]
        .trim_end()
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if digits.is_empty() {
        return None;
    }
    Some(format!("{digits} RPM"))
}

/// hwmon readings overwrite thermal-zone readings on key collision.
fn merge_temperatures(
    thermal: BTreeMap<String, String>,
    hwmon: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = thermal;
    for (key, value) in hwmon {
        merged.insert(key, value);
    }
    merged
}

/// Temperatures from /sys/class/thermal, labeled by each zone's type file.
fn thermal_zone_temps() -> BTreeMap<String, String> {
    let mut temps = BTreeMap::new();
    let Ok(entries) = fs::read_dir(THERMAL_DIR) else {
        return temps;
    };
    for entry in entries.flatten() {
        let zone = entry.file_name().to_string_lossy().into_owned();
        if !zone.starts_with("thermal_zone") {
            continue;
        }
        let dir = entry.path();
        let Ok(raw) = read_file(dir.join("temp")).parse::<i64>() else {
            continue;
        };
        let name = match read_file(dir.join("type")) {
            label if !label.is_empty() => label,
            _ => zone,
        };
        temps.insert(name, units::millidegrees_to_celsius(raw));
    }
    temps
}

/// Temperatures from /sys/class/hwmon, keyed "<chip> - <label>".
fn hwmon_temps() -> BTreeMap<String, String> {
    let mut temps = BTreeMap::new();
    let Ok(chips) = fs::read_dir(HWMON_DIR) else {
        return temps;
    };
    for chip in chips.flatten() {
        let dir = chip.path();
        let chip_name = match read_file(dir.join("name")) {
            name if !name.is_empty() => name,
            _ => chip.file_name().to_string_lossy().into_owned(),
        };

        let Ok(files) = fs::read_dir(&dir) else {
            continue;
        };
        for file in files.flatten() {
            let file_name = file.file_name().to_string_lossy().into_owned();
            let Some(sensor) = file_name
                .strip_suffix("_input")
                .filter(|stem| stem.starts_with("temp"))
            else {
                continue;
            };
            let Ok(raw) = read_file(file.path()).parse::<i64>() else {
                continue;
            };
            let label = match read_file(dir.join(format!("{sensor}_label"))) {
                label if !label.is_empty() => label,
                _ => sensor.to_string(),
            };
            temps.insert(
                format!("{chip_name} - {label}"),
                units::millidegrees_to_celsius(raw),
            );
        }
    }
    temps
}

/// Attributes of the first battery device found; additional batteries are
/// not aggregated.
fn battery_info() -> BTreeMap<String, String> {
    let mut battery = BTreeMap::new();
    let Ok(entries) = fs::read_dir(POWER_SUPPLY_DIR) else {
        return battery;
    };

    let mut names: Vec<String> = entries
        .flatten()
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("BAT"))
        .collect();
    names.sort();

    let Some(name) = names.first() else {
        return battery;
    };
    let dir = Path::new(POWER_SUPPLY_DIR).join(name);

    let capacity = read_file(dir.join("capacity"));
    if !capacity.is_empty() {
        battery.insert("Capacity".to_string(), format!("{capacity}%"));
    }
    let status = read_file(dir.join("status"));
    if !status.is_empty() {
        battery.insert("Status".to_string(), status);
    }
    if let (Ok(now), Ok(full)) = (
        read_file(dir.join("energy_now")).parse::<u64>(),
        read_file(dir.join("energy_full")).parse::<u64>(),
    ) {
        battery.insert(
            "Energy".to_string(),
            format!(
                "{:.2} Wh / {:.2} Wh",
                units::microwatt_hours_to_wh(now),
                units::microwatt_hours_to_wh(full)
            ),
        );
    }
    let manufacturer = read_file(dir.join("manufacturer"));
    if !manufacturer.is_empty() {
        battery.insert("Manufacturer".to_string(), manufacturer);
    }
    let model = read_file(dir.join("model_name"));
    if !model.is_empty() {
        battery.insert("Model".to_string(), model);
    }

    battery
}

fn read_file(path: impl AsRef<Path>) -> String {
    fs::read_to_string(path)
        .map(|content| content.trim().to_string())
        .unwrap_or_default()
}
