//! Unit conversions applied at the display boundary. Internal code keeps
//! raw integers; only formatted strings leave the crate.

/// Human-readable size with 1024-based units and two decimals.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    for unit in UNITS {
        if value < 1024.0 {
            return format!("{value:.2} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.2} PB")
}

/// Usage ratio with one decimal. Zero total reads as zero usage rather
/// than dividing by it.
pub fn format_percent(used: u64, total: u64) -> String {
    if total == 0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", used as f64 / total as f64 * 100.0)
}

/// cpufreq sysfs reports kHz.
pub fn khz_to_mhz(khz: u64) -> String {
    format!("{:.2} MHz", khz as f64 / 1000.0)
}

/// thermal and hwmon sysfs report millidegrees.
pub fn millidegrees_to_celsius(raw: i64) -> String {
    format!("{:.1}°C", raw as f64 / 1000.0)
}

/// power-supply sysfs reports microwatt-hours.
pub fn microwatt_hours_to_wh(raw: u64) -> f64 {
    raw as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_format_at_unit_boundaries() {
        assert_eq!(format_bytes(0), "0.00 B");
        assert_eq!(format_bytes(1023), "1023.00 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536 * 1024 * 1024), "1.50 GB");
        assert_eq!(format_bytes(u64::MAX), "16384.00 PB");
    }

    #[test]
    fn percent_guards_zero_total() {
        assert_eq!(format_percent(0, 0), "0.0%");
        assert_eq!(format_percent(1, 0), "0.0%");
        assert_eq!(format_percent(1, 2), "50.0%");
        assert_eq!(format_percent(1, 3), "33.3%");
    }

    #[test]
    fn frequency_conversion() {
        assert_eq!(khz_to_mhz(2_400_000), "2400.00 MHz");
        assert_eq!(khz_to_mhz(800_000), "800.00 MHz");
    }

    #[test]
    fn temperature_conversion() {
        assert_eq!(millidegrees_to_celsius(45_000), "45.0°C");
        assert_eq!(millidegrees_to_celsius(-5_500), "-5.5°C");
    }

    #[test]
    fn energy_counter_to_watt_hours() {
        assert!((microwatt_hours_to_wh(52_340_000) - 52.34).abs() < f64::EPSILON);
    }
}
