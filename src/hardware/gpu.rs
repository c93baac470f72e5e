//! GPU detection module.
//!
//! nvidia-smi output is authoritative when present and wholesale replaces
//! the generic PCI scan (the two sources disagree on model naming, so they
//! are never merged per-field). The PCI path classifies the vendor from the
//! lspci description and chases the kernel driver and its version through
//! lspci -v and modinfo.
//!
//! Everything here runs under the bounded runner: these are exactly the
//! tools that hang on headless or half-configured systems.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::UNKNOWN;
use crate::probe;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuInfo {
    pub gpus: Vec<GpuDevice>,
    pub opengl: String,
    pub vulkan: String,
}

/// One graphics adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuDevice {
    pub device: String,
    pub vendor: String,
    pub model: String,
    pub driver: String,
    pub driver_version: String,
    pub vram: String,
}

impl GpuInfo {
    /// Headline fields for the overview screen.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let primary = self
            .gpus
            .first()
            .map(|gpu| gpu.model.clone())
            .unwrap_or_else(|| UNKNOWN.to_string());
        vec![
            ("GPU Count", self.gpus.len().to_string()),
            ("Primary GPU", primary),
        ]
    }
}

pub struct GpuReader {
    lspci: bool,
    nvidia_smi: bool,
    glxinfo: bool,
    vulkaninfo: bool,
}

impl GpuReader {
    pub fn new() -> Self {
        Self {
            lspci: probe::command_available("lspci"),
            nvidia_smi: probe::command_available("nvidia-smi"),
            glxinfo: probe::command_available("glxinfo"),
            vulkaninfo: probe::command_available("vulkaninfo"),
        }
    }

    pub fn collect(&self) -> GpuInfo {
        // vendor tool output replaces the PCI scan entirely when present
        let nvidia = self.nvidia_devices();
        let gpus = if nvidia.is_empty() {
            self.pci_devices()
        } else {
            nvidia
        };

        GpuInfo {
            gpus,
            opengl: self.opengl_version(),
            vulkan: self.vulkan_version(),
        }
    }

    fn nvidia_devices(&self) -> Vec<GpuDevice> {
        if !self.nvidia_smi {
            return Vec::new();
        }
        let output = self.run(
            "nvidia-smi",
            &[
                "--query-gpu=name,memory.total,driver_version",
                "--format=csv,noheader",
            ],
        );
        parse_nvidia_smi(&output)
    }

    fn pci_devices(&self) -> Vec<GpuDevice> {
        if !self.lspci {
            debug!("lspci unavailable, no GPU enumeration possible");
            return Vec::new();
        }
        let output = self.run("lspci", &[]);
        output
            .lines()
            .filter_map(parse_pci_gpu_line)
            .map(|(slot, description)| {
                let (vendor, model) = classify_pci_description(&description);
                let (driver, driver_version) = self.driver_info(&slot);
                GpuDevice {
                    device: slot,
                    vendor,
                    model,
                    driver,
                    driver_version,
                    vram: UNKNOWN.to_string(),
                }
            })
            .collect()
    }

    /// Kernel driver in use for one PCI slot, plus a vendor-specific version
    /// lookup keyed off the driver name.
    fn driver_info(&self, slot: &str) -> (String, String) {
        let output = self.run("lspci", &["-v", "-s", slot]);
        let driver = output
            .lines()
            .find(|line| line.contains("Kernel driver in use:"))
            .and_then(|line| line.rsplit(':').next())
            .map(|value| value.trim().to_string());

        let driver = match driver {
            Some(driver) if !driver.is_empty() => driver,
            _ => return (UNKNOWN.to_string(), UNKNOWN.to_string()),
        };

        let version = match driver.as_str() {
            "nvidia" => self.nvidia_driver_version(),
            "amdgpu" | "radeon" => self.modinfo_version("amdgpu"),
            "i915" | "xe" => self.modinfo_version("i915"),
            _ => UNKNOWN.to_string(),
        };
        (driver, version)
    }

    fn nvidia_driver_version(&self) -> String {
        if !self.nvidia_smi {
            return UNKNOWN.to_string();
        }
        let output = self.run(
            "nvidia-smi",
            &["--query-gpu=driver_version", "--format=csv,noheader"],
        );
        match output.lines().next().map(str::trim) {
            Some(version) if !version.is_empty() => version.to_string(),
            _ => UNKNOWN.to_string(),
        }
    }

    fn modinfo_version(&self, module: &str) -> String {
        let output = self.run("modinfo", &[module]);
        output
            .lines()
            .find_map(|line| line.strip_prefix("version:"))
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    fn opengl_version(&self) -> String {
        if !self.glxinfo {
            return UNKNOWN.to_string();
        }
        let output = self.run("glxinfo", &[]);
        output
            .lines()
            .find(|line| line.contains("OpenGL version string:"))
            .and_then(|line| line.split_once(':'))
            .map(|(_, value)| value.trim().to_string())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    fn vulkan_version(&self) -> String {
        if !self.vulkaninfo {
            return UNKNOWN.to_string();
        }
        let output = self.run("vulkaninfo", &["--summary"]);
        output
            .lines()
            .find(|line| line.contains("apiVersion"))
            .and_then(extract_version_triple)
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    fn run(&self, program: &str, args: &[&str]) -> String {
        probe::run_with_timeout(program, args, probe::PROBE_TIMEOUT)
    }
}

impl Default for GpuReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one line of the nvidia-smi CSV query into a device record.
fn parse_nvidia_smi(output: &str) -> Vec<GpuDevice> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let parts: Vec<&str> = line.split(',').map(str::trim).collect();
            if parts.len() < 3 {
                return None;
            }
            Some(GpuDevice {
                device: "NVIDIA GPU".to_string(),
                vendor: "NVIDIA".to_string(),
                model: parts[0].to_string(),
                driver: "nvidia".to_string(),
                driver_version: parts[2].to_string(),
                vram: parts[1].to_string(),
            })
        })
        .collect()
}

/// Split an lspci line for a display controller into (slot, description).
///
/// Format: `01:00.0 VGA compatible controller: NVIDIA Corporation GA104 ...`
fn parse_pci_gpu_line(line: &str) -> Option<(String, String)> {
    if !line.contains("VGA compatible controller") && !line.contains("3D controller") {
        return None;
    }
    let (slot, rest) = line.split_once(' ')?;
    let (_class, description) = rest.split_once(": ")?;
    Some((slot.to_string(), description.trim().to_string()))
}

/// Classify the vendor by substring and strip corporate boilerplate from
/// the model string.
fn classify_pci_description(description: &str) -> (String, String) {
    if description.contains("NVIDIA") {
        let model = description.replace("NVIDIA Corporation", "");
        ("NVIDIA".to_string(), model.trim().to_string())
    } else if description.contains("AMD") || description.contains("ATI") {
        let model = description
            .replace("Advanced Micro Devices, Inc.", "")
            .replace("[AMD/ATI]", "");
        ("AMD".to_string(), model.trim().to_string())
    } else if description.contains("Intel") {
        let model = description.replace("Intel Corporation", "");
        ("Intel".to_string(), model.trim().to_string())
    } else {
        (UNKNOWN.to_string(), description.to_string())
    }
}

/// First dotted version triple (N.N.N) in a line, without a regex engine.
fn extract_version_triple(line: &str) -> Option<String> {
    line.split(|c: char| !c.is_ascii_digit() && c != '.')
        .find(|token| {
            let parts: Vec<&str> = token.split('.').collect();
            parts.len() == 3
                && parts
                    .iter()
                    .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
        })
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nvidia_csv_parse_builds_device_records() {
        let output = "GeForce RTX 3070, 8192 MiB, 535.154.05\n\
                      GeForce GTX 1650, 4096 MiB, 535.154.05\n";
        let gpus = parse_nvidia_smi(output);
        assert_eq!(gpus.len(), 2);
        assert_eq!(gpus[0].model, "GeForce RTX 3070");
        assert_eq!(gpus[0].vram, "8192 MiB");
        assert_eq!(gpus[0].driver_version, "535.154.05");
        assert_eq!(gpus[0].vendor, "NVIDIA");
    }

    #[test]
    fn nvidia_csv_parse_skips_malformed_lines() {
        assert!(parse_nvidia_smi("garbage\n\n").is_empty());
    }

    #[test]
    fn pci_line_parse_extracts_slot_and_description() {
        let line = "01:00.0 VGA compatible controller: NVIDIA Corporation GA104 [GeForce RTX 3070] (rev a1)";
        let (slot, description) = parse_pci_gpu_line(line).unwrap();
        assert_eq!(slot, "01:00.0");
        assert!(description.starts_with("NVIDIA Corporation"));
    }

    #[test]
    fn pci_line_parse_ignores_non_display_devices() {
        let line = "00:1f.3 Audio device: Intel Corporation Cannon Point-LP High Definition Audio";
        assert!(parse_pci_gpu_line(line).is_none());
    }

    #[test]
    fn intel_description_is_classified_and_stripped() {
        let (vendor, model) = classify_pci_description("Intel Corporation HD Graphics 620");
        assert_eq!(vendor, "Intel");
        assert_eq!(model, "HD Graphics 620");
    }

    #[test]
    fn amd_description_strips_bracket_boilerplate() {
        let (vendor, model) = classify_pci_description(
            "Advanced Micro Devices, Inc. [AMD/ATI] Navi 23 [Radeon RX 6600]",
        );
        assert_eq!(vendor, "AMD");
        assert_eq!(model, "Navi 23 [Radeon RX 6600]");
    }

    #[test]
    fn nvidia_description_strips_corporate_suffix() {
        let (vendor, model) =
            classify_pci_description("NVIDIA Corporation GA104 [GeForce RTX 3070] (rev a1)");
        assert_eq!(vendor, "NVIDIA");
        assert_eq!(model, "GA104 [GeForce RTX 3070] (rev a1)");
    }

    #[test]
    fn version_triple_extraction() {
        assert_eq!(
            extract_version_triple("        apiVersion = 1.3.255").unwrap(),
            "1.3.255"
        );
        assert_eq!(
            extract_version_triple("apiVersion = 4206847 (1.3.255)").unwrap(),
            "1.3.255"
        );
        assert!(extract_version_triple("apiVersion = 42").is_none());
    }

    #[test]
    fn collect_always_returns_api_fields() {
        let info = GpuReader::new().collect();
        assert!(!info.opengl.is_empty());
        assert!(!info.vulkan.is_empty());
    }
}
