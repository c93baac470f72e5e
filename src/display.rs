//! Terminal rendering: box-drawing tables and the menu surface.

use colored::Colorize;

use crate::hardware::{
    BoardInfo, CpuInfo, GpuInfo, MemoryInfo, SensorInfo, Snapshot, StorageInfo,
};

const FLAG_DISPLAY_LIMIT: usize = 30;

pub fn print_banner() {
    println!();
    println!("{}", "  ██╗     ██╗  ██╗      ███████╗".bright_cyan());
    println!("{}", "  ██║     ╚██╗██╔╝      ╚══███╔╝".bright_cyan());
    println!("{}", "  ██║      ╚███╔╝ █████╗  ███╔╝ ".bright_cyan());
    println!("{}", "  ██║      ██╔██╗ ╚════╝ ███╔╝  ".bright_cyan());
    println!("{}", "  ███████╗██╔╝ ██╗      ███████╗".bright_cyan());
    println!("{}", "  ╚══════╝╚═╝  ╚═╝      ╚══════╝".bright_cyan());
    println!("  {}", "Linux Hardware Analyzer".bright_white().italic());
    println!();
}

pub fn print_menu() {
    let items = [
        ("1", "CPU Information"),
        ("2", "Memory (RAM) Information"),
        ("3", "Storage Devices"),
        ("4", "GPU Information"),
        ("5", "Motherboard & BIOS"),
        ("6", "Sensors & Hardware Monitor"),
        ("7", "Complete System Overview"),
        ("8", "Export Report (JSON/TXT)"),
        ("0", "Exit"),
    ];
    println!("{}", "Main Menu".bold().cyan());
    for (option, description) in items {
        println!("  [{}] {description}", option.yellow());
    }
    println!();
}

pub fn print_cpu(info: &CpuInfo) {
    print_table(
        "CPU Information",
        &[
            ("Processor", info.model.clone()),
            ("Architecture", info.architecture.clone()),
            ("Vendor ID", info.vendor_id.clone()),
            ("CPU Family", info.cpu_family.clone()),
            ("Model Number", info.model_number.clone()),
            ("Stepping", info.stepping.clone()),
        ],
    );
    print_table(
        "Core & Thread Configuration",
        &[
            ("Physical Cores", info.cores.to_string()),
            ("Logical Processors", info.threads.to_string()),
            ("Sockets", info.sockets.to_string()),
        ],
    );
    print_table(
        "Frequency Information",
        &[
            ("Current Frequency", info.current_freq.clone()),
            ("Maximum Frequency", info.max_freq.clone()),
            ("Minimum Frequency", info.min_freq.clone()),
        ],
    );
    print_table(
        "Cache Information",
        &[
            ("L1 Data Cache", info.l1d_cache.clone()),
            ("L1 Instruction Cache", info.l1i_cache.clone()),
            ("L2 Cache", info.l2_cache.clone()),
            ("L3 Cache", info.l3_cache.clone()),
        ],
    );
    if !info.flags.is_empty() {
        let shown: Vec<&str> = info
            .flags
            .iter()
            .take(FLAG_DISPLAY_LIMIT)
            .map(String::as_str)
            .collect();
        println!("{}", "CPU Features (Selected)".bold().cyan());
        println!("  {}", shown.join(", "));
        println!();
    }
}

pub fn print_memory(info: &MemoryInfo) {
    print_table(
        "Memory Overview",
        &[
            ("Total RAM", info.total.clone()),
            ("Available RAM", info.available.clone()),
            ("Used RAM", info.used.clone()),
            ("Free RAM", info.free.clone()),
            ("Usage Percentage", info.percent.clone()),
        ],
    );
    print_table(
        "Swap Information",
        &[
            ("Total Swap", info.swap_total.clone()),
            ("Used Swap", info.swap_used.clone()),
            ("Free Swap", info.swap_free.clone()),
            ("Swap Usage", info.swap_percent.clone()),
        ],
    );
    if !info.modules.is_empty() {
        println!("{}", "Memory Modules (DMI)".bold().cyan());
        for module in &info.modules {
            println!(
                "  {}  {}  {}  {}  {}",
                module.locator.yellow(),
                module.size,
                module.module_type,
                module.speed,
                module.manufacturer
            );
        }
        println!();
    }
}

pub fn print_storage(info: &StorageInfo) {
    if info.devices.is_empty() {
        println!("{}", "No storage devices detected".yellow());
        println!();
    }
    for device in &info.devices {
        print_table(
            &format!("Device: {}", device.name),
            &[
                ("Device Path", device.path.clone()),
                ("Model", device.model.clone()),
                ("Size", device.size.clone()),
                ("Type", device.device_type.clone()),
                ("Removable", device.removable.clone()),
                ("Read-Only", device.readonly.clone()),
                ("SMART Health", device.health.clone()),
            ],
        );
    }
    if !info.partitions.is_empty() {
        println!("{}", "Partitions & Filesystems".bold().cyan());
        for part in &info.partitions {
            println!(
                "  {}  {}  {}  {} used of {}  ({})",
                part.device.yellow(),
                part.mountpoint,
                part.fstype,
                part.used,
                part.size,
                part.percent
            );
        }
        println!();
    }
}

pub fn print_gpu(info: &GpuInfo) {
    if info.gpus.is_empty() {
        println!("{}", "No GPU information available".yellow());
        println!();
    }
    for (idx, gpu) in info.gpus.iter().enumerate() {
        print_table(
            &format!("GPU #{}", idx + 1),
            &[
                ("Device", gpu.device.clone()),
                ("Vendor", gpu.vendor.clone()),
                ("Model", gpu.model.clone()),
                ("Driver", gpu.driver.clone()),
                ("Driver Version", gpu.driver_version.clone()),
                ("VRAM", gpu.vram.clone()),
            ],
        );
    }
    print_table(
        "Graphics API Support",
        &[
            ("OpenGL", info.opengl.clone()),
            ("Vulkan", info.vulkan.clone()),
        ],
    );
}

pub fn print_board(info: &BoardInfo) {
    print_table(
        "Motherboard Information",
        &[
            ("Manufacturer", info.manufacturer.clone()),
            ("Product Name", info.product.clone()),
            ("Version", info.version.clone()),
            ("Serial Number", info.serial.clone()),
        ],
    );
    print_table(
        "BIOS/UEFI Information",
        &[
            ("Vendor", info.bios_vendor.clone()),
            ("Version", info.bios_version.clone()),
            ("Release Date", info.bios_date.clone()),
        ],
    );
}

pub fn print_sensors(info: &SensorInfo) {
    if !info.temperatures.is_empty() {
        println!("{}", "Temperature Sensors".bold().cyan());
        for (sensor, temp) in &info.temperatures {
            println!("  {}  {temp}  {}", sensor.yellow(), temperature_status(temp));
        }
        println!();
    }
    if !info.fans.is_empty() {
        println!("{}", "Fan Speeds".bold().cyan());
        for (fan, speed) in &info.fans {
            println!("  {}  {speed}", fan.yellow());
        }
        println!();
    }
    if !info.battery.is_empty() {
        let rows: Vec<(&str, String)> = info
            .battery
            .iter()
            .map(|(key, value)| (key.as_str(), value.clone()))
            .collect();
        print_table("Battery Information", &rows);
    }
    if info.temperatures.is_empty() && info.fans.is_empty() && info.battery.is_empty() {
        println!(
            "{}",
            "No sensor information available. Run with sudo for better results.".yellow()
        );
        println!();
    }
}

pub fn print_overview(snapshot: &Snapshot) {
    let sections: [(&str, Vec<(&'static str, String)>); 5] = [
        ("CPU", snapshot.cpu.summary()),
        ("Memory", snapshot.memory.summary()),
        ("Storage", snapshot.storage.summary()),
        ("GPU", snapshot.gpu.summary()),
        ("Sensors", snapshot.sensors.summary()),
    ];
    for (title, rows) in sections {
        print_table(title, &rows);
    }
}

/// Classify a formatted temperature reading for the status column.
fn temperature_status(value: &str) -> colored::ColoredString {
    let degrees = value
        .trim_start_matches('+')
        .trim_end_matches("°C")
        .parse::<f64>()
        .unwrap_or(0.0);
    if degrees > 80.0 {
        "Hot".red()
    } else if degrees > 60.0 {
        "Warm".yellow()
    } else {
        "Normal".green()
    }
}

/// Two-column property table in a double-line box.
fn print_table(title: &str, rows: &[(&str, String)]) {
    print!("{}", render_table(title, rows));
    println!();
}

fn render_table(title: &str, rows: &[(&str, String)]) -> String {
    let label_width = rows
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0)
        .max(12);
    let value_width = rows
        .iter()
        .map(|(_, value)| value.chars().count())
        .max()
        .unwrap_or(0)
        .max(title.chars().count());
    let inner = label_width + value_width + 3;

    let mut out = String::new();
    out.push_str(&format!("╔{}╗\n", "═".repeat(inner)));
    out.push_str(&format!(
        "║{}║\n",
        format!("{title:^inner$}").bold().cyan()
    ));
    out.push_str(&format!("╠{}╣\n", "═".repeat(inner)));
    for (label, value) in rows {
        let padded_label = format!("{label:<label_width$}");
        let padded_value = format!("{value:<value_width$}");
        out.push_str(&format!("║ {} {padded_value} ║\n", padded_label.yellow()));
    }
    out.push_str(&format!("╚{}╝\n", "═".repeat(inner)));
    out
}
