use anyhow::Result;
use log::info;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use sysinfo::System;

/// Dump a snapshot of the host next to a run's results, so persisted
/// timings stay interpretable later
#[rustfmt::skip]
pub fn dump_sys_info(file: &Path) -> Result<()> {
    info!("Writing system info to {file:?}");
    let mut file = File::create(file)?;
    let mut sys = System::new_all();
    sys.refresh_all();

    writeln!(file, "{:<25}{}", "System name:", System::name().unwrap_or_else(|| "<unknown>".to_owned()))?;
    writeln!(file, "{:<25}{}", "System kernel version:", System::kernel_version().unwrap_or_else(|| "<unknown>".to_owned()))?;
    writeln!(file, "{:<25}{}", "System OS version:", System::long_os_version().unwrap_or_else(|| "<unknown>".to_owned()))?;
    writeln!(file, "{:<25}{}", "CPU Arch:", System::cpu_arch())?;

    let processors = sys.cpus();
    if let Some(processor) = processors.first() {
        writeln!(file, "{:<25}{} {} ({}) @ {:.2} GHz",
            "CPU:",
            processor.name(),
            processor.brand(),
            processors.len(),
            processor.frequency() as f64 / 1000.0)?;
    } else {
        writeln!(file, "CPU: Unknown")?;
    }

    writeln!(file, "{:<25}{} bytes", "Total memory:", sys.total_memory())?;
    writeln!(file, "{:<25}{} bytes", "Used memory:", sys.used_memory())?;
    writeln!(file, "{:<25}{} bytes", "Total swap:", sys.total_swap())?;
    writeln!(file, "{:<25}{} bytes", "Used swap:", sys.used_swap())?;

    let uptime = System::uptime();
    writeln!(file, "{:<25}{}", "Uptime (seconds):", uptime)?;
    Ok(())
}
