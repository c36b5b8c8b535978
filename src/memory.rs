//! Free RAM readout drawn next to the panel title.

use std::io;

use mockall::automock;
use strum::Display;
use sysinfo::System;

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

const HEALTHY_FREE: u64 = 9 * MIB;
const NEUTRAL_FREE: u64 = 3 * MIB;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryUsage {
    pub total: u64,
    pub used: u64,
}

/// Colour class of the readout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum RamHealth {
    Healthy,
    Neutral,
    Low,
}

/// System memory query capability.
#[automock]
pub trait MemoryInfo {
    fn usage(&mut self) -> io::Result<MemoryUsage>;
}

/// [`MemoryInfo`] over the host's memory counters.
pub struct SystemMemory {
    system: System,
}

impl Default for SystemMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemMemory {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl MemoryInfo for SystemMemory {
    fn usage(&mut self) -> io::Result<MemoryUsage> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "memory counters unavailable",
            ));
        }
        Ok(MemoryUsage {
            total,
            used: self.system.used_memory(),
        })
    }
}

/// Formats `total - used` as GB from 1 GiB up, MB below, with four
/// significant digits (three decimals under 1).
pub fn format_free_ram(total: u64, used: u64) -> (String, RamHealth) {
    let free = total.saturating_sub(used);
    let (value, unit) = if free >= GIB {
        (free as f64 / GIB as f64, "GB")
    } else {
        (free as f64 / MIB as f64, "MB")
    };
    let decimals = if value >= 1000.0 {
        0
    } else if value >= 100.0 {
        1
    } else if value >= 10.0 {
        2
    } else {
        3
    };

    let health = if free >= HEALTHY_FREE {
        RamHealth::Healthy
    } else if free >= NEUTRAL_FREE {
        RamHealth::Neutral
    } else {
        RamHealth::Low
    };

    (format!("{:.*} {} Free", decimals, value, unit), health)
}
