//! Module registry: discovers installed sysmodules once per session.
//!
//! The contents root is enumerated, every folder shaped like an install slot
//! has its descriptor parsed, and the resulting records are sorted by display
//! name. A broken descriptor only drops its own entry. Failing to open the
//! root leaves the registry empty in the [`ScanOutcome::Failed`] state, which
//! the view reports differently from a successful scan that found nothing.

use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::PanelConfig;
use crate::descriptor::{read_descriptor, DescriptorError};
use crate::fs::ContentFs;
use crate::module::ModuleRecord;
use crate::program_id::{is_module_slot, ProgramId};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Failed to open modules root {path}: {source}")]
    RootUnavailable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Scanned,
    Failed,
}

#[derive(Debug, Clone)]
pub struct ModuleRegistry {
    modules: Vec<ModuleRecord>,
    outcome: ScanOutcome,
}

impl ModuleRegistry {
    /// Registry for a session whose storage could not be reached at all.
    pub fn failed() -> Self {
        Self {
            modules: Vec::new(),
            outcome: ScanOutcome::Failed,
        }
    }

    /// Registry over already discovered records. Later duplicates of a
    /// program id are dropped.
    pub fn from_records(records: Vec<ModuleRecord>) -> Self {
        let mut seen = HashSet::new();
        let mut modules: Vec<ModuleRecord> = records
            .into_iter()
            .filter(|m| seen.insert(m.program_id()))
            .collect();
        sort_by_display_name(&mut modules);
        Self {
            modules,
            outcome: ScanOutcome::Scanned,
        }
    }

    /// Scans the contents root, degrading to [`ModuleRegistry::failed`] when
    /// the root cannot be opened.
    pub fn scan(fs: &dyn ContentFs, config: &PanelConfig) -> Self {
        match Self::try_scan(fs, config) {
            Ok(registry) => registry,
            Err(e) => {
                warn!("Module scan failed: {}", e);
                Self::failed()
            }
        }
    }

    pub fn try_scan(fs: &dyn ContentFs, config: &PanelConfig) -> Result<Self, ScanError> {
        let layout = config.layout();
        let entries =
            fs.read_dir(&layout.contents_root)
                .map_err(|source| ScanError::RootUnavailable {
                    path: layout.contents_root.clone(),
                    source,
                })?;

        let mut seen = HashSet::new();
        let mut modules = Vec::new();

        for entry in entries {
            if !entry.is_dir() || !is_module_slot(&entry.name) {
                debug!("Skipping {}: not a module slot", entry.name);
                continue;
            }

            let descriptor_path = layout.descriptor_in(&entry.name);
            let descriptor = match read_descriptor(fs, &descriptor_path) {
                Ok(descriptor) => descriptor,
                Err(DescriptorError::Io { source, .. })
                    if source.kind() == std::io::ErrorKind::NotFound =>
                {
                    debug!("Skipping {}: no descriptor", entry.name);
                    continue;
                }
                Err(e) => {
                    warn!("Skipping {}: {}", entry.name, e);
                    continue;
                }
            };

            if config.is_reserved(descriptor.program_id) {
                debug!("Skipping reserved program {}", descriptor.program_id);
                continue;
            }
            if !seen.insert(descriptor.program_id) {
                warn!(
                    "Skipping {}: program {} already listed",
                    entry.name, descriptor.program_id
                );
                continue;
            }

            modules.push(ModuleRecord::from_descriptor(
                &descriptor,
                &config.version_delimiter,
                &layout,
            ));
        }

        info!("Found {} sysmodules", modules.len());
        Ok(Self::from_records(modules))
    }

    pub fn outcome(&self) -> ScanOutcome {
        self.outcome
    }

    pub fn scan_failed(&self) -> bool {
        self.outcome == ScanOutcome::Failed
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleRecord> {
        self.modules.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ModuleRecord> {
        self.modules.iter_mut()
    }

    /// Modules that can be started and stopped live.
    pub fn dynamic_modules(&self) -> impl Iterator<Item = &ModuleRecord> {
        self.modules.iter().filter(|m| !m.requires_reboot())
    }

    /// Modules that only take effect after a reboot.
    pub fn static_modules(&self) -> impl Iterator<Item = &ModuleRecord> {
        self.modules.iter().filter(|m| m.requires_reboot())
    }

    pub fn get(&self, program_id: ProgramId) -> Option<&ModuleRecord> {
        self.modules.iter().find(|m| m.program_id() == program_id)
    }

    pub fn get_mut(&mut self, program_id: ProgramId) -> Option<&mut ModuleRecord> {
        self.modules.iter_mut().find(|m| m.program_id() == program_id)
    }
}

/// Stable ordinal sort on display names.
pub fn sort_by_display_name(modules: &mut [ModuleRecord]) {
    modules.sort_by(|a, b| a.display_name().cmp(b.display_name()));
}
