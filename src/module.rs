use crate::descriptor::ModuleDescriptor;
use crate::paths::{ContentsLayout, ModulePaths};
use crate::program_id::ProgramId;

/// One discovered sysmodule.
///
/// Identity and paths are fixed at discovery. `running` and `flagged` are the
/// last polled observations, never the source of truth, and `locked` is set
/// once a reboot-required module has been actioned this session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRecord {
    program_id: ProgramId,
    display_name: String,
    requires_reboot: bool,
    paths: ModulePaths,
    pub running: bool,
    pub flagged: bool,
    pub locked: bool,
}

impl ModuleRecord {
    pub fn new(
        program_id: ProgramId,
        display_name: impl Into<String>,
        requires_reboot: bool,
        layout: &ContentsLayout,
    ) -> Self {
        Self {
            program_id,
            display_name: display_name.into(),
            requires_reboot,
            paths: layout.paths_for(program_id),
            running: false,
            flagged: false,
            locked: false,
        }
    }

    pub fn from_descriptor(
        descriptor: &ModuleDescriptor,
        version_delimiter: &str,
        layout: &ContentsLayout,
    ) -> Self {
        Self::new(
            descriptor.program_id,
            descriptor.display_name(version_delimiter),
            descriptor.requires_reboot,
            layout,
        )
    }

    pub fn program_id(&self) -> ProgramId {
        self.program_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn requires_reboot(&self) -> bool {
        self.requires_reboot
    }

    pub fn flag_path(&self) -> &str {
        &self.paths.flag_path
    }

    pub fn flags_folder(&self) -> &str {
        &self.paths.flags_folder
    }

    pub fn metadata_folder(&self) -> &str {
        &self.paths.metadata_folder
    }
}
