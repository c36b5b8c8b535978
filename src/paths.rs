//! Path derivations for a module's folders and flag file.
//!
//! All paths are virtual, absolute within the mounted storage root
//! (`/atmosphere/contents/<id>/flags/boot2.flag`), and depend on nothing but
//! the layout and the program id.

use crate::program_id::ProgramId;

/// Folder holding the per-module flag files.
pub const FLAGS_FOLDER: &str = "flags";

/// Fixed naming scheme for the contents tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentsLayout {
    pub contents_root: String,
    pub descriptor_file: String,
    pub flag_file: String,
}

impl Default for ContentsLayout {
    fn default() -> Self {
        Self {
            contents_root: "/atmosphere/contents".to_string(),
            descriptor_file: "toolbox.json".to_string(),
            flag_file: "boot2.flag".to_string(),
        }
    }
}

impl ContentsLayout {
    fn root(&self) -> &str {
        self.contents_root.trim_end_matches('/')
    }

    /// `<root>/<folder>` for an arbitrary folder name found while scanning.
    pub fn slot_folder(&self, folder_name: &str) -> String {
        format!("{}/{}", self.root(), folder_name)
    }

    /// `<root>/<folder>/<descriptor>` for an arbitrary folder name.
    pub fn descriptor_in(&self, folder_name: &str) -> String {
        format!("{}/{}", self.slot_folder(folder_name), self.descriptor_file)
    }

    pub fn paths_for(&self, program_id: ProgramId) -> ModulePaths {
        let metadata_folder = self.slot_folder(&program_id.folder_name());
        let flags_folder = format!("{}/{}", metadata_folder, FLAGS_FOLDER);
        let flag_path = format!("{}/{}", flags_folder, self.flag_file);
        ModulePaths {
            metadata_folder,
            flags_folder,
            flag_path,
        }
    }
}

/// Paths derived from a program id. Computed once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModulePaths {
    pub metadata_folder: String,
    pub flags_folder: String,
    pub flag_path: String,
}
