//! Boot2 flag store.
//!
//! A module is flagged for automatic start on the next boot when its
//! `flags/boot2.flag` file exists. The content is irrelevant. Nothing is
//! cached here: every call goes to storage.

use std::io;
use std::sync::Arc;

use mockall::automock;
use tracing::{debug, warn};

use crate::fs::ContentFs;
use crate::paths::ContentsLayout;
use crate::program_id::ProgramId;

#[automock]
pub trait FlagStore {
    /// True when the flag file exists. Any failure reads as "not flagged".
    fn has_flag(&self, program_id: ProgramId) -> bool;

    /// Creates (`present`) or deletes the flag file. Repeating a call is a no-op.
    fn set_flag(&self, program_id: ProgramId, present: bool) -> io::Result<()>;
}

/// [`FlagStore`] over a [`ContentFs`] session.
pub struct FsFlagStore {
    fs: Arc<dyn ContentFs>,
    layout: ContentsLayout,
}

impl FsFlagStore {
    pub fn new(fs: Arc<dyn ContentFs>, layout: ContentsLayout) -> Self {
        Self { fs, layout }
    }
}

impl FlagStore for FsFlagStore {
    fn has_flag(&self, program_id: ProgramId) -> bool {
        self.fs
            .file_exists(&self.layout.paths_for(program_id).flag_path)
    }

    fn set_flag(&self, program_id: ProgramId, present: bool) -> io::Result<()> {
        let paths = self.layout.paths_for(program_id);
        if present {
            match self.fs.create_dir(&paths.flags_folder) {
                Ok(()) => debug!("Created {}", paths.flags_folder),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => {
                    warn!("Failed to create {}: {}", paths.flags_folder, e);
                    return Err(e);
                }
            }
            self.fs.create_file(&paths.flag_path)
        } else {
            match self.fs.delete_file(&paths.flag_path) {
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                other => other,
            }
        }
    }
}

/// Flag store for a session whose storage never mounted.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableFlagStore;

impl FlagStore for UnavailableFlagStore {
    fn has_flag(&self, _program_id: ProgramId) -> bool {
        false
    }

    fn set_flag(&self, _program_id: ProgramId, _present: bool) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::NotConnected,
            "storage is not mounted",
        ))
    }
}
