use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};
use thiserror::Error;

use crate::paths::ContentsLayout;
use crate::program_id::{ProgramId, OVERLAY_HOST_ID};
use crate::status::StatusLabels;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PanelConfig {
    #[serde(default = "default_contents_root")]
    pub contents_root: String,

    #[serde(default = "default_descriptor_file")]
    pub descriptor_file: String,

    #[serde(default = "default_flag_file")]
    pub flag_file: String,

    /// Never listed. The overlay host is excluded even when missing here.
    #[serde(default = "default_reserved_program_ids")]
    pub reserved_program_ids: Vec<ProgramId>,

    /// Poll process and flag state every N frame refreshes.
    #[serde(default = "default_poll_every_frames")]
    pub poll_every_frames: u32,

    /// Refresh the free RAM readout every N frame refreshes.
    #[serde(default = "default_memory_refresh_frames")]
    pub memory_refresh_frames: u32,

    #[serde(default)]
    pub version_delimiter: String,

    #[serde(default)]
    pub labels: StatusLabels,

    /// Emit haptic and sound feedback on flag toggles.
    #[serde(default = "default_true")]
    pub feedback: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            contents_root: default_contents_root(),
            descriptor_file: default_descriptor_file(),
            flag_file: default_flag_file(),
            reserved_program_ids: default_reserved_program_ids(),
            poll_every_frames: default_poll_every_frames(),
            memory_refresh_frames: default_memory_refresh_frames(),
            version_delimiter: String::new(),
            labels: StatusLabels::default(),
            feedback: default_true(),
        }
    }
}

impl PanelConfig {
    pub fn layout(&self) -> ContentsLayout {
        ContentsLayout {
            contents_root: self.contents_root.clone(),
            descriptor_file: self.descriptor_file.clone(),
            flag_file: self.flag_file.clone(),
        }
    }

    pub fn is_reserved(&self, program_id: ProgramId) -> bool {
        program_id == OVERLAY_HOST_ID || self.reserved_program_ids.contains(&program_id)
    }

    /// Poll cadence, never zero.
    pub fn poll_interval(&self) -> u32 {
        self.poll_every_frames.max(1)
    }

    pub fn memory_interval(&self) -> u32 {
        self.memory_refresh_frames.max(1)
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> ConfigResult<T> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> ConfigResult<T> {
    Ok(serde_json::from_str(s)?)
}

fn default_contents_root() -> String {
    "/atmosphere/contents".to_string()
}

fn default_descriptor_file() -> String {
    "toolbox.json".to_string()
}

fn default_flag_file() -> String {
    "boot2.flag".to_string()
}

fn default_reserved_program_ids() -> Vec<ProgramId> {
    vec![OVERLAY_HOST_ID]
}

fn default_poll_every_frames() -> u32 {
    20
}

// about once a second at 60 fps
fn default_memory_refresh_frames() -> u32 {
    60
}

fn default_true() -> bool {
    true
}
