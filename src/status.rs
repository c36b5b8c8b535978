//! The (running, flagged) truth table behind each item's status text.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// One cell of the 2x2 status table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum StatusLabel {
    Off,
    OffFlagged,
    On,
    OnFlagged,
}

impl StatusLabel {
    pub fn resolve(running: bool, flagged: bool) -> Self {
        match (running, flagged) {
            (false, false) => StatusLabel::Off,
            (false, true) => StatusLabel::OffFlagged,
            (true, false) => StatusLabel::On,
            (true, true) => StatusLabel::OnFlagged,
        }
    }

    pub fn is_running(self) -> bool {
        matches!(self, StatusLabel::On | StatusLabel::OnFlagged)
    }

    pub fn is_flagged(self) -> bool {
        matches!(self, StatusLabel::OffFlagged | StatusLabel::OnFlagged)
    }

    /// Stopped modules are drawn de-emphasized.
    pub fn is_dimmed(self) -> bool {
        !self.is_running()
    }
}

/// Text shown for each [`StatusLabel`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLabels {
    #[serde(default = "default_off")]
    pub off: String,
    #[serde(default = "default_off")]
    pub off_flagged: String,
    #[serde(default = "default_on")]
    pub on: String,
    #[serde(default = "default_on")]
    pub on_flagged: String,
}

impl Default for StatusLabels {
    fn default() -> Self {
        Self {
            off: default_off(),
            off_flagged: default_off(),
            on: default_on(),
            on_flagged: default_on(),
        }
    }
}

impl StatusLabels {
    pub fn text(&self, label: StatusLabel) -> &str {
        match label {
            StatusLabel::Off => &self.off,
            StatusLabel::OffFlagged => &self.off_flagged,
            StatusLabel::On => &self.on,
            StatusLabel::OnFlagged => &self.on_flagged,
        }
    }
}

fn default_off() -> String {
    "Off".to_string()
}

fn default_on() -> String {
    "On".to_string()
}
