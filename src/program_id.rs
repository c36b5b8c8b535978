//! 64-bit program identifiers and install-slot folder naming.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Program id of the overlay host. Never listed, so it can never be terminated
/// from its own overlay.
pub const OVERLAY_HOST_ID: ProgramId = ProgramId(0x4200_0000_0007_E51A);

/// Hex digits in a program id folder name.
pub const PROGRAM_ID_DIGITS: usize = 16;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgramIdError {
    #[error("Empty program id")]
    Empty,
    #[error("Invalid hex program id: {0}")]
    InvalidHex(String),
}

/// Numeric identifier of a sysmodule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u64);

impl ProgramId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// Folder name under the contents root, upper-case and zero padded.
    pub fn folder_name(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

impl FromStr for ProgramId {
    type Err = ProgramIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.is_empty() {
            return Err(ProgramIdError::Empty);
        }
        u64::from_str_radix(digits, 16)
            .map(ProgramId)
            .map_err(|_| ProgramIdError::InvalidHex(s.to_string()))
    }
}

impl Serialize for ProgramId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ProgramId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Returns true when a contents folder name looks like a sysmodule install slot.
///
/// Slots are named by 16 hex digits. Names in the `0100` application range are
/// only slots when the program portion (digits 5 to 12) is all zero, which keeps
/// system titles and drops regular games and their patches.
pub fn is_module_slot(folder_name: &str) -> bool {
    if folder_name.len() != PROGRAM_ID_DIGITS
        || !folder_name.bytes().all(|b| b.is_ascii_hexdigit())
    {
        return false;
    }
    if folder_name.starts_with("0100") {
        return &folder_name[4..12] == "00000000";
    }
    true
}
