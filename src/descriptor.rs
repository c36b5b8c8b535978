//! Reads a module's `toolbox.json` descriptor into a typed record.
//!
//! ```json
//! { "tid": "0100000000001000", "name": "Foo", "version": "1.2", "requires_reboot": false }
//! ```

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::fs::ContentFs;
use crate::program_id::{ProgramId, ProgramIdError};

#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Descriptor {0} is empty")]
    Empty(String),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),
    #[error("Invalid program id: {0}")]
    InvalidProgramId(#[from] ProgramIdError),
}

pub type DescriptorResult<T> = Result<T, DescriptorError>;

#[derive(Debug, Deserialize)]
struct RawDescriptor {
    tid: Option<String>,
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    requires_reboot: Option<bool>,
}

/// Parsed descriptor of one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub program_id: ProgramId,
    pub name: String,
    pub version: Option<String>,
    pub requires_reboot: bool,
}

impl ModuleDescriptor {
    /// Name with the version appended after `delimiter`, when a version is present.
    pub fn display_name(&self, delimiter: &str) -> String {
        match &self.version {
            Some(version) => format!("{}{}{}", self.name, delimiter, version),
            None => self.name.clone(),
        }
    }
}

/// Parses descriptor bytes. Every required field must be present.
pub fn parse_descriptor(data: &[u8]) -> DescriptorResult<ModuleDescriptor> {
    let raw: RawDescriptor = serde_json::from_slice(data)?;
    let tid = raw.tid.ok_or(DescriptorError::MissingField("tid"))?;
    let name = raw.name.ok_or(DescriptorError::MissingField("name"))?;
    let requires_reboot = raw
        .requires_reboot
        .ok_or(DescriptorError::MissingField("requires_reboot"))?;

    Ok(ModuleDescriptor {
        program_id: tid.parse()?,
        name,
        version: raw.version,
        requires_reboot,
    })
}

/// Opens and parses the descriptor at `path`.
pub fn read_descriptor(fs: &dyn ContentFs, path: &str) -> DescriptorResult<ModuleDescriptor> {
    let io_error = |source| DescriptorError::Io {
        path: path.to_string(),
        source,
    };
    let size = fs.file_size(path).map_err(io_error)?;
    if size == 0 {
        return Err(DescriptorError::Empty(path.to_string()));
    }
    let data = fs.read_file(path).map_err(io_error)?;
    debug!("Read descriptor {} ({} bytes)", path, data.len());
    parse_descriptor(&data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockContentFs;

    #[test]
    fn test_parse_full_descriptor() {
        let descriptor = parse_descriptor(
            br#"{"tid":"0100000000001000","name":"Foo","version":"1.2","requires_reboot":true}"#,
        )
        .unwrap();
        assert_eq!(descriptor.program_id, ProgramId(0x0100_0000_0000_1000));
        assert_eq!(descriptor.name, "Foo");
        assert_eq!(descriptor.version.as_deref(), Some("1.2"));
        assert!(descriptor.requires_reboot);
    }

    #[test]
    fn test_display_name_appends_version() {
        let descriptor = parse_descriptor(
            br#"{"tid":"1","name":"Bar","version":"1.2","requires_reboot":false}"#,
        )
        .unwrap();
        assert_eq!(descriptor.display_name(""), "Bar1.2");
        assert_eq!(descriptor.display_name(" v"), "Bar v1.2");
    }

    #[test]
    fn test_display_name_without_version() {
        let descriptor =
            parse_descriptor(br#"{"tid":"1","name":"Bar","requires_reboot":false}"#).unwrap();
        assert_eq!(descriptor.display_name(""), "Bar");
    }

    #[test]
    fn test_null_version_is_absent() {
        let descriptor = parse_descriptor(
            br#"{"tid":"1","name":"Bar","version":null,"requires_reboot":false}"#,
        )
        .unwrap();
        assert_eq!(descriptor.version, None);
    }

    #[test]
    fn test_missing_fields() {
        assert!(matches!(
            parse_descriptor(br#"{"name":"Bar","requires_reboot":false}"#),
            Err(DescriptorError::MissingField("tid"))
        ));
        assert!(matches!(
            parse_descriptor(br#"{"tid":"1","requires_reboot":false}"#),
            Err(DescriptorError::MissingField("name"))
        ));
        assert!(matches!(
            parse_descriptor(br#"{"tid":"1","name":"Bar"}"#),
            Err(DescriptorError::MissingField("requires_reboot"))
        ));
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(
            parse_descriptor(b"not json"),
            Err(DescriptorError::Json(_))
        ));
        assert!(matches!(
            parse_descriptor(br#"{"tid":"1","name":"Bar","requires_reboot":"yes"}"#),
            Err(DescriptorError::Json(_))
        ));
        assert!(matches!(
            parse_descriptor(br#"{"tid":"xyz","name":"Bar","requires_reboot":false}"#),
            Err(DescriptorError::InvalidProgramId(_))
        ));
    }

    #[test]
    fn test_read_descriptor_missing_file() {
        let mut fs = MockContentFs::new();
        fs.expect_file_size()
            .withf(|path| path == "/c/1/toolbox.json")
            .returning(|_| Err(std::io::Error::from(std::io::ErrorKind::NotFound)));
        fs.expect_read_file().never();

        let result = read_descriptor(&fs, "/c/1/toolbox.json");
        assert!(matches!(result, Err(DescriptorError::Io { .. })));
    }

    #[test]
    fn test_read_descriptor_empty_file() {
        let mut fs = MockContentFs::new();
        fs.expect_file_size().returning(|_| Ok(0));
        fs.expect_read_file().never();
        assert!(matches!(
            read_descriptor(&fs, "/c/1/toolbox.json"),
            Err(DescriptorError::Empty(_))
        ));
    }

    #[test]
    fn test_read_descriptor_success() {
        let body = br#"{"tid":"0100000000001000","name":"Foo","requires_reboot":false}"#;
        let mut fs = MockContentFs::new();
        fs.expect_file_size().returning(move |_| Ok(body.len() as u64));
        fs.expect_read_file().returning(move |_| Ok(body.to_vec()));

        let descriptor = read_descriptor(&fs, "/c/0100000000001000/toolbox.json").unwrap();
        assert_eq!(descriptor.name, "Foo");
        assert!(!descriptor.requires_reboot);
    }
}
