use thiserror::Error;

use crate::config::ConfigError;
use crate::descriptor::DescriptorError;
use crate::process::ProcessError;
use crate::program_id::ProgramIdError;
use crate::registry::ScanError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("Process error: {0}")]
    Process(#[from] ProcessError),
    #[error("Program id error: {0}")]
    ProgramId(#[from] ProgramIdError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }
}
