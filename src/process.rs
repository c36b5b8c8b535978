//! Process management: the OS capability and the oracle the controller uses.
//!
//! [`ProcessManager`] mirrors the process manager services (look up a pid,
//! launch a program, terminate a program). [`ProcessOracle`] is the view the
//! control state machine gets: queries never fail and mutations are
//! fire-and-forget. [`PmProcessOracle`] adapts one to the other.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use mockall::automock;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::program_id::ProgramId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("No process for program {0}")]
    NotFound(ProgramId),
    #[error("Failed to launch program {id}: {message}")]
    LaunchFailed { id: ProgramId, message: String },
    #[error("Failed to terminate program {id}: {message}")]
    TerminateFailed { id: ProgramId, message: String },
    #[error("Process manager unavailable: {0}")]
    Unavailable(String),
}

pub type ProcessResult<T> = Result<T, ProcessError>;

/// Content storage a program is launched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageId {
    /// No preference, let the loader resolve the program.
    #[default]
    None,
    Host,
    GameCard,
    BuiltInSystem,
    BuiltInUser,
    SdCard,
}

/// Program plus storage hint passed to a launch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramLocation {
    pub program_id: ProgramId,
    pub storage: StorageId,
}

/// Process manager capability.
#[automock]
pub trait ProcessManager {
    /// Pid of the live process for `program_id`.
    fn process_id(&self, program_id: ProgramId) -> ProcessResult<u64>;

    /// Requests a launch and returns the new pid without waiting for startup.
    fn launch(&self, location: ProgramLocation) -> ProcessResult<u64>;

    /// Requests termination. Does not wait for the process to exit.
    fn terminate(&self, program_id: ProgramId) -> ProcessResult<()>;
}

/// What the controller needs to know about and do to module processes.
#[automock]
pub trait ProcessOracle {
    /// Whether a live process exists. Query failures read as "not running".
    fn is_running(&self, program_id: ProgramId) -> bool;

    /// Best-effort launch with no storage preference.
    fn start(&self, program_id: ProgramId);

    /// Best-effort termination.
    fn terminate(&self, program_id: ProgramId);
}

/// [`ProcessOracle`] over a [`ProcessManager`], swallowing its failures.
pub struct PmProcessOracle {
    manager: Arc<dyn ProcessManager>,
}

impl PmProcessOracle {
    pub fn new(manager: Arc<dyn ProcessManager>) -> Self {
        Self { manager }
    }
}

impl ProcessOracle for PmProcessOracle {
    fn is_running(&self, program_id: ProgramId) -> bool {
        match self.manager.process_id(program_id) {
            Ok(pid) => pid > 0,
            Err(e) => {
                debug!("Process lookup for {} failed: {}", program_id, e);
                false
            }
        }
    }

    fn start(&self, program_id: ProgramId) {
        let location = ProgramLocation {
            program_id,
            storage: StorageId::None,
        };
        match self.manager.launch(location) {
            Ok(pid) => info!("Launched {} as pid {}", program_id, pid),
            Err(e) => warn!("Launch of {} failed: {}", program_id, e),
        }
    }

    fn terminate(&self, program_id: ProgramId) {
        match self.manager.terminate(program_id) {
            Ok(()) => info!("Requested termination of {}", program_id),
            Err(e) => warn!("Termination of {} failed: {}", program_id, e),
        }
    }
}

/// Process table kept in memory, for hosts without a process manager and for tests.
pub struct InMemoryProcessManager {
    processes: DashMap<ProgramId, u64>,
    next_pid: AtomicU64,
}

impl Default for InMemoryProcessManager {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryProcessManager {
    pub fn new() -> Self {
        Self {
            processes: DashMap::new(),
            next_pid: AtomicU64::new(0x80),
        }
    }

    /// Registers an already running process and returns its pid.
    pub fn spawn(&self, program_id: ProgramId) -> u64 {
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        self.processes.insert(program_id, pid);
        pid
    }

    pub fn running(&self) -> Vec<ProgramId> {
        let mut ids: Vec<ProgramId> = self.processes.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }
}

impl ProcessManager for InMemoryProcessManager {
    fn process_id(&self, program_id: ProgramId) -> ProcessResult<u64> {
        self.processes
            .get(&program_id)
            .map(|pid| *pid)
            .ok_or(ProcessError::NotFound(program_id))
    }

    fn launch(&self, location: ProgramLocation) -> ProcessResult<u64> {
        if let Some(pid) = self.processes.get(&location.program_id) {
            return Err(ProcessError::LaunchFailed {
                id: location.program_id,
                message: format!("already running as pid {}", *pid),
            });
        }
        Ok(self.spawn(location.program_id))
    }

    fn terminate(&self, program_id: ProgramId) -> ProcessResult<()> {
        self.processes
            .remove(&program_id)
            .map(|_| ())
            .ok_or_else(|| ProcessError::TerminateFailed {
                id: program_id,
                message: "not running".to_string(),
            })
    }
}
