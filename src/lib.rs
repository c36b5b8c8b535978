//! # sysmodules: background module control core
//!
//! Discovers the sysmodules installed under the contents tree, reports
//! whether each one is running and whether it is flagged to start on boot,
//! and lets an operator toggle both.
//!
//! ## Layers
//!
//! - Storage and OS capabilities: [`fs`], [`process`], [`feedback`], [`memory`]
//! - Module facts: [`descriptor`] reads `toolbox.json`, [`flags`] owns the
//!   boot2 flag files, [`process`] answers "is it running"
//! - [`registry`] builds the sorted module list once per session
//! - [`control`] reacts to item actions and the periodic frame tick, and
//!   pushes status text through the [`view`] capability
//!
//! ```text
//! ContentFs ─▶ ModuleRegistry ─▶ ModuleController ─▶ ListSurface
//!                                   │        ▲
//!                    ProcessOracle ◀┤        │ on_frame / handle_action
//!                        FlagStore ◀┘
//! ```

pub mod config;
pub mod control;
pub mod descriptor;
pub mod error;
pub mod feedback;
pub mod flags;
pub mod fs;
pub mod input;
pub mod memory;
pub mod module;
pub mod paths;
pub mod process;
pub mod program_id;
pub mod registry;
pub mod status;
pub mod view;

// Re-exports
pub use control::ModuleController;
pub use error::*;
pub use module::ModuleRecord;
pub use program_id::ProgramId;
pub use registry::{ModuleRegistry, ScanOutcome};
pub use status::StatusLabel;
