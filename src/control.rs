//! Control state machine binding registry entries to user actions.
//!
//! Everything runs on the host's single UI thread. Two inputs act on a
//! module: the primary button starts or stops it (live modules only) and the
//! secondary button toggles its boot2 flag. The host also calls
//! [`ModuleController::on_frame`] every frame refresh; every Nth frame the
//! running and flagged state of all modules is polled again and the status
//! text refreshed. OS failures never surface: the next poll shows the real
//! state.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::PanelConfig;
use crate::feedback::Feedback;
use crate::flags::{FlagStore, FsFlagStore, UnavailableFlagStore};
use crate::fs::{ContentFs, LocalFs};
use crate::input::Buttons;
use crate::memory::{format_free_ram, MemoryInfo, RamHealth};
use crate::process::{PmProcessOracle, ProcessManager, ProcessOracle};
use crate::program_id::ProgramId;
use crate::registry::ModuleRegistry;
use crate::status::{StatusLabel, StatusLabels};
use crate::view::{
    Category, HeaderWidget, ItemRow, ListItem, ListSurface, PanelView, DYNAMIC_HEADER, DYNAMIC_NOTE,
    FRAME_TITLE, NO_MODULES_FOUND, SCAN_FAILED, STATIC_HEADER, STATIC_NOTE,
};

/// Starts or stops a live module.
pub const PRIMARY_BUTTON: Buttons = Buttons::A;
/// Toggles the boot2 flag.
pub const SECONDARY_BUTTON: Buttons = Buttons::Y;

pub struct ModuleController {
    registry: ModuleRegistry,
    oracle: Box<dyn ProcessOracle>,
    flags: Box<dyn FlagStore>,
    feedback: Option<Box<dyn Feedback>>,
    labels: StatusLabels,
    poll_interval: u32,
    memory: Option<Box<dyn MemoryInfo>>,
    memory_interval: u32,
    free_ram: Option<(String, RamHealth)>,
    frame: u64,
    items: Vec<(ProgramId, Box<dyn ListItem>)>,
    widget: Option<Box<dyn HeaderWidget>>,
    storage: Option<Arc<dyn ContentFs>>,
}

impl ModuleController {
    pub fn new(
        registry: ModuleRegistry,
        oracle: Box<dyn ProcessOracle>,
        flags: Box<dyn FlagStore>,
        feedback: Box<dyn Feedback>,
        config: &PanelConfig,
    ) -> Self {
        Self {
            registry,
            oracle,
            flags,
            feedback: config.feedback.then_some(feedback),
            labels: config.labels.clone(),
            poll_interval: config.poll_interval(),
            memory: None,
            memory_interval: config.memory_interval(),
            free_ram: None,
            frame: 0,
            items: Vec::new(),
            widget: None,
            storage: None,
        }
    }

    /// Mounts `mount_root` as the storage root, scans it and wires the
    /// filesystem flag store and the process manager in.
    ///
    /// A mount failure still yields a controller, with a failed scan.
    pub fn open(
        mount_root: &Path,
        config: &PanelConfig,
        manager: Arc<dyn ProcessManager>,
        feedback: Box<dyn Feedback>,
    ) -> Self {
        let oracle = Box::new(PmProcessOracle::new(manager));
        match LocalFs::mount(mount_root) {
            Ok(fs) => {
                let fs: Arc<dyn ContentFs> = Arc::new(fs);
                let registry = ModuleRegistry::scan(fs.as_ref(), config);
                let flags = Box::new(FsFlagStore::new(fs.clone(), config.layout()));
                let mut controller = Self::new(registry, oracle, flags, feedback, config);
                controller.storage = Some(fs);
                controller
            }
            Err(e) => {
                warn!("Failed to mount {}: {}", mount_root.display(), e);
                Self::new(
                    ModuleRegistry::failed(),
                    oracle,
                    Box::new(UnavailableFlagStore),
                    feedback,
                    config,
                )
            }
        }
    }

    /// Adds the free RAM readout to the header.
    pub fn with_memory(mut self, memory: Box<dyn MemoryInfo>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Status of a module as of the last poll.
    pub fn status(&self, program_id: ProgramId) -> Option<StatusLabel> {
        self.registry
            .get(program_id)
            .map(|m| StatusLabel::resolve(m.running, m.flagged))
    }

    pub fn status_text(&self, label: StatusLabel) -> &str {
        self.labels.text(label)
    }

    /// Last free RAM readout, if memory reporting is enabled.
    pub fn free_ram(&self) -> Option<&(String, RamHealth)> {
        self.free_ram.as_ref()
    }

    /// Frame refresh hook. Polls on the first frame and every Nth one after,
    /// returning whether this frame polled.
    pub fn on_frame(&mut self) -> bool {
        let frame = self.frame;
        self.frame = self.frame.wrapping_add(1);
        if frame % u64::from(self.memory_interval) == 0 {
            self.refresh_memory();
        }
        let due = frame % u64::from(self.poll_interval) == 0;
        if due {
            self.refresh();
        }
        due
    }

    pub fn refresh_memory(&mut self) {
        let Some(memory) = self.memory.as_mut() else {
            return;
        };
        match memory.usage() {
            Ok(usage) => {
                let (text, health) = format_free_ram(usage.total, usage.used);
                if let Some(widget) = self.widget.as_mut() {
                    widget.set_value(&text, health);
                }
                self.free_ram = Some((text, health));
            }
            Err(e) => debug!("Memory query failed: {}", e),
        }
    }

    /// Re-reads running and flagged state of every module.
    pub fn refresh(&mut self) {
        for record in self.registry.iter_mut() {
            let program_id = record.program_id();
            record.running = self.oracle.is_running(program_id);
            record.flagged = self.flags.has_flag(program_id);
        }
        debug!("Polled {} modules", self.registry.len());
        self.push_statuses();
    }

    fn push_statuses(&mut self) {
        for (program_id, item) in self.items.iter_mut() {
            if let Some(record) = self.registry.get(*program_id) {
                let label = StatusLabel::resolve(record.running, record.flagged);
                item.set_value(self.labels.text(label), label.is_dimmed());
            }
        }
    }

    /// Item action callback. Returns whether the input was consumed.
    pub fn handle_action(&mut self, program_id: ProgramId, buttons: Buttons) -> bool {
        let Some(record) = self.registry.get(program_id) else {
            return false;
        };
        if record.locked {
            debug!("Ignoring input for locked module {}", program_id);
            return false;
        }
        let requires_reboot = record.requires_reboot();

        if buttons.contains(PRIMARY_BUTTON) && !requires_reboot {
            if self.oracle.is_running(program_id) {
                self.oracle.terminate(program_id);
            } else {
                self.oracle.start(program_id);
            }
            return true;
        }

        if buttons.contains(SECONDARY_BUTTON) {
            self.toggle_flag(program_id, requires_reboot);
            return true;
        }

        false
    }

    fn toggle_flag(&mut self, program_id: ProgramId, requires_reboot: bool) {
        let present = !self.flags.has_flag(program_id);
        match self.flags.set_flag(program_id, present) {
            Ok(()) => {
                info!(
                    "{} boot2 flag for {}",
                    if present { "Set" } else { "Cleared" },
                    program_id
                );
                if let Some(feedback) = &self.feedback {
                    feedback.rumble_click();
                    feedback.settings_sound();
                }
            }
            Err(e) => warn!("Failed to toggle boot2 flag for {}: {}", program_id, e),
        }

        if requires_reboot {
            if let Some(record) = self.registry.get_mut(program_id) {
                record.locked = true;
            }
            for (_, item) in self.items.iter_mut().filter(|(id, _)| *id == program_id) {
                item.set_locked(true);
            }
        }
    }

    /// Builds the panel into `surface` and keeps the item handles for status
    /// updates.
    pub fn mount(&mut self, surface: &mut dyn ListSurface) {
        surface.set_header(FRAME_TITLE, env!("CARGO_PKG_VERSION"));
        self.items.clear();
        self.widget = None;
        if self.memory.is_some() {
            let mut widget = surface.add_header_widget();
            if let Some((text, health)) = &self.free_ram {
                widget.set_value(text, *health);
            }
            self.widget = Some(widget);
        }

        if self.registry.is_empty() {
            surface.show_empty(self.empty_message());
            return;
        }

        surface.add_category(DYNAMIC_HEADER, DYNAMIC_NOTE);
        for record in self.registry.dynamic_modules() {
            let item = surface.add_item(record.program_id(), record.display_name());
            self.items.push((record.program_id(), item));
        }

        surface.add_category(STATIC_HEADER, STATIC_NOTE);
        for record in self.registry.static_modules() {
            let mut item = surface.add_item(record.program_id(), record.display_name());
            item.disable_click_animation();
            item.set_locked(record.locked);
            self.items.push((record.program_id(), item));
        }

        self.push_statuses();
    }

    fn empty_message(&self) -> &'static str {
        if self.registry.scan_failed() {
            SCAN_FAILED
        } else {
            NO_MODULES_FOUND
        }
    }

    pub fn view(&self) -> PanelView {
        if self.registry.is_empty() {
            return PanelView::Empty {
                message: self.empty_message(),
            };
        }

        let row = |record: &crate::module::ModuleRecord| {
            let label = StatusLabel::resolve(record.running, record.flagged);
            ItemRow {
                program_id: record.program_id(),
                label: record.display_name().to_string(),
                status: self.labels.text(label).to_string(),
                dimmed: label.is_dimmed(),
                locked: record.locked,
            }
        };

        PanelView::List {
            categories: vec![
                Category {
                    header: DYNAMIC_HEADER,
                    note: DYNAMIC_NOTE,
                    rows: self.registry.dynamic_modules().map(row).collect(),
                },
                Category {
                    header: STATIC_HEADER,
                    note: STATIC_NOTE,
                    rows: self.registry.static_modules().map(row).collect(),
                },
            ],
        }
    }

    /// Ends the session, releasing the storage session if one was opened.
    pub fn shutdown(mut self) {
        self.items.clear();
        self.widget = None;
        if let Some(storage) = self.storage.take() {
            storage.close();
        }
        debug!("Session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::{MockFeedback, NoFeedback};
    use crate::flags::MockFlagStore;
    use crate::memory::{MemoryUsage, MockMemoryInfo};
    use crate::module::ModuleRecord;
    use crate::paths::ContentsLayout;
    use crate::process::MockProcessOracle;
    use crate::view::TextSurface;
    use std::io;

    const LIVE: ProgramId = ProgramId(0x0100_0000_0000_1000);
    const STATIC: ProgramId = ProgramId(0x4200_0000_0000_0010);

    fn registry() -> ModuleRegistry {
        let layout = ContentsLayout::default();
        let records = vec![
            ModuleRecord::new(LIVE, "Foo", false, &layout),
            ModuleRecord::new(STATIC, "sys-con", true, &layout),
        ];
        ModuleRegistry::from_records(records)
    }

    fn controller(
        oracle: MockProcessOracle,
        flags: MockFlagStore,
        feedback: Box<dyn Feedback>,
    ) -> ModuleController {
        ModuleController::new(
            registry(),
            Box::new(oracle),
            Box::new(flags),
            feedback,
            &PanelConfig::default(),
        )
    }

    #[test]
    fn test_primary_starts_stopped_module() {
        let mut oracle = MockProcessOracle::new();
        oracle.expect_is_running().returning(|_| false);
        oracle.expect_start().withf(|id| *id == LIVE).times(1).return_const(());
        oracle.expect_terminate().never();
        let mut ctrl = controller(oracle, MockFlagStore::new(), Box::new(NoFeedback));

        assert!(ctrl.handle_action(LIVE, Buttons::A));
    }

    #[test]
    fn test_primary_terminates_running_module() {
        let mut oracle = MockProcessOracle::new();
        oracle.expect_is_running().returning(|_| true);
        oracle.expect_terminate().withf(|id| *id == LIVE).times(1).return_const(());
        oracle.expect_start().never();
        let mut ctrl = controller(oracle, MockFlagStore::new(), Box::new(NoFeedback));

        assert!(ctrl.handle_action(LIVE, Buttons::A));
    }

    #[test]
    fn test_primary_never_reaches_oracle_for_reboot_modules() {
        let mut oracle = MockProcessOracle::new();
        oracle.expect_is_running().never();
        oracle.expect_start().never();
        oracle.expect_terminate().never();
        let mut flags = MockFlagStore::new();
        flags.expect_set_flag().never();
        let mut ctrl = controller(oracle, flags, Box::new(NoFeedback));

        assert!(!ctrl.handle_action(STATIC, Buttons::A));
        assert!(!ctrl.handle_action(STATIC, Buttons::A | Buttons::B));
        assert!(!ctrl.registry().get(STATIC).unwrap().locked);
    }

    #[test]
    fn test_secondary_toggles_flag_with_feedback() {
        let mut flags = MockFlagStore::new();
        flags.expect_has_flag().returning(|_| false);
        flags
            .expect_set_flag()
            .withf(|id, present| *id == LIVE && *present)
            .times(1)
            .returning(|_, _| Ok(()));
        let mut feedback = MockFeedback::new();
        feedback.expect_rumble_click().times(1).return_const(());
        feedback.expect_settings_sound().times(1).return_const(());
        let mut ctrl = controller(MockProcessOracle::new(), flags, Box::new(feedback));

        assert!(ctrl.handle_action(LIVE, Buttons::Y));
        assert!(!ctrl.registry().get(LIVE).unwrap().locked);
    }

    #[test]
    fn test_secondary_failure_is_soft() {
        let mut flags = MockFlagStore::new();
        flags.expect_has_flag().returning(|_| true);
        flags
            .expect_set_flag()
            .withf(|_, present| !*present)
            .returning(|_, _| Err(io::Error::from(io::ErrorKind::PermissionDenied)));
        let mut feedback = MockFeedback::new();
        feedback.expect_rumble_click().never();
        feedback.expect_settings_sound().never();
        let mut ctrl = controller(MockProcessOracle::new(), flags, Box::new(feedback));

        assert!(ctrl.handle_action(LIVE, Buttons::Y));
    }

    #[test]
    fn test_feedback_disabled_by_config() {
        let mut flags = MockFlagStore::new();
        flags.expect_has_flag().returning(|_| false);
        flags.expect_set_flag().returning(|_, _| Ok(()));
        let mut feedback = MockFeedback::new();
        feedback.expect_rumble_click().never();
        feedback.expect_settings_sound().never();
        let config = PanelConfig {
            feedback: false,
            ..Default::default()
        };
        let mut ctrl = ModuleController::new(
            registry(),
            Box::new(MockProcessOracle::new()),
            Box::new(flags),
            Box::new(feedback),
            &config,
        );

        assert!(ctrl.handle_action(LIVE, Buttons::Y));
    }

    #[test]
    fn test_reboot_module_locks_after_toggle() {
        let mut flags = MockFlagStore::new();
        flags.expect_has_flag().returning(|_| false);
        flags.expect_set_flag().times(1).returning(|_, _| Ok(()));
        let mut ctrl = controller(MockProcessOracle::new(), flags, Box::new(NoFeedback));

        let mut surface = TextSurface::new();
        ctrl.mount(&mut surface);

        assert!(ctrl.handle_action(STATIC, Buttons::Y));
        assert!(ctrl.registry().get(STATIC).unwrap().locked);
        assert!(!ctrl.handle_action(STATIC, Buttons::Y));

        let static_item = surface
            .items()
            .into_iter()
            .find(|i| i.program_id == Some(STATIC))
            .unwrap();
        assert!(static_item.locked);
        assert!(!static_item.click_animation);
    }

    #[test]
    fn test_unknown_module_and_unbound_buttons() {
        let mut ctrl = controller(
            MockProcessOracle::new(),
            MockFlagStore::new(),
            Box::new(NoFeedback),
        );
        assert!(!ctrl.handle_action(ProgramId(0xdead), Buttons::A));
        assert!(!ctrl.handle_action(LIVE, Buttons::B));
        assert!(!ctrl.handle_action(LIVE, Buttons::NONE));
    }

    #[test]
    fn test_poll_cadence() {
        let mut oracle = MockProcessOracle::new();
        oracle.expect_is_running().returning(|_| false);
        let mut flags = MockFlagStore::new();
        flags.expect_has_flag().returning(|_| false);
        let config = PanelConfig {
            poll_every_frames: 5,
            ..Default::default()
        };
        let mut ctrl = ModuleController::new(
            registry(),
            Box::new(oracle),
            Box::new(flags),
            Box::new(NoFeedback),
            &config,
        );

        let polls = (0..12).filter(|_| ctrl.on_frame()).count();
        // frames 0, 5 and 10
        assert_eq!(polls, 3);
    }

    #[test]
    fn test_memory_readout_cadence() {
        let mut oracle = MockProcessOracle::new();
        oracle.expect_is_running().returning(|_| false);
        let mut flags = MockFlagStore::new();
        flags.expect_has_flag().returning(|_| false);
        let mut memory = MockMemoryInfo::new();
        let mut used = 0;
        memory.expect_usage().times(3).returning(move || {
            used += 2 * 1024 * 1024;
            Ok(MemoryUsage {
                total: 12 * 1024 * 1024,
                used,
            })
        });
        let config = PanelConfig {
            memory_refresh_frames: 4,
            ..Default::default()
        };
        let mut ctrl = ModuleController::new(
            registry(),
            Box::new(oracle),
            Box::new(flags),
            Box::new(NoFeedback),
            &config,
        )
        .with_memory(Box::new(memory));

        let mut surface = TextSurface::new();
        ctrl.mount(&mut surface);
        assert_eq!(surface.widget(), None);

        // frames 0, 4 and 8
        for _ in 0..9 {
            ctrl.on_frame();
        }
        let expected = ("6.000 MB Free".to_string(), RamHealth::Neutral);
        assert_eq!(ctrl.free_ram(), Some(&expected));
        assert_eq!(surface.widget(), Some(expected));
    }

    #[test]
    fn test_memory_failure_keeps_last_readout() {
        let mut memory = MockMemoryInfo::new();
        let mut calls = 0;
        memory.expect_usage().returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(MemoryUsage {
                    total: 4 * 1024 * 1024 * 1024,
                    used: 1024 * 1024 * 1024,
                })
            } else {
                Err(io::Error::from(io::ErrorKind::Unsupported))
            }
        });
        let mut ctrl = controller(
            MockProcessOracle::new(),
            MockFlagStore::new(),
            Box::new(NoFeedback),
        )
        .with_memory(Box::new(memory));

        ctrl.refresh_memory();
        ctrl.refresh_memory();
        assert_eq!(
            ctrl.free_ram(),
            Some(&("3.000 GB Free".to_string(), RamHealth::Healthy))
        );

        // a surface mounted later starts from the cached readout
        let mut surface = TextSurface::new();
        ctrl.mount(&mut surface);
        assert_eq!(
            surface.widget(),
            Some(("3.000 GB Free".to_string(), RamHealth::Healthy))
        );
    }

    #[test]
    fn test_refresh_updates_status_and_items() {
        let mut oracle = MockProcessOracle::new();
        oracle.expect_is_running().returning(|id| id == LIVE);
        let mut flags = MockFlagStore::new();
        flags.expect_has_flag().returning(|id| id == STATIC);
        let mut ctrl = controller(oracle, flags, Box::new(NoFeedback));

        let mut surface = TextSurface::new();
        ctrl.mount(&mut surface);
        ctrl.refresh();

        assert_eq!(ctrl.status(LIVE), Some(StatusLabel::On));
        assert_eq!(ctrl.status(STATIC), Some(StatusLabel::OffFlagged));

        let items = surface.items();
        assert_eq!(items[0].label, "Foo");
        assert_eq!(items[0].value, "On");
        assert!(!items[0].faint);
        assert_eq!(items[1].label, "sys-con");
        assert_eq!(items[1].value, "Off");
        assert!(items[1].faint);
    }

    #[test]
    fn test_view_groups_modules() {
        let ctrl = controller(
            MockProcessOracle::new(),
            MockFlagStore::new(),
            Box::new(NoFeedback),
        );
        match ctrl.view() {
            PanelView::List { categories } => {
                assert_eq!(categories.len(), 2);
                assert_eq!(categories[0].header, DYNAMIC_HEADER);
                assert_eq!(categories[0].rows[0].program_id, LIVE);
                assert_eq!(categories[1].header, STATIC_HEADER);
                assert_eq!(categories[1].rows[0].program_id, STATIC);
                assert!(categories[1].rows[0].dimmed);
            }
            other => panic!("unexpected view {:?}", other),
        }
    }

    #[test]
    fn test_empty_states_are_distinct() {
        let failed = ModuleController::new(
            ModuleRegistry::failed(),
            Box::new(MockProcessOracle::new()),
            Box::new(MockFlagStore::new()),
            Box::new(NoFeedback),
            &PanelConfig::default(),
        );
        assert_eq!(
            failed.view(),
            PanelView::Empty {
                message: SCAN_FAILED
            }
        );

        let mut empty = ModuleController::new(
            ModuleRegistry::from_records(Vec::new()),
            Box::new(MockProcessOracle::new()),
            Box::new(MockFlagStore::new()),
            Box::new(NoFeedback),
            &PanelConfig::default(),
        );
        let mut surface = TextSurface::new();
        empty.mount(&mut surface);
        assert_eq!(surface.empty_message(), Some(NO_MODULES_FOUND));
    }
}
