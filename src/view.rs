//! Presentation side of the panel.
//!
//! The controller never touches concrete widgets. It emits into a
//! [`ListSurface`] and keeps the returned [`ListItem`] handles to push status
//! updates, or hands out a [`PanelView`] snapshot for hosts that redraw from
//! scratch. [`TextSurface`] is the terminal rendition used by the CLI.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use crate::memory::RamHealth;
use crate::program_id::ProgramId;

pub const FRAME_TITLE: &str = "Sysmodules";
pub const DYNAMIC_HEADER: &str = "Dynamic   Auto Start   Toggle";
pub const DYNAMIC_NOTE: &str = "These sysmodules can be toggled at any time.";
pub const STATIC_HEADER: &str = "Static   Auto Start";
pub const STATIC_NOTE: &str = "These sysmodules need a reboot to work.";
pub const NO_MODULES_FOUND: &str = "No sysmodules found!";
pub const SCAN_FAILED: &str = "Scan failed!";

/// Handle to one rendered module line.
pub trait ListItem {
    /// Status text on the right side; `faint` draws it de-emphasized.
    fn set_value(&mut self, value: &str, faint: bool);

    fn set_locked(&mut self, locked: bool);

    fn disable_click_animation(&mut self);
}

/// Handle to the free RAM readout in the frame header.
pub trait HeaderWidget {
    fn set_value(&mut self, text: &str, health: RamHealth);
}

/// Container the panel is built into.
pub trait ListSurface {
    fn set_header(&mut self, title: &str, subtitle: &str);

    fn add_header_widget(&mut self) -> Box<dyn HeaderWidget>;

    /// Replaces the list with a single empty-state message.
    fn show_empty(&mut self, message: &str);

    fn add_category(&mut self, header: &str, note: &str);

    fn add_item(&mut self, program_id: ProgramId, label: &str) -> Box<dyn ListItem>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRow {
    pub program_id: ProgramId,
    pub label: String,
    pub status: String,
    pub dimmed: bool,
    pub locked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub header: &'static str,
    pub note: &'static str,
    pub rows: Vec<ItemRow>,
}

/// Read-only snapshot of what the panel shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelView {
    Empty { message: &'static str },
    List { categories: Vec<Category> },
}

impl PanelView {
    pub fn rows(&self) -> impl Iterator<Item = &ItemRow> {
        let categories: &[Category] = match self {
            PanelView::Empty { .. } => &[],
            PanelView::List { categories } => categories,
        };
        categories.iter().flat_map(|c| c.rows.iter())
    }

    pub fn render_text(&self) -> String {
        let mut surface = TextSurface::new();
        surface.set_header(FRAME_TITLE, env!("CARGO_PKG_VERSION"));
        match self {
            PanelView::Empty { message } => surface.show_empty(message),
            PanelView::List { categories } => {
                for category in categories {
                    surface.add_category(category.header, category.note);
                    for row in &category.rows {
                        let mut item = surface.add_item(row.program_id, &row.label);
                        item.set_value(&row.status, row.dimmed);
                        item.set_locked(row.locked);
                    }
                }
            }
        }
        surface.render()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TextItemState {
    pub program_id: Option<ProgramId>,
    pub label: String,
    pub value: String,
    pub faint: bool,
    pub locked: bool,
    pub click_animation: bool,
}

#[derive(Debug, Clone)]
enum TextLine {
    Category { header: String, note: String },
    Item(Rc<RefCell<TextItemState>>),
}

/// Plain-text [`ListSurface`].
#[derive(Debug, Default)]
pub struct TextSurface {
    title: String,
    subtitle: String,
    widget: Rc<RefCell<Option<(String, RamHealth)>>>,
    empty: Option<String>,
    lines: Vec<TextLine>,
}

struct TextItem {
    state: Rc<RefCell<TextItemState>>,
}

impl ListItem for TextItem {
    fn set_value(&mut self, value: &str, faint: bool) {
        let mut state = self.state.borrow_mut();
        state.value = value.to_string();
        state.faint = faint;
    }

    fn set_locked(&mut self, locked: bool) {
        self.state.borrow_mut().locked = locked;
    }

    fn disable_click_animation(&mut self) {
        self.state.borrow_mut().click_animation = false;
    }
}

struct TextWidget {
    state: Rc<RefCell<Option<(String, RamHealth)>>>,
}

impl HeaderWidget for TextWidget {
    fn set_value(&mut self, text: &str, health: RamHealth) {
        *self.state.borrow_mut() = Some((text.to_string(), health));
    }
}

impl TextSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn widget(&self) -> Option<(String, RamHealth)> {
        self.widget.borrow().clone()
    }

    /// Current state of every item line, in display order.
    pub fn items(&self) -> Vec<TextItemState> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                TextLine::Item(state) => Some(state.borrow().clone()),
                TextLine::Category { .. } => None,
            })
            .collect()
    }

    pub fn empty_message(&self) -> Option<&str> {
        self.empty.as_deref()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        match &*self.widget.borrow() {
            Some((text, health)) => {
                let _ = writeln!(
                    out,
                    "{} {}  | {} ({})",
                    self.title, self.subtitle, text, health
                );
            }
            None => {
                let _ = writeln!(out, "{} {}", self.title, self.subtitle);
            }
        }
        if let Some(message) = &self.empty {
            let _ = writeln!(out, "  {}", message);
            return out;
        }
        for line in &self.lines {
            match line {
                TextLine::Category { header, note } => {
                    let _ = writeln!(out, "== {}", header);
                    let _ = writeln!(out, "   {}", note);
                }
                TextLine::Item(state) => {
                    let state = state.borrow();
                    let id = state
                        .program_id
                        .map(|id| id.to_string())
                        .unwrap_or_default();
                    let _ = writeln!(
                        out,
                        "  {} {:<32} {}{}{}",
                        id,
                        state.label,
                        if state.faint { "~" } else { "" },
                        state.value,
                        if state.locked { " [locked]" } else { "" }
                    );
                }
            }
        }
        out
    }
}

impl ListSurface for TextSurface {
    fn set_header(&mut self, title: &str, subtitle: &str) {
        self.title = title.to_string();
        self.subtitle = subtitle.to_string();
    }

    fn add_header_widget(&mut self) -> Box<dyn HeaderWidget> {
        Box::new(TextWidget {
            state: self.widget.clone(),
        })
    }

    fn show_empty(&mut self, message: &str) {
        self.lines.clear();
        self.empty = Some(message.to_string());
    }

    fn add_category(&mut self, header: &str, note: &str) {
        self.lines.push(TextLine::Category {
            header: header.to_string(),
            note: note.to_string(),
        });
    }

    fn add_item(&mut self, program_id: ProgramId, label: &str) -> Box<dyn ListItem> {
        let state = Rc::new(RefCell::new(TextItemState {
            program_id: Some(program_id),
            label: label.to_string(),
            click_animation: true,
            ..Default::default()
        }));
        self.lines.push(TextLine::Item(state.clone()));
        Box::new(TextItem { state })
    }
}
