//! Presentation port and the in-memory board projection.
//!
//! The session layer never touches a display surface. It pushes state
//! through [`PresentationPort`] and reads operator inputs back from it.
//! [`SlotBoard`] is the shipped implementation: a cheap-to-clone, shared
//! projection that renderers draw from and tests assert on.
//!
//! # Panic-Free Guarantees
//!
//! A poisoned board mutex is recovered rather than propagated; the board
//! only holds display state, which stays consistent per field.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pdvmon_core::{LogEntry, SlotId, SlotLayout};

/// Maximum log entries kept per slot.
pub const MAX_LOG_ENTRIES: usize = 500;

// ============================================================================
// Presentation Port
// ============================================================================

/// Output and input surface consumed by the session layer.
pub trait PresentationPort: Send {
    /// Replaces the status line of a slot.
    fn update_slot_status(&mut self, slot: SlotId, text: &str);

    /// Appends one entry to a slot's log.
    fn append_slot_log(&mut self, slot: SlotId, entry: LogEntry);

    /// Empties a slot's log.
    fn clear_slot_log(&mut self, slot: SlotId);

    /// Grants or revokes full-screen precedence for a slot.
    fn set_exclusive_presentation(&mut self, slot: SlotId, exclusive: bool);

    /// Shows or hides a slot's alert banner.
    fn set_alert_banner(&mut self, slot: SlotId, banner: Option<&str>);

    /// Updates the control-channel status indicator.
    fn update_server_status(&mut self, text: &str, connected: bool);

    /// Video source URL entered for a slot.
    fn source_url(&self, slot: SlotId) -> Option<String>;

    /// Terminal address entered for a slot.
    fn terminal_address_input(&self, slot: SlotId) -> Option<String>;

    /// Backend address entered by the operator.
    fn server_address_input(&self) -> Option<String>;
}

// ============================================================================
// Board State
// ============================================================================

/// Display state of one slot.
#[derive(Debug, Clone, Default)]
pub struct SlotView {
    pub status: String,
    pub log: VecDeque<LogEntry>,
    pub banner: Option<String>,
    pub exclusive: bool,
    pub source_url: String,
    pub terminal_input: String,
}

/// Whole-board display state.
#[derive(Debug, Clone, Default)]
pub struct BoardState {
    pub server_status: String,
    pub server_connected: bool,
    pub server_address: String,
    pub exclusive: Option<SlotId>,
    pub slots: BTreeMap<SlotId, SlotView>,
}

impl BoardState {
    /// Returns a slot's view, if the slot exists.
    pub fn slot(&self, slot: SlotId) -> Option<&SlotView> {
        self.slots.get(&slot)
    }
}

// ============================================================================
// Slot Board
// ============================================================================

/// Shared board projection implementing [`PresentationPort`].
///
/// Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct SlotBoard {
    inner: Arc<Mutex<BoardState>>,
}

impl SlotBoard {
    /// Creates a board with one empty view per slot of `layout`.
    pub fn new(layout: SlotLayout) -> Self {
        let slots = layout
            .slots()
            .map(|slot| {
                let view = SlotView {
                    status: "Disconnected".to_string(),
                    ..Default::default()
                };
                (slot, view)
            })
            .collect();
        let state = BoardState {
            server_status: "Disconnected".to_string(),
            slots,
            ..Default::default()
        };
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clones the current state for rendering.
    pub fn snapshot(&self) -> BoardState {
        self.lock().clone()
    }

    /// Clones one slot's view.
    pub fn slot(&self, slot: SlotId) -> Option<SlotView> {
        self.lock().slots.get(&slot).cloned()
    }

    /// Sets the backend address input.
    pub fn set_server_address(&self, address: &str) {
        self.lock().server_address = address.to_string();
    }

    /// Sets a slot's terminal address input.
    pub fn set_terminal_input(&self, slot: SlotId, address: &str) {
        if let Some(view) = self.lock().slots.get_mut(&slot) {
            view.terminal_input = address.to_string();
        }
    }

    /// Sets a slot's video source URL input.
    pub fn set_source_url(&self, slot: SlotId, url: &str) {
        if let Some(view) = self.lock().slots.get_mut(&slot) {
            view.source_url = url.to_string();
        }
    }

    fn with_slot(&self, slot: SlotId, f: impl FnOnce(&mut SlotView)) {
        if let Some(view) = self.lock().slots.get_mut(&slot) {
            f(view);
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl PresentationPort for SlotBoard {
    fn update_slot_status(&mut self, slot: SlotId, text: &str) {
        self.with_slot(slot, |view| view.status = text.to_string());
    }

    fn append_slot_log(&mut self, slot: SlotId, entry: LogEntry) {
        self.with_slot(slot, |view| {
            view.log.push_back(entry);
            while view.log.len() > MAX_LOG_ENTRIES {
                view.log.pop_front();
            }
        });
    }

    fn clear_slot_log(&mut self, slot: SlotId) {
        self.with_slot(slot, |view| view.log.clear());
    }

    fn set_exclusive_presentation(&mut self, slot: SlotId, exclusive: bool) {
        let mut state = self.lock();
        if exclusive {
            if let Some(previous) = state.exclusive.replace(slot) {
                if let Some(view) = state.slots.get_mut(&previous) {
                    view.exclusive = false;
                }
            }
        } else if state.exclusive == Some(slot) {
            state.exclusive = None;
        }
        if let Some(view) = state.slots.get_mut(&slot) {
            view.exclusive = exclusive;
        }
    }

    fn set_alert_banner(&mut self, slot: SlotId, banner: Option<&str>) {
        self.with_slot(slot, |view| view.banner = banner.map(str::to_string));
    }

    fn update_server_status(&mut self, text: &str, connected: bool) {
        let mut state = self.lock();
        state.server_status = text.to_string();
        state.server_connected = connected;
    }

    fn source_url(&self, slot: SlotId) -> Option<String> {
        self.lock()
            .slots
            .get(&slot)
            .and_then(|view| non_empty(&view.source_url))
    }

    fn terminal_address_input(&self, slot: SlotId) -> Option<String> {
        self.lock()
            .slots
            .get(&slot)
            .and_then(|view| non_empty(&view.terminal_input))
    }

    fn server_address_input(&self) -> Option<String> {
        non_empty(&self.lock().server_address)
    }
}
