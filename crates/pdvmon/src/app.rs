//! Application state for the pdvmon board.
//!
//! The session actor owns everything behind the board; `App` only keeps
//! what the terminal needs between frames: the latest projections, the
//! selected slot, an in-progress text edit and the per-slot quality the
//! operator picked.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

use std::collections::BTreeMap;

use pdvmon_core::{MediaState, QualityPreset, SlotId, SlotLayout};
use pdvmon_session::{BoardState, LinkState, SessionSnapshot, SlotBoard};

// ============================================================================
// Editing
// ============================================================================

/// Text input the operator can edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    /// Backend `host[:port]`.
    Server,
    /// Camera source URL of the selected slot.
    Source,
    /// Terminal address of the selected slot.
    Terminal,
}

impl EditField {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Server => "Server",
            Self::Source => "Source URL",
            Self::Terminal => "PDV address",
        }
    }
}

/// An edit in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub field: EditField,
    pub slot: SlotId,
    pub buffer: String,
}

// ============================================================================
// Application
// ============================================================================

/// Front-end state between frames.
#[derive(Debug, Clone)]
pub struct App {
    layout: SlotLayout,
    board: SlotBoard,

    /// Board projection as of the last refresh.
    pub view: BoardState,

    /// Session snapshot as of the last refresh.
    pub session: SessionSnapshot,

    /// Slot that key commands apply to.
    pub selected: SlotId,

    pub edit: Option<Edit>,

    /// Last command failure, shown in the footer until the next command.
    pub notice: Option<String>,

    pub should_quit: bool,

    /// Whether the alert banner is drawn this frame.
    pub blink_visible: bool,
    tick_count: u32,

    default_quality: QualityPreset,
    quality: BTreeMap<SlotId, QualityPreset>,
}

impl App {
    pub fn new(layout: SlotLayout, board: SlotBoard) -> Self {
        let view = board.snapshot();
        Self {
            layout,
            board,
            view,
            session: SessionSnapshot::default(),
            selected: SlotId::new(1),
            edit: None,
            notice: None,
            should_quit: false,
            blink_visible: true,
            tick_count: 0,
            default_quality: QualityPreset::default(),
            quality: BTreeMap::new(),
        }
    }

    /// Sets the starting quality for slots the operator has not changed.
    #[must_use]
    pub fn with_quality(mut self, default: QualityPreset, per_slot: &BTreeMap<SlotId, QualityPreset>) -> Self {
        self.default_quality = default;
        self.quality = per_slot.clone();
        self
    }

    pub fn layout(&self) -> SlotLayout {
        self.layout
    }

    /// Pulls the latest board projection and stores `session` if given.
    pub fn refresh(&mut self, session: Option<SessionSnapshot>) {
        self.view = self.board.snapshot();
        if let Some(session) = session {
            self.session = session;
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.link == LinkState::Connected
    }

    pub fn media_state(&self, slot: SlotId) -> MediaState {
        self.session.media_state(slot)
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    /// Selects slot `number` if it exists in the layout.
    pub fn select(&mut self, number: u8) -> bool {
        match self.layout.slot(number) {
            Ok(slot) => {
                self.selected = slot;
                true
            }
            Err(_) => false,
        }
    }

    /// Selects the next slot, wrapping around.
    pub fn select_next(&mut self) {
        let next = self.selected.get() % self.layout.count() + 1;
        self.selected = SlotId::new(next);
    }

    /// Selects the previous slot, wrapping around.
    pub fn select_previous(&mut self) {
        let previous = match self.selected.get() {
            0 | 1 => self.layout.count(),
            n => n - 1,
        };
        self.selected = SlotId::new(previous);
    }

    // ------------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------------

    /// Starts editing `field`, seeded with the current input.
    pub fn begin_edit(&mut self, field: EditField) {
        let slot = self.selected;
        let current = match field {
            EditField::Server => self.view.server_address.clone(),
            EditField::Source => self
                .view
                .slot(slot)
                .map(|v| v.source_url.clone())
                .unwrap_or_default(),
            EditField::Terminal => self
                .view
                .slot(slot)
                .map(|v| v.terminal_input.clone())
                .unwrap_or_default(),
        };
        self.edit = Some(Edit {
            field,
            slot,
            buffer: current,
        });
    }

    pub fn edit_push(&mut self, c: char) {
        if let Some(edit) = self.edit.as_mut() {
            edit.buffer.push(c);
        }
    }

    pub fn edit_backspace(&mut self) {
        if let Some(edit) = self.edit.as_mut() {
            edit.buffer.pop();
        }
    }

    pub fn cancel_edit(&mut self) {
        self.edit = None;
    }

    /// Writes the edit into the board's inputs.
    pub fn commit_edit(&mut self) {
        let Some(edit) = self.edit.take() else {
            return;
        };
        match edit.field {
            EditField::Server => self.board.set_server_address(&edit.buffer),
            EditField::Source => self.board.set_source_url(edit.slot, &edit.buffer),
            EditField::Terminal => self.board.set_terminal_input(edit.slot, &edit.buffer),
        }
        self.view = self.board.snapshot();
    }

    // ------------------------------------------------------------------------
    // Quality
    // ------------------------------------------------------------------------

    pub fn quality(&self, slot: SlotId) -> QualityPreset {
        self.quality.get(&slot).copied().unwrap_or(self.default_quality)
    }

    /// Advances the selected slot's preset and returns it.
    pub fn cycle_quality(&mut self) -> QualityPreset {
        let next = self.quality(self.selected).cycle();
        self.quality.insert(self.selected, next);
        next
    }

    // ------------------------------------------------------------------------
    // Misc
    // ------------------------------------------------------------------------

    /// Advances the blink animation. Called every 100ms; toggles every 500ms.
    pub fn tick(&mut self) {
        self.tick_count = self.tick_count.wrapping_add(1);
        if self.tick_count % 5 == 0 {
            self.blink_visible = !self.blink_visible;
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Slots drawn on screen: the exclusive one alone, or all of them.
    pub fn visible_slots(&self) -> Vec<SlotId> {
        match self.view.exclusive {
            Some(slot) => vec![slot],
            None => self.layout.slots().collect(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
