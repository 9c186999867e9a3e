//! Slot identifiers and the fixed dashboard layout.
//!
//! A slot is one display quadrant. The set of slots is fixed for the
//! lifetime of the application: slots are validated against a
//! [`SlotLayout`] once and never created or destroyed afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Default number of quadrants on the board.
pub const DEFAULT_SLOT_COUNT: u8 = 4;

/// Upper bound on the number of slots a layout may hold.
pub const MAX_SLOT_COUNT: u8 = 9;

// ============================================================================
// Slot Identifier
// ============================================================================

/// Identifier of a display slot, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(u8);

impl SlotId {
    /// Creates a slot id without layout validation.
    ///
    /// Prefer [`SlotLayout::slot`] for user-provided numbers.
    pub const fn new(number: u8) -> Self {
        Self(number)
    }

    /// Returns the 1-based slot number.
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Returns the 0-based index of this slot.
    pub fn index(self) -> usize {
        usize::from(self.0.saturating_sub(1))
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Slot Layout
// ============================================================================

/// The fixed set of slots available on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLayout {
    count: u8,
}

impl Default for SlotLayout {
    fn default() -> Self {
        Self {
            count: DEFAULT_SLOT_COUNT,
        }
    }
}

impl SlotLayout {
    /// Creates a layout with `count` slots.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidSlotCount` if `count` is zero or above
    /// [`MAX_SLOT_COUNT`].
    pub fn new(count: u8) -> DomainResult<Self> {
        if count == 0 || count > MAX_SLOT_COUNT {
            return Err(DomainError::InvalidSlotCount {
                count,
                max: MAX_SLOT_COUNT,
            });
        }
        Ok(Self { count })
    }

    /// Number of slots in the layout.
    pub fn count(&self) -> u8 {
        self.count
    }

    /// Validates a slot number against this layout.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SlotOutOfRange` for numbers outside `1..=count`.
    pub fn slot(&self, number: u8) -> DomainResult<SlotId> {
        if number == 0 || number > self.count {
            return Err(DomainError::SlotOutOfRange {
                slot: number,
                count: self.count,
            });
        }
        Ok(SlotId(number))
    }

    /// Returns true if `slot` belongs to this layout.
    pub fn contains(&self, slot: SlotId) -> bool {
        slot.0 >= 1 && slot.0 <= self.count
    }

    /// Iterates all slots in ascending order.
    pub fn slots(&self) -> impl Iterator<Item = SlotId> {
        (1..=self.count).map(SlotId)
    }
}
