//! Inactivity alert scheduling and exclusive-presentation arbitration.
//!
//! Alerts move `Queued → Active → cleared`. A slot holds at most one
//! alert. Of all active alerts, at most one holds the exclusive
//! presentation grant (the full-screen takeover); the rest are shown as
//! banners. When the grant is released it passes to the oldest banner,
//! so alerts take the screen in the order they arrived.
//!
//! The scheduler is the sole owner of the queue and the grant. It never
//! reads the registry: callers resolve addresses before calling `add`.

use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, info};

use pdvmon_core::{InactiveDuration, LogEntry, SlotId, TerminalAddress};

use crate::presenter::PresentationPort;

/// One inactivity alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub slot: SlotId,
    pub address: TerminalAddress,
    pub inactive: InactiveDuration,
}

impl Alert {
    pub fn new(slot: SlotId, address: TerminalAddress, inactive: InactiveDuration) -> Self {
        Self {
            slot,
            address,
            inactive,
        }
    }

    /// Banner text, e.g. `PDV 05 inactive for 90s`.
    pub fn banner(&self) -> String {
        format!("{} inactive for {}", self.address.label(), self.inactive)
    }
}

/// Outcome of [`AlertScheduler::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertDisposition {
    /// The slot already had an alert; nothing changed.
    Suppressed,
    /// Enqueued behind pending alerts.
    Queued,
    /// Promoted and granted exclusive presentation.
    Exclusive,
    /// Promoted as a non-exclusive banner.
    Banner,
}

/// Read-only view of an active alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertView {
    pub slot: SlotId,
    pub address: TerminalAddress,
    pub inactive: InactiveDuration,
    pub exclusive: bool,
}

#[derive(Debug)]
struct ActiveAlert {
    alert: Alert,
    exclusive: bool,
    /// Activation order, used to hand the grant to the oldest banner.
    seq: u64,
}

/// Queue plus single-grant arbitration.
#[derive(Debug, Default)]
pub struct AlertScheduler {
    active: BTreeMap<SlotId, ActiveAlert>,
    queue: VecDeque<Alert>,
    grant: Option<SlotId>,
    next_seq: u64,
}

impl AlertScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an inactivity alert for a slot.
    ///
    /// Repeated notifications for a slot that already has an active or
    /// queued alert are suppressed.
    pub fn add(&mut self, alert: Alert, port: &mut dyn PresentationPort) -> AlertDisposition {
        let slot = alert.slot;
        if self.active.contains_key(&slot) || self.queue.iter().any(|a| a.slot == slot) {
            debug!(slot = %slot, "Alert suppressed, slot already alerted");
            return AlertDisposition::Suppressed;
        }

        let was_empty = self.queue.is_empty();
        self.queue.push_back(alert);

        if was_empty {
            if let Some(exclusive) = self.promote_next(port) {
                return if exclusive {
                    AlertDisposition::Exclusive
                } else {
                    AlertDisposition::Banner
                };
            }
        }
        AlertDisposition::Queued
    }

    /// Advances the queue by one alert.
    ///
    /// Returns `Some(exclusive)` if a queued alert was activated. With an
    /// empty queue and a free grant, the oldest banner is upgraded instead.
    pub fn promote_next(&mut self, port: &mut dyn PresentationPort) -> Option<bool> {
        let Some(alert) = self.queue.pop_front() else {
            if self.grant.is_none() {
                self.upgrade_oldest_banner(port);
            }
            return None;
        };

        let exclusive = self.grant.is_none();
        let slot = alert.slot;
        let banner = alert.banner();

        info!(
            slot = %slot,
            address = %alert.address,
            inactive = %alert.inactive,
            exclusive,
            "Inactivity alert activated"
        );

        if exclusive {
            self.grant = Some(slot);
            port.set_exclusive_presentation(slot, true);
        }
        port.set_alert_banner(slot, Some(&banner));
        port.append_slot_log(slot, LogEntry::alert(format!("{banner}!")));

        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        self.active.insert(
            slot,
            ActiveAlert {
                alert,
                exclusive,
                seq,
            },
        );

        Some(exclusive)
    }

    fn upgrade_oldest_banner(&mut self, port: &mut dyn PresentationPort) {
        let oldest = self
            .active
            .values_mut()
            .filter(|a| !a.exclusive)
            .min_by_key(|a| a.seq);

        if let Some(active) = oldest {
            active.exclusive = true;
            let slot = active.alert.slot;
            self.grant = Some(slot);
            port.set_exclusive_presentation(slot, true);
            debug!(slot = %slot, "Exclusive presentation handed to waiting alert");
        }
    }

    /// Removes the slot's alerts and advances the queue.
    pub fn clear(&mut self, slot: SlotId, port: &mut dyn PresentationPort) {
        self.remove(slot, port);
        self.promote_next(port);
    }

    /// Clears every alert and empties the queue.
    pub fn clear_all(&mut self, port: &mut dyn PresentationPort) {
        let slots: Vec<SlotId> = self.active.keys().copied().collect();
        for slot in slots {
            self.remove(slot, port);
        }
        self.queue.clear();
        self.grant = None;
    }

    fn remove(&mut self, slot: SlotId, port: &mut dyn PresentationPort) {
        if let Some(active) = self.active.remove(&slot) {
            if active.exclusive && self.grant == Some(slot) {
                self.grant = None;
                port.set_exclusive_presentation(slot, false);
            }
            port.set_alert_banner(slot, None);
            debug!(slot = %slot, "Alert cleared");
        }
        self.queue.retain(|a| a.slot != slot);
    }

    /// Active alerts sorted by slot.
    pub fn active(&self) -> Vec<AlertView> {
        self.active
            .values()
            .map(|a| AlertView {
                slot: a.alert.slot,
                address: a.alert.address.clone(),
                inactive: a.alert.inactive,
                exclusive: a.exclusive,
            })
            .collect()
    }

    /// Slot holding the exclusive-presentation grant.
    pub fn exclusive_slot(&self) -> Option<SlotId> {
        self.grant
    }

    pub fn is_active(&self, slot: SlotId) -> bool {
        self.active.contains_key(&slot)
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }
}
