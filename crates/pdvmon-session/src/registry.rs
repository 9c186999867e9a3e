//! Slot ↔ terminal address registry.
//!
//! The registry is the single source of truth for which slot owns which
//! terminal. Both directions are kept in lockstep so that the mapping is
//! always a bijection over registered terminals.

use std::collections::HashMap;

use pdvmon_core::{SlotId, TerminalAddress};

/// Mappings removed by a [`Registry::register`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Displaced {
    /// Address the slot held before (if different from the new one).
    pub previous_address: Option<TerminalAddress>,
    /// Slot that held the address before (if different from the new one).
    pub previous_slot: Option<SlotId>,
}

/// Bidirectional slot/address map.
#[derive(Debug, Default)]
pub struct Registry {
    by_slot: HashMap<SlotId, TerminalAddress>,
    by_address: HashMap<TerminalAddress, SlotId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `address` to `slot`.
    ///
    /// Any mapping held by the slot and any mapping held by the address are
    /// removed first. Registering the same pair again is a no-op.
    pub fn register(&mut self, slot: SlotId, address: TerminalAddress) -> Displaced {
        if self.by_slot.get(&slot) == Some(&address) {
            return Displaced::default();
        }

        let previous_address = self.by_slot.remove(&slot);
        if let Some(ref old) = previous_address {
            self.by_address.remove(old);
        }

        let previous_slot = self.by_address.remove(&address);
        if let Some(old) = previous_slot {
            self.by_slot.remove(&old);
        }

        self.by_slot.insert(slot, address.clone());
        self.by_address.insert(address, slot);

        Displaced {
            previous_address,
            previous_slot,
        }
    }

    /// Slot currently owning `address`.
    pub fn resolve_slot(&self, address: &TerminalAddress) -> Option<SlotId> {
        self.by_address.get(address).copied()
    }

    /// Address currently bound to `slot`.
    pub fn resolve_address(&self, slot: SlotId) -> Option<&TerminalAddress> {
        self.by_slot.get(&slot)
    }

    /// Removes the slot's mapping, if any.
    pub fn clear(&mut self, slot: SlotId) -> Option<TerminalAddress> {
        let address = self.by_slot.remove(&slot)?;
        self.by_address.remove(&address);
        Some(address)
    }

    /// Removes every mapping.
    pub fn clear_all(&mut self) {
        self.by_slot.clear();
        self.by_address.clear();
    }

    pub fn len(&self) -> usize {
        self.by_slot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_slot.is_empty()
    }

    /// All registrations sorted by slot.
    pub fn registrations(&self) -> Vec<(SlotId, TerminalAddress)> {
        let mut all: Vec<_> = self
            .by_slot
            .iter()
            .map(|(slot, address)| (*slot, address.clone()))
            .collect();
        all.sort_by_key(|(slot, _)| *slot);
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(n: u8) -> SlotId {
        SlotId::new(n)
    }

    fn addr(s: &str) -> TerminalAddress {
        TerminalAddress::parse(s).unwrap()
    }

    /// Checks both directions agree and no address is shared.
    fn assert_bijection(registry: &Registry) {
        for (s, a) in registry.registrations() {
            assert_eq!(registry.resolve_slot(&a), Some(s));
            assert_eq!(registry.resolve_address(s), Some(&a));
        }
        assert_eq!(registry.by_slot.len(), registry.by_address.len());
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = Registry::new();
        let displaced = registry.register(slot(1), addr("10.0.0.5"));

        assert_eq!(displaced, Displaced::default());
        assert_eq!(registry.resolve_slot(&addr("10.0.0.5")), Some(slot(1)));
        assert_eq!(registry.resolve_address(slot(1)), Some(&addr("10.0.0.5")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_same_pair_is_idempotent() {
        let mut registry = Registry::new();
        registry.register(slot(1), addr("10.0.0.5"));
        let displaced = registry.register(slot(1), addr("10.0.0.5"));

        assert_eq!(displaced, Displaced::default());
        assert_eq!(registry.len(), 1);
        assert_bijection(&registry);
    }

    #[test]
    fn test_reregister_slot_replaces_address() {
        let mut registry = Registry::new();
        registry.register(slot(1), addr("10.0.0.5"));
        let displaced = registry.register(slot(1), addr("10.0.0.6"));

        assert_eq!(displaced.previous_address, Some(addr("10.0.0.5")));
        assert_eq!(displaced.previous_slot, None);
        assert_eq!(registry.resolve_slot(&addr("10.0.0.5")), None);
        assert_bijection(&registry);
    }

    #[test]
    fn test_address_moves_between_slots() {
        let mut registry = Registry::new();
        registry.register(slot(1), addr("10.0.0.5"));
        let displaced = registry.register(slot(2), addr("10.0.0.5"));

        assert_eq!(displaced.previous_slot, Some(slot(1)));
        assert_eq!(registry.resolve_address(slot(1)), None);
        assert_eq!(registry.resolve_slot(&addr("10.0.0.5")), Some(slot(2)));
        assert_bijection(&registry);
    }

    #[test]
    fn test_bijection_holds_for_register_sequences() {
        let addresses = ["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4", "10.0.0.5"];
        let mut registry = Registry::new();

        // Deterministic pseudo-random walk over (slot, address) pairs.
        let mut x: u32 = 7;
        for _ in 0..500 {
            x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let s = slot(((x >> 8) % 4) as u8 + 1);
            let a = addresses[((x >> 16) % 5) as usize];
            registry.register(s, addr(a));
            assert_bijection(&registry);

            if (x >> 4) % 11 == 0 {
                registry.clear(s);
                assert_bijection(&registry);
            }
        }
    }

    #[test]
    fn test_clear_and_clear_all() {
        let mut registry = Registry::new();
        registry.register(slot(1), addr("10.0.0.5"));
        registry.register(slot(2), addr("10.0.0.6"));

        assert_eq!(registry.clear(slot(1)), Some(addr("10.0.0.5")));
        assert_eq!(registry.clear(slot(1)), None);
        assert_eq!(registry.resolve_slot(&addr("10.0.0.5")), None);

        registry.clear_all();
        assert!(registry.is_empty());
        assert_eq!(registry.resolve_slot(&addr("10.0.0.6")), None);
    }

    #[test]
    fn test_registrations_sorted() {
        let mut registry = Registry::new();
        registry.register(slot(3), addr("10.0.0.3"));
        registry.register(slot(1), addr("10.0.0.1"));
        let slots: Vec<u8> = registry.registrations().iter().map(|(s, _)| s.get()).collect();
        assert_eq!(slots, vec![1, 3]);
    }
}
