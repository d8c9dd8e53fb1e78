//! Fixed-capacity slot pools shared by the dock and prep allocators.
//!
//! A slot is free iff it has no occupant. `acquire` only ever hands out a
//! free slot and `release` reports whether it actually freed something, so
//! a double release is visible to the caller instead of silently
//! corrupting the pool.

use crate::id::{DockSlotId, PrepSlotId, TrayId};

/// Index-backed slot key.
pub trait SlotKey: Copy + Eq + std::fmt::Debug {
    fn from_index(index: u16) -> Self;
    fn index(self) -> usize;
}

impl SlotKey for DockSlotId {
    fn from_index(index: u16) -> Self {
        DockSlotId(index)
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl SlotKey for PrepSlotId {
    fn from_index(index: u16) -> Self {
        PrepSlotId(index)
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotPool<K> {
    occupants: Vec<Option<TrayId>>,
    _key: std::marker::PhantomData<K>,
    /// Lifetime acquire/release counters, for balance checks.
    acquired: u64,
    released: u64,
}

impl<K: SlotKey> SlotPool<K> {
    pub fn new(capacity: u16) -> Self {
        Self {
            occupants: vec![None; capacity as usize],
            _key: std::marker::PhantomData,
            acquired: 0,
            released: 0,
        }
    }

    /// Reserve the lowest free slot for `tray`.
    pub fn acquire(&mut self, tray: TrayId) -> Option<K> {
        let slot = self.first_free()?;
        self.occupy(slot, tray).then_some(slot)
    }

    /// The slot `acquire` would hand out next.
    pub fn first_free(&self) -> Option<K> {
        let index = self.occupants.iter().position(Option::is_none)?;
        Some(K::from_index(index as u16))
    }

    /// Occupy a specific slot. Returns false (and changes nothing) when the
    /// slot is taken or out of range.
    pub fn occupy(&mut self, slot: K, tray: TrayId) -> bool {
        match self.occupants.get_mut(slot.index()) {
            Some(occupant @ None) => {
                *occupant = Some(tray);
                self.acquired += 1;
                true
            }
            _ => false,
        }
    }

    /// Free a slot. Returns the tray that held it, or `None` if the slot was
    /// already free or out of range.
    pub fn release(&mut self, slot: K) -> Option<TrayId> {
        let freed = self.occupants.get_mut(slot.index())?.take();
        if freed.is_some() {
            self.released += 1;
        }
        freed
    }

    pub fn occupant(&self, slot: K) -> Option<TrayId> {
        self.occupants.get(slot.index()).copied().flatten()
    }

    pub fn is_free(&self, slot: K) -> bool {
        self.occupant(slot).is_none()
    }

    pub fn has_free(&self) -> bool {
        self.occupants.iter().any(Option::is_none)
    }

    pub fn capacity(&self) -> usize {
        self.occupants.len()
    }

    pub fn occupied_count(&self) -> usize {
        self.occupants.iter().filter(|o| o.is_some()).count()
    }

    pub fn free_count(&self) -> usize {
        self.capacity() - self.occupied_count()
    }

    /// `(slot, occupant)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (K, Option<TrayId>)> + '_ {
        self.occupants
            .iter()
            .enumerate()
            .map(|(i, o)| (K::from_index(i as u16), *o))
    }

    pub fn acquired_total(&self) -> u64 {
        self.acquired
    }

    pub fn released_total(&self) -> u64 {
        self.released
    }

    /// Free every slot (shift teardown).
    pub fn clear(&mut self) {
        for occupant in &mut self.occupants {
            if occupant.take().is_some() {
                self.released += 1;
            }
        }
    }
}
