use crate::id::{PrepSlotId, TrayId};
use crate::pool::SlotPool;

/// Read-only view of one build workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrepSlot {
    pub id: PrepSlotId,
    pub occupied_by: Option<TrayId>,
}

/// Fixed pool of active build workspaces.
#[derive(Debug, Clone)]
pub struct PrepAllocator {
    pool: SlotPool<PrepSlotId>,
}

impl PrepAllocator {
    pub fn new(capacity: u16) -> Self {
        Self {
            pool: SlotPool::new(capacity),
        }
    }

    pub fn acquire(&mut self, tray: TrayId) -> Option<PrepSlotId> {
        self.pool.acquire(tray)
    }

    pub fn release(&mut self, slot: PrepSlotId) -> Option<TrayId> {
        self.pool.release(slot)
    }

    pub fn first_free(&self) -> Option<PrepSlotId> {
        self.pool.first_free()
    }

    pub fn occupy(&mut self, slot: PrepSlotId, tray: TrayId) -> bool {
        self.pool.occupy(slot, tray)
    }

    pub fn has_free(&self) -> bool {
        self.pool.has_free()
    }

    pub fn occupied_count(&self) -> usize {
        self.pool.occupied_count()
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    pub fn slots(&self) -> Vec<PrepSlot> {
        self.pool
            .iter()
            .map(|(id, occupied_by)| PrepSlot { id, occupied_by })
            .collect()
    }

    pub fn pool(&self) -> &SlotPool<PrepSlotId> {
        &self.pool
    }

    pub fn clear(&mut self) {
        self.pool.clear();
    }
}
