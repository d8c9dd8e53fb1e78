use crate::fixed::Fixed64;
use crate::id::{DockSlotId, TrayId};
use crate::pool::SlotPool;

/// Where a ship parks, in world units along the station's dock line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DockPosition {
    pub x: Fixed64,
    pub y: Fixed64,
}

/// Read-only view of one parking position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DockSlot {
    pub id: DockSlotId,
    pub position: DockPosition,
    pub occupied_by: Option<TrayId>,
}

/// Fixed pool of customer parking positions.
#[derive(Debug, Clone)]
pub struct DockAllocator {
    pool: SlotPool<DockSlotId>,
    positions: Vec<DockPosition>,
}

impl DockAllocator {
    /// `capacity` slots laid out left to right, `spacing` apart.
    pub fn new(capacity: u16, spacing: Fixed64) -> Self {
        let positions = (0..capacity)
            .map(|i| DockPosition {
                x: spacing * i as i64,
                y: Fixed64::ZERO,
            })
            .collect();
        Self {
            pool: SlotPool::new(capacity),
            positions,
        }
    }

    pub fn acquire(&mut self, tray: TrayId) -> Option<DockSlotId> {
        self.pool.acquire(tray)
    }

    pub fn release(&mut self, slot: DockSlotId) -> Option<TrayId> {
        self.pool.release(slot)
    }

    pub fn first_free(&self) -> Option<DockSlotId> {
        self.pool.first_free()
    }

    pub fn occupy(&mut self, slot: DockSlotId, tray: TrayId) -> bool {
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

    pub fn position(&self, slot: DockSlotId) -> Option<DockPosition> {
        self.positions.get(slot.0 as usize).copied()
    }

    pub fn slot(&self, slot: DockSlotId) -> Option<DockSlot> {
        Some(DockSlot {
            id: slot,
            position: self.position(slot)?,
            occupied_by: self.pool.occupant(slot),
        })
    }

    pub fn slots(&self) -> Vec<DockSlot> {
        self.pool
            .iter()
            .zip(&self.positions)
            .map(|((id, occupied_by), &position)| DockSlot {
                id,
                position,
                occupied_by,
            })
            .collect()
    }

    pub fn pool(&self) -> &SlotPool<DockSlotId> {
        &self.pool
    }

    pub fn clear(&mut self) {
        self.pool.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn positions_are_spaced_along_x() {
        let docks = DockAllocator::new(4, Fixed64::from_num(3));
        let xs: Vec<i64> = docks
            .slots()
            .iter()
            .map(|s| s.position.x.to_num::<i64>())
            .collect();
        assert_eq!(xs, vec![0, 3, 6, 9]);
    }

    #[test]
    fn slot_view_reports_occupant() {
        let mut sm = SlotMap::<TrayId, ()>::with_key();
        let tray = sm.insert(());
        let mut docks = DockAllocator::new(2, Fixed64::ONE);
        let slot = docks.acquire(tray).unwrap();
        assert_eq!(docks.slot(slot).unwrap().occupied_by, Some(tray));
        docks.release(slot);
        assert_eq!(docks.slot(slot).unwrap().occupied_by, None);
        assert!(docks.slot(DockSlotId(9)).is_none());
    }
}
