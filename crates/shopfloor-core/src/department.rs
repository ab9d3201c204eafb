//! Department resource model: per-stage workstations, drop points and the
//! item buffer.

use crate::grid::TilePos;
use crate::id::{ItemId, StageId, TaskId};
use crate::item::Item;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

/// Default staffing ceiling for a department.
pub const DEFAULT_MAX_WORKERS: u32 = 8;

/// A department's zone rectangle, in tile coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRect {
    pub col: i32,
    pub row: i32,
    pub width: i32,
    pub height: i32,
}

impl ZoneRect {
    pub fn new(col: i32, row: i32, width: i32, height: i32) -> Self {
        Self { col, row, width, height }
    }

    pub fn contains(&self, pos: TilePos) -> bool {
        pos.col >= self.col
            && pos.col < self.col + self.width
            && pos.row >= self.row
            && pos.row < self.row + self.height
    }
}

/// A workstation slot. `reserved_by` is the live PROCESS task that holds it,
/// from task creation until completion or the task leaving the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workstation {
    pub pos: TilePos,
    pub reserved_by: Option<TaskId>,
}

/// One named pipeline stage's resources on the floor.
///
/// Invariants: `worker_count <= max_workers`; each workstation is reserved by
/// at most one live PROCESS task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub stage: StageId,
    pub zone: ZoneRect,
    pub workstations: Vec<Workstation>,
    /// Handoff tiles. The first is the entry point (incoming items land
    /// here), the last is the exit point (outbound pickups).
    pub drop_points: Vec<TilePos>,
    /// Items currently resident, in stable insertion order. Callers must not
    /// assume anything beyond that.
    pub buffer: Vec<ItemId>,
    pub worker_count: u32,
    pub max_workers: u32,
    /// Throughput counter for external reporting.
    pub items_processed: u64,
    /// Latched when task creation is blocked by a configuration gap
    /// (no workstations, or a missing drop point).
    pub stalled: bool,
}

impl Department {
    pub fn new(stage: StageId, zone: ZoneRect) -> Self {
        Self {
            stage,
            zone,
            workstations: Vec::new(),
            drop_points: Vec::new(),
            buffer: Vec::new(),
            worker_count: 0,
            max_workers: DEFAULT_MAX_WORKERS,
            items_processed: 0,
            stalled: false,
        }
    }

    pub fn add_workstation(&mut self, pos: TilePos) {
        self.workstations.push(Workstation { pos, reserved_by: None });
    }

    // -- Buffer --

    /// Add an item to the buffer. Adding an already-present item is a no-op.
    pub fn add_item(&mut self, item: ItemId) {
        if !self.buffer.contains(&item) {
            self.buffer.push(item);
        }
    }

    pub fn remove_item(&mut self, item: ItemId) {
        self.buffer.retain(|i| *i != item);
    }

    pub fn contains_item(&self, item: ItemId) -> bool {
        self.buffer.contains(&item)
    }

    /// First buffered item with no processing started yet.
    pub fn pending_item(&self, items: &SlotMap<ItemId, Item>) -> Option<ItemId> {
        self.buffer
            .iter()
            .copied()
            .find(|id| items.get(*id).is_some_and(|item| item.is_pending()))
    }

    /// First buffered item that is processed and waiting for a carrier.
    pub fn ready_to_carry_item(&self, items: &SlotMap<ItemId, Item>) -> Option<ItemId> {
        self.buffer
            .iter()
            .copied()
            .find(|id| items.get(*id).is_some_and(|item| item.awaiting_carrier()))
    }

    // -- Workstations --

    /// First workstation with no reservation. No load balancing.
    pub fn free_workstation(&self) -> Option<TilePos> {
        self.workstations
            .iter()
            .find(|ws| ws.reserved_by.is_none())
            .map(|ws| ws.pos)
    }

    pub fn free_workstation_count(&self) -> usize {
        self.workstations.iter().filter(|ws| ws.reserved_by.is_none()).count()
    }

    /// Reserve the workstation at `pos` for a task. Returns false if the
    /// tile is not a workstation here or is already held.
    pub fn reserve_workstation(&mut self, pos: TilePos, task: TaskId) -> bool {
        match self.workstations.iter_mut().find(|ws| ws.pos == pos) {
            Some(ws) if ws.reserved_by.is_none() => {
                ws.reserved_by = Some(task);
                true
            }
            _ => false,
        }
    }

    /// Release whatever workstation the given task holds.
    pub fn release_workstation(&mut self, task: TaskId) {
        for ws in &mut self.workstations {
            if ws.reserved_by == Some(task) {
                ws.reserved_by = None;
            }
        }
    }

    // -- Drop points --

    /// Where incoming items are deposited.
    pub fn entry_point(&self) -> Option<TilePos> {
        self.drop_points.first().copied()
    }

    /// Where outbound items are picked up. Falls back to the entry point
    /// when only one drop point is configured.
    pub fn exit_point(&self) -> Option<TilePos> {
        self.drop_points.last().copied()
    }

    pub fn has_staff_capacity(&self) -> bool {
        self.worker_count < self.max_workers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::WorldPos;
    use crate::id::{OrderId, ProductTypeId};

    fn dept() -> Department {
        let mut d = Department::new(StageId(0), ZoneRect::new(0, 0, 6, 6));
        d.add_workstation(TilePos::new(1, 1));
        d.add_workstation(TilePos::new(1, 3));
        d.drop_points.push(TilePos::new(0, 2));
        d.drop_points.push(TilePos::new(5, 2));
        d
    }

    fn task_id() -> TaskId {
        let mut sm = slotmap::SlotMap::<TaskId, ()>::with_key();
        sm.insert(())
    }

    fn item_arena() -> (SlotMap<ItemId, Item>, ItemId) {
        let mut orders = slotmap::SlotMap::<OrderId, ()>::with_key();
        let order = orders.insert(());
        let mut items = SlotMap::with_key();
        let id = items.insert(Item::new(ProductTypeId(0), order, StageId(0), WorldPos::zero()));
        (items, id)
    }

    #[test]
    fn add_item_is_idempotent() {
        let mut d = dept();
        let (_, item) = item_arena();
        d.add_item(item);
        d.add_item(item);
        assert_eq!(d.buffer.len(), 1);
        d.remove_item(item);
        assert!(d.buffer.is_empty());
    }

    #[test]
    fn pending_and_ready_scans() {
        let mut d = dept();
        let (mut items, id) = item_arena();
        d.add_item(id);
        assert_eq!(d.pending_item(&items), Some(id));
        assert_eq!(d.ready_to_carry_item(&items), None);

        let item = items.get_mut(id).unwrap();
        item.processed = true;
        item.ready_to_carry = true;
        assert_eq!(d.pending_item(&items), None);
        assert_eq!(d.ready_to_carry_item(&items), Some(id));
    }

    #[test]
    fn workstation_reservation_is_exclusive() {
        let mut d = dept();
        let t1 = task_id();
        let t2 = task_id();

        let ws = d.free_workstation().unwrap();
        assert!(d.reserve_workstation(ws, t1));
        assert!(!d.reserve_workstation(ws, t2));
        assert_eq!(d.free_workstation(), Some(TilePos::new(1, 3)));

        d.release_workstation(t1);
        assert_eq!(d.free_workstation_count(), 2);
    }

    #[test]
    fn entry_and_exit_points() {
        let d = dept();
        assert_eq!(d.entry_point(), Some(TilePos::new(0, 2)));
        assert_eq!(d.exit_point(), Some(TilePos::new(5, 2)));

        let mut single = Department::new(StageId(0), ZoneRect::new(0, 0, 4, 4));
        single.drop_points.push(TilePos::new(1, 1));
        assert_eq!(single.entry_point(), single.exit_point());

        let empty = Department::new(StageId(0), ZoneRect::new(0, 0, 4, 4));
        assert_eq!(empty.entry_point(), None);
    }
}
