//! Read-only query API for inspecting simulation state.
//!
//! Snapshot types aggregate engine state into owned views for rendering, UI
//! and FFI consumers -- no references into internal storage.

use crate::engine::Engine;
use crate::grid::{TilePos, WorldPos};
use crate::id::{ItemId, StageId, WorkerId};
use crate::worker::WorkerState;

// ---------------------------------------------------------------------------
// Department snapshot
// ---------------------------------------------------------------------------

/// An aggregated, read-only view of one department.
#[derive(Debug, Clone)]
pub struct DepartmentSnapshot {
    pub stage: StageId,
    pub name: String,
    /// Items currently resident in the buffer.
    pub buffered_items: usize,
    /// Lifetime processed counter, for external reporting.
    pub items_processed: u64,
    pub worker_count: u32,
    pub max_workers: u32,
    /// QUEUED tasks waiting for this department's workers.
    pub pending_tasks: usize,
    pub free_workstations: usize,
    /// True while task creation is blocked by a configuration gap.
    pub stalled: bool,
}

// ---------------------------------------------------------------------------
// Worker snapshot
// ---------------------------------------------------------------------------

/// An aggregated, read-only view of one worker agent.
#[derive(Debug, Clone)]
pub struct WorkerSnapshot {
    pub id: WorkerId,
    pub home: StageId,
    pub state: WorkerState,
    pub tile: TilePos,
    pub pos: WorldPos,
    pub carrying: Option<ItemId>,
}

// ---------------------------------------------------------------------------
// Engine queries
// ---------------------------------------------------------------------------

impl Engine {
    pub fn department_snapshot(&self, stage: StageId) -> Option<DepartmentSnapshot> {
        let dept = self.department(stage)?;
        let name = self
            .registry()
            .stage(stage)
            .map(|def| def.display_name.clone())
            .unwrap_or_default();
        Some(DepartmentSnapshot {
            stage,
            name,
            buffered_items: dept.buffer.len(),
            items_processed: dept.items_processed,
            worker_count: dept.worker_count,
            max_workers: dept.max_workers,
            pending_tasks: self.scheduler().queued_count(stage),
            free_workstations: dept.free_workstation_count(),
            stalled: dept.stalled,
        })
    }

    /// Snapshots for every department, in pipeline order.
    pub fn department_snapshots(&self) -> Vec<DepartmentSnapshot> {
        self.registry()
            .stage_ids()
            .filter_map(|stage| self.department_snapshot(stage))
            .collect()
    }

    /// Snapshots for every worker, in hire order.
    pub fn worker_snapshots(&self) -> Vec<WorkerSnapshot> {
        self.crew()
            .iter()
            .map(|(id, worker)| WorkerSnapshot {
                id,
                home: worker.home,
                state: worker.state,
                tile: worker.tile,
                pos: worker.pos,
                carrying: worker.carrying,
            })
            .collect()
    }

    /// QUEUED tasks waiting for the given department's workers.
    pub fn pending_task_count(&self, stage: StageId) -> usize {
        self.scheduler().queued_count(stage)
    }
}
