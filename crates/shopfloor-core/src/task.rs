//! Schedulable units of work.

use crate::fixed::Fixed64;
use crate::grid::TilePos;
use crate::id::{ItemId, StageId, WorkerId};
use serde::{Deserialize, Serialize};

/// What kind of work a task asks for. Dispatches via enum match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    /// Transform the item at a workstation in its current department.
    Process { station: TilePos },
    /// Relocate the item from the source department's exit point to the next
    /// department's entry point. `dest_stage` is `None` when the item leaves
    /// the pipeline out of the final stage.
    Carry {
        pickup: TilePos,
        delivery: TilePos,
        dest_stage: Option<StageId>,
    },
}

impl TaskKind {
    /// The tile a claiming worker walks to first: the workstation for
    /// PROCESS, the pickup point for CARRY.
    pub fn target(&self) -> TilePos {
        match self {
            TaskKind::Process { station } => *station,
            TaskKind::Carry { pickup, .. } => *pickup,
        }
    }

    pub fn is_carry(&self) -> bool {
        matches!(self, TaskKind::Carry { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Queued,
    Assigned,
    InProgress,
    Complete,
    Failed,
}

/// A discrete unit of work. The scheduler creates tasks; workers claim,
/// execute and report them.
///
/// Invariant: `assigned_to` is `Some` exactly while status is `Assigned` or
/// `InProgress`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub kind: TaskKind,
    pub status: TaskStatus,
    /// The item this task is for.
    pub item: ItemId,
    /// Home department. For CARRY this is the *source* stage: only that
    /// department's workers may carry its outbound items.
    pub dept: StageId,
    pub assigned_to: Option<WorkerId>,
    /// Sim-seconds of work at the target (PROCESS only; zero for CARRY).
    pub work_duration: Fixed64,
    /// Higher values are served first. The base system leaves this at zero,
    /// so dispatch is FIFO by creation order.
    pub priority: i32,
    /// Monotonic creation counter; the FIFO tie-break within a priority.
    pub seq: u64,
}

impl Task {
    pub fn new(kind: TaskKind, item: ItemId, dept: StageId, work_duration: Fixed64, seq: u64) -> Self {
        Self {
            kind,
            status: TaskStatus::Queued,
            item,
            dept,
            assigned_to: None,
            work_duration,
            priority: 0,
            seq,
        }
    }

    /// Still in the scheduler's hands: queued, claimed, or running.
    pub fn is_live(&self) -> bool {
        matches!(
            self.status,
            TaskStatus::Queued | TaskStatus::Assigned | TaskStatus::InProgress
        )
    }

    pub fn assign(&mut self, worker: WorkerId) {
        self.assigned_to = Some(worker);
        self.status = TaskStatus::Assigned;
    }

    pub fn start(&mut self) {
        self.status = TaskStatus::InProgress;
    }

    pub fn complete(&mut self) {
        self.status = TaskStatus::Complete;
        self.assigned_to = None;
    }

    pub fn fail(&mut self) {
        self.status = TaskStatus::Failed;
        self.assigned_to = None;
    }

    /// Return a failed task to the pool.
    pub fn requeue(&mut self) {
        self.status = TaskStatus::Queued;
        self.assigned_to = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn item_id() -> ItemId {
        let mut sm = SlotMap::<ItemId, ()>::with_key();
        sm.insert(())
    }

    fn worker_id() -> WorkerId {
        let mut sm = SlotMap::<WorkerId, ()>::with_key();
        sm.insert(())
    }

    fn process_task() -> Task {
        Task::new(
            TaskKind::Process { station: TilePos::new(2, 2) },
            item_id(),
            StageId(0),
            Fixed64::from_num(4),
            0,
        )
    }

    #[test]
    fn lifecycle_keeps_assignment_invariant() {
        let mut task = process_task();
        assert_eq!(task.status, TaskStatus::Queued);
        assert_eq!(task.assigned_to, None);

        let worker = worker_id();
        task.assign(worker);
        assert_eq!(task.status, TaskStatus::Assigned);
        assert_eq!(task.assigned_to, Some(worker));

        task.start();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(task.assigned_to.is_some());

        task.complete();
        assert_eq!(task.status, TaskStatus::Complete);
        assert_eq!(task.assigned_to, None);
    }

    #[test]
    fn fail_and_requeue_clears_worker() {
        let mut task = process_task();
        task.assign(worker_id());
        task.fail();
        assert_eq!(task.assigned_to, None);
        assert!(!task.is_live());

        task.requeue();
        assert_eq!(task.status, TaskStatus::Queued);
        assert!(task.is_live());
    }

    #[test]
    fn carry_target_is_pickup() {
        let kind = TaskKind::Carry {
            pickup: TilePos::new(1, 1),
            delivery: TilePos::new(5, 1),
            dest_stage: Some(StageId(1)),
        };
        assert_eq!(kind.target(), TilePos::new(1, 1));
        assert!(kind.is_carry());
    }
}
