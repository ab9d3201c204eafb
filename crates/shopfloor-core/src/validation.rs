//! Invariant auditing for tests and debugging.
//!
//! Walks the whole engine and reports every broken cross-structure
//! invariant: task/worker assignment linkage, workstation capacity, item
//! flag exclusivity, buffer membership and staffing counts. Scenario tests
//! run this after every significant step; production code never needs to.

use crate::engine::Engine;
use crate::id::{ItemId, StageId, TaskId, WorkerId};
use crate::item::ItemStage;
use crate::task::{TaskKind, TaskStatus};
use crate::worker::WorkerState;

/// One broken invariant, with enough context to locate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// `assigned_to` must be Some exactly while ASSIGNED or IN_PROGRESS.
    TaskAssignmentMismatch { task: TaskId, status: TaskStatus },
    /// A task's assignee does not exist or does not point back at the task.
    TaskWorkerLinkBroken { task: TaskId, worker: WorkerId },
    /// A worker in a task-holding state has no task, or vice versa.
    WorkerTaskMismatch { worker: WorkerId, state: WorkerState },
    /// More IN_PROGRESS process tasks at a department than workstations.
    StationOverCommit {
        stage: StageId,
        in_progress: usize,
        stations: usize,
    },
    /// An item is simultaneously being worked and in carry handoff.
    ItemFlagConflict { item: ItemId },
    /// A buffered item is missing or not actually at that department's stage.
    BufferStageMismatch { item: ItemId, stage: StageId },
    /// Department worker_count disagrees with the crew roster.
    StaffCountMismatch {
        stage: StageId,
        counted: usize,
        recorded: u32,
    },
    /// Department headcount exceeds its ceiling.
    StaffOverCeiling { stage: StageId },
}

/// States in which a worker must hold a task reference. Idle and Returning
/// carry none -- the walk home happens after completion.
fn state_holds_task(state: WorkerState) -> bool {
    matches!(
        state,
        WorkerState::MovingToStation
            | WorkerState::Working
            | WorkerState::MovingToPickup
            | WorkerState::Carrying
            | WorkerState::Delivering
    )
}

/// Audit every invariant; returns all violations found.
pub fn check_invariants(engine: &Engine) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    // -- Task <-> worker linkage --
    for (task_id, task) in engine.scheduler().tasks() {
        let should_have_worker =
            matches!(task.status, TaskStatus::Assigned | TaskStatus::InProgress);
        if task.assigned_to.is_some() != should_have_worker {
            violations.push(InvariantViolation::TaskAssignmentMismatch {
                task: task_id,
                status: task.status,
            });
        }
        if let Some(worker_id) = task.assigned_to {
            let linked = engine
                .crew()
                .worker(worker_id)
                .is_some_and(|w| w.task == Some(task_id));
            if !linked {
                violations.push(InvariantViolation::TaskWorkerLinkBroken {
                    task: task_id,
                    worker: worker_id,
                });
            }
        }
    }

    for (worker_id, worker) in engine.crew().iter() {
        if worker.task.is_some() != state_holds_task(worker.state) {
            violations.push(InvariantViolation::WorkerTaskMismatch {
                worker: worker_id,
                state: worker.state,
            });
        }
    }

    // -- Workstation capacity --
    for dept in engine.departments() {
        let in_progress = engine
            .scheduler()
            .tasks()
            .filter(|(_, t)| {
                t.dept == dept.stage
                    && t.status == TaskStatus::InProgress
                    && matches!(t.kind, TaskKind::Process { .. })
            })
            .count();
        if in_progress > dept.workstations.len() {
            violations.push(InvariantViolation::StationOverCommit {
                stage: dept.stage,
                in_progress,
                stations: dept.workstations.len(),
            });
        }
    }

    // -- Item flag exclusivity --
    for (item_id, item) in engine.items() {
        let in_transit = item.ready_to_carry && item.carrier.is_some();
        if item.being_processed && in_transit {
            violations.push(InvariantViolation::ItemFlagConflict { item: item_id });
        }
    }

    // -- Buffer membership --
    for dept in engine.departments() {
        for &item_id in &dept.buffer {
            let at_stage = engine
                .item(item_id)
                .is_some_and(|i| i.stage == ItemStage::At(dept.stage));
            if !at_stage {
                violations.push(InvariantViolation::BufferStageMismatch {
                    item: item_id,
                    stage: dept.stage,
                });
            }
        }
    }

    // -- Staffing --
    for dept in engine.departments() {
        let counted = engine.crew().count_in(dept.stage);
        if counted != dept.worker_count as usize {
            violations.push(InvariantViolation::StaffCountMismatch {
                stage: dept.stage,
                counted,
                recorded: dept.worker_count,
            });
        }
        if dept.worker_count > dept.max_workers {
            violations.push(InvariantViolation::StaffOverCeiling { stage: dept.stage });
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::StageId;
    use crate::test_utils::*;

    #[test]
    fn healthy_engine_has_no_violations() {
        let mut engine = two_stage_engine();
        engine.hire(StageId(0)).unwrap();
        engine.hire(StageId(1)).unwrap();
        spawn_unit(&mut engine);

        for _ in 0..600 {
            engine.advance(fixed(0.1));
            let violations = check_invariants(&engine);
            assert!(violations.is_empty(), "violations at tick {}: {violations:?}", engine.sim_state.tick);
        }
    }

    #[test]
    fn corrupted_worker_count_is_reported() {
        let mut engine = two_stage_engine();
        engine.hire(StageId(0)).unwrap();
        engine.department_mut(StageId(0)).unwrap().worker_count = 5;

        let violations = check_invariants(&engine);
        assert!(violations
            .iter()
            .any(|v| matches!(v, InvariantViolation::StaffCountMismatch { .. })));
    }
}
