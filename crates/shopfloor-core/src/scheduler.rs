//! The task scheduler: turns item arrivals into schedulable work, arbitrates
//! claims, and reacts to completion and failure.
//!
//! The scheduler owns the task table and the pending queue exclusively.
//! Items, departments and the grid are reached through a [`TickCtx`] view
//! assembled by the engine each phase, so every mutation of shared state
//! happens on the single tick thread.

use crate::department::Department;
use crate::event::{Event, EventBus};
use crate::fixed::{Fixed64, Ticks};
use crate::grid::FloorGrid;
use crate::id::{ItemId, OrderId, StageId, TaskId, WorkerId};
use crate::item::Item;
use crate::order::Order;
use crate::registry::StageRegistry;
use crate::sim::SimConfig;
use crate::task::{Task, TaskKind, TaskStatus};
use slotmap::SlotMap;

// ---------------------------------------------------------------------------
// TickCtx
// ---------------------------------------------------------------------------

/// Borrowed view of the sim state a scheduler or worker step may touch.
/// Assembled by the engine from its own fields; never stored.
pub struct TickCtx<'a> {
    pub grid: &'a mut FloorGrid,
    pub items: &'a mut SlotMap<ItemId, Item>,
    pub orders: &'a mut SlotMap<OrderId, Order>,
    pub departments: &'a mut [Department],
    pub registry: &'a StageRegistry,
    pub events: &'a mut EventBus,
    pub config: &'a SimConfig,
    pub tick: Ticks,
}

impl TickCtx<'_> {
    pub fn department(&self, stage: StageId) -> Option<&Department> {
        self.departments.get(stage.0 as usize)
    }

    pub fn department_mut(&mut self, stage: StageId) -> Option<&mut Department> {
        self.departments.get_mut(stage.0 as usize)
    }
}

// ---------------------------------------------------------------------------
// Stall latch
// ---------------------------------------------------------------------------

/// Latch the configuration-gap signal for a department. Raised once, not
/// re-emitted every retry tick.
fn raise_stall(dept: &mut Department, events: &mut EventBus, tick: Ticks) {
    if !dept.stalled {
        dept.stalled = true;
        events.emit(Event::DepartmentStalled { stage: dept.stage, tick });
    }
}

fn clear_stall(dept: &mut Department, events: &mut EventBus, tick: Ticks) {
    if dept.stalled {
        dept.stalled = false;
        events.emit(Event::DepartmentResumed { stage: dept.stage, tick });
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// The central coordinator between items and workers.
///
/// Workers poll [`Scheduler::request_task`] when idle and report back through
/// `complete_task` / `fail_task`. The engine calls [`Scheduler::retry_pass`]
/// once per tick to re-attempt creation that earlier races skipped.
#[derive(Debug, Default)]
pub struct Scheduler {
    tasks: SlotMap<TaskId, Task>,
    /// Unassigned-first queue in creation order. Tasks stay listed here
    /// until completion; `request_task` filters on QUEUED status.
    pending: Vec<TaskId>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn tasks(&self) -> impl Iterator<Item = (TaskId, &Task)> {
        self.tasks.iter()
    }

    /// Number of QUEUED tasks waiting for a worker of the given department.
    pub fn queued_count(&self, stage: StageId) -> usize {
        self.pending
            .iter()
            .filter_map(|id| self.tasks.get(*id))
            .filter(|t| t.dept == stage && t.status == TaskStatus::Queued)
            .count()
    }

    /// Tasks still queued, claimed, or running.
    pub fn live_task_count(&self) -> usize {
        self.tasks.values().filter(|t| t.is_live()).count()
    }

    /// Highest-priority QUEUED task claimable by a worker of `home`.
    /// Priority descending, creation order as tie-break. Pure query;
    /// claiming is the caller's explicit `assign` step.
    pub fn request_task(&self, home: StageId) -> Option<TaskId> {
        let mut best: Option<(i32, TaskId)> = None;
        for &id in &self.pending {
            let Some(task) = self.tasks.get(id) else { continue };
            if task.status != TaskStatus::Queued || task.dept != home {
                continue;
            }
            match best {
                Some((priority, _)) if task.priority <= priority => {}
                _ => best = Some((task.priority, id)),
            }
        }
        best.map(|(_, id)| id)
    }

    // -----------------------------------------------------------------------
    // Arrival
    // -----------------------------------------------------------------------

    /// An item has been placed in its current stage's buffer. Registers it
    /// and attempts PROCESS task creation; when no workstation is free the
    /// item just stays buffered and the retry pass picks it up later.
    pub fn item_arrived(&mut self, item_id: ItemId, ctx: &mut TickCtx) {
        let Some(item) = ctx.items.get(item_id) else { return };
        let Some(stage) = item.stage.stage_id() else { return };
        if let Some(dept) = ctx.departments.get_mut(stage.0 as usize) {
            dept.add_item(item_id);
        }
        ctx.events.emit(Event::ItemArrived { item: item_id, stage, tick: ctx.tick });
        self.try_create_process(item_id, ctx);
    }

    // -----------------------------------------------------------------------
    // Claim protocol
    // -----------------------------------------------------------------------

    /// Claim a task for a worker: ASSIGNED with the worker recorded.
    pub fn assign(&mut self, task_id: TaskId, worker: WorkerId, ctx: &mut TickCtx) {
        let Some(task) = self.tasks.get_mut(task_id) else { return };
        task.assign(worker);
        // A PROCESS task re-claimed after a failure re-arms the item flag
        // that fail_task cleared.
        if let TaskKind::Process { .. } = task.kind
            && let Some(item) = ctx.items.get_mut(task.item)
        {
            item.being_processed = true;
        }
    }

    /// The claiming worker arrived and began executing.
    pub fn start(&mut self, task_id: TaskId) {
        if let Some(task) = self.tasks.get_mut(task_id) {
            task.start();
        }
    }

    /// The carrier picked the item up at the pickup point. The carry is now
    /// running: IN_PROGRESS with the item attached.
    pub fn item_picked_up(&mut self, task_id: TaskId, worker: WorkerId, ctx: &mut TickCtx) {
        let Some(task) = self.tasks.get_mut(task_id) else { return };
        let TaskKind::Carry { pickup, .. } = task.kind else { return };
        task.start();
        if let Some(item) = ctx.items.get_mut(task.item) {
            item.carrier = Some(worker);
            item.pos = ctx.grid.tile_center(pickup);
        }
    }

    // -----------------------------------------------------------------------
    // Completion
    // -----------------------------------------------------------------------

    /// Mark a task COMPLETE and apply its effects. Completing an unknown or
    /// already-completed task is a no-op, so double reports are harmless.
    pub fn complete_task(&mut self, task_id: TaskId, ctx: &mut TickCtx) {
        let Some(mut task) = self.tasks.remove(task_id) else { return };
        self.pending.retain(|t| *t != task_id);
        task.complete();
        ctx.events.emit(Event::TaskCompleted { task: task_id, dept: task.dept, tick: ctx.tick });

        if let TaskKind::Process { .. } = task.kind
            && let Some(dept) = ctx.departments.get_mut(task.dept.0 as usize)
        {
            dept.release_workstation(task_id);
        }

        if !ctx.items.contains_key(task.item) {
            // The item vanished externally; there is nothing to progress.
            return;
        }

        match task.kind {
            TaskKind::Process { .. } => self.finish_process(&task, ctx),
            TaskKind::Carry { .. } => self.finish_carry(&task, ctx),
        }
    }

    fn finish_process(&mut self, task: &Task, ctx: &mut TickCtx) {
        if let Some(item) = ctx.items.get_mut(task.item) {
            item.being_processed = false;
            item.processed = true;
            item.ready_to_carry = true;
        }
        if let Some(dept) = ctx.departments.get_mut(task.dept.0 as usize) {
            dept.items_processed += 1;
        }
        self.try_create_carry(task.item, ctx);
    }

    fn finish_carry(&mut self, task: &Task, ctx: &mut TickCtx) {
        let old_stage = ctx.items.get(task.item).and_then(|i| i.stage.stage_id());
        if let Some(old) = old_stage
            && let Some(dept) = ctx.departments.get_mut(old.0 as usize)
        {
            dept.remove_item(task.item);
        }

        let next = old_stage.and_then(|s| ctx.registry.next_stage(s));
        if let Some(item) = ctx.items.get_mut(task.item) {
            item.advance(next);
        }

        match next {
            Some(new_stage) => {
                // Land the item on the next department's entry point, then
                // run the arrival cycle again. This cascade only enqueues;
                // claiming happens on a later IDLE poll.
                let entry = ctx
                    .departments
                    .get(new_stage.0 as usize)
                    .and_then(|d| d.entry_point());
                if let Some(entry) = entry
                    && let Some(item) = ctx.items.get_mut(task.item)
                {
                    item.pos = ctx.grid.tile_center(entry);
                }
                self.item_arrived(task.item, ctx);
            }
            None => {
                // Out of the final stage: ownership passes to the order
                // collaborator.
                let Some(order_id) = ctx.items.get(task.item).map(|i| i.order) else {
                    return;
                };
                ctx.events.emit(Event::ItemDelivered {
                    item: task.item,
                    order: order_id,
                    tick: ctx.tick,
                });
                if let Some(order) = ctx.orders.get_mut(order_id)
                    && order.record_delivery()
                {
                    ctx.events.emit(Event::OrderCompleted { order: order_id, tick: ctx.tick });
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Failure
    // -----------------------------------------------------------------------

    /// Mark a task FAILED, reset the item so it is re-schedulable, and
    /// return the task to the pool with no assignee.
    pub fn fail_task(&mut self, task_id: TaskId, ctx: &mut TickCtx) {
        let (kind, item_id, dept) = match self.tasks.get_mut(task_id) {
            Some(task) if task.is_live() => {
                task.fail();
                let captured = (task.kind, task.item, task.dept);
                task.requeue();
                captured
            }
            _ => return,
        };

        ctx.events.emit(Event::TaskFailed { task: task_id, dept, tick: ctx.tick });

        if let Some(item) = ctx.items.get_mut(item_id) {
            match kind {
                TaskKind::Process { .. } => item.being_processed = false,
                TaskKind::Carry { .. } => {
                    item.ready_to_carry = true;
                    item.carrier = None;
                }
            }
        }

        if !self.pending.contains(&task_id) {
            self.pending.push(task_id);
        }
    }

    // -----------------------------------------------------------------------
    // Retry pass
    // -----------------------------------------------------------------------

    /// Once per tick: re-attempt task creation that an arrival event missed
    /// because a workstation or drop point was busy at the time. This is the
    /// self-healing mechanism; without it an item whose creation raced a
    /// full department would stall forever.
    pub fn retry_pass(&mut self, ctx: &mut TickCtx) {
        for i in 0..ctx.departments.len() {
            let (pending_item, carry_item) = {
                let dept = &ctx.departments[i];
                (dept.pending_item(ctx.items), dept.ready_to_carry_item(ctx.items))
            };

            if let Some(item_id) = pending_item
                && !self.has_queued_task_for(item_id)
            {
                self.try_create_process(item_id, ctx);
            }

            // An item whose carry task is merely ASSIGNED still has no
            // carrier recorded, so the check covers every live carry task,
            // not just QUEUED ones. One item, one carry.
            if let Some(item_id) = carry_item
                && !self.has_live_carry(item_id)
            {
                self.try_create_carry(item_id, ctx);
            }
        }
    }

    fn has_queued_task_for(&self, item: ItemId) -> bool {
        self.tasks
            .values()
            .any(|t| t.item == item && t.status == TaskStatus::Queued)
    }

    fn has_live_carry(&self, item: ItemId) -> bool {
        self.tasks
            .values()
            .any(|t| t.item == item && t.kind.is_carry() && t.is_live())
    }

    // -----------------------------------------------------------------------
    // Task creation
    // -----------------------------------------------------------------------

    fn try_create_process(&mut self, item_id: ItemId, ctx: &mut TickCtx) -> Option<TaskId> {
        let item = ctx.items.get(item_id)?;
        if item.being_processed || item.processed {
            return None;
        }
        let stage = item.stage.stage_id()?;
        let work_duration = ctx.registry.stage(stage)?.work_duration;

        let dept = ctx.departments.get_mut(stage.0 as usize)?;
        if dept.workstations.is_empty() {
            raise_stall(dept, ctx.events, ctx.tick);
            return None;
        }
        clear_stall(dept, ctx.events, ctx.tick);
        // No free workstation is capacity exhaustion, not a stall; the item
        // stays buffered and the retry pass keeps attempting.
        let station = dept.free_workstation()?;

        let seq = self.next_seq;
        self.next_seq += 1;
        let task_id = self.tasks.insert(Task::new(
            TaskKind::Process { station },
            item_id,
            stage,
            work_duration,
            seq,
        ));
        dept.reserve_workstation(station, task_id);
        self.pending.push(task_id);

        if let Some(item) = ctx.items.get_mut(item_id) {
            item.being_processed = true;
        }
        ctx.events.emit(Event::TaskCreated { task: task_id, dept: stage, carry: false, tick: ctx.tick });
        Some(task_id)
    }

    fn try_create_carry(&mut self, item_id: ItemId, ctx: &mut TickCtx) -> Option<TaskId> {
        let item = ctx.items.get(item_id)?;
        if !item.processed {
            return None;
        }
        let stage = item.stage.stage_id()?;

        let next = ctx.registry.next_stage(stage);
        let pickup = ctx.departments.get(stage.0 as usize)?.exit_point();
        let delivery = match next {
            Some(n) => ctx.departments.get(n.0 as usize).and_then(|d| d.entry_point()),
            // Out of the final stage the handoff happens at the source's own
            // exit point.
            None => pickup,
        };

        let (Some(pickup), Some(delivery)) = (pickup, delivery) else {
            // Configuration gap: a drop point is missing. The item stays
            // buffered and the retry pass keeps attempting; surfaced to
            // observers through the stall latch.
            if let Some(dept) = ctx.departments.get_mut(stage.0 as usize) {
                raise_stall(dept, ctx.events, ctx.tick);
            }
            return None;
        };
        if let Some(dept) = ctx.departments.get_mut(stage.0 as usize) {
            clear_stall(dept, ctx.events, ctx.tick);
        }

        if let Some(item) = ctx.items.get_mut(item_id) {
            item.ready_to_carry = true;
            item.carrier = None;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let task_id = self.tasks.insert(Task::new(
            TaskKind::Carry { pickup, delivery, dest_stage: next },
            item_id,
            stage,
            Fixed64::ZERO,
            seq,
        ));
        self.pending.push(task_id);
        ctx.events.emit(Event::TaskCreated { task: task_id, dept: stage, carry: true, tick: ctx.tick });
        Some(task_id)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
