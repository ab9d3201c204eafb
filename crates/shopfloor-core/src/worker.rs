//! Autonomous worker agents.
//!
//! Each worker is a state machine stepped once per tick. Movement
//! interpolates between tile centers along a claimed 4-directional path,
//! handing tile occupancy over tile-by-tile. Waiting (work, deposit, idle
//! poll) is explicit timer state advanced by `dt`, never a wakeup.

use crate::fixed::Fixed64;
use crate::grid::{TilePos, WorldPos};
use crate::id::{ItemId, StageId, TaskId, WorkerId};
use crate::path;
use crate::scheduler::{Scheduler, TickCtx};
use crate::task::TaskKind;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Worker state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerState {
    Idle,
    /// Navigating to a PROCESS task's workstation.
    MovingToStation,
    /// Executing PROCESS work at the workstation.
    Working,
    /// Navigating to a CARRY task's pickup point.
    MovingToPickup,
    /// Hauling the item to the delivery point.
    Carrying,
    /// Depositing the item at the delivery point.
    Delivering,
    /// Walking back to the home department after a delivery. No task held.
    Returning,
}

/// One worker agent. Home department is fixed at hire; the worker only ever
/// claims tasks whose `dept` matches it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub home: StageId,
    pub tile: TilePos,
    pub pos: WorldPos,
    pub state: WorkerState,
    pub task: Option<TaskId>,
    pub carrying: Option<ItemId>,
    path: VecDeque<TilePos>,
    target: WorldPos,
    work_timer: Fixed64,
    deposit_timer: Fixed64,
    idle_timer: Fixed64,
}

impl Worker {
    pub(crate) fn new(home: StageId, tile: TilePos, pos: WorldPos) -> Self {
        Self {
            home,
            tile,
            pos,
            state: WorkerState::Idle,
            task: None,
            carrying: None,
            path: VecDeque::new(),
            target: pos,
            work_timer: Fixed64::ZERO,
            deposit_timer: Fixed64::ZERO,
            idle_timer: Fixed64::ZERO,
        }
    }

    /// Remaining 0..1 fraction of the current work timer, for observers.
    pub fn work_remaining(&self, total: Fixed64) -> Fixed64 {
        if total > Fixed64::ZERO && self.work_timer > Fixed64::ZERO {
            self.work_timer / total
        } else {
            Fixed64::ZERO
        }
    }

    // -----------------------------------------------------------------------
    // Main step
    // -----------------------------------------------------------------------

    pub(crate) fn step(
        &mut self,
        id: WorkerId,
        dt: Fixed64,
        scheduler: &mut Scheduler,
        ctx: &mut TickCtx,
    ) {
        match self.state {
            WorkerState::Idle => self.step_idle(id, dt, scheduler, ctx),
            WorkerState::Working => self.step_working(dt, scheduler, ctx),
            WorkerState::Delivering => self.step_delivering(dt, scheduler, ctx),
            WorkerState::MovingToStation
            | WorkerState::MovingToPickup
            | WorkerState::Carrying
            | WorkerState::Returning => self.step_moving(id, dt, scheduler, ctx),
        }
    }

    // -----------------------------------------------------------------------
    // State handlers
    // -----------------------------------------------------------------------

    fn step_idle(&mut self, id: WorkerId, dt: Fixed64, scheduler: &mut Scheduler, ctx: &mut TickCtx) {
        self.idle_timer -= dt;
        if self.idle_timer > Fixed64::ZERO {
            return;
        }
        match scheduler.request_task(self.home) {
            Some(task) => self.claim(id, task, scheduler, ctx),
            None => self.idle_timer = ctx.config.idle_poll_interval,
        }
    }

    fn step_moving(&mut self, id: WorkerId, dt: Fixed64, scheduler: &mut Scheduler, ctx: &mut TickCtx) {
        if self.path.is_empty() {
            self.on_arrived(id, scheduler, ctx);
            return;
        }

        let step = ctx.config.worker_speed * dt;
        let dx = self.target.x - self.pos.x;
        let dy = self.target.y - self.pos.y;
        // Waypoints are 4-directional, so exactly one axis differs and
        // Manhattan distance is the real distance.
        let dist = dx.abs() + dy.abs();

        if dist <= step {
            // Snap to the waypoint's tile center and take over its tile.
            self.pos = self.target;
            if let Some(next) = self.path.pop_front() {
                ctx.grid.clear_occupant(self.tile, id);
                self.tile = next;
                ctx.grid.set_occupant(next, id);
            }
            match self.path.front() {
                Some(&next) => self.target = ctx.grid.tile_center(next),
                None => self.on_arrived(id, scheduler, ctx),
            }
        } else if dx != Fixed64::ZERO {
            self.pos.x += if dx > Fixed64::ZERO { step } else { -step };
        } else {
            self.pos.y += if dy > Fixed64::ZERO { step } else { -step };
        }
    }

    fn step_working(&mut self, dt: Fixed64, scheduler: &mut Scheduler, ctx: &mut TickCtx) {
        self.work_timer -= dt;
        if self.work_timer <= Fixed64::ZERO {
            if let Some(task) = self.task {
                scheduler.complete_task(task, ctx);
            }
            self.task = None;
            self.state = WorkerState::Idle;
        }
    }

    fn step_delivering(&mut self, dt: Fixed64, scheduler: &mut Scheduler, ctx: &mut TickCtx) {
        self.deposit_timer -= dt;
        if self.deposit_timer > Fixed64::ZERO {
            return;
        }
        if let Some(task) = self.task {
            scheduler.complete_task(task, ctx);
        }
        self.task = None;
        self.carrying = None;

        // Walk back to the home department's entry point; stay put when no
        // route exists.
        let home_entry = ctx
            .departments
            .get(self.home.0 as usize)
            .and_then(|d| d.entry_point());
        self.state = WorkerState::Idle;
        if let Some(entry) = home_entry
            && self.navigate_to(entry, ctx)
        {
            self.state = WorkerState::Returning;
        }
    }

    // -----------------------------------------------------------------------
    // Claiming
    // -----------------------------------------------------------------------

    fn claim(&mut self, id: WorkerId, task_id: TaskId, scheduler: &mut Scheduler, ctx: &mut TickCtx) {
        scheduler.assign(task_id, id, ctx);
        self.task = Some(task_id);

        let Some(kind) = scheduler.task(task_id).map(|t| t.kind) else {
            self.task = None;
            return;
        };
        let (target, next_state) = match kind {
            TaskKind::Process { station } => (station, WorkerState::MovingToStation),
            TaskKind::Carry { pickup, .. } => (pickup, WorkerState::MovingToPickup),
        };

        if self.navigate_to(target, ctx) {
            self.state = next_state;
        } else {
            self.abandon(task_id, scheduler, ctx);
        }
    }

    /// Request a path to `goal`. Returns false when no route exists.
    fn navigate_to(&mut self, goal: TilePos, ctx: &mut TickCtx) -> bool {
        match path::find_path(ctx.grid, self.tile, goal) {
            Some(waypoints) => {
                self.path = waypoints.into();
                self.target = match self.path.front() {
                    Some(&next) => ctx.grid.tile_center(next),
                    None => self.pos,
                };
                true
            }
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Arrival
    // -----------------------------------------------------------------------

    fn on_arrived(&mut self, id: WorkerId, scheduler: &mut Scheduler, ctx: &mut TickCtx) {
        let Some(task_id) = self.task else {
            // End of the walk home, or a stale move with nothing to do.
            self.state = WorkerState::Idle;
            return;
        };

        match self.state {
            WorkerState::MovingToStation => match scheduler.task(task_id).map(|t| t.work_duration) {
                Some(duration) => {
                    self.work_timer = duration;
                    scheduler.start(task_id);
                    self.state = WorkerState::Working;
                }
                None => {
                    self.task = None;
                    self.state = WorkerState::Idle;
                }
            },
            WorkerState::MovingToPickup => {
                let carry = scheduler.task(task_id).map(|t| (t.kind, t.item));
                match carry {
                    Some((TaskKind::Carry { delivery, .. }, item)) => {
                        self.carrying = Some(item);
                        scheduler.item_picked_up(task_id, id, ctx);
                        if self.navigate_to(delivery, ctx) {
                            self.state = WorkerState::Carrying;
                        } else {
                            self.abandon(task_id, scheduler, ctx);
                        }
                    }
                    _ => {
                        self.task = None;
                        self.state = WorkerState::Idle;
                    }
                }
            }
            WorkerState::Carrying => {
                self.deposit_timer = ctx.config.deposit_duration;
                self.state = WorkerState::Delivering;
            }
            _ => self.state = WorkerState::Idle,
        }
    }

    // -----------------------------------------------------------------------
    // Failure
    // -----------------------------------------------------------------------

    /// Fail the current task and cool down before polling again, so an
    /// unroutable task does not thrash the queue every frame.
    pub(crate) fn abandon(&mut self, task_id: TaskId, scheduler: &mut Scheduler, ctx: &mut TickCtx) {
        scheduler.fail_task(task_id, ctx);
        self.task = None;
        self.carrying = None;
        self.state = WorkerState::Idle;
        self.idle_timer = ctx.config.path_fail_cooldown;
    }
}
