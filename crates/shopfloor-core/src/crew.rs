//! The agent pool: hires, fires and steps all worker agents.

use crate::id::{StageId, WorkerId};
use crate::fixed::Fixed64;
use crate::event::Event;
use crate::grid::TilePos;
use crate::scheduler::{Scheduler, TickCtx};
use crate::worker::{Worker, WorkerState};
use slotmap::SlotMap;

#[derive(Debug, thiserror::Error)]
pub enum StaffError {
    #[error("unknown department")]
    UnknownDepartment,
    #[error("department is at its staffing ceiling")]
    AtCapacity,
    #[error("no free tile to spawn a worker on")]
    NoSpawnTile,
    #[error("department has no workers to remove")]
    NoWorkers,
}

/// Owns all worker instances. The roster records hire order: it drives both
/// deterministic per-tick stepping and most-recently-hired fire selection.
#[derive(Debug, Default)]
pub struct Crew {
    workers: SlotMap<WorkerId, Worker>,
    roster: Vec<WorkerId>,
}

impl Crew {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn worker(&self, id: WorkerId) -> Option<&Worker> {
        self.workers.get(id)
    }

    pub fn len(&self) -> usize {
        self.roster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    /// Workers in hire order.
    pub fn iter(&self) -> impl Iterator<Item = (WorkerId, &Worker)> {
        self.roster.iter().filter_map(|id| self.workers.get(*id).map(|w| (*id, w)))
    }

    pub fn count_in(&self, stage: StageId) -> usize {
        self.iter().filter(|(_, w)| w.home == stage).count()
    }

    // -----------------------------------------------------------------------
    // Hire
    // -----------------------------------------------------------------------

    /// Hire a worker into a department, spawning it at the entry drop point
    /// (or the first free interior tile when the drop point is taken).
    pub fn hire(&mut self, stage: StageId, ctx: &mut TickCtx) -> Result<WorkerId, StaffError> {
        let dept = ctx
            .departments
            .get(stage.0 as usize)
            .ok_or(StaffError::UnknownDepartment)?;
        if !dept.has_staff_capacity() {
            return Err(StaffError::AtCapacity);
        }

        let spawn = Self::spawn_tile(dept, ctx).ok_or(StaffError::NoSpawnTile)?;
        let pos = ctx.grid.tile_center(spawn);
        let id = self.workers.insert(Worker::new(stage, spawn, pos));
        self.roster.push(id);
        ctx.grid.set_occupant(spawn, id);

        if let Some(dept) = ctx.departments.get_mut(stage.0 as usize) {
            dept.worker_count += 1;
        }
        ctx.events.emit(Event::WorkerHired { worker: id, stage, tick: ctx.tick });
        Ok(id)
    }

    fn spawn_tile(dept: &crate::department::Department, ctx: &TickCtx) -> Option<TilePos> {
        if let Some(entry) = dept.entry_point()
            && ctx.grid.is_walkable(entry)
            && ctx.grid.occupant(entry).is_none()
        {
            return Some(entry);
        }
        // Fall back to any free walkable tile inside the zone interior.
        let zone = dept.zone;
        for row in zone.row..zone.row + zone.height {
            for col in zone.col..zone.col + zone.width {
                let pos = TilePos::new(col, row);
                if ctx.grid.is_walkable(pos) && ctx.grid.occupant(pos).is_none() {
                    return Some(pos);
                }
            }
        }
        None
    }

    // -----------------------------------------------------------------------
    // Fire
    // -----------------------------------------------------------------------

    /// Remove a worker from a department. Prefers the most recently hired
    /// IDLE worker; with none idle, the most recently hired one goes and its
    /// in-flight task is failed back into the pool first. A task is never
    /// left assigned to a worker that no longer exists.
    pub fn fire(
        &mut self,
        stage: StageId,
        scheduler: &mut Scheduler,
        ctx: &mut TickCtx,
    ) -> Result<WorkerId, StaffError> {
        if ctx.departments.get(stage.0 as usize).is_none() {
            return Err(StaffError::UnknownDepartment);
        }

        let target = self
            .last_hired_matching(stage, |w| w.state == WorkerState::Idle)
            .or_else(|| self.last_hired_matching(stage, |_| true))
            .ok_or(StaffError::NoWorkers)?;

        self.remove(target, scheduler, ctx);
        Ok(target)
    }

    fn last_hired_matching(
        &self,
        stage: StageId,
        filter: impl Fn(&Worker) -> bool,
    ) -> Option<WorkerId> {
        self.roster
            .iter()
            .rev()
            .copied()
            .find(|id| self.workers.get(*id).is_some_and(|w| w.home == stage && filter(w)))
    }

    fn remove(&mut self, id: WorkerId, scheduler: &mut Scheduler, ctx: &mut TickCtx) {
        let Some(worker) = self.workers.remove(id) else { return };
        self.roster.retain(|w| *w != id);

        // Abandoned work returns to the pool before the worker disappears.
        if let Some(task) = worker.task {
            scheduler.fail_task(task, ctx);
        }
        ctx.grid.clear_occupant(worker.tile, id);

        if let Some(dept) = ctx.departments.get_mut(worker.home.0 as usize) {
            dept.worker_count = dept.worker_count.saturating_sub(1);
        }
        ctx.events.emit(Event::WorkerFired { worker: id, stage: worker.home, tick: ctx.tick });
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Step every worker in hire order.
    pub(crate) fn step_all(&mut self, dt: Fixed64, scheduler: &mut Scheduler, ctx: &mut TickCtx) {
        for i in 0..self.roster.len() {
            let id = self.roster[i];
            if let Some(worker) = self.workers.get_mut(id) {
                worker.step(id, dt, scheduler, ctx);
            }
        }
    }
}
