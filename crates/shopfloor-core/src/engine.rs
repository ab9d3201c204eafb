//! The simulation engine: owns all floor state and orchestrates the tick
//! pipeline.
//!
//! # Architecture
//!
//! The `Engine` owns:
//! - A [`FloorGrid`] (tiles, walkability, occupancy)
//! - A frozen [`StageRegistry`] (the pipeline order)
//! - Arena state: items, orders, departments
//! - The [`Scheduler`] (task table + pending queue)
//! - The [`Crew`] (worker agents)
//! - A [`CommandQueue`] and an [`EventBus`]
//!
//! # Tick Pipeline
//!
//! Each `advance(dt)` runs, in fixed order:
//! 1. **Commands** -- drain externally queued mutations (hire, fire, orders,
//!    layout repairs).
//! 2. **Schedule** -- the scheduler retry pass re-attempts task creation.
//! 3. **Agents** -- every worker steps once, in hire order. Completion
//!    cascades enqueue follow-on tasks but never claim them.
//! 4. **Post-tick** -- buffered event delivery.
//! 5. **Bookkeeping** -- tick counter, elapsed time, state hash.
//!
//! Everything runs on the caller's thread; `dt` arrives pre-scaled by the
//! caller's speed multiplier.

use crate::command_queue::{Command, CommandQueue};
use crate::crew::{Crew, StaffError};
use crate::department::Department;
use crate::event::{Event, EventBus};
use crate::fixed::Fixed64;
use crate::grid::{FloorGrid, TilePos, WorldPos};
use crate::id::{ItemId, OrderId, StageId, WorkerId};
use crate::item::{Item, ItemStage};
use crate::order::{Order, OrderLine};
use crate::registry::StageRegistry;
use crate::scheduler::{Scheduler, TickCtx};
use crate::sim::{SimConfig, SimState, StateHash};
use slotmap::SlotMap;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("registry defines {stages} stages but {departments} departments were provided")]
    DepartmentCountMismatch { stages: usize, departments: usize },
    #[error("department at index {index} is bound to stage {found}, expected stage {index}")]
    DepartmentOrderMismatch { index: usize, found: u32 },
}

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("unknown department")]
    UnknownDepartment,
    #[error("tile is outside the department zone")]
    OutsideZone,
    #[error("tile is not walkable")]
    NotWalkable,
    #[error("tile is already a drop point")]
    AlreadyDropPoint,
    #[error("no drop point at the source tile")]
    NoSuchDropPoint,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The core simulation engine.
#[derive(Debug)]
pub struct Engine {
    /// The tile grid. Mutable layout access stays with the engine so drop
    /// point edits and department state cannot drift apart.
    pub grid: FloorGrid,

    /// Simulation bookkeeping (tick counter, elapsed time).
    pub sim_state: SimState,

    /// Typed event bus for simulation events.
    pub event_bus: EventBus,

    /// Queue of externally-submitted commands, drained each tick.
    pub commands: CommandQueue,

    pub(crate) registry: StageRegistry,
    pub(crate) items: SlotMap<ItemId, Item>,
    pub(crate) orders: SlotMap<OrderId, Order>,
    pub(crate) departments: Vec<Department>,
    pub(crate) scheduler: Scheduler,
    pub(crate) crew: Crew,
    pub(crate) config: SimConfig,
    paused: bool,
    last_state_hash: u64,
}

impl Engine {
    /// Create an engine over a built floor. Departments must line up with
    /// the registry's stage sequence, index for index.
    pub fn new(
        grid: FloorGrid,
        departments: Vec<Department>,
        registry: StageRegistry,
        config: SimConfig,
    ) -> Result<Self, EngineError> {
        if departments.len() != registry.stage_count() {
            return Err(EngineError::DepartmentCountMismatch {
                stages: registry.stage_count(),
                departments: departments.len(),
            });
        }
        for (index, dept) in departments.iter().enumerate() {
            if dept.stage.0 as usize != index {
                return Err(EngineError::DepartmentOrderMismatch {
                    index,
                    found: dept.stage.0,
                });
            }
        }

        Ok(Self {
            grid,
            sim_state: SimState::new(),
            event_bus: EventBus::default(),
            commands: CommandQueue::new(),
            registry,
            items: SlotMap::with_key(),
            orders: SlotMap::with_key(),
            departments,
            scheduler: Scheduler::new(),
            crew: Crew::new(),
            config,
            paused: false,
            last_state_hash: 0,
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn department(&self, stage: StageId) -> Option<&Department> {
        self.departments.get(stage.0 as usize)
    }

    pub fn department_mut(&mut self, stage: StageId) -> Option<&mut Department> {
        self.departments.get_mut(stage.0 as usize)
    }

    pub fn departments(&self) -> &[Department] {
        &self.departments
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn items(&self) -> impl Iterator<Item = (ItemId, &Item)> {
        self.items.iter()
    }

    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(id)
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn crew(&self) -> &Crew {
        &self.crew
    }

    /// The most recently computed state hash.
    pub fn state_hash(&self) -> u64 {
        self.last_state_hash
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Pause the simulation. While paused, `advance` is a no-op; commands
    /// stay queued.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    // -----------------------------------------------------------------------
    // Advance
    // -----------------------------------------------------------------------

    /// Advance the simulation by `dt` sim-seconds (already scaled by the
    /// caller's speed multiplier).
    pub fn advance(&mut self, dt: Fixed64) {
        if self.paused {
            return;
        }
        self.phase_commands();
        self.phase_schedule();
        self.phase_agents(dt);
        self.phase_post_tick();
        self.phase_bookkeeping(dt);
    }

    fn phase_commands(&mut self) {
        let tick = self.sim_state.tick;
        for command in self.commands.drain(tick) {
            self.apply_command(command);
        }
    }

    fn phase_schedule(&mut self) {
        let (mut ctx, scheduler, _crew) = self.split();
        scheduler.retry_pass(&mut ctx);
    }

    fn phase_agents(&mut self, dt: Fixed64) {
        let (mut ctx, scheduler, crew) = self.split();
        crew.step_all(dt, scheduler, &mut ctx);
    }

    fn phase_post_tick(&mut self) {
        self.event_bus.deliver();
    }

    fn phase_bookkeeping(&mut self, dt: Fixed64) {
        self.sim_state.tick += 1;
        self.sim_state.elapsed += dt;
        self.last_state_hash = self.compute_state_hash();
    }

    /// Borrowed view of the sim state for scheduler and worker steps.
    fn split(&mut self) -> (TickCtx<'_>, &mut Scheduler, &mut Crew) {
        let Engine {
            grid,
            registry,
            items,
            orders,
            departments,
            scheduler,
            crew,
            event_bus,
            sim_state,
            config,
            ..
        } = self;
        (
            TickCtx {
                grid,
                items,
                orders,
                departments: departments.as_mut_slice(),
                registry,
                events: event_bus,
                config,
                tick: sim_state.tick,
            },
            scheduler,
            crew,
        )
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    fn apply_command(&mut self, command: Command) {
        let result = match command {
            Command::HireWorker { stage } => self.hire(stage).map(|_| ()).map_err(|e| e.to_string()),
            Command::FireWorker { stage } => self.fire(stage).map(|_| ()).map_err(|e| e.to_string()),
            Command::AcceptOrder { lines } => {
                self.accept_order(lines);
                Ok(())
            }
            Command::SetMaxWorkers { stage, max } => {
                self.set_max_workers(stage, max).map_err(|e| e.to_string())
            }
            Command::AddDropPoint { stage, pos } => {
                self.add_drop_point(stage, pos).map_err(|e| e.to_string())
            }
            Command::MoveDropPoint { stage, from, to } => {
                self.move_drop_point(stage, from, to).map_err(|e| e.to_string())
            }
        };
        if let Err(reason) = result {
            let tick = self.sim_state.tick;
            self.event_bus.emit(Event::CommandRejected { reason, tick });
        }
    }

    // -----------------------------------------------------------------------
    // Staffing
    // -----------------------------------------------------------------------

    /// Hire one worker into a department, honoring its staffing ceiling.
    pub fn hire(&mut self, stage: StageId) -> Result<WorkerId, StaffError> {
        let (mut ctx, _scheduler, crew) = self.split();
        crew.hire(stage, &mut ctx)
    }

    /// Fire one worker from a department. A non-idle victim's task is
    /// failed back into the pool first.
    pub fn fire(&mut self, stage: StageId) -> Result<WorkerId, StaffError> {
        let (mut ctx, scheduler, crew) = self.split();
        crew.fire(stage, scheduler, &mut ctx)
    }

    fn set_max_workers(&mut self, stage: StageId, max: u32) -> Result<(), LayoutError> {
        let dept = self
            .departments
            .get_mut(stage.0 as usize)
            .ok_or(LayoutError::UnknownDepartment)?;
        // Lowering below the current headcount only blocks future hires;
        // nobody is fired implicitly.
        dept.max_workers = max;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Orders
    // -----------------------------------------------------------------------

    /// Accept an order: one item per unit quantity lands at the first
    /// stage's entry point and enters the scheduling cycle.
    pub fn accept_order(&mut self, lines: Vec<OrderLine>) -> OrderId {
        let units: u32 = lines.iter().map(|l| l.quantity).sum();
        let first = self.registry.first_stage();
        let spawn_pos = self
            .departments
            .get(first.0 as usize)
            .and_then(|d| d.entry_point())
            .map(|p| self.grid.tile_center(p))
            .unwrap_or_else(WorldPos::zero);

        let order_id = self.orders.insert(Order::new(lines));
        let mut spawned = Vec::with_capacity(units as usize);
        let lines: Vec<OrderLine> = self
            .orders
            .get(order_id)
            .map(|o| o.lines.clone())
            .unwrap_or_default();
        for line in lines {
            for _ in 0..line.quantity {
                spawned.push(self.items.insert(Item::new(line.product, order_id, first, spawn_pos)));
            }
        }
        if let Some(order) = self.orders.get_mut(order_id) {
            order.items.extend(spawned.iter().copied());
        }

        let tick = self.sim_state.tick;
        self.event_bus.emit(Event::OrderAccepted { order: order_id, units, tick });

        let (mut ctx, scheduler, _crew) = self.split();
        for item in spawned {
            scheduler.item_arrived(item, &mut ctx);
        }
        order_id
    }

    // -----------------------------------------------------------------------
    // Layout repairs
    // -----------------------------------------------------------------------

    /// Add a drop point to a department. The validated path for the layout
    /// collaborator to fix a stalled department at runtime.
    pub fn add_drop_point(&mut self, stage: StageId, pos: TilePos) -> Result<(), LayoutError> {
        let dept = self
            .departments
            .get_mut(stage.0 as usize)
            .ok_or(LayoutError::UnknownDepartment)?;
        if !dept.zone.contains(pos) {
            return Err(LayoutError::OutsideZone);
        }
        if dept.drop_points.contains(&pos) {
            return Err(LayoutError::AlreadyDropPoint);
        }
        let tile = self.grid.tile_mut(pos).ok_or(LayoutError::OutsideZone)?;
        if !tile.walkable {
            return Err(LayoutError::NotWalkable);
        }
        tile.drop_point = true;
        tile.stage = Some(stage);
        dept.drop_points.push(pos);
        Ok(())
    }

    /// Move an existing drop point, preserving its entry/exit position in
    /// the department's list.
    pub fn move_drop_point(
        &mut self,
        stage: StageId,
        from: TilePos,
        to: TilePos,
    ) -> Result<(), LayoutError> {
        let dept = self
            .departments
            .get_mut(stage.0 as usize)
            .ok_or(LayoutError::UnknownDepartment)?;
        let Some(slot) = dept.drop_points.iter().position(|p| *p == from) else {
            return Err(LayoutError::NoSuchDropPoint);
        };
        if !dept.zone.contains(to) {
            return Err(LayoutError::OutsideZone);
        }
        if dept.drop_points.contains(&to) {
            return Err(LayoutError::AlreadyDropPoint);
        }
        if !self.grid.is_walkable(to) {
            return Err(LayoutError::NotWalkable);
        }

        if let Some(tile) = self.grid.tile_mut(from) {
            tile.drop_point = false;
        }
        if let Some(tile) = self.grid.tile_mut(to) {
            tile.drop_point = true;
            tile.stage = Some(stage);
        }
        dept.drop_points[slot] = to;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // State hash
    // -----------------------------------------------------------------------

    fn compute_state_hash(&self) -> u64 {
        let mut h = StateHash::new();
        h.write_u64(self.sim_state.tick);

        for (_, worker) in self.crew.iter() {
            h.write_i32(worker.tile.col);
            h.write_i32(worker.tile.row);
            h.write_fixed64(worker.pos.x);
            h.write_fixed64(worker.pos.y);
            h.write_u32(worker.state as u32);
        }

        for (_, item) in self.items.iter() {
            match item.stage {
                ItemStage::At(stage) => {
                    h.write_u32(0);
                    h.write_u32(stage.0);
                }
                ItemStage::Delivered => h.write_u32(1),
            }
            let flags = item.being_processed as u32
                | (item.processed as u32) << 1
                | (item.ready_to_carry as u32) << 2
                | (item.carrier.is_some() as u32) << 3;
            h.write_u32(flags);
        }

        for dept in &self.departments {
            h.write_u32(dept.buffer.len() as u32);
            h.write_u64(dept.items_processed);
            h.write_u32(dept.worker_count);
        }

        h.write_u32(self.scheduler.live_task_count() as u32);
        h.finish()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::test_utils::*;

    #[test]
    fn full_pipeline_delivers_an_item() {
        let mut engine = two_stage_engine();
        engine.hire(StageId(0)).unwrap();
        engine.hire(StageId(1)).unwrap();
        let item = spawn_unit(&mut engine);
        let order = engine.item(item).unwrap().order;

        run_for(&mut engine, 120.0);

        assert!(engine.item(item).unwrap().stage.is_delivered());
        assert_eq!(engine.order(order).unwrap().delivered, 1);

        let events = engine.event_bus.drain();
        let delivered = events
            .iter()
            .filter(|e| matches!(e, Event::ItemDelivered { .. }))
            .count();
        assert_eq!(delivered, 1);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, Event::OrderCompleted { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn stage_only_moves_forward() {
        let mut engine = two_stage_engine();
        engine.hire(StageId(0)).unwrap();
        engine.hire(StageId(1)).unwrap();
        let item = spawn_unit(&mut engine);

        let mut last = 0u32;
        for _ in 0..1200 {
            engine.advance(fixed(0.1));
            match engine.item(item).unwrap().stage {
                crate::item::ItemStage::At(stage) => {
                    assert!(stage.0 >= last);
                    last = stage.0;
                }
                crate::item::ItemStage::Delivered => break,
            }
        }
        assert!(engine.item(item).unwrap().stage.is_delivered());
    }

    #[test]
    fn commands_apply_at_the_tick_boundary() {
        let mut engine = two_stage_engine();
        engine.commands.push(crate::command_queue::Command::HireWorker { stage: StageId(0) });
        assert_eq!(engine.crew().len(), 0);

        engine.advance(fixed(0.1));
        assert_eq!(engine.crew().len(), 1);
    }

    #[test]
    fn rejected_commands_surface_as_events() {
        let mut engine = two_stage_engine();
        engine.commands.push(crate::command_queue::Command::FireWorker { stage: StageId(0) });
        engine.advance(fixed(0.1));

        let events = engine.event_bus.drain();
        assert!(events.iter().any(|e| matches!(e, Event::CommandRejected { .. })));
    }

    #[test]
    fn paused_engine_does_not_advance() {
        let mut engine = two_stage_engine();
        engine.pause();
        engine.advance(fixed(0.1));
        assert_eq!(engine.sim_state.tick, 0);

        engine.resume();
        engine.advance(fixed(0.1));
        assert_eq!(engine.sim_state.tick, 1);
    }

    #[test]
    fn mismatched_departments_are_rejected() {
        let (grid, mut departments, registry) = linear_floor(2, 1);
        departments.pop();
        let err = Engine::new(grid, departments, registry, SimConfig::default());
        assert!(matches!(err, Err(EngineError::DepartmentCountMismatch { .. })));
    }

    #[test]
    fn drop_point_repair_unblocks_a_stalled_department() {
        let mut engine = two_stage_engine();
        engine.hire(StageId(0)).unwrap();
        // Break stage 1's entry before anything arrives there.
        let entry = engine.department(StageId(1)).unwrap().entry_point().unwrap();
        engine.department_mut(StageId(1)).unwrap().drop_points.clear();

        spawn_unit(&mut engine);
        run_for(&mut engine, 20.0);
        assert!(engine.department(StageId(0)).unwrap().stalled);

        engine.add_drop_point(StageId(1), entry).unwrap();
        run_for(&mut engine, 60.0);
        assert!(!engine.department(StageId(0)).unwrap().stalled);
        let item = engine.items().next().unwrap().1;
        assert_eq!(item.stage.stage_id(), Some(StageId(1)));
    }

    #[test]
    fn move_drop_point_validates_target() {
        let mut engine = two_stage_engine();
        let from = engine.department(StageId(0)).unwrap().entry_point().unwrap();

        let outside = TilePos::new(100, 100);
        assert!(matches!(
            engine.move_drop_point(StageId(0), from, outside),
            Err(LayoutError::OutsideZone)
        ));

        let inside = TilePos::new(1, 0);
        engine.move_drop_point(StageId(0), from, inside).unwrap();
        assert_eq!(engine.department(StageId(0)).unwrap().entry_point(), Some(inside));
        assert!(engine.grid.tile(inside).unwrap().drop_point);
        assert!(!engine.grid.tile(from).unwrap().drop_point);
    }

    #[test]
    fn identical_scripts_produce_identical_hashes() {
        let script = |engine: &mut Engine| {
            engine.commands.push(crate::command_queue::Command::HireWorker { stage: StageId(0) });
            engine.commands.push(crate::command_queue::Command::HireWorker { stage: StageId(1) });
            engine.commands.push(crate::command_queue::Command::AcceptOrder {
                lines: vec![crate::order::OrderLine { product: widget(), quantity: 2 }],
            });
        };

        let mut a = two_stage_engine();
        let mut b = two_stage_engine();
        script(&mut a);
        script(&mut b);

        for _ in 0..600 {
            a.advance(fixed(0.1));
            b.advance(fixed(0.1));
            assert_eq!(a.state_hash(), b.state_hash());
        }
    }
}
