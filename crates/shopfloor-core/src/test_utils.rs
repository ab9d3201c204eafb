//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available everywhere the `test-utils` feature is enabled.

use crate::department::{Department, ZoneRect};
use crate::engine::Engine;
use crate::fixed::Fixed64;
use crate::grid::{FloorGrid, TilePos, DEFAULT_TILE_SIZE};
use crate::id::{ItemId, ProductTypeId, StageId};
use crate::order::OrderLine;
use crate::registry::{ProductDef, StageDef, StageRegistry};
use crate::sim::SimConfig;

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Product constructors
// ===========================================================================

pub fn widget() -> ProductTypeId {
    ProductTypeId(0)
}

pub fn gadget() -> ProductTypeId {
    ProductTypeId(1)
}

// ===========================================================================
// Floor builders
// ===========================================================================

/// A minimal open floor: `stages` bands of 4x5 tiles side by side, each with
/// `stations` workstations and entry/exit drop points, no walls. Small
/// enough to reason about exactly, walkable enough that paths always exist.
pub fn linear_floor(stages: usize, stations: usize) -> (FloorGrid, Vec<Department>, StageRegistry) {
    let mut grid = FloorGrid::new(stages as u32 * 4, 5, DEFAULT_TILE_SIZE);
    let mut departments = Vec::new();
    let mut defs = Vec::new();

    for i in 0..stages {
        let base = i as i32 * 4;
        let stage = StageId(i as u32);
        let mut dept = Department::new(stage, ZoneRect::new(base, 0, 4, 5));

        for j in 0..stations {
            let pos = TilePos::new(base + 2, 1 + j as i32);
            if let Some(tile) = grid.tile_mut(pos) {
                tile.workstation = true;
                tile.stage = Some(stage);
            }
            dept.add_workstation(pos);
        }
        for pos in [TilePos::new(base, 2), TilePos::new(base + 3, 2)] {
            if let Some(tile) = grid.tile_mut(pos) {
                tile.drop_point = true;
                tile.stage = Some(stage);
            }
            dept.drop_points.push(pos);
        }

        departments.push(dept);
        defs.push(StageDef::new(
            &format!("stage{i}"),
            &format!("Stage {i}"),
            fixed(4.0),
        ));
    }

    let registry = StageRegistry::new(
        defs,
        vec![
            ProductDef { name: "widget".to_string() },
            ProductDef { name: "gadget".to_string() },
        ],
    )
    .expect("linear floor registry is valid");

    (grid, departments, registry)
}

/// An engine over a [`linear_floor`] with default tuning.
pub fn engine_with(stages: usize, stations: usize) -> Engine {
    let (grid, departments, registry) = linear_floor(stages, stations);
    Engine::new(grid, departments, registry, SimConfig::default())
        .expect("linear floor engine is valid")
}

/// The workhorse fixture: two stages, one workstation each.
pub fn two_stage_engine() -> Engine {
    engine_with(2, 1)
}

// ===========================================================================
// Scenario helpers
// ===========================================================================

/// Accept a one-unit widget order and return the spawned item.
pub fn spawn_unit(engine: &mut Engine) -> ItemId {
    let order = engine.accept_order(vec![OrderLine { product: widget(), quantity: 1 }]);
    engine
        .order(order)
        .and_then(|o| o.items.first().copied())
        .expect("order spawned one item")
}

/// Advance the engine in 0.1-second steps for `secs` sim-seconds.
pub fn run_for(engine: &mut Engine, secs: f64) {
    let steps = (secs / 0.1).round() as u64;
    let dt = fixed(0.1);
    for _ in 0..steps {
        engine.advance(dt);
    }
}
