//! Declarative floor plans for the shopfloor engine.
//!
//! A [`FloorPlan`] describes department zones, corridors and grid size as
//! plain data. [`FloorPlan::build`] compiles it into the engine's world:
//! perimeter walls, doorways, workstations, drop points, a [`Department`]
//! per zone and the frozen [`StageRegistry`]. This crate is the spatial/
//! layout provider the core treats as an external collaborator; the core
//! itself never builds layout.
//!
//! With the `plan-io` feature, plans round-trip through JSON.

use serde::{Deserialize, Serialize};
use shopfloor_core::department::{Department, ZoneRect};
use shopfloor_core::engine::{Engine, EngineError};
use shopfloor_core::fixed::Fixed64;
use shopfloor_core::grid::{FloorGrid, TileKind, TilePos, DEFAULT_TILE_SIZE};
use shopfloor_core::id::StageId;
use shopfloor_core::registry::{ProductDef, RegistryError, StageDef, StageRegistry};
use shopfloor_core::sim::SimConfig;

/// Workstations carved into each zone: two columns of two.
const WORKSTATION_ROWS: [usize; 2] = [1, 2];

// ---------------------------------------------------------------------------
// Plan data
// ---------------------------------------------------------------------------

/// One department zone. Zone order defines the pipeline's stage order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneSpec {
    pub name: String,
    pub display_name: String,
    pub col: i32,
    pub row: i32,
    pub width: i32,
    pub height: i32,
    /// Sim-seconds of PROCESS work at this stage.
    #[serde(default = "default_work_secs")]
    pub work_secs: f64,
}

fn default_work_secs() -> f64 {
    4.0
}

/// A vertical corridor band between zones.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CorridorSpec {
    pub col: i32,
    pub width: i32,
}

/// A complete declarative floor plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloorPlan {
    pub cols: u32,
    pub rows: u32,
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
    pub corridors: Vec<CorridorSpec>,
    pub zones: Vec<ZoneSpec>,
    pub products: Vec<String>,
    #[serde(default = "default_max_workers")]
    pub max_workers_per_zone: u32,
}

fn default_tile_size() -> u32 {
    DEFAULT_TILE_SIZE
}

fn default_max_workers() -> u32 {
    8
}

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("a plan needs at least one zone")]
    NoZones,
    #[error("zone '{0}' is smaller than the 4x4 minimum")]
    ZoneTooSmall(String),
    #[error("zone '{0}' does not fit on the grid")]
    OutOfBounds(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// A built floor, ready to hand to the engine.
#[derive(Debug)]
pub struct Floor {
    pub grid: FloorGrid,
    pub departments: Vec<Department>,
    pub registry: StageRegistry,
}

impl Floor {
    /// Convenience: wrap the built floor in an engine.
    pub fn into_engine(self, config: SimConfig) -> Result<Engine, EngineError> {
        Engine::new(self.grid, self.departments, self.registry, config)
    }
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

impl FloorPlan {
    /// Compile the plan into a grid, departments and registry.
    pub fn build(&self) -> Result<Floor, PlanError> {
        if self.zones.is_empty() {
            return Err(PlanError::NoZones);
        }
        for zone in &self.zones {
            if zone.width < 4 || zone.height < 4 {
                return Err(PlanError::ZoneTooSmall(zone.name.clone()));
            }
            let fits = zone.col >= 0
                && zone.row >= 0
                && zone.col + zone.width <= self.cols as i32
                && zone.row + zone.height <= self.rows as i32;
            if !fits {
                return Err(PlanError::OutOfBounds(zone.name.clone()));
            }
        }

        let registry = StageRegistry::new(
            self.zones
                .iter()
                .map(|z| StageDef::new(&z.name, &z.display_name, Fixed64::from_num(z.work_secs)))
                .collect(),
            self.products
                .iter()
                .map(|name| ProductDef { name: name.clone() })
                .collect(),
        )?;

        let mut grid = FloorGrid::new(self.cols, self.rows, self.tile_size);

        for corridor in &self.corridors {
            for col in corridor.col..corridor.col + corridor.width {
                for row in 0..self.rows as i32 {
                    if let Some(tile) = grid.tile_mut(TilePos::new(col, row)) {
                        tile.kind = TileKind::Corridor;
                        tile.walkable = true;
                    }
                }
            }
        }

        let mut departments = Vec::with_capacity(self.zones.len());
        for (index, zone) in self.zones.iter().enumerate() {
            let stage = StageId(index as u32);
            let mut dept = Department::new(
                stage,
                ZoneRect::new(zone.col, zone.row, zone.width, zone.height),
            );
            dept.max_workers = self.max_workers_per_zone;

            carve_zone(&mut grid, zone, stage);
            place_workstations(&mut grid, zone, stage, &mut dept);
            place_drop_points(&mut grid, zone, stage, &mut dept);

            departments.push(dept);
        }

        Ok(Floor {
            grid,
            departments,
            registry,
        })
    }

    /// The reference six-stage line: 80x60 tiles, zones separated by 2-wide
    /// corridors, receiving through dispatch.
    pub fn standard() -> Self {
        let stage = |name: &str, display: &str, col: i32| ZoneSpec {
            name: name.to_string(),
            display_name: display.to_string(),
            col,
            row: 0,
            width: 12,
            height: 60,
            work_secs: default_work_secs(),
        };
        Self {
            cols: 80,
            rows: 60,
            tile_size: DEFAULT_TILE_SIZE,
            corridors: [12, 26, 40, 54, 66]
                .into_iter()
                .map(|col| CorridorSpec { col, width: 2 })
                .collect(),
            zones: vec![
                stage("receiving", "Receiving", 0),
                stage("prep", "Prep", 14),
                stage("cooking", "Cooking", 28),
                stage("qc", "Quality Control", 42),
                stage("packaging", "Packaging", 56),
                stage("dispatch", "Dispatch", 68),
            ],
            products: ["burger", "salad", "pasta", "sandwich", "soup", "pizza", "wrap"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_workers_per_zone: default_max_workers(),
        }
    }
}

// ---------------------------------------------------------------------------
// Carving
// ---------------------------------------------------------------------------

/// Wall the zone perimeter, claim the interior, punch doorways at 1/3 and
/// 2/3 of the zone height on both corridor-facing sides.
fn carve_zone(grid: &mut FloorGrid, zone: &ZoneSpec, stage: StageId) {
    for row in zone.row..zone.row + zone.height {
        for col in zone.col..zone.col + zone.width {
            let Some(tile) = grid.tile_mut(TilePos::new(col, row)) else { continue };
            let on_edge = row == zone.row
                || row == zone.row + zone.height - 1
                || col == zone.col
                || col == zone.col + zone.width - 1;
            if on_edge {
                tile.kind = TileKind::Wall;
                tile.walkable = false;
                tile.stage = None;
            } else {
                tile.kind = TileKind::Floor;
                tile.walkable = true;
                tile.stage = Some(stage);
            }
        }
    }

    let gap_rows = [
        zone.row + zone.height / 3,
        zone.row + 2 * zone.height / 3,
    ];
    for gap_row in gap_rows {
        let mut doors = Vec::new();
        if zone.col > 0 {
            doors.push(zone.col);
        }
        if zone.col + zone.width < grid.cols() as i32 {
            doors.push(zone.col + zone.width - 1);
        }
        for door_col in doors {
            if let Some(tile) = grid.tile_mut(TilePos::new(door_col, gap_row)) {
                tile.kind = TileKind::Floor;
                tile.walkable = true;
                tile.stage = Some(stage);
            }
        }
    }
}

/// Two columns of workstations at the zone's quarter widths, rows spaced at
/// thirds of the height.
fn place_workstations(grid: &mut FloorGrid, zone: &ZoneSpec, stage: StageId, dept: &mut Department) {
    let cols = [zone.col + zone.width / 4, zone.col + 3 * zone.width / 4];
    for col in cols {
        for step in WORKSTATION_ROWS {
            let row = zone.row + (zone.height / 3) * step as i32;
            let pos = TilePos::new(col, row);
            let Some(tile) = grid.tile_mut(pos) else { continue };
            if tile.kind == TileKind::Wall || tile.kind == TileKind::Corridor {
                continue;
            }
            tile.workstation = true;
            tile.stage = Some(stage);
            dept.add_workstation(pos);
        }
    }
}

/// Entry drop point just inside the left wall, exit just inside the right
/// wall, both on the zone's mid row.
fn place_drop_points(grid: &mut FloorGrid, zone: &ZoneSpec, stage: StageId, dept: &mut Department) {
    let mid_row = zone.row + zone.height / 2;
    for col in [zone.col + 1, zone.col + zone.width - 2] {
        let pos = TilePos::new(col, mid_row);
        let Some(tile) = grid.tile_mut(pos) else { continue };
        if !tile.walkable {
            continue;
        }
        tile.drop_point = true;
        tile.stage = Some(stage);
        dept.drop_points.push(pos);
    }
}

// ---------------------------------------------------------------------------
// Plan IO
// ---------------------------------------------------------------------------

#[cfg(feature = "plan-io")]
mod io {
    use super::FloorPlan;

    #[derive(Debug, thiserror::Error)]
    pub enum PlanIoError {
        #[error(transparent)]
        Json(#[from] serde_json::Error),
    }

    impl FloorPlan {
        pub fn to_json(&self) -> Result<String, PlanIoError> {
            Ok(serde_json::to_string_pretty(self)?)
        }

        pub fn from_json(json: &str) -> Result<FloorPlan, PlanIoError> {
            Ok(serde_json::from_str(json)?)
        }
    }
}

#[cfg(feature = "plan-io")]
pub use io::PlanIoError;

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_plan_builds_six_departments() {
        let floor = FloorPlan::standard().build().unwrap();
        assert_eq!(floor.departments.len(), 6);
        assert_eq!(floor.registry.stage_count(), 6);
        assert_eq!(floor.registry.stage_id("receiving"), Some(StageId(0)));
        assert_eq!(floor.registry.stage_id("dispatch"), Some(StageId(5)));
        assert_eq!(floor.registry.product_count(), 7);
    }

    #[test]
    fn zones_get_stations_and_drop_points() {
        let floor = FloorPlan::standard().build().unwrap();
        for dept in &floor.departments {
            assert_eq!(dept.workstations.len(), 4);
            assert_eq!(dept.drop_points.len(), 2);
            // Every placed tile is walkable and inside the zone.
            for ws in &dept.workstations {
                assert!(floor.grid.is_walkable(ws.pos));
                assert!(dept.zone.contains(ws.pos));
            }
            for &dp in &dept.drop_points {
                assert!(floor.grid.is_walkable(dp));
                assert!(floor.grid.tile(dp).unwrap().drop_point);
            }
        }
    }

    #[test]
    fn walls_enclose_zones_and_doorways_open_them() {
        let plan = FloorPlan::standard();
        let floor = plan.build().unwrap();
        let zone = &plan.zones[1]; // prep at col 14

        // Perimeter corner is wall.
        assert!(!floor.grid.is_walkable(TilePos::new(zone.col, zone.row)));
        // Doorway at a third of the height is open.
        let door = TilePos::new(zone.col, zone.row + zone.height / 3);
        assert!(floor.grid.is_walkable(door));
        // Corridor tiles stay walkable.
        assert!(floor.grid.is_walkable(TilePos::new(12, 30)));
    }

    #[test]
    fn departments_are_mutually_reachable() {
        use shopfloor_core::path::find_path;
        let floor = FloorPlan::standard().build().unwrap();
        let start = floor.departments[0].exit_point().unwrap();
        let goal = floor.departments[5].entry_point().unwrap();
        let path = find_path(&floor.grid, start, goal);
        assert!(path.is_some_and(|p| !p.is_empty()));
    }

    #[test]
    fn undersized_zone_is_rejected() {
        let mut plan = FloorPlan::standard();
        plan.zones[0].height = 3;
        assert!(matches!(plan.build(), Err(PlanError::ZoneTooSmall(_))));
    }

    #[test]
    fn out_of_bounds_zone_is_rejected() {
        let mut plan = FloorPlan::standard();
        plan.zones[5].width = 40;
        assert!(matches!(plan.build(), Err(PlanError::OutOfBounds(_))));
    }

    #[test]
    fn duplicate_zone_names_are_rejected() {
        let mut plan = FloorPlan::standard();
        plan.zones[1].name = "receiving".to_string();
        assert!(matches!(plan.build(), Err(PlanError::Registry(_))));
    }

    #[test]
    fn built_floor_becomes_an_engine() {
        let engine = FloorPlan::standard()
            .build()
            .unwrap()
            .into_engine(SimConfig::default())
            .unwrap();
        assert_eq!(engine.departments().len(), 6);
    }

    #[cfg(feature = "plan-io")]
    #[test]
    fn plans_round_trip_through_json() {
        let plan = FloorPlan::standard();
        let json = plan.to_json().unwrap();
        let back = FloorPlan::from_json(&json).unwrap();
        assert_eq!(back.zones.len(), plan.zones.len());
        assert_eq!(back.cols, plan.cols);
        let floor = back.build().unwrap();
        assert_eq!(floor.departments.len(), 6);
    }
}
