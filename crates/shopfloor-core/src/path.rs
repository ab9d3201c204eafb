//! Grid pathfinding for worker agents.
//!
//! A* over the walkability mask with a Manhattan heuristic (admissible for
//! 4-directional unit-cost movement, so results are shortest paths). Fully
//! deterministic: neighbors expand in fixed N/S/W/E order and heap ties break
//! on a monotonic insertion counter, never on memory layout.

use crate::grid::{FloorGrid, TilePos};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

/// Find the shortest walkable path from `start` to `goal`.
///
/// Returns the waypoint list with `start` excluded. `Some(vec![])` when the
/// start already is the goal, `None` when no path exists. A non-walkable goal
/// is first resolved to the nearest walkable tile by ring expansion from the
/// goal, so "walk to that workstation" works even when the station tile
/// itself blocks movement.
pub fn find_path(grid: &FloorGrid, start: TilePos, goal: TilePos) -> Option<Vec<TilePos>> {
    if start == goal {
        return Some(Vec::new());
    }

    let goal = if grid.is_walkable(goal) {
        goal
    } else {
        nearest_walkable(grid, goal)?
    };
    if start == goal {
        return Some(Vec::new());
    }

    let cols = grid.cols() as usize;
    let rows = grid.rows() as usize;
    let index = |p: TilePos| p.row as usize * cols + p.col as usize;

    let mut g_score = vec![u32::MAX; cols * rows];
    let mut came_from: Vec<Option<TilePos>> = vec![None; cols * rows];

    // Heap entries: Reverse((f, seq, pos)). `seq` makes equal-cost pops FIFO.
    let mut open: BinaryHeap<Reverse<(u32, u64, (i32, i32))>> = BinaryHeap::new();
    let mut seq: u64 = 0;

    g_score[index(start)] = 0;
    open.push(Reverse((start.manhattan_distance(&goal), seq, (start.col, start.row))));

    while let Some(Reverse((_, _, (col, row)))) = open.pop() {
        let current = TilePos::new(col, row);
        if current == goal {
            return Some(reconstruct(&came_from, cols, current, start));
        }

        let current_g = g_score[index(current)];
        for next in current.neighbors4() {
            if !grid.is_walkable(next) {
                continue;
            }
            let tentative = current_g + 1;
            if tentative < g_score[index(next)] {
                g_score[index(next)] = tentative;
                came_from[index(next)] = Some(current);
                seq += 1;
                let f = tentative + next.manhattan_distance(&goal);
                open.push(Reverse((f, seq, (next.col, next.row))));
            }
        }
    }

    None
}

/// Ring expansion outward from `goal` to the nearest walkable tile.
fn nearest_walkable(grid: &FloorGrid, goal: TilePos) -> Option<TilePos> {
    let mut visited = vec![false; grid.cols() as usize * grid.rows() as usize];
    let index = |p: TilePos| p.row as usize * grid.cols() as usize + p.col as usize;

    let mut queue = VecDeque::new();
    if grid.in_bounds(goal) {
        visited[index(goal)] = true;
        queue.push_back(goal);
    }

    while let Some(pos) = queue.pop_front() {
        if grid.is_walkable(pos) {
            return Some(pos);
        }
        for next in pos.neighbors4() {
            if grid.in_bounds(next) && !visited[index(next)] {
                visited[index(next)] = true;
                queue.push_back(next);
            }
        }
    }

    None
}

fn reconstruct(
    came_from: &[Option<TilePos>],
    cols: usize,
    mut current: TilePos,
    start: TilePos,
) -> Vec<TilePos> {
    let mut path = Vec::new();
    while current != start {
        path.push(current);
        match came_from[current.row as usize * cols + current.col as usize] {
            Some(prev) => current = prev,
            None => break,
        }
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::DEFAULT_TILE_SIZE;

    fn open_grid(cols: u32, rows: u32) -> FloorGrid {
        FloorGrid::new(cols, rows, DEFAULT_TILE_SIZE)
    }

    #[test]
    fn same_tile_is_empty_path() {
        let grid = open_grid(5, 5);
        let path = find_path(&grid, TilePos::new(2, 2), TilePos::new(2, 2));
        assert_eq!(path, Some(vec![]));
    }

    #[test]
    fn open_grid_path_is_manhattan_optimal() {
        let grid = open_grid(5, 5);
        let path = find_path(&grid, TilePos::new(0, 0), TilePos::new(4, 4)).unwrap();
        assert_eq!(path.len(), 8);
        assert_eq!(*path.last().unwrap(), TilePos::new(4, 4));
    }

    #[test]
    fn path_is_deterministic() {
        let grid = open_grid(5, 5);
        let a = find_path(&grid, TilePos::new(0, 0), TilePos::new(4, 4));
        let b = find_path(&grid, TilePos::new(0, 0), TilePos::new(4, 4));
        assert_eq!(a, b);
    }

    #[test]
    fn walls_are_routed_around() {
        let mut grid = open_grid(5, 5);
        // Vertical wall at col 2 with a gap at row 4.
        for row in 0..4 {
            grid.tile_mut(TilePos::new(2, row)).unwrap().walkable = false;
        }
        let path = find_path(&grid, TilePos::new(0, 0), TilePos::new(4, 0)).unwrap();
        assert!(path.contains(&TilePos::new(2, 4)));
        assert_eq!(*path.last().unwrap(), TilePos::new(4, 0));
    }

    #[test]
    fn sealed_goal_is_unreachable() {
        let mut grid = open_grid(5, 5);
        for row in 0..5 {
            grid.tile_mut(TilePos::new(2, row)).unwrap().walkable = false;
        }
        // The wall itself resolves to a walkable neighbor, so aim past it.
        assert_eq!(find_path(&grid, TilePos::new(0, 0), TilePos::new(4, 0)), None);
    }

    #[test]
    fn unwalkable_goal_resolves_to_nearest_neighbor() {
        let mut grid = open_grid(5, 5);
        grid.tile_mut(TilePos::new(3, 3)).unwrap().walkable = false;
        let path = find_path(&grid, TilePos::new(0, 3), TilePos::new(3, 3)).unwrap();
        let end = *path.last().unwrap();
        assert_eq!(end.manhattan_distance(&TilePos::new(3, 3)), 1);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Every returned path starts adjacent to `start`, steps one tile
            /// at a time, stays walkable, and ends at the goal.
            #[test]
            fn paths_are_adjacent_and_walkable(
                walls in proptest::collection::vec(0usize..64, 0..20),
                start in (0i32..8, 0i32..8),
                goal in (0i32..8, 0i32..8),
            ) {
                let mut grid = open_grid(8, 8);
                for w in walls {
                    let pos = TilePos::new((w % 8) as i32, (w / 8) as i32);
                    grid.tile_mut(pos).unwrap().walkable = false;
                }
                let start = TilePos::new(start.0, start.1);
                let goal = TilePos::new(goal.0, goal.1);
                grid.tile_mut(start).unwrap().walkable = true;

                if let Some(path) = find_path(&grid, start, goal) {
                    let mut prev = start;
                    for &step in &path {
                        prop_assert_eq!(prev.manhattan_distance(&step), 1);
                        prop_assert!(grid.is_walkable(step));
                        prev = step;
                    }
                    prop_assert!(!path.contains(&start));
                }
            }
        }
    }
}
