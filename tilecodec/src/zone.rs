//! Flood fill partitioning a tile grid into maximal 4-connected zones,
//! recording each zone's left- and top-entry border points as it goes.

use std::collections::HashSet;

use log::debug;

use crate::RawMap;

/// A maximal 4-connected region of cells sharing one tile type.
///
/// `left_border`/`top_border` are in discovery order; the matching `_set`
/// gives O(1) membership tests, used by the line builder to recognise when a
/// BFS has reached another border point.
#[derive(Debug)]
pub struct Zone {
    pub type_index: u16,
    pub left_border: Vec<usize>,
    pub left_border_set: HashSet<usize>,
    pub top_border: Vec<usize>,
    pub top_border_set: HashSet<usize>,
}

/// Flood-fills `map` in row-major order, returning the per-cell zone id grid
/// (1-based; every cell is assigned, since every cell scanned starts a new
/// zone if unassigned) and the ordered list of zones (zone id `k` is
/// `zones[k - 1]`).
pub fn build_zones(map: &RawMap) -> (Vec<u16>, Vec<Zone>) {
    let width = map.width as usize;
    let height = map.height as usize;
    let size = width * height;

    let mut cell_map = vec![0u16; size];
    let mut zones = Vec::new();

    for start in 0..size {
        if cell_map[start] != 0 {
            continue;
        }

        let tile_type = map.tiles[start];
        let zone_id = (zones.len() + 1) as u16;

        let mut left_border = Vec::new();
        let mut left_border_set = HashSet::new();
        let mut top_border = Vec::new();
        let mut top_border_set = HashSet::new();

        cell_map[start] = zone_id;
        let mut stack = vec![start];

        while let Some(cell) = stack.pop() {
            let x = cell % width;
            let y = cell / width;

            if x == 0 {
                if left_border_set.insert(cell) {
                    left_border.push(cell);
                }
            } else {
                let left = cell - 1;
                if map.tiles[left] == tile_type {
                    if cell_map[left] == 0 {
                        cell_map[left] = zone_id;
                        stack.push(left);
                    }
                } else if left_border_set.insert(cell) {
                    left_border.push(cell);
                }
            }

            if y == 0 {
                if top_border_set.insert(cell) {
                    top_border.push(cell);
                }
            } else {
                let top = cell - width;
                if map.tiles[top] == tile_type {
                    if cell_map[top] == 0 {
                        cell_map[top] = zone_id;
                        stack.push(top);
                    }
                } else if top_border_set.insert(cell) {
                    top_border.push(cell);
                }
            }

            if x + 1 < width {
                let right = cell + 1;
                if map.tiles[right] == tile_type && cell_map[right] == 0 {
                    cell_map[right] = zone_id;
                    stack.push(right);
                }
            }

            if y + 1 < height {
                let bottom = cell + width;
                if map.tiles[bottom] == tile_type && cell_map[bottom] == 0 {
                    cell_map[bottom] = zone_id;
                    stack.push(bottom);
                }
            }
        }

        debug!(
            "zone {} type={} left_border={} top_border={}",
            zone_id,
            tile_type,
            left_border.len(),
            top_border.len()
        );

        zones.push(Zone {
            type_index: tile_type,
            left_border,
            left_border_set,
            top_border,
            top_border_set,
        });
    }

    (cell_map, zones)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TileType;

    fn tile_type(name: &str) -> TileType {
        TileType {
            name: name.to_string(),
            color_base: "red".to_string(),
            color_variant: 0,
            conquerable: true,
            navigable: true,
            expansion_time: 0,
            expansion_cost: 0,
        }
    }

    #[test]
    fn single_cell_map_is_one_zone_bordered_both_ways() {
        let map = RawMap {
            width: 1,
            height: 1,
            tiles: vec![0],
            types: vec![tile_type("T0")],
        };
        let (cell_map, zones) = build_zones(&map);
        assert_eq!(cell_map, vec![1]);
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].left_border, vec![0]);
        assert_eq!(zones[0].top_border, vec![0]);
    }

    #[test]
    fn checkerboard_is_four_singleton_zones() {
        let map = RawMap {
            width: 2,
            height: 2,
            tiles: vec![0, 1, 1, 0],
            types: vec![tile_type("T0"), tile_type("T1")],
        };
        let (cell_map, zones) = build_zones(&map);
        assert_eq!(zones.len(), 4);
        // Every cell is its own zone: all ids distinct.
        let mut ids: Vec<u16> = cell_map.clone();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 4);
        for zone in &zones {
            assert_eq!(zone.left_border.len(), 1);
            assert_eq!(zone.top_border.len(), 1);
        }
    }

    #[test]
    fn uniform_grid_is_a_single_zone() {
        let map = RawMap {
            width: 3,
            height: 3,
            tiles: vec![0; 9],
            types: vec![tile_type("T0"), tile_type("T1")],
        };
        let (cell_map, zones) = build_zones(&map);
        assert!(cell_map.iter().all(|&id| id == 1));
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].type_index, 0);
        // left border: one per row (column 0 cells).
        assert_eq!(zones[0].left_border.len(), 3);
        // top border: one per column (row 0 cells).
        assert_eq!(zones[0].top_border.len(), 3);
    }

    #[test]
    fn striped_map_is_two_zones() {
        let map = RawMap {
            width: 8,
            height: 1,
            tiles: vec![0, 0, 0, 0, 1, 1, 1, 1],
            types: vec![tile_type("T0"), tile_type("T1")],
        };
        let (_cell_map, zones) = build_zones(&map);
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].type_index, 0);
        assert_eq!(zones[1].type_index, 1);
    }

    #[test]
    fn zone_partition_matches_connectivity() {
        // tiles:   0 0 1
        //          0 1 1
        let map = RawMap {
            width: 3,
            height: 2,
            tiles: vec![0, 0, 1, 0, 1, 1],
            types: vec![tile_type("T0"), tile_type("T1")],
        };
        let (cell_map, zones) = build_zones(&map);
        // Cells (0,0),(1,0),(0,1) form one zone of type 0 (4-connected via top/left).
        assert_eq!(cell_map[0], cell_map[1]);
        assert_eq!(cell_map[0], cell_map[3]);
        assert_eq!(zones[(cell_map[0] - 1) as usize].type_index, 0);
        // (2,0),(1,1),(2,1) are all type 1 and mutually 4-connected through (2,1).
        assert_eq!(cell_map[2], cell_map[4]);
        assert_eq!(cell_map[2], cell_map[5]);
        assert_eq!(zones[(cell_map[2] - 1) as usize].type_index, 1);
        // Exactly two zones overall.
        assert_eq!(zones.len(), 2);
    }
}
