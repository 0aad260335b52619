//! Per-zone short-path discovery and greedy line stitching.
//!
//! For each zone, border points are connected pairwise by bounded BFS
//! (§4.3.1), then greedily stitched into the longest chains a degree-2 cap
//! per point allows (§4.3.2), cropped to the 256-cell line limit and
//! completed with singletons for any leftover border point (§4.3.3). The
//! resulting lines are finally grouped by 32x32 chunk and costed so the
//! frame encoder can pick the cheaper of the left-border and top-border
//! candidate sets (§4.3.4).

use std::collections::{HashMap, VecDeque};

use log::info;

use crate::zone::Zone;

/// An emitted chain of 4-adjacent cells lying entirely inside one zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub type_index: u16,
    pub cells: Vec<usize>,
}

const MAX_BFS_DEPTH: u32 = 8;
const MAX_SEGMENT_LEN: usize = 256;
pub const CHUNK_SIZE: usize = 32;

struct Connection {
    from: usize,
    to: usize,
    path: Vec<usize>,
}

fn neighbors(cell: usize, width: usize, height: usize) -> [Option<usize>; 4] {
    let x = cell % width;
    let y = cell / width;
    [
        if x + 1 < width { Some(cell + 1) } else { None },
        if x > 0 { Some(cell - 1) } else { None },
        if y + 1 < height { Some(cell + width) } else { None },
        if y > 0 { Some(cell - width) } else { None },
    ]
}

/// Bucketed candidate connections between border points, bucket index
/// `d - 1` holding every pair at BFS distance `d` (1..=8).
fn border_connections(
    cell_map: &[u16],
    width: usize,
    height: usize,
    zone_id: u16,
    border: &[usize],
) -> Vec<Vec<Connection>> {
    let mut border_index = HashMap::with_capacity(border.len());
    for (i, &cell) in border.iter().enumerate() {
        border_index.insert(cell, i);
    }

    let mut buckets: Vec<Vec<Connection>> = (0..MAX_BFS_DEPTH).map(|_| Vec::new()).collect();

    for (from_idx, &start) in border.iter().enumerate() {
        let mut dist: HashMap<usize, u32> = HashMap::new();
        let mut parent: HashMap<usize, usize> = HashMap::new();
        let mut queue = VecDeque::new();
        dist.insert(start, 0);
        queue.push_back(start);

        while let Some(cell) = queue.pop_front() {
            let d = dist[&cell];
            if d == MAX_BFS_DEPTH {
                continue;
            }
            for neighbor in neighbors(cell, width, height).into_iter().flatten() {
                if cell_map[neighbor] != zone_id || dist.contains_key(&neighbor) {
                    continue;
                }
                dist.insert(neighbor, d + 1);
                parent.insert(neighbor, cell);
                queue.push_back(neighbor);

                if let Some(&to_idx) = border_index.get(&neighbor) {
                    if to_idx < from_idx {
                        debug_assert_ne!(from_idx, to_idx);
                        let mut path = Vec::new();
                        let mut walk = cell;
                        while walk != start {
                            path.push(walk);
                            walk = parent[&walk];
                        }
                        path.reverse();
                        buckets[(d + 1 - 1) as usize].push(Connection {
                            from: from_idx,
                            to: to_idx,
                            path,
                        });
                    }
                }
            }
        }
    }

    buckets
}

/// Greedily stitches border points into chains, processing connections in
/// ascending-distance bucket order (§4.3.2), then crops over-long segments
/// and fills in singletons for untouched border points (§4.3.3).
fn stitch(border: &[usize], buckets: Vec<Vec<Connection>>) -> Vec<Vec<usize>> {
    let mut degree = vec![0u8; border.len()];
    let mut point_segment: Vec<Option<usize>> = vec![None; border.len()];
    let mut segments: Vec<Vec<usize>> = Vec::new();

    for bucket in buckets {
        for conn in bucket {
            let (from_idx, to_idx) = (conn.from, conn.to);
            if degree[from_idx] >= 2 || degree[to_idx] >= 2 {
                continue;
            }

            let a = border[from_idx];
            let b = border[to_idx];

            match (point_segment[from_idx], point_segment[to_idx]) {
                (None, None) => {
                    let mut seg = Vec::with_capacity(conn.path.len() + 2);
                    seg.push(a);
                    seg.extend_from_slice(&conn.path);
                    seg.push(b);
                    let seg_id = segments.len();
                    segments.push(seg);
                    point_segment[from_idx] = Some(seg_id);
                    point_segment[to_idx] = Some(seg_id);
                }
                (None, Some(seg_id)) => {
                    let seg = &mut segments[seg_id];
                    if seg.first() == Some(&b) {
                        let mut new_seg = Vec::with_capacity(seg.len() + conn.path.len() + 1);
                        new_seg.push(a);
                        new_seg.extend_from_slice(&conn.path);
                        new_seg.extend_from_slice(seg);
                        *seg = new_seg;
                    } else {
                        seg.extend_from_slice(&conn.path);
                        seg.push(a);
                    }
                    point_segment[from_idx] = Some(seg_id);
                }
                (Some(seg_id), None) => {
                    let seg = &mut segments[seg_id];
                    if seg.first() == Some(&a) {
                        let mut new_seg = Vec::with_capacity(seg.len() + conn.path.len() + 1);
                        new_seg.push(b);
                        new_seg.extend(conn.path.iter().rev().copied());
                        new_seg.extend_from_slice(seg);
                        *seg = new_seg;
                    } else {
                        seg.extend_from_slice(&conn.path);
                        seg.push(b);
                    }
                    point_segment[to_idx] = Some(seg_id);
                }
                (Some(seg_a), Some(seg_b)) => {
                    if seg_a == seg_b {
                        continue;
                    }
                    let mut oriented_a = std::mem::take(&mut segments[seg_a]);
                    if oriented_a.first() == Some(&a) {
                        oriented_a.reverse();
                    }
                    let mut oriented_b = std::mem::take(&mut segments[seg_b]);
                    if oriented_b.last() == Some(&b) {
                        oriented_b.reverse();
                    }

                    let mut merged =
                        Vec::with_capacity(oriented_a.len() + conn.path.len() + oriented_b.len());
                    merged.extend(oriented_a);
                    merged.extend(conn.path.iter().copied());
                    merged.extend(oriented_b);

                    segments[seg_a] = merged;
                    segments[seg_b] = Vec::new();

                    for ps in point_segment.iter_mut() {
                        if *ps == Some(seg_b) {
                            *ps = Some(seg_a);
                        }
                    }
                }
            }

            degree[from_idx] += 1;
            degree[to_idx] += 1;
        }
    }

    for (i, seg) in point_segment.iter().enumerate() {
        if seg.is_none() {
            segments.push(vec![border[i]]);
        }
    }

    let mut final_segments = Vec::with_capacity(segments.len());
    for seg in segments {
        if seg.is_empty() {
            continue;
        }
        if seg.len() > MAX_SEGMENT_LEN {
            let (head, tail) = seg.split_at(MAX_SEGMENT_LEN);
            final_segments.push(head.to_vec());
            final_segments.push(tail.to_vec());
        } else {
            final_segments.push(seg);
        }
    }
    final_segments
}

fn build_zone_lines(
    cell_map: &[u16],
    width: usize,
    height: usize,
    zone_id: u16,
    type_index: u16,
    border: &[usize],
) -> Vec<Line> {
    if border.is_empty() {
        return Vec::new();
    }
    let buckets = border_connections(cell_map, width, height, zone_id, border);
    stitch(border, buckets)
        .into_iter()
        .map(|cells| Line { type_index, cells })
        .collect()
}

/// Builds both candidate line sets (left-border and top-border) across all
/// zones. Neither is sorted by chunk yet; call [`sort_by_chunk`] before
/// costing or emitting.
pub fn build_candidates(
    width: usize,
    height: usize,
    cell_map: &[u16],
    zones: &[Zone],
) -> (Vec<Line>, Vec<Line>) {
    let mut lines_l2r = Vec::new();
    let mut lines_t2b = Vec::new();

    for (i, zone) in zones.iter().enumerate() {
        let zone_id = (i + 1) as u16;
        lines_l2r.extend(build_zone_lines(
            cell_map,
            width,
            height,
            zone_id,
            zone.type_index,
            &zone.left_border,
        ));
        lines_t2b.extend(build_zone_lines(
            cell_map,
            width,
            height,
            zone_id,
            zone.type_index,
            &zone.top_border,
        ));
    }

    info!(
        "built {} left-border lines and {} top-border lines across {} zones",
        lines_l2r.len(),
        lines_t2b.len(),
        zones.len()
    );

    (lines_l2r, lines_t2b)
}

/// The 32x32 chunk containing `cell`, chunks indexed row-major.
pub fn chunk_id(cell: usize, width: usize) -> usize {
    let chunk_width = width.div_ceil(CHUNK_SIZE);
    let x = cell % width;
    let y = cell / width;
    (y / CHUNK_SIZE) * chunk_width + (x / CHUNK_SIZE)
}

/// Stable-sorts `lines` by the chunk containing their first cell.
pub fn sort_by_chunk(lines: &mut [Line], width: usize) {
    lines.sort_by_key(|line| chunk_id(line.cells[0], width));
}

/// Emission cost of a (chunk-sorted) candidate line set, per §4.3.4.
pub fn candidate_cost(lines: &[Line], width: usize, type_bits: u32) -> u64 {
    let mut previous_chunk = 0u64;
    let mut total = 0u64;
    for line in lines {
        let chunk = chunk_id(line.cells[0], width) as u64;
        total += (line.cells.len() as u64 - 1) * 2 + 20 + type_bits as u64 + (chunk - previous_chunk);
        previous_chunk = chunk;
    }
    total
}
