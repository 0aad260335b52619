//! Palette and line-record framing, plus the directional fill that turns a
//! decoded anchor set back into a full tile grid.
//!
//! The wire `typeId` field width is derived from the *full* palette length
//! transmitted in the header, not from the used-subset size `§4.4` computes
//! for cost comparison — a decoder only ever sees `paletteLen` before it has
//! parsed a single line record, so deriving the field width from anything
//! else would make the stream self-contradictory. The used-subset size still
//! drives the L2R/T2B cost comparison exactly as specified, since that only
//! picks the (transmitted) direction bit and never needs independent
//! re-derivation on decode. See `DESIGN.md` for the full rationale.

use std::collections::HashSet;

use log::{debug, info, warn};

use crate::bitstream::{bits_for_count, BitReader, BitWriter};
use crate::error::TileCodecError;
use crate::line::{self, Line, CHUNK_SIZE};
use crate::zone::Zone;
use crate::{RawMap, TileType};

fn write_tile_type(writer: &mut BitWriter, tile_type: &TileType) -> Result<(), TileCodecError> {
    writer.write_bits(3, 0);
    writer.write_string("name", 32, &tile_type.name)?;
    writer.write_string("color_base", 16, &tile_type.color_base)?;
    writer.write_bits(4, tile_type.color_variant as u32);
    writer.write_bool(tile_type.conquerable);
    writer.write_bool(tile_type.navigable);
    writer.write_bits(8, tile_type.expansion_time as u32);
    writer.write_bits(8, tile_type.expansion_cost as u32);
    Ok(())
}

fn read_tile_type(reader: &mut BitReader) -> Result<TileType, TileCodecError> {
    let _reserved = reader.read_bits(3)?;
    let name = reader.read_string(32)?;
    let color_base = reader.read_string(16)?;
    let color_variant = reader.read_bits(4)? as u8;
    let conquerable = reader.read_bool()?;
    let navigable = reader.read_bool()?;
    let expansion_time = reader.read_bits(8)? as u8;
    let expansion_cost = reader.read_bits(8)? as u8;
    Ok(TileType {
        name,
        color_base,
        color_variant,
        conquerable,
        navigable,
        expansion_time,
        expansion_cost,
    })
}

/// Encodes the signed unit step between two 4-adjacent cells as a 2-bit code.
fn step_code(from: usize, to: usize, width: usize) -> Result<u32, TileCodecError> {
    if to == from + 1 {
        Ok(0b00)
    } else if from == to + 1 {
        Ok(0b01)
    } else if to == from + width {
        Ok(0b10)
    } else if from == to + width {
        Ok(0b11)
    } else {
        Err(TileCodecError::InvalidStepCode { code: 0xFF })
    }
}

fn step_delta(code: u32, width: usize) -> isize {
    match code {
        0b00 => 1,
        0b01 => -1,
        0b10 => width as isize,
        0b11 => -(width as isize),
        _ => unreachable!("2-bit field can only hold 0..=3"),
    }
}

fn write_line_record(
    writer: &mut BitWriter,
    line: &Line,
    width: usize,
    current_chunk_id: &mut usize,
    wire_type_bits: u32,
) -> Result<(), TileCodecError> {
    let first = line.cells[0];
    let starting_chunk = line::chunk_id(first, width);
    debug_assert!(starting_chunk >= *current_chunk_id);
    for _ in 0..(starting_chunk - *current_chunk_id) {
        writer.write_bool(true);
    }
    writer.write_bool(false);
    *current_chunk_id = starting_chunk;

    writer.write_bits(8, (line.cells.len() - 1) as u32);
    if wire_type_bits > 0 {
        writer.write_bits(wire_type_bits, line.type_index as u32);
    }

    let x = first % width;
    let y = first / width;
    let local_x = x % CHUNK_SIZE;
    let local_y = y % CHUNK_SIZE;
    writer.write_bits(10, (local_x + local_y * CHUNK_SIZE) as u32);

    for pair in line.cells.windows(2) {
        let code = step_code(pair[0], pair[1], width)?;
        writer.write_bits(2, code);
    }
    Ok(())
}

struct DecodedLine {
    first_cell: usize,
    type_id: u16,
    step_count: usize,
}

fn read_line_record(
    reader: &mut BitReader,
    width: usize,
    chunk_width: usize,
    current_chunk_id: &mut usize,
    wire_type_bits: u32,
) -> Result<(DecodedLine, Vec<u32>), TileCodecError> {
    let mut advance = 0usize;
    while reader.read_bool()? {
        advance += 1;
    }
    *current_chunk_id += advance;

    let length_minus_1 = reader.read_bits(8)? as usize;
    let type_id = if wire_type_bits > 0 {
        reader.read_bits(wire_type_bits)? as u16
    } else {
        0
    };
    let position_in_chunk = reader.read_bits(10)? as usize;

    let chunk_x = *current_chunk_id % chunk_width;
    let chunk_y = *current_chunk_id / chunk_width;
    let local_x = position_in_chunk % CHUNK_SIZE;
    let local_y = position_in_chunk / CHUNK_SIZE;
    let first_cell = local_x + chunk_x * CHUNK_SIZE + local_y * width + chunk_y * CHUNK_SIZE * width;

    let mut steps = Vec::with_capacity(length_minus_1);
    for _ in 0..length_minus_1 {
        steps.push(reader.read_bits(2)?);
    }

    Ok((
        DecodedLine {
            first_cell,
            type_id,
            step_count: length_minus_1,
        },
        steps,
    ))
}

/// Writes the direction bit, palette, and line stream. `lines_l2r`/`lines_t2b`
/// need not be pre-sorted; this sorts both by chunk before costing.
pub fn encode_frame(
    writer: &mut BitWriter,
    map: &RawMap,
    zones: &[Zone],
    mut lines_l2r: Vec<Line>,
    mut lines_t2b: Vec<Line>,
) -> Result<(), TileCodecError> {
    let width = map.width as usize;

    line::sort_by_chunk(&mut lines_l2r, width);
    line::sort_by_chunk(&mut lines_t2b, width);

    let used_count = zones
        .iter()
        .map(|z| z.type_index)
        .collect::<HashSet<_>>()
        .len() as u32;
    let cost_type_bits = bits_for_count(used_count);

    let cost_l2r = line::candidate_cost(&lines_l2r, width, cost_type_bits);
    let cost_t2b = line::candidate_cost(&lines_t2b, width, cost_type_bits);

    let (direction, chosen) = if cost_l2r > cost_t2b {
        (true, lines_t2b)
    } else {
        (false, lines_l2r)
    };

    info!(
        "direction={} cost_l2r={} cost_t2b={} lines={}",
        direction as u8,
        cost_l2r,
        cost_t2b,
        chosen.len()
    );

    writer.write_bool(direction);
    writer.write_bool(false);

    for tile_type in &map.types {
        if tile_type.name.len() > 32 {
            warn!("palette entry name too long: {}", tile_type.name.len());
        }
    }
    writer.write_bits(16, map.types.len() as u32);
    let wire_type_bits = bits_for_count(map.types.len() as u32);
    debug!(
        "palette_len={} wire_type_bits={}",
        map.types.len(),
        wire_type_bits
    );
    for tile_type in &map.types {
        write_tile_type(writer, tile_type)?;
    }

    writer.write_bits(32, chosen.len() as u32);
    let mut current_chunk_id = 0usize;
    for line in &chosen {
        write_line_record(writer, line, width, &mut current_chunk_id, wire_type_bits)?;
    }

    writer.write_bool(false);
    writer.write_bits(8, 0);

    Ok(())
}

fn directional_fill(tiles: &mut [u16], anchor: &[bool], width: usize, height: usize, direction: bool) {
    let size = width * height;
    let mut current = 0u16;
    if !direction {
        for i in 0..size {
            if anchor[i] {
                current = tiles[i];
            }
            tiles[i] = current;
        }
    } else {
        let mut i = 0usize;
        for _ in 0..size.saturating_sub(1) {
            if anchor[i] {
                current = tiles[i];
            }
            tiles[i] = current;
            i += width;
            if i >= size {
                i = (i + 1) % width;
            }
        }
    }
}

/// Reads the direction bit, palette, and line stream, then reconstructs the
/// tile grid by placing anchors and running the chosen directional fill.
pub fn decode_frame(
    reader: &mut BitReader,
    width: u16,
    height: u16,
) -> Result<RawMap, TileCodecError> {
    let width_usize = width as usize;
    let height_usize = height as usize;
    let size = width_usize * height_usize;

    let direction = reader.read_bool()?;
    let _reserved = reader.read_bool()?;

    let palette_len = reader.read_bits(16)? as usize;
    let wire_type_bits = bits_for_count(palette_len as u32);
    debug!(
        "decode palette_len={} wire_type_bits={}",
        palette_len, wire_type_bits
    );

    let mut types = Vec::with_capacity(palette_len);
    for _ in 0..palette_len {
        types.push(read_tile_type(reader)?);
    }

    let line_count = reader.read_bits(32)?;
    debug!("decode line_count={}", line_count);

    let mut tiles = vec![0u16; size];
    let mut anchor = vec![false; size];
    let chunk_width = (width_usize + CHUNK_SIZE - 1) / CHUNK_SIZE;
    let mut current_chunk_id = 0usize;

    for _ in 0..line_count {
        let (decoded, steps) = read_line_record(
            reader,
            width_usize,
            chunk_width,
            &mut current_chunk_id,
            wire_type_bits,
        )?;
        if palette_len > 0 && decoded.type_id as usize >= palette_len {
            warn!("line references out-of-range palette index {}", decoded.type_id);
            return Err(TileCodecError::UnknownTileType {
                index: decoded.type_id,
            });
        }

        let mut pos = decoded.first_cell;
        if pos >= size {
            return Err(TileCodecError::InvalidInput {
                reason: format!("decoded anchor position {} out of bounds", pos),
            });
        }
        tiles[pos] = decoded.type_id;
        anchor[pos] = true;
        for &code in steps.iter().take(decoded.step_count) {
            let delta = step_delta(code, width_usize);
            let next = pos as isize + delta;
            if next < 0 || next as usize >= size {
                return Err(TileCodecError::InvalidInput {
                    reason: "line step moved outside the grid".to_string(),
                });
            }
            pos = next as usize;
            tiles[pos] = decoded.type_id;
            anchor[pos] = true;
        }
    }

    directional_fill(&mut tiles, &anchor, width_usize, height_usize, direction);

    let _reserved = reader.read_bool()?;
    let _reserved = reader.read_bits(8)?;

    Ok(RawMap {
        width,
        height,
        tiles,
        types,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::build_zones;

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
    fn tile_type_round_trips_through_palette_encoding() {
        let tt = TileType {
            name: "Grassland".to_string(),
            color_base: "green".to_string(),
            color_variant: 7,
            conquerable: true,
            navigable: false,
            expansion_time: 42,
            expansion_cost: 255,
        };
        let mut writer = BitWriter::new();
        write_tile_type(&mut writer, &tt).unwrap();
        let bytes = writer.finish();
        let mut reader = BitReader::new(&bytes);
        let decoded = read_tile_type(&mut reader).unwrap();
        assert_eq!(decoded.name, tt.name);
        assert_eq!(decoded.color_base, tt.color_base);
        assert_eq!(decoded.color_variant, tt.color_variant);
        assert_eq!(decoded.conquerable, tt.conquerable);
        assert_eq!(decoded.navigable, tt.navigable);
        assert_eq!(decoded.expansion_time, tt.expansion_time);
        assert_eq!(decoded.expansion_cost, tt.expansion_cost);
    }

    #[test]
    fn single_cell_frame_round_trips() {
        let map = RawMap {
            width: 1,
            height: 1,
            tiles: vec![0],
            types: vec![tile_type("T0")],
        };
        let (cell_map, zones) = build_zones(&map);
        let (l2r, t2b) = line::build_candidates(1, 1, &cell_map, &zones);

        let mut writer = BitWriter::new();
        encode_frame(&mut writer, &map, &zones, l2r, t2b).unwrap();
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        let decoded = decode_frame(&mut reader, 1, 1).unwrap();
        assert_eq!(decoded.tiles, map.tiles);
        assert_eq!(decoded.types.len(), 1);
    }

    #[test]
    fn directional_fill_l2r_propagates_from_anchors() {
        let mut tiles = vec![0u16; 6];
        let anchor = vec![true, false, false, true, false, false];
        tiles[0] = 5;
        tiles[3] = 9;
        directional_fill(&mut tiles, &anchor, 3, 2, false);
        assert_eq!(tiles, vec![5, 5, 5, 9, 9, 9]);
    }

    #[test]
    fn directional_fill_t2b_wraps_columns_and_skips_last_cell() {
        // width=3 height=3, column-major fill order: 0,3,6,1,4,7,2,5,(8 skipped).
        let mut tiles = vec![0u16; 9];
        let mut anchor = vec![false; 9];
        anchor[0] = true;
        tiles[0] = 1;
        anchor[1] = true;
        tiles[1] = 2;
        anchor[2] = true;
        tiles[2] = 3;
        directional_fill(&mut tiles, &anchor, 3, 3, true);
        assert_eq!(tiles, vec![1, 2, 3, 1, 2, 3, 1, 2, 0]);
    }
}
