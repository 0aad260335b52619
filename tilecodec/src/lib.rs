//! Lossless binary codec for 2D tile maps.
//!
//! A map is partitioned into maximal 4-connected zones of equal tile type
//! ([`zone`]), each zone's border points are stitched into short chains
//! ([`line`]), and the cheaper of two directional candidate sets is framed
//! into a bit-packed byte stream ([`frame`]). [`encode`] and [`decode`] are
//! the only two operations a caller needs.

mod bitstream;
mod error;
mod frame;
mod line;
mod zone;

pub use error::TileCodecError;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use bitstream::{BitReader, BitWriter};

const CURRENT_VERSION: u8 = 0;
const MINIMUM_VERSION: u8 = 0;

/// A tile type in a map's palette.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileType {
    pub name: String,
    pub color_base: String,
    pub color_variant: u8,
    pub conquerable: bool,
    pub navigable: bool,
    pub expansion_time: u8,
    pub expansion_cost: u8,
}

/// A rectangular grid of tile-type indices, row-major with row 0 on top.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMap {
    pub width: u16,
    pub height: u16,
    pub tiles: Vec<u16>,
    pub types: Vec<TileType>,
}

fn validate(map: &RawMap) -> Result<(), TileCodecError> {
    let expected = map.width as usize * map.height as usize;
    if map.tiles.len() != expected {
        warn!(
            "tiles length {} does not match width*height {}",
            map.tiles.len(),
            expected
        );
        return Err(TileCodecError::InvalidInput {
            reason: format!(
                "tiles length {} does not match width*height {}",
                map.tiles.len(),
                expected
            ),
        });
    }

    for &tile in &map.tiles {
        if tile as usize >= map.types.len() {
            warn!("tile references unknown palette index {}", tile);
            return Err(TileCodecError::UnknownTileType { index: tile });
        }
    }

    for tile_type in &map.types {
        if tile_type.color_variant > 15 {
            warn!(
                "color_variant {} out of range [0,15] for {:?}",
                tile_type.color_variant, tile_type.name
            );
            return Err(TileCodecError::InvalidInput {
                reason: format!(
                    "color_variant {} out of range [0,15] for tile type {:?}",
                    tile_type.color_variant, tile_type.name
                ),
            });
        }
    }

    Ok(())
}

/// Compresses `map` into a bit-packed byte stream.
///
/// Fails with [`TileCodecError::InvalidInput`] if `tiles.len() != width *
/// height`, or [`TileCodecError::UnknownTileType`] if any tile references a
/// palette index outside `types`.
pub fn encode(map: &RawMap) -> Result<Vec<u8>, TileCodecError> {
    validate(map)?;

    let (cell_map, zones) = zone::build_zones(map);
    let (lines_l2r, lines_t2b) = line::build_candidates(
        map.width as usize,
        map.height as usize,
        &cell_map,
        &zones,
    );

    debug!(
        "encoding {}x{} map, {} zones",
        map.width,
        map.height,
        zones.len()
    );

    let mut writer = BitWriter::new();
    writer.write_bits(4, CURRENT_VERSION as u32);
    writer.write_bits(16, map.width as u32);
    writer.write_bits(16, map.height as u32);
    writer.write_bits(8, 0);

    frame::encode_frame(&mut writer, map, &zones, lines_l2r, lines_t2b)?;

    let bytes = writer.finish();
    info!("encoded {}x{} map into {} bytes", map.width, map.height, bytes.len());
    Ok(bytes)
}

/// Reconstructs a [`RawMap`] from bytes produced by [`encode`].
///
/// Fails with [`TileCodecError::UnsupportedVersion`] if the embedded version
/// is outside the supported range, or [`TileCodecError::Truncated`] /
/// [`TileCodecError::InvalidString`] on a malformed stream.
pub fn decode(bytes: &[u8]) -> Result<RawMap, TileCodecError> {
    let mut reader = BitReader::new(bytes);

    let version = reader.read_bits(4)? as u8;
    if version < MINIMUM_VERSION || version > CURRENT_VERSION {
        warn!("unsupported codec version {}", version);
        return Err(TileCodecError::UnsupportedVersion { version });
    }

    let width = reader.read_bits(16)? as u16;
    let height = reader.read_bits(16)? as u16;
    let _reserved = reader.read_bits(8)?;

    debug!("decoding {}x{} map, version {}", width, height, version);

    let map = frame::decode_frame(&mut reader, width, height)?;
    info!("decoded {}x{} map, {} palette entries", width, height, map.types.len());
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn rejects_tiles_length_mismatch() {
        let map = RawMap {
            width: 2,
            height: 2,
            tiles: vec![0, 0, 0],
            types: vec![tile_type("T0")],
        };
        let err = encode(&map).unwrap_err();
        assert!(matches!(err, TileCodecError::InvalidInput { .. }));
    }

    #[test]
    fn rejects_color_variant_out_of_range() {
        let mut bad = tile_type("T0");
        bad.color_variant = 16;
        let map = RawMap {
            width: 1,
            height: 1,
            tiles: vec![0],
            types: vec![bad],
        };
        let err = encode(&map).unwrap_err();
        assert!(matches!(err, TileCodecError::InvalidInput { .. }));
    }

    #[test]
    fn rejects_unknown_tile_type() {
        let map = RawMap {
            width: 1,
            height: 1,
            tiles: vec![5],
            types: vec![tile_type("T0")],
        };
        let err = encode(&map).unwrap_err();
        assert_eq!(err, TileCodecError::UnknownTileType { index: 5 });
    }

    #[test]
    fn rejects_unsupported_version_on_decode() {
        let mut writer = BitWriter::new();
        writer.write_bits(4, 1); // version 1, above CURRENT_VERSION
        writer.write_bits(16, 0);
        writer.write_bits(16, 0);
        writer.write_bits(8, 0);
        let bytes = writer.finish();
        let err = decode(&bytes).unwrap_err();
        assert_eq!(err, TileCodecError::UnsupportedVersion { version: 1 });
    }

    #[test]
    fn round_trips_a_small_map() {
        let map = RawMap {
            width: 2,
            height: 2,
            tiles: vec![0, 1, 1, 0],
            types: vec![tile_type("T0"), tile_type("T1")],
        };
        let bytes = encode(&map).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, map);
    }

    #[test]
    fn re_encoding_a_decoded_map_is_byte_identical() {
        let map = RawMap {
            width: 8,
            height: 1,
            tiles: vec![0, 0, 0, 0, 1, 1, 1, 1],
            types: vec![tile_type("T0"), tile_type("T1")],
        };
        let bytes = encode(&map).unwrap();
        let decoded = decode(&bytes).unwrap();
        let re_encoded = encode(&decoded).unwrap();
        assert_eq!(bytes, re_encoded);
    }
}
