//! Merging a square arrangement of terrain tiles into one dataset.
//!
//! Runs once at data-preparation time. Validation happens up front and a
//! failed check aborts with a configuration error before anything is
//! merged, so a bad tile set never produces a half-built dataset.

use crate::core::types::{Vec2, Vec3, IVec2, Result};
use crate::core::error::Error;
use crate::math::Aabb;

use super::height_field::HeightField;
use super::texture_field::TextureField;
use super::tile::TerrainTile;
use super::TerrainData;

/// Merge equal-sized terrain tiles arranged in a square into a single
/// [`TerrainData`].
///
/// Tiles may arrive in any order; they are sorted into grid order by world
/// position. Adjacent tiles share their edge row/column of height samples,
/// so `d x d` tiles of resolution `r` merge into a heightmap of side
/// `d * r - (d - 1)`.
pub fn merge_tiles(tiles: &[TerrainTile]) -> Result<TerrainData> {
    if tiles.is_empty() {
        return Err(Error::Config("no terrain tiles provided".into()));
    }
    for tile in tiles {
        tile.validate()?;
    }

    let (ordered, side) = check_square(tiles)?;
    check_same_parameters(&ordered)?;

    let aabb = merged_aabb(&ordered, side);
    let height_field = build_height_field(&ordered, side, aabb)?;
    let texture_field = build_texture_field(&ordered, side, aabb)?;

    log::info!(
        "merged {} terrain tiles ({side}x{side}) into a {res}x{res} heightmap, {layers} texture layers",
        tiles.len(),
        res = height_field.resolution(),
        layers = texture_field.layer_count(),
    );

    Ok(TerrainData { height_field, texture_field })
}

/// Verify the tile count is a perfect square and the tiles occupy a square
/// grid; returns them sorted by x then z (grid order) plus the side length.
fn check_square(tiles: &[TerrainTile]) -> Result<(Vec<&TerrainTile>, usize)> {
    let count = tiles.len();
    let side = (1..=count)
        .rev()
        .find(|d| d * d == count)
        .ok_or_else(|| {
            Error::Config(format!(
                "{count} terrain tiles cannot form a square arrangement"
            ))
        })?;

    let mut ordered: Vec<&TerrainTile> = tiles.iter().collect();
    ordered.sort_by(|a, b| {
        (a.position.x, a.position.z)
            .partial_cmp(&(b.position.x, b.position.z))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let distinct = |f: fn(&TerrainTile) -> f32| {
        let mut values: Vec<i32> = ordered.iter().map(|t| f(t) as i32).collect();
        values.sort_unstable();
        values.dedup();
        values.len()
    };
    let x_count = distinct(|t| t.position.x);
    let z_count = distinct(|t| t.position.z);
    if x_count != z_count {
        return Err(Error::Config(format!(
            "terrain tiles are not laid out as a square: {x_count} distinct x positions vs {z_count} distinct z positions"
        )));
    }

    Ok((ordered, side))
}

/// Verify every tile shares the first tile's parameters.
fn check_same_parameters(tiles: &[&TerrainTile]) -> Result<()> {
    let first = tiles[0];
    for tile in &tiles[1..] {
        if tile.heightmap_resolution != first.heightmap_resolution {
            return Err(Error::Config(format!(
                "terrain tiles have different heightmap resolutions: {} vs {}",
                first.heightmap_resolution, tile.heightmap_resolution
            )));
        }
        if tile.sample_size() != first.sample_size() {
            return Err(Error::Config(format!(
                "terrain tiles have different sample sizes: {} vs {}",
                first.sample_size(),
                tile.sample_size()
            )));
        }
        if tile.alphamap_size != first.alphamap_size {
            return Err(Error::Config(format!(
                "terrain tiles have different texture array sizes: {} vs {}",
                first.alphamap_size, tile.alphamap_size
            )));
        }
        if tile.size.x != first.size.x || tile.size.z != first.size.z {
            return Err(Error::Config(format!(
                "terrain tiles have different world sizes: {} vs {}",
                first.size, tile.size
            )));
        }
        if tile.layer_count != first.layer_count {
            return Err(Error::Config(format!(
                "terrain tiles have different texture layer counts: one has {} while another has {}",
                first.layer_count, tile.layer_count
            )));
        }
        if tile.position.y as i32 != first.position.y as i32 {
            return Err(Error::Config(format!(
                "terrain tiles do not share the same height position: {} vs {}",
                first.position.y, tile.position.y
            )));
        }
    }
    Ok(())
}

fn merged_aabb(tiles: &[&TerrainTile], side: usize) -> Aabb {
    let mut min = tiles[0].position;
    for tile in &tiles[1..] {
        min = min.min(tile.position);
    }
    let size = Vec3::new(
        tiles[0].size.x * side as f32,
        tiles[0].size.y,
        tiles[0].size.z * side as f32,
    );
    Aabb::new(min, min + size)
}

fn build_height_field(tiles: &[&TerrainTile], side: usize, aabb: Aabb) -> Result<HeightField> {
    let res = tiles[0].heightmap_resolution;
    let quads = res - 1;
    let merged_res = res * side - (side - 1);

    let mut heights = vec![0.0f32; merged_res * merged_res];
    for x in 0..merged_res {
        // Interior tile edges overlap; a sample on a shared edge reads
        // from the higher-indexed tile
        let tx = (x / quads).min(side - 1);
        let lx = x - tx * quads;
        for z in 0..merged_res {
            let tz = (z / quads).min(side - 1);
            let lz = z - tz * quads;
            heights[x * merged_res + z] = tiles[tx * side + tz].heights[lx * res + lz];
        }
    }

    HeightField::new(heights, merged_res, tiles[0].sample_size(), aabb)
}

fn build_texture_field(tiles: &[&TerrainTile], side: usize, aabb: Aabb) -> Result<TextureField> {
    let tile_w = tiles[0].alphamap_size.x as usize;
    let tile_h = tiles[0].alphamap_size.y as usize;
    let layers = tiles[0].layer_count;
    let w = tile_w * side;
    let h = tile_h * side;

    let mut weights = vec![0.0f32; w * h * layers];
    for layer in 0..layers {
        for z in 0..h {
            let tz = z / tile_h;
            let lz = z % tile_h;
            for x in 0..w {
                let tx = x / tile_w;
                let lx = x % tile_w;
                weights[layer * w * h + z * w + x] =
                    tiles[tx * side + tz].weights[layer * tile_w * tile_h + lz * tile_w + lx];
            }
        }
    }

    TextureField::new(
        weights,
        IVec2::new(w as i32, h as i32),
        layers,
        Vec2::new(aabb.min.x, aabb.min.z),
        Vec2::new(aabb.size().x, aabb.size().z),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 33x33 tile of constant normalized height, 32x32 single-layer
    /// alphamap, 32x32 world units.
    fn tile_at(x: f32, z: f32, height: f32) -> TerrainTile {
        let res = 33usize;
        let alpha = 32usize;
        TerrainTile {
            position: Vec3::new(x, 0.0, z),
            size: Vec3::new(32.0, 10.0, 32.0),
            heightmap_resolution: res,
            heights: vec![height; res * res],
            alphamap_size: IVec2::splat(alpha as i32),
            layer_count: 1,
            weights: vec![1.0; alpha * alpha],
        }
    }

    #[test]
    fn test_three_tiles_not_square() {
        let tiles = vec![
            tile_at(0.0, 0.0, 0.0),
            tile_at(32.0, 0.0, 0.0),
            tile_at(0.0, 32.0, 0.0),
        ];
        let err = merge_tiles(&tiles).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_four_in_a_row_rejected() {
        let tiles: Vec<_> = (0..4).map(|i| tile_at(i as f32 * 32.0, 0.0, 0.0)).collect();
        assert!(merge_tiles(&tiles).is_err());
    }

    #[test]
    fn test_mismatched_resolution_rejected() {
        let mut odd = tile_at(32.0, 0.0, 0.0);
        odd.heightmap_resolution = 17;
        odd.heights = vec![0.0; 17 * 17];
        let tiles = vec![
            tile_at(0.0, 0.0, 0.0),
            odd,
            tile_at(0.0, 32.0, 0.0),
            tile_at(32.0, 32.0, 0.0),
        ];
        let err = merge_tiles(&tiles).unwrap_err();
        assert!(err.to_string().contains("resolutions"));
    }

    #[test]
    fn test_two_by_two_shared_edges() {
        // 4 tiles of 33x33 at 1-unit spacing merge into 65x65
        let tiles = vec![
            tile_at(0.0, 0.0, 0.1),
            tile_at(0.0, 32.0, 0.2),
            tile_at(32.0, 0.0, 0.3),
            tile_at(32.0, 32.0, 0.4),
        ];
        let merged = merge_tiles(&tiles).unwrap();
        let field = &merged.height_field;
        assert_eq!(field.resolution(), 65);
        assert_eq!(field.aabb().min, Vec3::ZERO);
        assert_eq!(field.aabb().max, Vec3::new(64.0, 10.0, 64.0));
        assert_eq!(field.sample_size(), Vec2::ONE);

        // Quadrant interiors come from their own tiles (heights scale by
        // the 10-unit elevation range)
        assert!((field.sample_height(Vec2::new(10.0, 10.0)) - 1.0).abs() < 1e-4);
        assert!((field.sample_height(Vec2::new(10.0, 50.0)) - 2.0).abs() < 1e-4);
        assert!((field.sample_height(Vec2::new(50.0, 10.0)) - 3.0).abs() < 1e-4);
        assert!((field.sample_height(Vec2::new(50.0, 50.0)) - 4.0).abs() < 1e-4);

        // The texture map doubles per axis with no shared edges
        assert_eq!(merged.texture_field.array_size(), IVec2::splat(64));
    }

    #[test]
    fn test_unsorted_input_is_ordered() {
        let tiles = vec![
            tile_at(32.0, 32.0, 0.4),
            tile_at(0.0, 0.0, 0.1),
            tile_at(32.0, 0.0, 0.3),
            tile_at(0.0, 32.0, 0.2),
        ];
        let merged = merge_tiles(&tiles).unwrap();
        assert!((merged.height_field.sample_height(Vec2::new(10.0, 10.0)) - 1.0).abs() < 1e-4);
        assert!((merged.height_field.sample_height(Vec2::new(50.0, 50.0)) - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_single_tile_merge() {
        let merged = merge_tiles(&[tile_at(0.0, 0.0, 0.5)]).unwrap();
        assert_eq!(merged.height_field.resolution(), 33);
        assert!((merged.height_field.sample_height(Vec2::new(16.0, 16.0)) - 5.0).abs() < 1e-4);
    }
}
