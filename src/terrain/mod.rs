//! Terrain data: height/texture sampling, tile merging, persistence

pub mod height_field;
pub mod texture_field;
pub mod tile;
pub mod merge;
pub mod dataset;

pub use height_field::{HeightField, Triangle, OUT_OF_RANGE_HEIGHT};
pub use texture_field::TextureField;
pub use tile::TerrainTile;
pub use merge::merge_tiles;
pub use dataset::{TerrainDataset, DATASET_VERSION, DATASET_FILE_EXTENSION};

use std::path::Path;

use crate::core::types::Result;
use crate::core::error::Error;

/// Merged terrain data shared by every instancer in a session.
///
/// Built once by `merge_tiles` (or loaded from a saved dataset) and
/// read-only afterwards.
#[derive(Debug)]
pub struct TerrainData {
    pub height_field: HeightField,
    pub texture_field: TextureField,
}

impl TerrainData {
    /// Load a previously merged dataset from disk.
    ///
    /// A missing file is a configuration error: the merge step has to run
    /// before a session can stream vegetation.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "terrain dataset not found at {}; run the terrain merge step first",
                path.display()
            )));
        }
        let dataset = TerrainDataset::load(path)?;
        dataset.to_terrain()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::core::types::{Vec2, Vec3, IVec2};
    use crate::math::Aabb;

    /// Flat terrain of the given world side length at elevation zero.
    pub fn flat_terrain(side: f32) -> TerrainData {
        terrain_with_heights(side, |_, _| 0.0)
    }

    /// Terrain whose normalized elevation ramps along the x axis,
    /// giving a uniform nonzero slope everywhere.
    pub fn ramp_terrain(side: f32) -> TerrainData {
        terrain_with_heights(side, |x, _| x)
    }

    /// Build a 33x33 terrain with the given normalized height function of
    /// normalized (x, z) in [0, 1], plus a two-layer texture field split
    /// down the middle: layer 0 dominates for x < 0.5, layer 1 beyond.
    pub fn terrain_with_heights(side: f32, f: impl Fn(f32, f32) -> f32) -> TerrainData {
        let res = 33usize;
        let quads = (res - 1) as f32;
        let mut heights = vec![0.0f32; res * res];
        for x in 0..res {
            for z in 0..res {
                heights[x * res + z] = f(x as f32 / quads, z as f32 / quads).clamp(0.0, 1.0);
            }
        }
        let aabb = Aabb::new(Vec3::ZERO, Vec3::new(side, 100.0, side));
        let height_field = HeightField::new(
            heights,
            res,
            Vec2::splat(side / quads),
            aabb,
        )
        .unwrap();

        let tex_res = 32usize;
        let mut weights = vec![0.0f32; tex_res * tex_res * 2];
        for x in 0..tex_res {
            for z in 0..tex_res {
                let left = x < tex_res / 2;
                weights[z * tex_res + x] = if left { 0.9 } else { 0.2 };
                weights[tex_res * tex_res + z * tex_res + x] = if left { 0.1 } else { 0.8 };
            }
        }
        let texture_field = TextureField::new(
            weights,
            IVec2::splat(tex_res as i32),
            2,
            Vec2::ZERO,
            Vec2::splat(side),
        )
        .unwrap();

        TerrainData { height_field, texture_field }
    }
}
