//! Source terrain tile, as handed over by the host engine's terrain asset.

use crate::core::types::{Vec2, Vec3, IVec2, Result};
use crate::core::error::Error;

/// One terrain tile read from the external terrain data source.
///
/// Tiles are axis-aligned, unrotated, square, and only ever read once at
/// data-preparation time when they are merged into a single
/// [`TerrainData`](crate::terrain::TerrainData).
#[derive(Clone, Debug)]
pub struct TerrainTile {
    /// World position of the tile's min corner
    pub position: Vec3,
    /// World extents of the tile (y is the elevation range)
    pub size: Vec3,
    /// Heightmap samples per side
    pub heightmap_resolution: usize,
    /// Normalized elevations in [0, 1], indexed `[x * resolution + z]`
    pub heights: Vec<f32>,
    /// Blend-weight map dimensions
    pub alphamap_size: IVec2,
    /// Number of texture layers
    pub layer_count: usize,
    /// Blend weights, layer-major then row-major: `[layer][z][x]`
    pub weights: Vec<f32>,
}

impl TerrainTile {
    /// World units per heightmap grid step in x/z.
    pub fn sample_size(&self) -> Vec2 {
        let quads = (self.heightmap_resolution - 1) as f32;
        Vec2::new(self.size.x / quads, self.size.z / quads)
    }

    /// Check internal consistency of the tile's arrays.
    pub fn validate(&self) -> Result<()> {
        if self.heightmap_resolution < 2 {
            return Err(Error::Config(format!(
                "tile at {} has heightmap resolution {}, need at least 2",
                self.position, self.heightmap_resolution
            )));
        }
        let expected = self.heightmap_resolution * self.heightmap_resolution;
        if self.heights.len() != expected {
            return Err(Error::Config(format!(
                "tile at {} has {} height samples, expected {}",
                self.position,
                self.heights.len(),
                expected
            )));
        }
        let expected = (self.alphamap_size.x * self.alphamap_size.y) as usize * self.layer_count;
        if self.weights.len() != expected {
            return Err(Error::Config(format!(
                "tile at {} has {} blend weights, expected {}",
                self.position,
                self.weights.len(),
                expected
            )));
        }
        Ok(())
    }
}
