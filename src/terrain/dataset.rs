//! Merged terrain dataset persistence.
//!
//! The merge step runs once; its output is stored as an LZ4-compressed
//! rkyv blob so later sessions can skip straight to streaming. The format
//! carries a version field checked on load.

use rkyv::{Archive, Deserialize, Serialize};
use std::path::Path;

use crate::core::types::{Vec2, Vec3, IVec2, Result};
use crate::core::error::Error;
use crate::math::Aabb;

use super::height_field::HeightField;
use super::texture_field::TextureField;
use super::TerrainData;

/// Current version of the terrain dataset format
pub const DATASET_VERSION: u32 = 1;

/// File extension for terrain dataset files
pub const DATASET_FILE_EXTENSION: &str = "veg";

/// Serializable merged terrain data with metadata
#[derive(Debug, Archive, Deserialize, Serialize)]
pub struct TerrainDataset {
    /// Format version for compatibility
    pub version: u32,
    /// Heightmap samples per side
    pub height_resolution: u32,
    /// World units per heightmap grid step (x, z)
    pub sample_size: [f32; 2],
    /// Terrain bounding box min corner
    pub bounds_min: [f32; 3],
    /// Terrain bounding box max corner
    pub bounds_max: [f32; 3],
    /// Normalized elevations, `[x * resolution + z]`
    pub heights: Vec<f32>,
    /// Blend-weight map dimensions (x, z)
    pub tex_array_size: [i32; 2],
    /// Number of texture layers
    pub layer_count: u32,
    /// Terrain origin in world xz
    pub origin: [f32; 2],
    /// Terrain world size in xz
    pub world_size: [f32; 2],
    /// Blend weights, layer-major then row-major
    pub weights: Vec<f32>,
}

impl TerrainDataset {
    /// Capture a merged terrain as a serializable dataset.
    pub fn from_terrain(terrain: &TerrainData) -> Self {
        let heights = &terrain.height_field;
        let textures = &terrain.texture_field;
        Self {
            version: DATASET_VERSION,
            height_resolution: heights.resolution() as u32,
            sample_size: heights.sample_size().to_array(),
            bounds_min: heights.aabb().min.to_array(),
            bounds_max: heights.aabb().max.to_array(),
            heights: heights.heights().to_vec(),
            tex_array_size: textures.array_size().to_array(),
            layer_count: textures.layer_count() as u32,
            origin: textures.origin().to_array(),
            world_size: textures.world_size().to_array(),
            weights: textures.weights().to_vec(),
        }
    }

    /// Rebuild the in-memory terrain from this dataset.
    pub fn to_terrain(&self) -> Result<TerrainData> {
        let height_field = HeightField::new(
            self.heights.clone(),
            self.height_resolution as usize,
            Vec2::from_array(self.sample_size),
            Aabb::new(
                Vec3::from_array(self.bounds_min),
                Vec3::from_array(self.bounds_max),
            ),
        )?;
        let texture_field = TextureField::new(
            self.weights.clone(),
            IVec2::from_array(self.tex_array_size),
            self.layer_count as usize,
            Vec2::from_array(self.origin),
            Vec2::from_array(self.world_size),
        )?;
        Ok(TerrainData { height_field, texture_field })
    }

    /// Serialize to compressed bytes (rkyv + LZ4)
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map_err(|e| Error::Dataset(e.to_string()))?;
        Ok(lz4_flex::compress_prepend_size(&bytes))
    }

    /// Deserialize from compressed bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let decompressed = lz4_flex::decompress_size_prepended(data)
            .map_err(|e| Error::Dataset(format!("LZ4 decompression failed: {e}")))?;

        let archived = rkyv::access::<ArchivedTerrainDataset, rkyv::rancor::Error>(&decompressed)
            .map_err(|e| Error::Dataset(e.to_string()))?;

        let dataset: TerrainDataset = rkyv::deserialize::<TerrainDataset, rkyv::rancor::Error>(archived)
            .map_err(|e| Error::Dataset(e.to_string()))?;

        // Version check
        if dataset.version != DATASET_VERSION {
            return Err(Error::Dataset(format!(
                "terrain dataset version mismatch: expected {DATASET_VERSION}, got {}",
                dataset.version
            )));
        }

        Ok(dataset)
    }

    /// Save to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, bytes)?;
        log::info!("terrain dataset saved to {}", path.display());
        Ok(())
    }

    /// Load from file
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Remove a saved dataset, if present.
    pub fn delete(path: &Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}
