//! Deterministic per-chunk placement sampling.
//!
//! A chunk is a fixed-size grid of placement slots. Every slot is computed
//! independently from shared read-only terrain data: jitter the slot's
//! lattice position, sample the surface, run the rejection gates, and
//! build a TRS transform. Rejected slots still occupy their place in the
//! output buffer as a sentinel transform, so the renderer can draw the
//! array densely without a separate count.

use bytemuck::{Pod, Zeroable};

use crate::core::types::{Vec2, Vec3, Quat, Mat4};
use crate::terrain::{TerrainData, OUT_OF_RANGE_HEIGHT};

use super::chunk_index::ChunkKey;
use super::config::InstancerConfig;
use super::rng::PlacementRng;

/// Y translation of the sentinel transform, far below any terrain.
pub const SENTINEL_Y: f32 = -10_000.0;

/// One placed object as a column-major 4x4 world transform, ready for an
/// instanced-draw buffer upload.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PlacedInstance {
    pub transform: [[f32; 4]; 4],
}

impl PlacedInstance {
    pub fn from_trs(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            transform: Mat4::from_scale_rotation_translation(scale, rotation, translation)
                .to_cols_array_2d(),
        }
    }

    /// Placeholder for a rejected slot: far below the world at negligible
    /// scale, invisible to any camera.
    pub fn sentinel() -> Self {
        Self::from_trs(
            Vec3::new(0.0, SENTINEL_Y, 0.0),
            Quat::IDENTITY,
            Vec3::splat(1e-5),
        )
    }

    pub fn is_rejected(&self) -> bool {
        self.transform[3][1] == SENTINEL_Y
    }

    pub fn translation(&self) -> Vec3 {
        Vec3::new(self.transform[3][0], self.transform[3][1], self.transform[3][2])
    }
}

/// Fills chunk buffers by sampling terrain data with deterministic
/// per-slot random streams.
pub struct PlacementSampler<'a> {
    terrain: &'a TerrainData,
    config: &'a InstancerConfig,
}

impl<'a> PlacementSampler<'a> {
    pub fn new(terrain: &'a TerrainData, config: &'a InstancerConfig) -> Self {
        Self { terrain, config }
    }

    /// Produce the dense transform buffer for one chunk.
    ///
    /// Bit-reproducible: the same chunk key and config yield the same
    /// buffer on every call, every frame, every run.
    pub fn fill_chunk(&self, key: ChunkKey) -> Vec<PlacedInstance> {
        (0..self.config.slots_per_chunk())
            .map(|slot| self.place_slot(key, slot))
            .collect()
    }

    fn place_slot(&self, key: ChunkKey, slot: u32) -> PlacedInstance {
        let config = self.config;
        let density = config.plant_density;
        let chunk_size = config.chunk_size as f32;
        let step = chunk_size / density as f32;

        let mut rng = PlacementRng::for_slot(key.x, key.z, config.seed, slot);
        let dx = rng.range(-config.max_displacement, config.max_displacement);
        let dz = rng.range(-config.max_displacement, config.max_displacement);

        // Slot (row, col) on the regular lattice spanning the footprint,
        // anchored at the chunk's min corner
        let row = (slot / density) as f32;
        let col = (slot % density) as f32;
        let x = key.x as f32 - chunk_size / 2.0 + row * step + dx;
        let z = key.z as f32 - chunk_size / 2.0 + col * step + dz;

        let position = Vec2::new(x, z);
        let (height, normal) = self.terrain.height_field.sample_height_normal(position);

        // Texture gate: a weak weight still spawns while the target layer
        // remains locally dominant; a cell owned by another layer never does
        let mut texture_weight = None;
        if let Some(layer) = config.texture_layer {
            let weight = self.terrain.texture_field.weight_at(position, layer as usize);
            if weight < config.falloff
                && self.terrain.texture_field.dominant_layer_at(position) != layer as usize
            {
                return PlacedInstance::sentinel();
            }
            texture_weight = Some(weight);
        }

        // Slope gate
        if normal.y < config.max_slope {
            return PlacedInstance::sentinel();
        }

        // Height gate; the out-of-range sentinel height always fails
        if height <= OUT_OF_RANGE_HEIGHT
            || height < config.min_height
            || height > config.max_height
        {
            return PlacedInstance::sentinel();
        }

        // Stand the object up along the surface normal, with optional
        // random yaw on top
        let mut rotation = Quat::from_rotation_arc(Vec3::Y, normal);
        if config.random_rotation {
            rotation *= Quat::from_rotation_y(rng.range(0.0, std::f32::consts::TAU));
        }

        let mut size = rng.range(1.0 / config.random_size_range, config.random_size_range)
            * config.size_bias;
        if let Some(weight) = texture_weight {
            // Thin out gracefully toward a blend boundary instead of popping
            if weight >= config.falloff {
                size *= weight.max(0.1);
            }
        }

        PlacedInstance::from_trs(
            Vec3::new(x, height + config.y_offset, z),
            rotation,
            Vec3::splat(size),
        )
    }
}
