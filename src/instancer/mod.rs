//! Vegetation instancer: streams procedurally placed objects around a
//! moving camera.
//!
//! Each tick rescans chunk visibility, fills placement buffers for chunks
//! that entered view, and drops buffers for chunks that left. The host
//! render loop drives `tick` and draws the returned batches; several
//! instancers (one per vegetation kind) can share one terrain.

pub mod config;
pub mod rng;
pub mod chunk_index;
pub mod placement;

pub use config::InstancerConfig;
pub use chunk_index::{ChunkDelta, ChunkEntry, ChunkIndex, ChunkKey, ChunkLod};
pub use placement::{PlacedInstance, PlacementSampler, SENTINEL_Y};

use std::collections::HashMap;

use rayon::prelude::*;

use crate::core::camera::Camera;
use crate::core::types::{Quat, Vec3};
use crate::math::Frustum;
use crate::terrain::TerrainData;

/// One resident chunk's dense transform buffer, ready for an
/// instanced-draw call at its detail level.
pub struct ChunkBatch<'a> {
    pub key: ChunkKey,
    pub lod: ChunkLod,
    pub instances: &'a [PlacedInstance],
}

/// Per-session streaming state for one vegetation kind.
pub struct Instancer {
    config: InstancerConfig,
    index: ChunkIndex,
    buffers: HashMap<ChunkKey, Vec<PlacedInstance>>,
    last_pose: Option<(Vec3, Quat)>,
}

impl Instancer {
    /// Create an instancer; the config is clamped into its supported
    /// ranges up front.
    pub fn new(config: InstancerConfig) -> Self {
        Self {
            config: config.clamped(),
            index: ChunkIndex::new(),
            buffers: HashMap::new(),
            last_pose: None,
        }
    }

    pub fn config(&self) -> &InstancerConfig {
        &self.config
    }

    /// Number of currently resident chunks.
    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }

    /// Advance one frame: refresh the visible chunk set for the camera
    /// pose and fill placement buffers for chunks that appeared.
    ///
    /// If the camera has not moved at all since the previous tick the
    /// whole recomputation is skipped and the resident buffers are reused
    /// unchanged.
    pub fn tick(&mut self, terrain: &TerrainData, camera: &Camera) -> ChunkDelta {
        if let Some((position, rotation)) = self.last_pose {
            if position == camera.position && rotation == camera.rotation {
                return ChunkDelta::default();
            }
        }

        let frustum = Frustum::from_view_projection(&camera.view_projection());
        let delta = self.index.update(
            &terrain.height_field,
            &frustum,
            camera.position,
            &self.config,
        );

        for key in &delta.removed {
            self.buffers.remove(key);
        }

        // Chunks in lod_changed keep their buffers: placement is identical
        // at both detail levels, only the drawn mesh differs.
        let sampler = PlacementSampler::new(terrain, &self.config);
        let filled: Vec<(ChunkKey, Vec<PlacedInstance>)> = delta
            .added
            .par_iter()
            .map(|&key| (key, sampler.fill_chunk(key)))
            .collect();
        for (key, buffer) in filled {
            self.buffers.insert(key, buffer);
        }

        self.last_pose = Some((camera.position, camera.rotation));

        log::debug!(
            "instancer tick: {} resident chunks (+{} -{} ~{})",
            self.index.len(),
            delta.added.len(),
            delta.removed.len(),
            delta.lod_changed.len(),
        );

        delta
    }

    /// Resident transform buffer for one chunk, if it is streamed in.
    pub fn instances_for(&self, key: ChunkKey) -> Option<&[PlacedInstance]> {
        self.buffers.get(&key).map(Vec::as_slice)
    }

    /// Renderable batches at one detail level.
    pub fn batches(&self, lod: ChunkLod) -> Vec<ChunkBatch<'_>> {
        self.index
            .keys_with_lod(lod)
            .filter_map(|key| {
                self.buffers.get(&key).map(|buffer| ChunkBatch {
                    key,
                    lod,
                    instances: buffer.as_slice(),
                })
            })
            .collect()
    }
}
