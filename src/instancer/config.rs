//! Instancer configuration (user-facing procedural parameters).

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::types::Result;
use crate::core::error::Error;

/// Procedural placement and streaming parameters for one vegetation kind.
///
/// Several instancers can share one terrain; give each a different `seed`
/// so their patterns do not line up.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InstancerConfig {
    /// X and Z size of the chunks
    pub chunk_size: i32,
    /// Maximum display range
    pub view_distance: i32,
    /// Distance at which LOD chunks start
    pub lod_view_distance: i32,
    /// Plants per chunk side; a chunk holds `plant_density^2` slots
    pub plant_density: u32,
    /// Random per-slot displacement radius
    pub max_displacement: f32,
    /// Random size spread: scale is drawn in [1/range, range]
    pub random_size_range: f32,
    /// Constant multiplier on the medium object size
    pub size_bias: f32,
    /// Minimum surface normal y to accept a slot (1 = flat only)
    pub max_slope: f32,
    /// Texture weight below which spawning on a non-dominant layer stops
    pub falloff: f32,
    /// Blend layer to spawn on; None spawns everywhere
    pub texture_layer: Option<u32>,
    /// Compose a random yaw into each object's orientation
    pub random_rotation: bool,
    /// Minimum elevation where this object can live
    pub min_height: f32,
    /// Maximum elevation where this object can live
    pub max_height: f32,
    /// Raise objects whose pivot is not at their base
    pub y_offset: f32,
    /// Assumed maximum plant height, inflates chunk culling bounds
    pub plant_height: f32,
    /// Per-instancer random-stream salt
    pub seed: u32,
}

impl Default for InstancerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 20,
            view_distance: 50,
            lod_view_distance: 30,
            plant_density: 5,
            max_displacement: 0.5,
            random_size_range: 1.5,
            size_bias: 1.0,
            max_slope: 0.5,
            falloff: 1.0,
            texture_layer: None,
            random_rotation: true,
            min_height: -10_000.0,
            max_height: 10_000.0,
            y_offset: 0.0,
            plant_height: 10.0,
            seed: 1,
        }
    }
}

impl InstancerConfig {
    /// Number of placement slots per chunk.
    pub fn slots_per_chunk(&self) -> u32 {
        self.plant_density * self.plant_density
    }

    /// Return a copy with every parameter forced into its supported range,
    /// logging whatever had to change.
    pub fn clamped(&self) -> Self {
        let mut cfg = self.clone();

        cfg.chunk_size = cfg.chunk_size.max(2);
        cfg.view_distance = cfg.view_distance.clamp(1, 1000);
        cfg.lod_view_distance = cfg.lod_view_distance.clamp(1, (cfg.view_distance - 1).max(1));
        cfg.plant_density = cfg.plant_density.clamp(1, 300);
        cfg.max_displacement = cfg.max_displacement.clamp(0.0, 50.0);
        cfg.random_size_range = cfg.random_size_range.max(1.0);
        cfg.size_bias = cfg.size_bias.clamp(0.01, 5.0);
        cfg.max_slope = cfg.max_slope.clamp(0.0, 1.0);
        cfg.falloff = cfg.falloff.clamp(0.0, 1.0);
        cfg.y_offset = cfg.y_offset.clamp(0.0, 5.0);
        cfg.plant_height = cfg.plant_height.max(0.0);
        if cfg.min_height > cfg.max_height {
            std::mem::swap(&mut cfg.min_height, &mut cfg.max_height);
        }

        if cfg.chunk_size != self.chunk_size
            || cfg.view_distance != self.view_distance
            || cfg.lod_view_distance != self.lod_view_distance
            || cfg.plant_density != self.plant_density
        {
            log::warn!(
                "instancer config clamped: chunk_size {} view_distance {} lod_view_distance {} plant_density {}",
                cfg.chunk_size, cfg.view_distance, cfg.lod_view_distance, cfg.plant_density
            );
        }

        cfg
    }

    /// Load a config from pretty-printed JSON.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Save this config as pretty-printed JSON.
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
