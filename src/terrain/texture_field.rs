//! Terrain texture blend-weight lookup.
//!
//! Nearest-sample reads of the splat/alpha map, used to decide whether a
//! placement slot sits on the right ground texture. Weights across layers
//! are not required to sum to one; consumers read single layers directly.

use crate::core::types::{Vec2, IVec2, Result};
use crate::core::error::Error;

/// Immutable per-layer blend weights over the terrain footprint.
///
/// Layout is layer-major, row-major per layer:
/// `weights[layer * w * h + z * w + x]`, weights in [0, 1].
#[derive(Debug)]
pub struct TextureField {
    weights: Vec<f32>,
    array_size: IVec2,
    layer_count: usize,
    origin: Vec2,
    world_size: Vec2,
}

impl TextureField {
    pub fn new(
        weights: Vec<f32>,
        array_size: IVec2,
        layer_count: usize,
        origin: Vec2,
        world_size: Vec2,
    ) -> Result<Self> {
        if array_size.x < 1 || array_size.y < 1 || layer_count < 1 {
            return Err(Error::Config(format!(
                "texture map must have positive dimensions, got {array_size} x {layer_count} layers"
            )));
        }
        let expected = (array_size.x * array_size.y) as usize * layer_count;
        if weights.len() != expected {
            return Err(Error::Config(format!(
                "texture map length {} does not match {}x{}x{} layers",
                weights.len(),
                array_size.x,
                array_size.y,
                layer_count
            )));
        }
        Ok(Self { weights, array_size, layer_count, origin, world_size })
    }

    pub fn layer_count(&self) -> usize {
        self.layer_count
    }

    pub fn array_size(&self) -> IVec2 {
        self.array_size
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn world_size(&self) -> Vec2 {
        self.world_size
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Nearest texture-map cell for a world xz position, clamped to the
    /// array on both ends. Terrains cannot be rotated, so a linear rescale
    /// is all it takes.
    fn cell_at(&self, world_xz: Vec2) -> (usize, usize) {
        let relative = world_xz - self.origin;
        let x = (relative.x / self.world_size.x * self.array_size.x as f32).round() as i32;
        let z = (relative.y / self.world_size.y * self.array_size.y as f32).round() as i32;
        (
            x.clamp(0, self.array_size.x - 1) as usize,
            z.clamp(0, self.array_size.y - 1) as usize,
        )
    }

    /// Blend weight of one layer at a world xz position.
    ///
    /// Returns 0 for a layer index outside `[0, layer_count)`.
    pub fn weight_at(&self, world_xz: Vec2, layer: usize) -> f32 {
        if layer >= self.layer_count {
            return 0.0;
        }
        let (x, z) = self.cell_at(world_xz);
        let plane = (self.array_size.x * self.array_size.y) as usize;
        self.weights[layer * plane + z * self.array_size.x as usize + x]
    }

    /// Index of the most dominant layer at a world xz position
    /// (first layer wins ties).
    pub fn dominant_layer_at(&self, world_xz: Vec2) -> usize {
        let (x, z) = self.cell_at(world_xz);
        let plane = (self.array_size.x * self.array_size.y) as usize;
        let cell = z * self.array_size.x as usize + x;

        let mut dominant = 0;
        let mut greatest = f32::MIN;
        for layer in 0..self.layer_count {
            let weight = self.weights[layer * plane + cell];
            if weight > greatest {
                greatest = weight;
                dominant = layer;
            }
        }
        dominant
    }
}
