//! Terrain height sampling through the render triangulation.
//!
//! Heights are stored as a normalized row-major grid; a query walks
//! straight to the containing grid cell, picks the triangle the renderer
//! would rasterize there, and solves the plane equation. No search, and
//! the result matches the displayed mesh exactly, so placed objects sit
//! on the surface instead of floating or sinking.

use crate::core::types::{Vec2, Vec3, Result};
use crate::core::error::Error;
use crate::math::Aabb;

/// Sentinel returned for queries outside the terrain bounds.
pub const OUT_OF_RANGE_HEIGHT: f32 = -10_000.0;

/// Immutable heightmap with world-space bounds.
///
/// `heights` holds `resolution * resolution` normalized elevations in
/// [0, 1], indexed `[x * resolution + z]`; the world height of a vertex is
/// `aabb.min.y + aabb.size().y * h`.
#[derive(Debug)]
pub struct HeightField {
    heights: Vec<f32>,
    resolution: usize,
    sample_size: Vec2,
    aabb: Aabb,
}

impl HeightField {
    pub fn new(heights: Vec<f32>, resolution: usize, sample_size: Vec2, aabb: Aabb) -> Result<Self> {
        if resolution < 2 {
            return Err(Error::Config(format!(
                "heightmap resolution must be at least 2, got {resolution}"
            )));
        }
        if heights.len() != resolution * resolution {
            return Err(Error::Config(format!(
                "heightmap length {} does not match resolution {}x{}",
                heights.len(),
                resolution,
                resolution
            )));
        }
        Ok(Self { heights, resolution, sample_size, aabb })
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn sample_size(&self) -> Vec2 {
        self.sample_size
    }

    pub fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    fn quad_count(&self) -> usize {
        self.resolution - 1
    }

    /// World height of the terrain at an xz position.
    ///
    /// Out-of-bounds queries return [`OUT_OF_RANGE_HEIGHT`] instead of
    /// failing, so callers can treat them as "nothing to place here".
    pub fn sample_height(&self, world_xz: Vec2) -> f32 {
        if !self.aabb.contains_xz(world_xz.x, world_xz.y) {
            return OUT_OF_RANGE_HEIGHT;
        }
        self.triangle_at(world_xz).height_at(world_xz)
    }

    /// World height and unit surface normal at an xz position.
    ///
    /// Same bounds policy as [`sample_height`](Self::sample_height); the
    /// normal is zero for out-of-bounds queries.
    pub fn sample_height_normal(&self, world_xz: Vec2) -> (f32, Vec3) {
        if !self.aabb.contains_xz(world_xz.x, world_xz.y) {
            return (OUT_OF_RANGE_HEIGHT, Vec3::ZERO);
        }
        let tri = self.triangle_at(world_xz);
        (tri.height_at(world_xz), tri.normal)
    }

    /// The triangle of the render mesh containing an in-bounds xz position.
    pub fn triangle_at(&self, world_xz: Vec2) -> Triangle {
        let local = Vec2::new(world_xz.x - self.aabb.min.x, world_xz.y - self.aabb.min.z);
        let sample_pos = local / self.sample_size;

        // Clamp so the terrain's max edge falls in the last cell
        let last = self.quad_count() - 1;
        let cx = (sample_pos.x.floor() as usize).min(last);
        let cz = (sample_pos.y.floor() as usize).min(last);
        let fx = sample_pos.x - cx as f32;
        let fz = sample_pos.y - cz as f32;

        // The unit cell splits along its diagonal; fz > fx lands in the
        // upper-left triangle, anything else in the lower-right.
        let (v1_off, v2_off) = if fz > fx {
            ((0, 1), (1, 1))
        } else {
            ((1, 1), (1, 0))
        };

        Triangle::new(
            self.world_vertex(cx, cz),
            self.world_vertex(cx + v1_off.0, cz + v1_off.1),
            self.world_vertex(cx + v2_off.0, cz + v2_off.1),
        )
    }

    fn world_vertex(&self, gx: usize, gz: usize) -> Vec3 {
        let quads = self.quad_count() as f32;
        let fractions = Vec3::new(
            gx as f32 / quads,
            self.heights[gx * self.resolution + gz],
            gz as f32 / quads,
        );
        self.aabb.min + self.aabb.size() * fractions
    }
}

/// One triangle of the terrain mesh, with its precomputed unit normal.
#[derive(Clone, Copy, Debug)]
pub struct Triangle {
    pub v0: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
    pub normal: Vec3,
}

impl Triangle {
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        let normal = (v1 - v0).cross(v2 - v0).normalize();
        Self { v0, v1, v2, normal }
    }

    /// Height of the triangle's plane at an xz position.
    ///
    /// Solved from the point-normal plane form rather than barycentric
    /// blending, which keeps the result exact across the whole plane.
    pub fn height_at(&self, position: Vec2) -> f32 {
        (-self.normal.x * (position.x - self.v0.x) - self.normal.z * (position.y - self.v0.z))
            / self.normal.y
            + self.v0.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 3x3 grid over a 20x20 world footprint, 50 units of height range.
    fn small_field(heights: [f32; 9]) -> HeightField {
        HeightField::new(
            heights.to_vec(),
            3,
            Vec2::splat(10.0),
            Aabb::new(Vec3::ZERO, Vec3::new(20.0, 50.0, 20.0)),
        )
        .unwrap()
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let result = HeightField::new(vec![0.0; 5], 3, Vec2::ONE, Aabb::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_grid_vertex_exact() {
        // Stored elevations must come back exactly at grid vertices
        let field = small_field([0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8]);
        for gx in 0..3 {
            for gz in 0..3 {
                let expected = field.heights()[gx * 3 + gz] * 50.0;
                let world = Vec2::new(gx as f32 * 10.0, gz as f32 * 10.0);
                let sampled = field.sample_height(world);
                assert!(
                    (sampled - expected).abs() < 1e-4,
                    "vertex ({gx},{gz}): {sampled} != {expected}"
                );
            }
        }
    }

    #[test]
    fn test_out_of_bounds_sentinel() {
        let field = small_field([0.5; 9]);
        assert_eq!(field.sample_height(Vec2::new(-0.1, 5.0)), OUT_OF_RANGE_HEIGHT);
        assert_eq!(field.sample_height(Vec2::new(5.0, 20.1)), OUT_OF_RANGE_HEIGHT);
        assert_eq!(field.sample_height(Vec2::new(1e9, -1e9)), OUT_OF_RANGE_HEIGHT);

        let (h, n) = field.sample_height_normal(Vec2::new(-50.0, -50.0));
        assert_eq!(h, OUT_OF_RANGE_HEIGHT);
        assert_eq!(n, Vec3::ZERO);
    }

    #[test]
    fn test_flat_terrain_normal_up() {
        let field = small_field([0.2; 9]);
        let (h, n) = field.sample_height_normal(Vec2::new(7.3, 12.9));
        assert!((h - 10.0).abs() < 1e-4);
        assert_eq!(n, Vec3::Y);
    }

    #[test]
    fn test_max_edge_is_in_bounds() {
        let field = small_field([0.2; 9]);
        let h = field.sample_height(Vec2::new(20.0, 20.0));
        assert!((h - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_triangle_selection_matches_diagonal() {
        let field = small_field([0.0; 9]);

        // fz > fx: upper-left triangle, whose third vertex is (cx, cz+1)
        let tri = field.triangle_at(Vec2::new(2.0, 8.0));
        assert_eq!(tri.v1, field.world_vertex(0, 1));

        // fx >= fz: lower-right triangle, third vertex (cx+1, cz)
        let tri = field.triangle_at(Vec2::new(8.0, 2.0));
        assert_eq!(tri.v2, field.world_vertex(1, 0));
    }

    #[test]
    fn test_ramp_height_between_vertices() {
        // Heights rise along x: columns at 0.0, 0.2, 0.4 normalized
        let field = small_field([0.0, 0.0, 0.0, 0.2, 0.2, 0.2, 0.4, 0.4, 0.4]);
        // Midway along x between columns 0 and 1, on the cell diagonal,
        // both triangles agree: height = 0.1 * 50 = 5
        let h = field.sample_height(Vec2::new(5.0, 5.0));
        assert!((h - 5.0).abs() < 1e-3);
    }
}
