//! Per-frame chunk visibility scan and LOD classification.
//!
//! Rather than walking every chunk of the terrain, the scan enumerates
//! only the chunk-grid window around the camera, frustum-tests each cell
//! with a conservative bounding box, and classifies survivors as near
//! (full detail) or far (LOD) by squared distance. The active set is the
//! only state carried across frames; `update` reports the delta against it
//! so callers can fill and evict placement buffers incrementally.

use std::collections::HashMap;

use crate::core::types::{Vec2, Vec3};
use crate::math::Frustum;
use crate::terrain::HeightField;

use super::config::InstancerConfig;

/// Integer-snapped world center of a chunk's footprint. Identity is xz
/// only; ground height is derived data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkKey {
    pub x: i32,
    pub z: i32,
}

impl ChunkKey {
    pub fn center_xz(&self) -> Vec2 {
        Vec2::new(self.x as f32, self.z as f32)
    }
}

/// Detail level of a visible chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkLod {
    /// Full-detail chunk near the camera
    Near,
    /// Reduced-detail chunk between the LOD and view distances
    Far,
}

/// Cached per-chunk data for the current frame's active set.
#[derive(Clone, Copy, Debug)]
pub struct ChunkEntry {
    pub lod: ChunkLod,
    /// Lowest corner height minus the displacement margin
    pub ground_height: f32,
    /// Conservative vertical extent of the chunk's bounding box
    pub height_diff: f32,
}

/// Chunks that appeared, disappeared, or switched detail level this frame.
#[derive(Clone, Debug, Default)]
pub struct ChunkDelta {
    pub added: Vec<ChunkKey>,
    pub removed: Vec<ChunkKey>,
    pub lod_changed: Vec<ChunkKey>,
}

impl ChunkDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.lod_changed.is_empty()
    }
}

/// The set of chunks currently within view and display range.
#[derive(Default)]
pub struct ChunkIndex {
    active: HashMap<ChunkKey, ChunkEntry>,
}

impl ChunkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> &HashMap<ChunkKey, ChunkEntry> {
        &self.active
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Keys of active chunks at one detail level.
    pub fn keys_with_lod(&self, lod: ChunkLod) -> impl Iterator<Item = ChunkKey> + '_ {
        self.active
            .iter()
            .filter(move |(_, entry)| entry.lod == lod)
            .map(|(key, _)| *key)
    }

    /// Rescan visibility for the new camera state and diff against the
    /// previous frame's active set.
    pub fn update(
        &mut self,
        heights: &HeightField,
        frustum: &Frustum,
        camera_pos: Vec3,
        config: &InstancerConfig,
    ) -> ChunkDelta {
        let fresh = Self::scan(heights, frustum, camera_pos, config);

        let mut delta = ChunkDelta::default();
        for (key, entry) in &fresh {
            match self.active.get(key) {
                None => delta.added.push(*key),
                Some(prev) if prev.lod != entry.lod => delta.lod_changed.push(*key),
                Some(_) => {}
            }
        }
        for key in self.active.keys() {
            if !fresh.contains_key(key) {
                delta.removed.push(*key);
            }
        }

        self.active = fresh;
        delta
    }

    /// Enumerate the chunk-grid window around the camera and keep every
    /// cell that passes the distance and frustum tests.
    fn scan(
        heights: &HeightField,
        frustum: &Frustum,
        camera_pos: Vec3,
        config: &InstancerConfig,
    ) -> HashMap<ChunkKey, ChunkEntry> {
        let chunk = config.chunk_size;
        let view = config.view_distance;
        let aabb = heights.aabb();

        let terrain_x = aabb.min.x as i32;
        let terrain_z = aabb.min.z as i32;
        let size_1d = (aabb.max.x - aabb.min.x) as i32;

        let cam_x = camera_pos.x as i32;
        let cam_y = camera_pos.y as i32;
        let cam_z = camera_pos.z as i32;

        // Scan window: view radius around the camera, start snapped to the
        // chunk grid, clipped to the terrain footprint
        let mut start_x = cam_x - view - (cam_x - view) % chunk;
        if start_x < terrain_x {
            start_x = terrain_x;
        }
        let mut start_z = cam_z - view - (cam_z - view) % chunk;
        if start_z < terrain_z {
            start_z = terrain_z;
        }
        let mut end_x = cam_x + view + chunk;
        if end_x >= terrain_x + size_1d {
            end_x = terrain_x + size_1d;
        }
        let mut end_z = cam_z + view + chunk;
        if end_z >= terrain_z + size_1d {
            end_z = terrain_z + size_1d;
        }

        let view_sq = (view * view) as f32;
        let lod_sq = (config.lod_view_distance * config.lod_view_distance) as f32;

        let mut active = HashMap::new();
        let mut i = start_x;
        while i <= end_x {
            let mut j = start_z;
            while j <= end_z {
                // Conservative vertical extent from the four corner heights;
                // displacement can push objects past the footprint edge
                let h1 = heights.sample_height(Vec2::new((i + chunk) as f32, (j + chunk) as f32));
                let h2 = heights.sample_height(Vec2::new((i + chunk) as f32, j as f32));
                let h3 = heights.sample_height(Vec2::new(i as f32, (j + chunk) as f32));
                let h4 = heights.sample_height(Vec2::new(i as f32, j as f32));
                let min_height = (h1.min(h2).min(h3).min(h4) - config.max_displacement) as i32;
                let max_height = (h1.max(h2).max(h3).max(h4) + 1.0 + config.max_displacement) as i32;
                let height_diff = (max_height - min_height) as f32;

                let key = ChunkKey { x: i + chunk / 2, z: j + chunk / 2 };
                let center = Vec3::new(key.x as f32, min_height as f32, key.z as f32);

                let dx = (cam_x - key.x) as f32;
                let dy = (cam_y - min_height) as f32;
                let dz = (cam_z - key.z) as f32;
                let distance_sq = dx * dx + dy * dy + dz * dz;

                let lod = if distance_sq <= lod_sq {
                    Some(ChunkLod::Near)
                } else if distance_sq <= view_sq {
                    Some(ChunkLod::Far)
                } else {
                    None
                };

                if let Some(lod) = lod {
                    if Self::chunk_visible(frustum, center, height_diff, config) {
                        active.insert(
                            key,
                            ChunkEntry { lod, ground_height: min_height as f32, height_diff },
                        );
                    }
                }

                j += chunk;
            }
            i += chunk;
        }

        active
    }

    /// Plane/AABB signed-distance test against all 6 frustum planes.
    fn chunk_visible(
        frustum: &Frustum,
        center: Vec3,
        height_diff: f32,
        config: &InstancerConfig,
    ) -> bool {
        let y_extent = (height_diff + config.plant_height) / 2.0;
        let half = config.chunk_size as f32 / 2.0 + config.max_displacement;
        let probe = Vec3::new(center.x, center.y + y_extent, center.z);

        frustum.planes.iter().all(|plane| {
            // Projection interval radius of the box onto the plane normal
            let r = half * plane.normal.x.abs()
                + y_extent * plane.normal.y.abs()
                + half * plane.normal.z.abs();
            -r <= plane.distance_to_point(probe)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::camera::Camera;
    use crate::core::types::Mat4;
    use crate::terrain::test_support::flat_terrain;

    /// Frustum that accepts everything within +-10km, isolating the
    /// distance classification from the visibility test.
    fn open_frustum() -> Frustum {
        let proj = Mat4::orthographic_rh(-1e4, 1e4, -1e4, 1e4, -1e4, 1e4);
        Frustum::from_view_projection(&proj)
    }

    fn test_config() -> InstancerConfig {
        InstancerConfig {
            chunk_size: 20,
            view_distance: 50,
            lod_view_distance: 30,
            max_displacement: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_chunk_dead_ahead_is_included() {
        let terrain = flat_terrain(640.0);
        let config = test_config();
        let mut index = ChunkIndex::new();

        // Perspective camera just above the terrain looking down -Z at a
        // chunk center well within view distance
        let camera = Camera::look_at(
            Vec3::new(330.0, 5.0, 350.0),
            Vec3::new(330.0, 0.0, 320.0),
            Vec3::Y,
        );
        let frustum = Frustum::from_view_projection(&camera.view_projection());
        index.update(&terrain.height_field, &frustum, camera.position, &config);

        assert!(
            index.active().contains_key(&ChunkKey { x: 330, z: 330 }),
            "chunk straight ahead must be visible, got {:?}",
            index.active().keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_chunk_behind_camera_is_culled() {
        let terrain = flat_terrain(640.0);
        let config = test_config();
        let mut index = ChunkIndex::new();

        let camera = Camera::look_at(
            Vec3::new(330.0, 5.0, 350.0),
            Vec3::new(330.0, 0.0, 320.0),
            Vec3::Y,
        );
        let frustum = Frustum::from_view_projection(&camera.view_projection());
        index.update(&terrain.height_field, &frustum, camera.position, &config);

        // Chunks behind the camera (larger z) are in range but not in view
        assert!(!index.active().contains_key(&ChunkKey { x: 330, z: 390 }));
    }

    #[test]
    fn test_lod_boundary_is_near() {
        let terrain = flat_terrain(640.0);
        let config = test_config();
        let mut index = ChunkIndex::new();

        // Directly above a chunk center at exactly the LOD distance:
        // squared distance == lod^2 classifies as Near
        let cam = Vec3::new(330.0, 30.0, 330.0);
        index.update(&terrain.height_field, &open_frustum(), cam, &config);
        let entry = index.active()[&ChunkKey { x: 330, z: 330 }];
        assert_eq!(entry.lod, ChunkLod::Near);
    }

    #[test]
    fn test_past_lod_boundary_is_far() {
        let terrain = flat_terrain(640.0);
        let config = test_config();
        let mut index = ChunkIndex::new();

        let cam = Vec3::new(330.0, 31.0, 330.0);
        index.update(&terrain.height_field, &open_frustum(), cam, &config);
        let entry = index.active()[&ChunkKey { x: 330, z: 330 }];
        assert_eq!(entry.lod, ChunkLod::Far);
    }

    #[test]
    fn test_past_view_distance_is_absent() {
        let terrain = flat_terrain(640.0);
        let config = test_config();
        let mut index = ChunkIndex::new();

        let cam = Vec3::new(330.0, 51.0, 330.0);
        index.update(&terrain.height_field, &open_frustum(), cam, &config);
        assert!(!index.active().contains_key(&ChunkKey { x: 330, z: 330 }));
    }

    #[test]
    fn test_delta_added_then_removed() {
        let terrain = flat_terrain(640.0);
        let config = test_config();
        let mut index = ChunkIndex::new();

        let delta = index.update(
            &terrain.height_field,
            &open_frustum(),
            Vec3::new(330.0, 5.0, 330.0),
            &config,
        );
        assert!(!delta.added.is_empty());
        assert!(delta.removed.is_empty());
        let first_count = index.len();

        // Same camera again: rescan finds the identical set
        let delta = index.update(
            &terrain.height_field,
            &open_frustum(),
            Vec3::new(330.0, 5.0, 330.0),
            &config,
        );
        assert!(delta.is_empty());
        assert_eq!(index.len(), first_count);

        // Teleport far away: everything near the old position evicts
        let delta = index.update(
            &terrain.height_field,
            &open_frustum(),
            Vec3::new(100.0, 5.0, 100.0),
            &config,
        );
        assert_eq!(delta.removed.len(), first_count);
        assert!(!delta.added.is_empty());
    }

    #[test]
    fn test_lod_transition_reported_in_place() {
        let terrain = flat_terrain(640.0);
        let config = test_config();
        let mut index = ChunkIndex::new();
        let key = ChunkKey { x: 330, z: 330 };

        index.update(&terrain.height_field, &open_frustum(), Vec3::new(330.0, 29.0, 330.0), &config);
        assert_eq!(index.active()[&key].lod, ChunkLod::Near);

        let delta = index.update(
            &terrain.height_field,
            &open_frustum(),
            Vec3::new(330.0, 35.0, 330.0),
            &config,
        );
        assert!(delta.lod_changed.contains(&key));
        assert!(!delta.removed.contains(&key));
        assert_eq!(index.active()[&key].lod, ChunkLod::Far);
    }

    #[test]
    fn test_scan_stays_on_terrain() {
        let terrain = flat_terrain(640.0);
        let config = test_config();
        let mut index = ChunkIndex::new();

        // Camera near the terrain origin corner: no key may lie outside
        index.update(&terrain.height_field, &open_frustum(), Vec3::new(2.0, 5.0, 2.0), &config);
        for key in index.active().keys() {
            assert!(key.x >= 0 && key.z >= 0, "chunk {key:?} outside terrain");
        }
        assert!(!index.is_empty());
    }

    #[test]
    fn test_keys_with_lod_partition() {
        let terrain = flat_terrain(640.0);
        let config = test_config();
        let mut index = ChunkIndex::new();

        index.update(&terrain.height_field, &open_frustum(), Vec3::new(330.0, 5.0, 330.0), &config);
        let near = index.keys_with_lod(ChunkLod::Near).count();
        let far = index.keys_with_lod(ChunkLod::Far).count();
        assert_eq!(near + far, index.len());
        assert!(near > 0);
        assert!(far > 0);
    }
}
