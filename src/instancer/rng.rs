//! Deterministic random streams for reproducible placement.
//!
//! Seeds derive only from chunk coordinates, the instancer salt, and the
//! slot index — never from frame count or wall clock — so a chunk fills
//! with exactly the same vegetation every frame and every run.

/// Simple deterministic RNG using hash function
#[derive(Clone, Debug)]
pub struct PlacementRng {
    state: u64,
}

impl PlacementRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed.wrapping_add(1) }
    }

    /// Stream for one placement slot of one chunk.
    pub fn for_slot(chunk_x: i32, chunk_z: i32, salt: u32, slot: u32) -> Self {
        let mut h = (chunk_x as u32).wrapping_mul(374761393)
            .wrapping_add((chunk_z as u32).wrapping_mul(668265263))
            .wrapping_add(salt.wrapping_mul(1274126177))
            .wrapping_add(slot.wrapping_mul(2654435761));
        h = (h ^ (h >> 13)).wrapping_mul(1103515245);
        h ^= h >> 16;
        Self::new(((h as u64) << 32) | slot as u64)
    }

    /// Advance state and return next u32
    pub fn next_u32(&mut self) -> u32 {
        // PCG-like state update
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        // Output function
        let mut h = (self.state >> 32) as u32;
        h = h.wrapping_mul(0x45d9f3b);
        h ^= h >> 16;
        h = h.wrapping_mul(0x45d9f3b);
        h ^= h >> 16;
        h
    }

    /// Generate f32 in range [0, 1)
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() as f32) / (u32::MAX as f32)
    }

    /// Generate f32 in range [min, max)
    pub fn range(&mut self, min: f32, max: f32) -> f32 {
        min + self.next_f32() * (max - min)
    }
}
