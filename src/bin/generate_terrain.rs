//! Terrain dataset generator binary — synthesizes a square grid of
//! terrain tiles with fractal noise, merges them, and writes the dataset
//! the streaming session loads at startup.
//!
//! Usage: cargo run --release --bin generate_terrain -- [OPTIONS]
//!
//! Options:
//!   --tiles <N>       Tiles per side, N x N total (default: 2)
//!   --resolution <R>  Heightmap resolution per tile (default: 129)
//!   --size <METERS>   Tile world size in meters (default: 128)
//!   --height <H>      Elevation range in meters (default: 60)
//!   --layers <L>      Texture layer count (default: 2)
//!   --seed <SEED>     Noise seed (default: 12345)
//!   --out <PATH>      Output file (default: assets/terrain.veg)

use std::path::PathBuf;
use std::time::Instant;

use glam::{IVec2, Vec3};
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use verdant::terrain::{merge_tiles, TerrainDataset, TerrainTile};

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    let args: Vec<String> = std::env::args().collect();
    let tiles_per_side = parse_usize_arg(&args, "--tiles").unwrap_or(2);
    let resolution = parse_usize_arg(&args, "--resolution").unwrap_or(129);
    let tile_size = parse_f32_arg(&args, "--size").unwrap_or(128.0);
    let height_range = parse_f32_arg(&args, "--height").unwrap_or(60.0);
    let layer_count = parse_usize_arg(&args, "--layers").unwrap_or(2);
    let seed = parse_u32_arg(&args, "--seed").unwrap_or(12345);
    let out = parse_str_arg(&args, "--out").unwrap_or_else(|| "assets/terrain.veg".to_string());
    let out = PathBuf::from(out);

    println!("=== Verdant Terrain Generator ===");
    println!("Tiles:      {0} x {0} of {1}m", tiles_per_side, tile_size);
    println!("Resolution: {0} x {0} per tile", resolution);
    println!("Height:     {}m, {} texture layers", height_range, layer_count);
    println!("Seed:       {}", seed);
    println!("Output:     {}", out.display());
    println!();

    let start = Instant::now();

    let elevation = Fbm::<Perlin>::new(seed)
        .set_octaves(5)
        .set_persistence(0.5)
        .set_lacunarity(2.0);
    let splat = Fbm::<Perlin>::new(seed.wrapping_add(1)).set_octaves(3);

    let mut tiles = Vec::with_capacity(tiles_per_side * tiles_per_side);
    for tile_x in 0..tiles_per_side {
        for tile_z in 0..tiles_per_side {
            tiles.push(build_tile(
                &elevation,
                &splat,
                tile_x,
                tile_z,
                resolution,
                tile_size,
                height_range,
                layer_count,
            ));
        }
    }

    let merged = merge_tiles(&tiles).expect("tile set failed validation");
    let dataset = TerrainDataset::from_terrain(&merged);
    dataset.save(&out).expect("failed to write terrain dataset");

    println!(
        "Merged {} tiles into a {res}x{res} heightmap in {:.2}s",
        tiles.len(),
        start.elapsed().as_secs_f64(),
        res = merged.height_field.resolution(),
    );
}

/// Sample one tile's heightmap and blend weights from the noise fields.
#[allow(clippy::too_many_arguments)]
fn build_tile(
    elevation: &Fbm<Perlin>,
    splat: &Fbm<Perlin>,
    tile_x: usize,
    tile_z: usize,
    resolution: usize,
    tile_size: f32,
    height_range: f32,
    layer_count: usize,
) -> TerrainTile {
    let origin_x = tile_x as f64 * tile_size as f64;
    let origin_z = tile_z as f64 * tile_size as f64;
    let quads = (resolution - 1) as f64;
    let noise_scale = 1.0 / 300.0;

    let mut heights = vec![0.0f32; resolution * resolution];
    for x in 0..resolution {
        for z in 0..resolution {
            // Sample in world space so neighbouring tiles line up seamlessly
            let wx = (origin_x + x as f64 / quads * tile_size as f64) * noise_scale;
            let wz = (origin_z + z as f64 / quads * tile_size as f64) * noise_scale;
            let h = elevation.get([wx, wz]) * 0.5 + 0.5;
            heights[x * resolution + z] = h.clamp(0.0, 1.0) as f32;
        }
    }

    // Alphamaps conventionally run one sample short of the heightmap
    let alpha = resolution - 1;
    let mut weights = vec![0.0f32; alpha * alpha * layer_count];
    for x in 0..alpha {
        for z in 0..alpha {
            let wx = (origin_x + x as f64 / alpha as f64 * tile_size as f64) * noise_scale * 2.0;
            let wz = (origin_z + z as f64 / alpha as f64 * tile_size as f64) * noise_scale * 2.0;
            let t = (splat.get([wx, wz]) * 0.5 + 0.5).clamp(0.0, 1.0) as f32;

            // Distribute weight between the first two layers; any further
            // layers stay empty for hand-authoring later
            weights[z * alpha + x] = t;
            if layer_count > 1 {
                weights[alpha * alpha + z * alpha + x] = 1.0 - t;
            }
        }
    }

    TerrainTile {
        position: Vec3::new(origin_x as f32, 0.0, origin_z as f32),
        size: Vec3::new(tile_size, height_range, tile_size),
        heightmap_resolution: resolution,
        heights,
        alphamap_size: IVec2::splat(alpha as i32),
        layer_count,
        weights,
    }
}

fn parse_f32_arg(args: &[String], flag: &str) -> Option<f32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_usize_arg(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.clone())
}
