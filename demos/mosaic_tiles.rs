//! Example: lay out a tiled mosaic and check its overlaps
//!
//! Run with: cargo run --example mosaic_tiles

use framestack::{Axis, FovAxis, FovOrigin, FrameStack, Scale, TileLayout};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("framestack Example: Mosaic Tiles");
    println!("================================\n");

    let layout = TileLayout::new(5, 4, 1)?;
    let tile_pixels = (2048, 2048);
    let overlap = 102;

    // Grow a mosaic around the centre tile of a calibrated acquisition
    let pitch = 0.1083;
    let base = Scale::new(-110.0, -110.0 + 2047.0 * pitch, 35.0, 35.0 + 2047.0 * pitch);
    let mut fov = FovAxis::extended_from_one_tile(layout, &base, tile_pixels, overlap, 7)?;
    println!("Extended from tile 7:");
    for (i, origin) in fov.origins().iter().enumerate().take(6) {
        println!("  tile {:2}: ({:10.4}, {:10.4})", i, origin.x, origin.y);
    }

    let report = fov.validate_pixel_overlap((pitch, pitch), tile_pixels, 0.001)?;
    println!(
        "  {} neighbour pairs, max deviation {:.6} px, aligned: {}",
        report.pairs.len(),
        report.max_deviation(),
        report.is_aligned()
    );

    // Nudge one tile by a third of a pixel and validate again
    let moved = fov.origin(12)?;
    let previous = fov.set_origin(12, FovOrigin::new(moved.x + pitch / 3.0, moved.y, moved.z))?;
    println!("\nMoved tile 12 from x = {:.4}", previous.x);
    let report = fov.validate_pixel_overlap((pitch, pitch), tile_pixels, 0.001)?;
    for pair in report.misaligned() {
        println!(
            "  misaligned {:?} pair {} -> {}: overlap {:.4} px",
            pair.direction, pair.from, pair.to, pair.implied_overlap
        );
    }

    // Subdivide a known stage area instead
    let area = Scale::new(0.0, 1000.0, 0.0, 800.0).with_units("um", "um");
    let (grid, geometry) = FovAxis::subdivided_from_total_area(layout, &area, tile_pixels, overlap)?;
    println!(
        "\nSubdivided 1000 x 800 um: pitch {:.6} x {:.6} um, stride {:.4} x {:.4} um",
        geometry.pixel_pitch_x, geometry.pixel_pitch_y, geometry.stride_x, geometry.stride_y
    );
    let last = grid.origin(grid.tile_count() - 1)?;
    let last_scale = geometry.tile_scale(last, tile_pixels);
    println!(
        "  last tile spans ({:.4}, {:.4}) - ({:.4}, {:.4})",
        last_scale.x_min, last_scale.y_min, last_scale.x_max, last_scale.y_max
    );

    // Attach the mosaic to a stack of tile thumbnails
    let frames = vec![vec![0u8; 32 * 32]; layout.tile_count()];
    let mut stack = FrameStack::from_frames(32, 32, frames)?;
    stack.define_dimensions(vec![Axis::fov("FOV", grid)])?;
    println!("\nThumbnails: {}", stack.summary());

    println!("\n✓ Example completed successfully!");
    Ok(())
}
