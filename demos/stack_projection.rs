//! Example: build a multi-channel Z stack, slice it and project it
//!
//! Run with: cargo run --example stack_projection

use framestack::{
    Axis, EngineConfig, FrameStack, MapStrategy, ProjectionAxis, ProjectionMode,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("framestack Example: Stack Projection");
    println!("====================================\n");

    // Two channels by 24 Z planes of 256 x 256 pixels
    let (width, height) = (256, 256);
    let (channels, planes) = (2, 24);
    let frames = (0..channels * planes)
        .map(|f| {
            let (c, z) = (f % channels, f / channels);
            (0..width * height)
                .map(|p| {
                    let (x, y) = ((p % width) as i64 - 128, (p / width) as i64 - 128);
                    let r2 = x * x + y * y;
                    let focus = (z as i64 - 12).abs() * 40;
                    (4000 - (r2 / 8 + focus).min(4000)) as u16 + c as u16 * 100
                })
                .collect()
        })
        .collect();

    let mut stack = FrameStack::from_frames(width, height, frames)?;
    stack.set_xy_scale(0.0, 0.1625 * 255.0, 0.0, 0.1625 * 255.0);
    stack.set_units("um", "um");
    stack.define_dimensions(vec![
        Axis::index_based("Channel", channels),
        Axis::new("Z", planes, 0.0, 0.5 * (planes - 1) as f64, "um"),
    ])?;
    stack.metadata_mut().insert("objective", "40x/0.95");

    println!("Stack: {}", stack.summary());

    // Pick a channel and project it three ways
    let green = stack.snap_to("Channel", 1, false)?;
    println!("Channel 1: {}", green.summary());

    let config = EngineConfig::default();
    for mode in [ProjectionMode::Maximum, ProjectionMode::Minimum, ProjectionMode::Average] {
        let projection = green.project_with(ProjectionAxis::Z, mode, &config)?;
        let (min, max) = projection.min_max_arrays(0)?;
        println!("  {:?} Z projection: range {:.0} - {:.0}", mode, min[0], max[0]);
    }

    // Side view: depth lands on the output Y axis
    let side = green.project_with(ProjectionAxis::Y, ProjectionMode::Maximum, &config)?;
    println!(
        "  XZ view: {} x {} ({} to {} {})",
        side.x_count(),
        side.y_count(),
        side.scale().y_min,
        side.scale().y_max,
        side.y_unit()
    );

    // Normalise to [0, 1] and crop the centre
    let normalised: FrameStack<f32> =
        green.map(|v, _, _, _| v as f32 / u16::MAX as f32, MapStrategy::Auto);
    let centre = normalised.crop_center(64, 64)?;
    println!(
        "\nCentre crop: {} x {} spanning x {:.3} - {:.3} {}",
        centre.x_count(),
        centre.y_count(),
        centre.scale().x_min,
        centre.scale().x_max,
        centre.x_unit()
    );

    // Collapse Z per channel with a median
    let medians = stack.reduce_axis(
        "Z",
        |values: &[u16]| {
            let mut sorted = values.to_vec();
            sorted.sort_unstable();
            sorted[sorted.len() / 2]
        },
        true,
    )?;
    println!("Z medians: {}", medians.summary());

    println!("\n✓ Example completed successfully!");
    Ok(())
}
