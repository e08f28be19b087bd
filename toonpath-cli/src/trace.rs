//! Top-down (XZ) sketch of a stage: shape footprints, their outlines, and the
//! positions animated nodes pass through.

use anyhow::{bail, Result};
use glam::{Vec2, Vec3};
use image::{Rgba, RgbaImage};
use toonpath_core::color::Rgb;
use toonpath_core::renderer::FrameRecorder;
use toonpath_core::scene::{NodeId, Scene};
use toonpath_core::scheduler::{FixedStepClock, FrameScheduler, ViewportState};
use toonpath_core::stage::Stage;

pub struct TraceOptions {
    pub size: u32,
    pub seconds: f64,
    pub fps: f64,
}

struct Footprint {
    min: Vec2,
    max: Vec2,
    color: Rgb,
    shell: bool,
}

pub fn render(stage: &mut Stage, opts: &TraceOptions) -> Result<RgbaImage> {
    if opts.size < 16 {
        bail!("trace image must be at least 16px, got {}", opts.size);
    }
    let footprints = footprints(&stage.scene);

    let mut recorder = FrameRecorder::new(opts.size, opts.size);
    for (name, _) in stage.tracked_positions() {
        recorder = recorder.track(name);
    }
    let frames = (opts.seconds * opts.fps).ceil().max(1.0) as u64;
    let mut scheduler = FrameScheduler::new(ViewportState::new(opts.size, opts.size)?);
    scheduler.run(stage, &mut recorder, &mut FixedStepClock::new(opts.fps, frames));
    let trail: Vec<Vec2> = recorder
        .frames()
        .iter()
        .flat_map(|f| f.nodes.iter().map(|n| Vec2::new(n.position[0], n.position[2])))
        .collect();

    let (lo, hi) = extent(&footprints, &trail);
    let span = (hi - lo).max_element().max(1e-3);
    let scale = (opts.size - 1) as f32 / span;
    let to_px = |p: Vec2| ((p - lo) * scale).as_ivec2();

    let mut img = RgbaImage::from_pixel(opts.size, opts.size, rgba(stage.clear_color));
    for fp in footprints.iter().filter(|f| !f.shell) {
        fill(&mut img, to_px(fp.min), to_px(fp.max), rgba(fp.color));
    }
    for fp in footprints.iter().filter(|f| f.shell) {
        frame(&mut img, to_px(fp.min), to_px(fp.max), rgba(fp.color));
    }
    let ink = rgba(stage.clear_color.offset_hsl(0.5, 0.0, 0.5));
    for p in &trail {
        let c = to_px(*p);
        fill(&mut img, c - 1, c + 1, ink);
    }
    log::debug!("trace: {} footprints, {} trail points", footprints.len(), trail.len());
    Ok(img)
}

fn footprints(scene: &Scene) -> Vec<Footprint> {
    scene
        .walk()
        .into_iter()
        .filter_map(|id| footprint(scene, id))
        .collect()
}

fn footprint(scene: &Scene, id: NodeId) -> Option<Footprint> {
    let node = scene.node(id)?;
    let (min, max) = node.geometry()?.bounds();
    let world = scene.world_matrix(id).ok()?;
    let mut lo = Vec2::splat(f32::INFINITY);
    let mut hi = Vec2::splat(f32::NEG_INFINITY);
    for i in 0..8 {
        let corner = Vec3::new(
            if i & 1 == 0 { min.x } else { max.x },
            if i & 2 == 0 { min.y } else { max.y },
            if i & 4 == 0 { min.z } else { max.z },
        );
        let p = world.transform_point3(corner);
        lo = lo.min(Vec2::new(p.x, p.z));
        hi = hi.max(Vec2::new(p.x, p.z));
    }
    let color = node.material()?.color.unwrap_or(Rgb::WHITE);
    Some(Footprint { min: lo, max: hi, color, shell: node.is_derived() })
}

fn extent(footprints: &[Footprint], trail: &[Vec2]) -> (Vec2, Vec2) {
    let mut lo = Vec2::splat(f32::INFINITY);
    let mut hi = Vec2::splat(f32::NEG_INFINITY);
    for fp in footprints {
        lo = lo.min(fp.min);
        hi = hi.max(fp.max);
    }
    for p in trail {
        lo = lo.min(*p);
        hi = hi.max(*p);
    }
    if !lo.is_finite() || !hi.is_finite() {
        return (Vec2::splat(-1.0), Vec2::splat(1.0));
    }
    let pad = (hi - lo).max_element() * 0.05 + 0.1;
    (lo - pad, hi + pad)
}

fn rgba(c: Rgb) -> Rgba<u8> {
    Rgba(c.to_rgba8())
}

fn put(img: &mut RgbaImage, x: i32, y: i32, px: Rgba<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, px);
    }
}

fn fill(img: &mut RgbaImage, a: glam::IVec2, b: glam::IVec2, px: Rgba<u8>) {
    for y in a.y.min(b.y)..=a.y.max(b.y) {
        for x in a.x.min(b.x)..=a.x.max(b.x) {
            put(img, x, y, px);
        }
    }
}

fn frame(img: &mut RgbaImage, a: glam::IVec2, b: glam::IVec2, px: Rgba<u8>) {
    let (x0, x1, y0, y1) = (a.x.min(b.x), a.x.max(b.x), a.y.min(b.y), a.y.max(b.y));
    for x in x0..=x1 {
        put(img, x, y0, px);
        put(img, x, y1, px);
    }
    for y in y0..=y1 {
        put(img, x0, y, px);
        put(img, x1, y, px);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toonpath_core::presets;

    #[test]
    fn courier_trace_marks_the_path() {
        let mut stage = Stage::from_config(&presets::load("courier").unwrap()).unwrap();
        let opts = TraceOptions { size: 128, seconds: 8.0, fps: 10.0 };
        let img = render(&mut stage, &opts).unwrap();
        assert_eq!(img.dimensions(), (128, 128));
        let ink = rgba(stage.clear_color.offset_hsl(0.5, 0.0, 0.5));
        assert!(img.pixels().any(|p| *p == ink));
    }

    #[test]
    fn tiny_images_are_rejected() {
        let mut stage = Stage::from_config(&presets::load("campus").unwrap()).unwrap();
        let opts = TraceOptions { size: 4, seconds: 1.0, fps: 10.0 };
        assert!(render(&mut stage, &opts).is_err());
    }
}
