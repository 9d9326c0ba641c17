use super::*;
use crate::render::device::SurfaceId;

fn view(px: u32, resolution: f64, frame: Rect) -> SurfaceView {
    SurfaceView {
        id: SurfaceId(1),
        width_px: px,
        height_px: px,
        resolution,
        samples: 1,
        filter_frame: Some(frame),
    }
}

fn pass(frame: Rect) -> PassDescriptor {
    PassDescriptor {
        target_bounds: frame,
        input_frame: frame,
        output_frame: frame,
        target_in_frame: frame,
        target_out_frame: frame,
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn sizes_describe_the_whole_surface() {
    let frame = Rect::new(-10.0, -5.0, 110.0, 85.0);
    let g = FilterGlobals::for_pass(&pass(frame), &view(128, 1.0, frame), 1.0, false);
    assert_eq!(g.input_size, [128.0, 128.0, 1.0 / 128.0, 1.0 / 128.0]);
    assert_eq!(g.input_pixel, [128.0, 128.0, 1.0 / 128.0, 1.0 / 128.0]);
    assert_eq!(g.output_frame, frame);
    assert!(g.legacy.is_none());
}

#[test]
fn clamp_stays_half_a_texel_inside_the_frame() {
    let frame = Rect::new(-10.0, -5.0, 110.0, 85.0);
    let g = FilterGlobals::for_pass(&pass(frame), &view(128, 1.0, frame), 1.0, false);
    let half = 0.5 / 128.0;
    assert!(close(g.input_clamp[0], half));
    assert!(close(g.input_clamp[1], half));
    assert!(close(g.input_clamp[2], 120.0 / 128.0 - half));
    assert!(close(g.input_clamp[3], 90.0 / 128.0 - half));
}

#[test]
fn resolution_shrinks_the_half_texel() {
    let frame = Rect::new(0.0, 0.0, 100.0, 100.0);
    let g = FilterGlobals::for_pass(&pass(frame), &view(256, 2.0, frame), 2.0, false);
    assert_eq!(g.input_size[0], 128.0);
    assert_eq!(g.input_pixel[0], 256.0);
    assert!(close(g.input_clamp[0], 0.5 / 256.0));
    assert!(close(g.input_clamp[2], 100.0 / 128.0 - 0.5 / 256.0));
    assert_eq!(g.resolution, 2.0);
}

#[test]
fn legacy_block_carries_absolute_frame() {
    let frame = Rect::new(-5.0, -5.0, 105.0, 85.0);
    let g = FilterGlobals::for_pass(&pass(frame), &view(128, 1.0, frame), 1.0, true);
    let legacy = g.legacy.unwrap();
    assert_eq!(legacy.filter_area, [128.0, 128.0, -5.0, -5.0]);
    assert_eq!(legacy.filter_clamp, g.input_clamp);
}

#[test]
fn sub_texel_frame_collapses_instead_of_inverting() {
    let frame = Rect::new(0.0, 0.0, 0.25, 4.0);
    let g = FilterGlobals::for_pass(&pass(frame), &view(8, 1.0, frame), 1.0, false);
    assert_eq!(g.input_clamp[0], g.input_clamp[2]);
    assert!(g.input_clamp[1] < g.input_clamp[3]);
}
