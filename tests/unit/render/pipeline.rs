use super::*;
use crate::render::device::SurfaceId;

fn view(frame: Option<Rect>) -> SurfaceView {
    SurfaceView {
        id: SurfaceId(3),
        width_px: 256,
        height_px: 128,
        resolution: 2.0,
        samples: 1,
        filter_frame: frame,
    }
}

#[test]
fn opts_default_from_empty_json() {
    let opts = PipelineOpts::from_json_str("{}").unwrap();
    assert_eq!(opts, PipelineOpts::default());
    assert!(!opts.force_clear);
    assert_eq!(opts.padding, PaddingPolicy::Max);
    assert_eq!(opts.auto_fit, AutoFitPolicy::All);
}

#[test]
fn opts_parse_policies() {
    let opts = PipelineOpts::from_json_str(
        r#"{"force_clear": true, "padding": "sum", "auto_fit": "any", "pool": {"max_surfaces_per_bucket": 2}}"#,
    )
    .unwrap();
    assert!(opts.force_clear);
    assert_eq!(opts.padding, PaddingPolicy::Sum);
    assert_eq!(opts.auto_fit, AutoFitPolicy::Any);
    assert_eq!(opts.pool.max_surfaces_per_bucket, 2);
    assert_eq!(opts.pool.max_pool_bytes, SurfacePoolOpts::default().max_pool_bytes);
}

#[test]
fn opts_errors() {
    assert!(matches!(
        PipelineOpts::from_json_str("{\"padding\": \"median\"}"),
        Err(FxError::Serde(_))
    ));
    assert!(matches!(
        PipelineOpts::from_json_str(r#"{"pool": {"max_pool_bytes": 0}}"#),
        Err(FxError::Validation(_))
    ));
    assert!(PipelineOpts::from_json_str(
        r#"{"pool": {"max_pool_bytes": 0, "max_surfaces_per_bucket": 0}}"#
    )
    .is_ok());
    assert!(matches!(
        PipelineOpts::from_path("/definitely/not/here.json"),
        Err(FxError::Other(_))
    ));
}

#[test]
fn surface_binding_maps_frame_to_top_left_pixels() {
    let frame = Rect::new(-10.0, -5.0, 50.0, 25.0);
    let b = binding_for(&view(Some(frame)));
    assert_eq!(b.target, RenderTarget::Surface(SurfaceId(3)));
    assert_eq!(b.source_frame, frame);
    assert_eq!(b.dest_frame, Rect::new(0.0, 0.0, 120.0, 60.0));
    assert_eq!(b.resolution(), 2.0);
}

#[test]
fn uvs_are_relative_to_the_whole_surface() {
    let frame = Rect::new(-10.0, -5.0, 50.0, 25.0);
    let uv = uv_rect(frame, &view(Some(frame)));
    // Logical surface is 128x64.
    assert_eq!(uv, Rect::new(0.0, 0.0, 60.0 / 128.0, 30.0 / 64.0));

    let uv = uv_rect(Rect::new(0.0, 0.0, 64.0, 32.0), &view(None));
    assert_eq!(uv, Rect::new(0.0, 0.0, 0.5, 0.5));
}

#[test]
fn rect_is_its_own_filter_target() {
    let r = Rect::new(1.0, 2.0, 3.0, 4.0);
    assert_eq!(r.bounds(), r);
    assert_eq!(FilterTarget::filter_area(&r), None);
}
