use super::*;
use crate::effects::filter::{DrawState, FilterShader};
use crate::render::device::FilterQuad;
use crate::render::globals::FilterGlobals;

struct CopyShader;

impl FilterShader for CopyShader {
    fn label(&self) -> &str {
        "copy"
    }

    fn fragment(&self, input: &TexelSampler<'_>, uv: Point, _globals: &FilterGlobals) -> [f32; 4] {
        input.sample(uv)
    }
}

fn small_device() -> CpuDevice {
    CpuDevice::new(CpuDeviceOpts {
        screen_width: 8,
        screen_height: 8,
        ..CpuDeviceOpts::default()
    })
    .unwrap()
}

fn surface_binding(id: SurfaceId, w: f64, h: f64) -> Binding {
    Binding {
        target: RenderTarget::Surface(id),
        source_frame: Rect::new(0.0, 0.0, w, h),
        dest_frame: Rect::new(0.0, 0.0, w, h),
    }
}

fn red() -> Rgba8Premul {
    Rgba8Premul::from_straight_rgba(255, 0, 0, 255)
}

#[test]
fn starts_bound_to_the_screen() {
    let dev = small_device();
    let b = dev.binding();
    assert_eq!(b.target, RenderTarget::Screen);
    assert_eq!(b.source_frame, Rect::new(0.0, 0.0, 8.0, 8.0));
    assert_eq!(dev.screen_size(), (8, 8));
}

#[test]
fn create_and_destroy_track_counters() {
    let mut dev = small_device();
    let a = dev.create_surface(16, 16, 1).unwrap();
    let b = dev.create_surface(4, 4, 4).unwrap();
    assert_ne!(a, b);
    assert!(dev.is_live(a));
    dev.destroy_surface(a);
    let stats = dev.stats();
    assert_eq!((stats.created, stats.destroyed, stats.live), (2, 1, 1));
    assert_eq!(stats.live_bytes, 4 * 4 * 4);
    assert!(!dev.is_live(a));
}

#[test]
fn oversized_and_over_budget_surfaces_fail() {
    let mut dev = CpuDevice::new(CpuDeviceOpts {
        screen_width: 8,
        screen_height: 8,
        max_surface_bytes: 64 * 64 * 4,
        ..CpuDeviceOpts::default()
    })
    .unwrap();
    assert!(matches!(
        dev.create_surface(70_000, 1, 1),
        Err(FxError::Resource(_))
    ));
    dev.create_surface(64, 64, 1).unwrap();
    assert!(matches!(dev.create_surface(1, 1, 1), Err(FxError::Resource(_))));
}

#[test]
fn invalid_resolution_is_rejected() {
    let err = CpuDevice::new(CpuDeviceOpts {
        resolution: 0.0,
        ..CpuDeviceOpts::default()
    });
    assert!(matches!(err, Err(FxError::Validation(_))));
}

#[test]
fn fill_and_clear_the_bound_surface() {
    let mut dev = small_device();
    let id = dev.create_surface(4, 4, 1).unwrap();
    dev.bind(surface_binding(id, 4.0, 4.0));
    dev.fill_rect(Rect::new(0.0, 0.0, 2.0, 2.0), red()).unwrap();

    let frame = dev.read_pixels(RenderTarget::Surface(id)).unwrap();
    assert_eq!(frame.pixel(0, 0), Some([255, 0, 0, 255]));
    assert_eq!(frame.pixel(3, 3), Some([0, 0, 0, 0]));

    dev.clear([0.0; 4]);
    let frame = dev.read_pixels(RenderTarget::Surface(id)).unwrap();
    assert!(frame.data.iter().all(|&b| b == 0));
    assert_eq!(dev.stats().clears, 1);
}

#[test]
fn filter_quad_copies_through_the_projection() {
    let mut dev = small_device();
    let id = dev.create_surface(4, 4, 1).unwrap();
    dev.bind(surface_binding(id, 4.0, 4.0));
    dev.fill_rect(Rect::new(0.0, 0.0, 2.0, 2.0), red()).unwrap();

    // Logical (4,4)-(8,8) of the screen shows the whole surface.
    dev.bind(dev.root_binding());
    let globals = FilterGlobals::default();
    dev.draw_filter(&FilterDraw {
        shader: &CopyShader,
        state: DrawState::default(),
        source: id,
        quad: FilterQuad {
            positions: Rect::new(4.0, 4.0, 8.0, 8.0),
            uvs: Rect::new(0.0, 0.0, 1.0, 1.0),
        },
        globals: &globals,
        program: ProgramKey(7),
    })
    .unwrap();

    let screen = dev.read_pixels(RenderTarget::Screen).unwrap();
    assert_eq!(screen.pixel(4, 4), Some([255, 0, 0, 255]));
    assert_eq!(screen.pixel(5, 5), Some([255, 0, 0, 255]));
    assert_eq!(screen.pixel(6, 6), Some([0, 0, 0, 0]));
    assert_eq!(screen.pixel(0, 0), Some([0, 0, 0, 0]));
    let stats = dev.stats();
    assert_eq!((stats.draws, stats.programs), (1, 1));
}

#[test]
fn sampling_the_bound_surface_is_rejected() {
    let mut dev = small_device();
    let id = dev.create_surface(4, 4, 1).unwrap();
    dev.bind(surface_binding(id, 4.0, 4.0));
    let globals = FilterGlobals::default();
    let err = dev
        .draw_filter(&FilterDraw {
            shader: &CopyShader,
            state: DrawState::default(),
            source: id,
            quad: FilterQuad {
                positions: Rect::new(0.0, 0.0, 4.0, 4.0),
                uvs: Rect::new(0.0, 0.0, 1.0, 1.0),
            },
            globals: &globals,
            program: ProgramKey(1),
        })
        .unwrap_err();
    assert!(err.is_contract());
    // The target survives the failed draw.
    assert!(dev.is_live(id));
}

#[test]
fn destroying_the_bound_surface_falls_back_to_the_screen() {
    let mut dev = small_device();
    let id = dev.create_surface(4, 4, 1).unwrap();
    dev.bind(surface_binding(id, 4.0, 4.0));
    dev.destroy_surface(id);
    assert_eq!(dev.binding().target, RenderTarget::Screen);
}

#[test]
fn screen_resize_rebinds_the_root() {
    let mut dev = small_device();
    dev.set_screen_size(16, 12).unwrap();
    assert_eq!(dev.screen_size(), (16, 12));
    assert_eq!(dev.binding().source_frame, Rect::new(0.0, 0.0, 16.0, 12.0));
    assert_eq!(dev.read_pixels(RenderTarget::Screen).unwrap().width, 16);
}

#[test]
fn resolution_maps_logical_to_physical() {
    let dev = CpuDevice::new(CpuDeviceOpts {
        screen_width: 200,
        screen_height: 100,
        resolution: 2.0,
        ..CpuDeviceOpts::default()
    })
    .unwrap();
    let b = dev.root_binding();
    assert_eq!(b.source_frame, Rect::new(0.0, 0.0, 100.0, 50.0));
    assert_eq!(b.resolution(), 2.0);
}
