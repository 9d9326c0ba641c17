use super::*;

struct Plain;

impl Filter for Plain {
    fn name(&self) -> &str {
        "plain"
    }

    fn apply(
        &self,
        _ctx: &mut dyn FilterContext,
        _input: SurfaceView,
        _output: FilterOutput,
        _clear: ClearMode,
    ) -> FxResult<()> {
        Ok(())
    }
}

#[test]
fn legacy_bool_maps_onto_clear_modes() {
    assert_eq!(ClearMode::from(true), ClearMode::Clear);
    assert_eq!(ClearMode::from(false), ClearMode::Blend);
    assert_eq!(ClearMode::default(), ClearMode::Clear);
}

#[test]
fn default_draw_state_blends_normally() {
    let st = DrawState::default();
    assert!(st.blend);
    assert_eq!(st.blend_mode, BlendMode::Normal);
}

#[test]
fn unit_defaults() {
    let f = Plain;
    assert_eq!(f.resolution(), 1.0);
    assert_eq!(f.padding(), 0.0);
    assert_eq!(f.multisample(), 1);
    assert!(f.auto_fit());
    assert!(!f.legacy());
    assert!(f.enabled());
    assert_eq!(f.input_source(), InputSource::Upstream);

    let r = Rect::new(1.0, 2.0, 3.0, 4.0);
    assert_eq!(f.measure_output(r), r);
    assert_eq!(f.measure_input(r), r);
}

#[test]
fn clear_mode_serializes_snake_case() {
    assert_eq!(serde_json::to_string(&ClearMode::Blit).unwrap(), "\"blit\"");
    let m: BlendMode = serde_json::from_str("\"add\"").unwrap();
    assert_eq!(m, BlendMode::Add);
}
