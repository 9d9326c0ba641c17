use super::*;
use crate::effects::filter::{ClearMode, FilterContext, FilterOutput};
use crate::foundation::error::FxResult;
use crate::render::surface_pool::SurfaceView;

struct Unit {
    resolution: f64,
    padding: f64,
    samples: u8,
    auto_fit: bool,
    legacy: bool,
}

impl Unit {
    fn new(resolution: f64, padding: f64) -> Self {
        Self {
            resolution,
            padding,
            samples: 1,
            auto_fit: true,
            legacy: false,
        }
    }
}

impl Filter for Unit {
    fn name(&self) -> &str {
        "unit"
    }

    fn resolution(&self) -> f64 {
        self.resolution
    }

    fn padding(&self) -> f64 {
        self.padding
    }

    fn multisample(&self) -> u8 {
        self.samples
    }

    fn auto_fit(&self) -> bool {
        self.auto_fit
    }

    fn legacy(&self) -> bool {
        self.legacy
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

fn state_with(units: Vec<Unit>) -> FilterState {
    let mut s = FilterState::default();
    s.reset();
    for u in units {
        s.filters.push(Arc::new(u));
    }
    s
}

#[test]
fn chain_takes_lowest_resolution_and_largest_padding() {
    let mut s = state_with(vec![Unit::new(2.0, 5.0), Unit::new(1.0, 3.0)]);
    s.resolve_chain(PaddingPolicy::Max, AutoFitPolicy::All);
    assert_eq!(s.resolution, 1.0);
    assert_eq!(s.padding, 5.0);
    assert!(s.auto_fit);
    assert!(!s.legacy);
}

#[test]
fn sum_policy_adds_padding() {
    let mut s = state_with(vec![Unit::new(1.0, 5.0), Unit::new(1.0, 3.0)]);
    s.resolve_chain(PaddingPolicy::Sum, AutoFitPolicy::All);
    assert_eq!(s.padding, 8.0);
}

#[test]
fn auto_fit_policies() {
    let mut off = Unit::new(1.0, 0.0);
    off.auto_fit = false;
    let mut s = state_with(vec![Unit::new(1.0, 0.0), off]);
    s.resolve_chain(PaddingPolicy::Max, AutoFitPolicy::All);
    assert!(!s.auto_fit);
    s.resolve_chain(PaddingPolicy::Max, AutoFitPolicy::Any);
    assert!(s.auto_fit);
}

#[test]
fn legacy_is_sticky_and_samples_take_the_minimum() {
    let mut a = Unit::new(1.0, 0.0);
    a.samples = 4;
    let mut b = Unit::new(1.0, 0.0);
    b.samples = 2;
    b.legacy = true;
    let mut s = state_with(vec![a, b]);
    s.resolve_chain(PaddingPolicy::Max, AutoFitPolicy::All);
    assert_eq!(s.multisample, 2);
    assert!(s.legacy);
}

#[test]
fn arena_reuses_recycled_records() {
    let mut arena = StateArena::new(Binding::default());
    assert_eq!(arena.len(), 1);

    let (a, sa) = arena.acquire();
    let (b, sb) = arena.acquire();
    assert_ne!(a, StateArena::SENTINEL);
    assert_ne!(a, b);
    arena.park(a, sa);
    arena.park(b, sb);
    assert_eq!(arena.len(), 3);

    let sb = arena.take(b);
    arena.recycle(b, sb);
    assert_eq!(arena.free_len(), 1);

    let (c, sc) = arena.acquire();
    assert_eq!(c, b);
    assert!(sc.filters.is_empty());
    assert_eq!(arena.len(), 3);
    assert_eq!(arena.free_len(), 0);
}

#[test]
fn sentinel_is_never_recycled() {
    let mut arena = StateArena::new(Binding::default());
    let root = arena.take(StateArena::SENTINEL);
    arena.recycle(StateArena::SENTINEL, root);
    assert_eq!(arena.free_len(), 0);
    let (i, _) = arena.acquire();
    assert_ne!(i, StateArena::SENTINEL);
}

#[test]
fn recycled_record_pins_nothing() {
    let mut arena = StateArena::new(Binding::default());
    let (i, mut s) = arena.acquire();
    let unit: Arc<dyn Filter> = Arc::new(Unit::new(1.0, 0.0));
    s.filters.push(unit.clone());
    assert_eq!(Arc::strong_count(&unit), 2);
    arena.recycle(i, s);
    assert_eq!(Arc::strong_count(&unit), 1);
}

#[test]
fn shrink_keeps_only_the_sentinel() {
    let mut arena = StateArena::new(Binding::default());
    for _ in 0..3 {
        let (i, s) = arena.acquire();
        arena.park(i, s);
    }
    arena.shrink();
    assert_eq!(arena.len(), 1);
    assert_eq!(arena.free_len(), 0);
}
