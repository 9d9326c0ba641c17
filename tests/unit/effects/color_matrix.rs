use super::*;

fn run(filter: &ColorMatrixFilter, px: [u8; 4]) -> [f32; 4] {
    let data = px.to_vec();
    let sampler = TexelSampler::new(&data, 1, 1);
    let g = FilterGlobals {
        input_clamp: [0.0, 0.0, 1.0, 1.0],
        ..FilterGlobals::default()
    };
    filter.shader.fragment(&sampler, Point::new(0.5, 0.5), &g)
}

#[test]
fn identity_preserves_premultiplied_color() {
    let out = run(&ColorMatrixFilter::identity(), [100, 50, 25, 200]);
    assert!((out[0] - 100.0 / 255.0).abs() < 1e-3);
    assert!((out[3] - 200.0 / 255.0).abs() < 1e-3);
}

#[test]
fn grayscale_equalizes_channels() {
    let out = run(&ColorMatrixFilter::grayscale(), [255, 0, 0, 255]);
    assert!((out[0] - out[1]).abs() < 1e-6);
    assert!((out[1] - out[2]).abs() < 1e-6);
    assert!((out[0] - 0.2126).abs() < 1e-3);
}

#[test]
fn invert_works_on_straight_color() {
    // Half-transparent white inverts to half-transparent black.
    let out = run(&ColorMatrixFilter::invert(), [128, 128, 128, 128]);
    assert!(out[0] < 1e-3);
    assert!((out[3] - 128.0 / 255.0).abs() < 1e-3);
}

#[test]
fn transparent_input_stays_transparent() {
    let out = run(&ColorMatrixFilter::brightness(2.0).unwrap(), [0, 0, 0, 0]);
    assert_eq!(out, [0.0; 4]);
}

#[test]
fn non_finite_matrix_is_rejected() {
    let mut m = [0.0f32; 20];
    m[3] = f32::INFINITY;
    assert!(ColorMatrixFilter::new(m).is_err());
    assert!(ColorMatrixFilter::brightness(f32::NAN).is_err());
}
