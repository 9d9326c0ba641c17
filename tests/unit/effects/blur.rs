use super::*;

fn globals(size: f64) -> FilterGlobals {
    FilterGlobals {
        input_size: [size, size, 1.0 / size, 1.0 / size],
        input_pixel: [size, size, 1.0 / size, 1.0 / size],
        input_clamp: [0.0, 0.0, 1.0, 1.0],
        ..FilterGlobals::default()
    }
}

#[test]
fn kernel_is_normalized_and_symmetric() {
    let k = gaussian_kernel(4, 2.0).unwrap();
    assert_eq!(k.len(), 9);
    let sum: f32 = k.iter().sum();
    assert!((sum - 1.0).abs() < 1e-5);
    for i in 0..4 {
        assert!((k[i] - k[8 - i]).abs() < 1e-7);
    }
    assert!(k[4] > k[3]);
}

#[test]
fn zero_radius_is_identity_kernel() {
    assert_eq!(gaussian_kernel(0, 0.0).unwrap(), vec![1.0]);
}

#[test]
fn invalid_parameters_are_rejected() {
    assert!(gaussian_kernel(3, 0.0).is_err());
    assert!(gaussian_kernel(3, f32::NAN).is_err());
    assert!(BlurPassFilter::blur_x(MAX_BLUR_RADIUS + 1).is_err());
    assert!(BlurFilter::new(4, Some(-1.0)).is_err());
}

#[test]
fn padding_defaults_to_radius() {
    let f = BlurPassFilter::blur_x(5).unwrap();
    assert_eq!(f.padding(), 5.0);
    assert_eq!(f.sigma(), 2.5);
    assert_eq!(f.with_padding(8.0).padding(), 8.0);
}

#[test]
fn single_axis_measurement_bleeds_along_its_axis() {
    let r = Rect::new(0.0, 0.0, 10.0, 10.0);
    let x = BlurPassFilter::blur_x(3).unwrap();
    let y = BlurPassFilter::blur_y(3).unwrap();
    assert_eq!(x.measure_output(r), Rect::new(-3.0, 0.0, 13.0, 10.0));
    assert_eq!(y.measure_output(r), Rect::new(0.0, -3.0, 10.0, 13.0));
    assert_eq!(x.measure_input(r), Rect::new(-3.0, 0.0, 13.0, 10.0));
    assert_eq!(x.name(), "blur_x");
    assert_eq!(y.axis(), BlurAxis::Y);
}

#[test]
fn two_axis_blur_bleeds_both_ways() {
    let f = BlurFilter::new(2, None).unwrap();
    let r = Rect::new(0.0, 0.0, 10.0, 10.0);
    assert_eq!(f.measure_output(r), Rect::new(-2.0, -2.0, 12.0, 12.0));
    assert_eq!(f.measure_input(r), Rect::new(-2.0, -2.0, 12.0, 12.0));
    assert_eq!(f.padding(), 2.0);
}

#[test]
fn constant_input_stays_constant() {
    let data = [64u8, 32, 16, 128].repeat(16);
    let sampler = TexelSampler::new(&data, 4, 4);
    let shader = BlurShader::new(BlurAxis::X, 2, 1.0).unwrap();
    let out = shader.fragment(&sampler, Point::new(0.5, 0.5), &globals(4.0));
    assert!((out[3] - 128.0 / 255.0).abs() < 1e-4);
    assert!((out[0] - 64.0 / 255.0).abs() < 1e-4);
}

#[test]
fn blur_spreads_a_single_texel() {
    let mut data = vec![0u8; 8 * 4];
    data[4 * 4..4 * 4 + 4].copy_from_slice(&[255, 255, 255, 255]);
    let sampler = TexelSampler::new(&data, 8, 1);
    let shader = BlurShader::new(BlurAxis::X, 2, 1.0).unwrap();
    let g = FilterGlobals {
        input_size: [8.0, 1.0, 1.0 / 8.0, 1.0],
        input_pixel: [8.0, 1.0, 1.0 / 8.0, 1.0],
        input_clamp: [0.0, 0.0, 1.0, 1.0],
        ..FilterGlobals::default()
    };
    // Center of texel 3, one tap away from the lit texel.
    let near = shader.fragment(&sampler, Point::new(3.5 / 8.0, 0.5), &g);
    let far = shader.fragment(&sampler, Point::new(0.5 / 8.0, 0.5), &g);
    assert!(near[3] > 0.0);
    assert_eq!(far[3], 0.0);
}

#[test]
fn label_tracks_tap_count() {
    let a = BlurShader::new(BlurAxis::X, 2, 1.0).unwrap();
    let b = BlurShader::new(BlurAxis::X, 3, 1.0).unwrap();
    assert_ne!(a.label(), b.label());
}
