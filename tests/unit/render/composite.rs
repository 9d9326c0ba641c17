use super::*;

#[test]
fn opaque_source_replaces_destination() {
    assert_eq!(over([10, 20, 30, 255], [200, 0, 0, 255], 1.0), [200, 0, 0, 255]);
}

#[test]
fn transparent_source_keeps_destination() {
    let dst = [10, 20, 30, 40];
    assert_eq!(over(dst, [0, 0, 0, 0], 1.0), dst);
    assert_eq!(over(dst, [255, 255, 255, 255], 0.0), dst);
}

#[test]
fn half_alpha_over_opaque() {
    let out = over([0, 0, 255, 255], [128, 0, 0, 128], 1.0);
    assert_eq!(out[3], 255);
    assert_eq!(out[0], 128);
    assert!((i32::from(out[2]) - 127).abs() <= 1);
}

#[test]
fn add_saturates_and_keeps_premultiplied_invariant() {
    assert_eq!(add([200, 10, 0, 200], [100, 10, 0, 100]), [255, 20, 0, 255]);
    let out = add([0, 0, 0, 10], [200, 0, 0, 0]);
    assert!(out[0] <= out[3]);
}

#[test]
fn non_blending_state_overwrites() {
    let st = DrawState {
        blend: false,
        blend_mode: BlendMode::Normal,
    };
    assert_eq!(blend([1, 2, 3, 4], [0, 0, 0, 0], st), [0, 0, 0, 0]);
    let add_state = DrawState {
        blend: true,
        blend_mode: BlendMode::Add,
    };
    assert_eq!(blend([1, 1, 1, 1], [1, 1, 1, 1], add_state), [2, 2, 2, 2]);
}

#[test]
fn over_in_place_rejects_mismatched_buffers() {
    let mut dst = vec![0u8; 8];
    assert!(over_in_place(&mut dst, &[0u8; 4], 1.0).is_err());
    over_in_place(&mut dst, &[255u8; 8], 1.0).unwrap();
    assert_eq!(dst, vec![255u8; 8]);
}
