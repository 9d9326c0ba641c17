use crate::effects::filter::{BlendMode, DrawState};
use crate::foundation::error::{FxError, FxResult};
use crate::foundation::math::mul_div255_u8;

/// Premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// Premultiplied source-over with a global opacity.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = add_sat_u8(sa, mul_div255_u8(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = add_sat_u8(sc, dc);
    }
    out
}

/// Saturating additive blend.
pub fn add(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = dst[i].saturating_add(src[i]);
    }
    // Keep color within coverage after saturation.
    for i in 0..3 {
        out[i] = out[i].min(out[3]);
    }
    out
}

/// Combine one shaded fragment with the destination per a filter's draw state.
pub fn blend(dst: PremulRgba8, src: PremulRgba8, state: DrawState) -> PremulRgba8 {
    if !state.blend {
        return src;
    }
    match state.blend_mode {
        BlendMode::Normal => over(dst, src, 1.0),
        BlendMode::Add => add(dst, src),
    }
}

/// Source-over `src` onto `dst`, pixel by pixel.
pub fn over_in_place(dst: &mut [u8], src: &[u8], opacity: f32) -> FxResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(FxError::validation(
            "over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
    Ok(())
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    (u16::from(a) + u16::from(b)).min(255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
