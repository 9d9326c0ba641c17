use crate::foundation::error::{FxError, FxResult};

/// Round up to the next power of two (`0` maps to `1`).
pub(crate) fn next_pow2(v: u32) -> FxResult<u32> {
    v.max(1)
        .checked_next_power_of_two()
        .ok_or_else(|| FxError::resource(format!("surface extent {v} has no power-of-two bucket")))
}

/// Physical pixel extent for a logical length at `resolution`, never below one pixel.
///
/// The epsilon keeps `100.0000001 * 1.0` from rounding up to 101.
pub(crate) fn physical_extent(logical: f64, resolution: f64) -> FxResult<u32> {
    let scaled = (logical * resolution - 1e-6).ceil();
    if !scaled.is_finite() {
        return Err(FxError::resource(format!(
            "non-finite surface extent {logical} at resolution {resolution}"
        )));
    }
    if scaled > f64::from(u32::MAX) {
        return Err(FxError::resource(format!(
            "surface extent {scaled} exceeds u32"
        )));
    }
    Ok((scaled as u32).max(1))
}

pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
