pub use kurbo::{Affine, Point, Rect, Size, Vec2};

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    /// Red channel premultiplied by alpha.
    pub r: u8,
    /// Green channel premultiplied by alpha.
    pub g: u8,
    /// Blue channel premultiplied by alpha.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8Premul {
    /// Fully transparent black.
    pub fn transparent() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }
    }

    /// Convert straight-alpha RGBA8 into premultiplied RGBA8.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }

        Self {
            r: premul(r, a),
            g: premul(g, a),
            b: premul(b, a),
            a,
        }
    }

    /// Normalized premultiplied channels in `[0, 1]`.
    pub fn to_f32(self) -> [f32; 4] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
            f32::from(self.a) / 255.0,
        ]
    }

    /// Quantize normalized premultiplied channels, clamping out-of-range values.
    pub fn from_f32(c: [f32; 4]) -> Self {
        fn q(v: f32) -> u8 {
            if v.is_nan() {
                return 0;
            }
            (v.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        let a = q(c[3]);
        // Premultiplied invariant: color never exceeds coverage.
        Self {
            r: q(c[0]).min(a),
            g: q(c[1]).min(a),
            b: q(c[2]).min(a),
            a,
        }
    }

    /// Channels as an `[r, g, b, a]` array.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// `true` when a frame has no usable area (zero, negative or NaN extent).
pub fn is_degenerate(frame: Rect) -> bool {
    !(frame.width() > 0.0 && frame.height() > 0.0)
}

/// Smallest rectangle containing both frames.
///
/// Degenerate operands contribute nothing, so enlarging never pulls in a stray origin.
pub fn enlarge_to_contain(a: Rect, b: Rect) -> Rect {
    match (is_degenerate(a), is_degenerate(b)) {
        (true, true) => Rect::ZERO,
        (true, false) => b,
        (false, true) => a,
        (false, false) => a.union(b),
    }
}

/// Clip `frame` to `bounds`. Disjoint inputs yield a zero-area rect.
pub fn fit(frame: Rect, bounds: Rect) -> Rect {
    let r = frame.intersect(bounds);
    if is_degenerate(r) { Rect::ZERO } else { r }
}

/// Grow a frame by `padding` on every side.
pub fn pad(frame: Rect, padding: f64) -> Rect {
    if padding <= 0.0 {
        return frame;
    }
    frame.inflate(padding, padding)
}

/// `true` when two frames share a region of positive area.
pub fn overlaps(a: Rect, b: Rect) -> bool {
    !is_degenerate(a.intersect(b))
}

/// Round a logical frame outward so its edges land on the physical pixel grid.
pub fn snap_to_pixels(frame: Rect, resolution: f64) -> Rect {
    if is_degenerate(frame) || resolution.is_nan() || resolution <= 0.0 {
        return frame;
    }
    Rect::new(
        (frame.x0 * resolution).floor() / resolution,
        (frame.y0 * resolution).floor() / resolution,
        (frame.x1 * resolution).ceil() / resolution,
        (frame.y1 * resolution).ceil() / resolution,
    )
}

/// `true` when `outer` fully contains `inner` (degenerate `inner` is always contained).
pub fn contains_frame(outer: Rect, inner: Rect) -> bool {
    if is_degenerate(inner) {
        return true;
    }
    outer.x0 <= inner.x0 && outer.y0 <= inner.y0 && outer.x1 >= inner.x1 && outer.y1 >= inner.y1
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
