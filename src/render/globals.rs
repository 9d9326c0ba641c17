use crate::foundation::core::Rect;
use crate::render::pass::PassDescriptor;
use crate::render::surface_pool::SurfaceView;

/// Absolute-coordinate parameters kept for units flagged `legacy`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LegacyGlobals {
    /// `[logical width, logical height, frame x, frame y]` of the input surface.
    pub filter_area: [f64; 4],
    /// Same values as [`FilterGlobals::input_clamp`].
    pub filter_clamp: [f64; 4],
}

/// Parameter block shared by every draw of one filter pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FilterGlobals {
    /// `[w, h, 1/w, 1/h]` of the input surface in logical units.
    pub input_size: [f64; 4],
    /// `[w, h, 1/w, 1/h]` of the input surface in physical pixels.
    pub input_pixel: [f64; 4],
    /// Normalized `[u0, v0, u1, v1]` that keeps sampling half a texel inside the valid input.
    pub input_clamp: [f64; 4],
    /// Logical region the pass writes.
    pub output_frame: Rect,
    /// Resolution the chain runs at.
    pub resolution: f64,
    /// Present only for legacy chains.
    pub legacy: Option<LegacyGlobals>,
}

impl FilterGlobals {
    /// Compute the block for `pass` reading from `input`.
    pub fn for_pass(
        pass: &PassDescriptor,
        input: &SurfaceView,
        resolution: f64,
        legacy: bool,
    ) -> Self {
        let logical = input.logical_size();
        let frame = input.frame();
        let (lw, lh) = (logical.width.max(f64::EPSILON), logical.height.max(f64::EPSILON));
        let pw = f64::from(input.width_px.max(1));
        let ph = f64::from(input.height_px.max(1));

        let input_size = [lw, lh, 1.0 / lw, 1.0 / lh];
        let input_pixel = [pw, ph, 1.0 / pw, 1.0 / ph];

        // Everything inside the filter frame is either drawn or cleared; the rest of a pooled
        // surface is stale. The frame starts at uv (0, 0).
        let half_u = 0.5 * input_pixel[2];
        let half_v = 0.5 * input_pixel[3];
        let mut input_clamp = [
            half_u,
            half_v,
            frame.width() * input_size[2] - half_u,
            frame.height() * input_size[3] - half_v,
        ];
        // Sub-texel regions collapse onto their center instead of inverting.
        if input_clamp[2] < input_clamp[0] {
            let mid = 0.5 * (input_clamp[0] + input_clamp[2]);
            input_clamp[0] = mid;
            input_clamp[2] = mid;
        }
        if input_clamp[3] < input_clamp[1] {
            let mid = 0.5 * (input_clamp[1] + input_clamp[3]);
            input_clamp[1] = mid;
            input_clamp[3] = mid;
        }

        let legacy = legacy.then(|| LegacyGlobals {
            filter_area: [lw, lh, frame.x0, frame.y0],
            filter_clamp: input_clamp,
        });

        Self {
            input_size,
            input_pixel,
            input_clamp,
            output_frame: pass.output_frame,
            resolution,
            legacy,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/globals.rs"]
mod tests;
