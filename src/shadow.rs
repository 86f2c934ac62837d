//! Shadow generator: separable Gaussian kernel, precomputed edge/corner
//! tables, and per-window raster assembly (spec §4.9).
//!
//! There is no analogue for this in the teacher (the kernel has no window
//! shadows); grounded instead on the other pack example
//! `willothy-recomp`'s shadow module sketch for the overall shape (a kernel
//! table built once at startup, reused per window) and on the algebra in
//! spec §4.9 directly for the math.

/// `s = ((ceil(3r)+1) & ~1)`: the Gaussian is truncated at three sigma and
/// rounded down to an even extent (spec §3.3).
fn kernel_size(radius: u32) -> usize {
    let r = radius.max(1) as f64;
    let truncated = (3.0 * r).ceil() as i64 + 1;
    (truncated & !1) as usize
}

/// `G[y][x] = exp(-(x²+y²) / (2r²))`, normalized to sum 1 over the
/// `kernel_size(radius)` square.
pub fn gaussian_map(radius: u32) -> Vec<Vec<f64>> {
    let r = radius.max(1) as f64;
    let size = kernel_size(radius);
    let center = (size / 2) as i64;
    let mut map = vec![vec![0.0f64; size]; size];
    let mut sum = 0.0;
    for (y, row) in map.iter_mut().enumerate() {
        for (x, cell) in row.iter_mut().enumerate() {
            let dx = x as i64 - center;
            let dy = y as i64 - center;
            let v = (-((dx * dx + dy * dy) as f64) / (2.0 * r * r)).exp();
            *cell = v;
            sum += v;
        }
    }
    if sum > 0.0 {
        for row in map.iter_mut() {
            for cell in row.iter_mut() {
                *cell /= sum;
            }
        }
    }
    map
}

/// Opacity levels the presum tables are quantized into (spec §3.3: 25
/// graded steps `op/25` for `op` in `0..24`, plus one extra "full" slice at
/// `op = 25` — 26 layers in total).
pub const OPACITY_STEPS: usize = 26;

/// Precomputed per-opacity-step edge and corner tables (spec §4.9
/// `presum`). `top[op][x]` is the shadow value of a one-pixel-tall strip at
/// column `x`; `corner[op][y][x]` is the shadow value at `(x, y)` inside one
/// quadrant, both scaled by `op / 25`.
pub struct ShadowTables {
    pub size: usize,
    pub top: Vec<Vec<f64>>,
    pub corner: Vec<Vec<Vec<f64>>>,
}

impl ShadowTables {
    pub fn build(radius: u32) -> Self {
        let map = gaussian_map(radius);
        let size = map.len();
        let center = size / 2;

        // Column sums of the full kernel give the "one-pixel strip" profile
        // used for the top/bottom/left/right bands.
        let mut col_sum = vec![0.0f64; size];
        for row in &map {
            for (x, &v) in row.iter().enumerate() {
                col_sum[x] += v;
            }
        }

        // Corner quadrant: cumulative sum of the kernel restricted to one
        // quadrant, approximating the shadow falloff near a window corner.
        let mut quadrant = vec![vec![0.0f64; size]; size];
        for y in 0..size {
            for x in 0..size {
                let dx = x as i64 - center as i64;
                let dy = y as i64 - center as i64;
                quadrant[y][x] = if dx >= 0 && dy >= 0 { map[y][x] } else { 0.0 };
            }
        }

        let mut top = vec![vec![0.0f64; size]; OPACITY_STEPS];
        let mut corner = vec![vec![vec![0.0f64; size]; size]; OPACITY_STEPS];
        for op in 0..OPACITY_STEPS {
            let scale = op as f64 / (OPACITY_STEPS - 1) as f64;
            for x in 0..size {
                top[op][x] = col_sum[x] * scale;
            }
            for y in 0..size {
                for x in 0..size {
                    corner[op][y][x] = quadrant[y][x] * scale;
                }
            }
        }

        Self { size, top, corner }
    }

    fn opacity_step(&self, opacity: u32) -> usize {
        let frac = opacity as f64 / crate::window::OPAQUE as f64;
        ((frac * (OPACITY_STEPS - 1) as f64).round() as usize).min(OPACITY_STEPS - 1)
    }
}

/// An assembled 8-bit alpha shadow raster, ready to be uploaded as a pixmap
/// (spec §4.9: "uploaded as an 8-bit-alpha pixmap").
pub struct ShadowRaster {
    pub width: u32,
    pub height: u32,
    /// Row-major, one byte of alpha per pixel.
    pub alpha: Vec<u8>,
}

impl ShadowRaster {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            alpha: vec![0u8; (width * height) as usize],
        }
    }

    #[inline]
    fn set(&mut self, x: i64, y: i64, value: u8) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.alpha[idx] = value;
    }
}

/// Build a window's shadow raster, logical size `(win_w + s) × (win_h + s)`
/// (spec §4.9). `base_opacity` is the configured shadow alpha, already
/// folded into `OPACITY_STEPS` quantization by the caller via
/// `opacity_step`; `clear_shadow_beneath` zeros the region directly under
/// the window when it's larger than the kernel.
pub fn build_shadow(
    tables: &ShadowTables,
    win_w: u32,
    win_h: u32,
    base_opacity: u32,
    clear_shadow_beneath: bool,
) -> ShadowRaster {
    let s = tables.size as u32;
    let width = win_w + s;
    let height = win_h + s;
    let mut raster = ShadowRaster::new(width, height);
    let step = tables.opacity_step(base_opacity);
    let half = (s / 2) as i64;
    let full_alpha = (step as f64 / (OPACITY_STEPS - 1) as f64 * 255.0) as u8;

    // Center: full-strength fill, since the window body is large enough for
    // the kernel to have converged by its edges.
    for y in half..(height as i64 - half) {
        for x in half..(width as i64 - half) {
            raster.set(x, y, full_alpha);
        }
    }

    // Corner quadrants, mirrored into all four corners.
    let corner_extent = (s as usize / 2).min((win_w.min(win_h) / 2).max(1) as usize);
    for y in 0..corner_extent {
        for x in 0..corner_extent {
            let v = (tables.corner[step][y][x] * 255.0) as u8;
            raster.set(x as i64, y as i64, v); // top-left
            raster.set(width as i64 - 1 - x as i64, y as i64, v); // top-right
            raster.set(x as i64, height as i64 - 1 - y as i64, v); // bottom-left
            raster.set(
                width as i64 - 1 - x as i64,
                height as i64 - 1 - y as i64,
                v,
            ); // bottom-right
        }
    }

    // Top/bottom bands between the corners.
    for x in corner_extent..(width as usize - corner_extent) {
        let v = (tables.top[step][x.min(tables.size - 1)] * 255.0) as u8;
        raster.set(x as i64, 0, v);
        raster.set(x as i64, height as i64 - 1, v);
    }

    if clear_shadow_beneath && win_w > s && win_h > s {
        let margin = 2i64;
        let x0 = half + margin;
        let y0 = half + margin;
        let x1 = width as i64 - half - margin;
        let y1 = height as i64 - half - margin;
        for y in y0..y1 {
            for x in x0..x1 {
                raster.set(x, y, 0);
            }
        }
    }

    raster
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaussian_map_normalizes_to_one() {
        let map = gaussian_map(8);
        let sum: f64 = map.iter().flatten().sum();
        assert!((sum - 1.0).abs() < 1e-9, "sum was {sum}");
    }

    #[test]
    fn gaussian_map_peaks_at_center() {
        let map = gaussian_map(4);
        let size = map.len();
        let center = size / 2;
        let peak = map[center][center];
        for (y, row) in map.iter().enumerate() {
            for (x, &v) in row.iter().enumerate() {
                if (x, y) != (center, center) {
                    assert!(v <= peak);
                }
            }
        }
    }

    #[test]
    fn shadow_raster_has_expected_dimensions() {
        let tables = ShadowTables::build(4);
        let raster = build_shadow(&tables, 100, 60, crate::window::OPAQUE / 2, false);
        assert_eq!(raster.width, 100 + tables.size as u32);
        assert_eq!(raster.height, 60 + tables.size as u32);
    }

    #[test]
    fn clear_shadow_beneath_zeroes_center() {
        let tables = ShadowTables::build(4);
        let raster = build_shadow(&tables, 200, 200, crate::window::OPAQUE, true);
        let cx = raster.width / 2;
        let cy = raster.height / 2;
        let idx = (cy * raster.width + cx) as usize;
        assert_eq!(raster.alpha[idx], 0);
    }

    proptest::proptest! {
        #[test]
        fn gaussian_map_always_normalizes(radius in 1u32..40) {
            let map = gaussian_map(radius);
            let sum: f64 = map.iter().flatten().sum();
            proptest::prop_assert!((sum - 1.0).abs() < 1e-6);
        }
    }
}
