/// Maximum number of distinct elevation bands a mask can encode in one
/// 8-bit channel (zero is reserved for "no coverage").
pub const MAX_ELEVATION_BANDS: usize = 255;

/// Which band a between-entries query snaps to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BandRounding {
    /// Greatest tracked elevation ≤ the query (depth mask).
    Floor,
    /// Least tracked elevation ≥ the query (occlusion mask).
    Ceiling,
}

/// Ascending, deduplicated array of distinct elevation values with a
/// normalized band lookup.
///
/// Both the depth and occlusion masks quantize the unbounded elevation axis
/// through this one structure; only the rounding direction differs. The
/// array is rebuilt only when the distinct-elevation set changes.
#[derive(Debug, Clone)]
pub struct ElevationBands {
    values: Vec<f32>,
    rounding: BandRounding,
}

impl ElevationBands {
    pub fn new(rounding: BandRounding) -> Self {
        Self {
            values: vec![f32::NEG_INFINITY],
            rounding,
        }
    }

    /// Distinct tracked elevations, ascending.
    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Rebuilds from observed elevations: sorted, deduplicated, capped at
    /// [`MAX_ELEVATION_BANDS`]. An empty input falls back to a single
    /// negative-infinity band so every query maps to band 0.
    ///
    /// # Panics
    /// Panics on a NaN elevation; malformed document data must fail visibly
    /// rather than produce a wrong frame.
    pub fn rebuild(&mut self, elevations: impl IntoIterator<Item = f32>) {
        self.values.clear();
        for e in elevations {
            assert!(!e.is_nan(), "elevation must not be NaN");
            self.values.push(e);
        }
        self.values.sort_by(f32::total_cmp);
        self.values.dedup();
        self.values.truncate(MAX_ELEVATION_BANDS);

        if self.values.is_empty() {
            self.values.push(f32::NEG_INFINITY);
        }
    }

    /// Zero-based band index for `elevation`, clamped to the tracked range.
    ///
    /// # Panics
    /// Panics on a NaN query.
    pub fn band_index(&self, elevation: f32) -> usize {
        assert!(!elevation.is_nan(), "elevation must not be NaN");

        // partition_point: count of entries < elevation.
        let below = self.values.partition_point(|&v| v < elevation);

        match self.rounding {
            BandRounding::Floor => {
                // Greatest entry <= elevation; below-minimum clamps to 0.
                if below < self.values.len() && self.values[below] == elevation {
                    below
                } else {
                    below.saturating_sub(1)
                }
            }
            BandRounding::Ceiling => {
                // Least entry >= elevation; above-maximum clamps to the top.
                below.min(self.values.len() - 1)
            }
        }
    }

    /// Normalized band value `(index + 1) / 255` in (0, 1].
    #[inline]
    pub fn map_elevation(&self, elevation: f32) -> f32 {
        (self.band_index(elevation) as f32 + 1.0) / 255.0
    }

    /// Quantized channel value for mask fills: `index + 1` (zero means
    /// "no coverage").
    #[inline]
    pub fn channel_value(&self, elevation: f32) -> u8 {
        (self.band_index(elevation) + 1) as u8
    }
}
