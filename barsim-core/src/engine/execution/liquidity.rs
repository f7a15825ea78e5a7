//! Liquidity constraint: participation limit per bar.
//!
//! Limits the fill quantity to a fraction of the bar's volume. The unfilled
//! remainder keeps resting and is retried on the next bar. Each order is
//! capped on its own; orders on the same symbol do not share the bar's volume.

/// Participation cap as a fraction of bar volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiquidityPolicy {
    /// In (0, 1]. Example: 0.10 means fill at most 10% of the bar's volume.
    pub participation_pct: f64,
}

impl LiquidityPolicy {
    pub fn new(participation_pct: f64) -> Self {
        debug_assert!(
            participation_pct > 0.0 && participation_pct <= 1.0,
            "participation rate must be in (0, 1]"
        );
        Self { participation_pct }
    }

    /// No cap beyond the bar's own volume.
    pub fn unlimited() -> Self {
        Self::new(1.0)
    }

    /// `floor(volume * participation_pct)`.
    pub fn max_fill_qty(&self, bar_volume: f64) -> u64 {
        let cap = (bar_volume * self.participation_pct).floor();
        if cap.is_finite() && cap > 0.0 {
            cap as u64
        } else {
            0
        }
    }

    /// Apply the cap to a remaining quantity.
    ///
    /// Returns `(fill_qty, remainder_qty)`.
    pub fn constrain(&self, remaining: u64, bar_volume: f64) -> (u64, u64) {
        let fill = remaining.min(self.max_fill_qty(bar_volume));
        (fill, remaining - fill)
    }
}

impl Default for LiquidityPolicy {
    fn default() -> Self {
        Self::unlimited()
    }
}
