use crate::error::MarketError;

/// Volatility envelope recentred on the slow average each tick, with a
/// half-width proportional to the current price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    width_pct: f64,
}

impl Envelope {
    pub fn new(width_pct: f64) -> Result<Self, MarketError> {
        if !width_pct.is_finite() || width_pct < 0.0 {
            return Err(MarketError::InvalidParams(format!(
                "band width must be finite and non-negative, got {width_pct}"
            )));
        }
        Ok(Self { width_pct })
    }

    /// Returns `(upper, lower)`.
    pub fn around(&self, center: f64, price: f64) -> (f64, f64) {
        let half = price.abs() * self.width_pct;
        (center + half, center - half)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_percent_of_price_each_side() {
        let band = Envelope::new(0.01).unwrap();
        let (upper, lower) = band.around(100.0, 200.0);
        assert!((upper - 102.0).abs() < 1e-9);
        assert!((lower - 98.0).abs() < 1e-9);
    }
}
