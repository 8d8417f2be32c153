use crate::error::MarketError;

/// Exponential moving average with a fixed smoothing factor.
///
/// ```text
/// ema' = ema * (1 - alpha) + price * alpha
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ema {
    alpha: f64,
}

impl Ema {
    pub fn new(alpha: f64) -> Result<Self, MarketError> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(MarketError::InvalidParams(format!(
                "smoothing factor must be in (0, 1], got {alpha}"
            )));
        }
        Ok(Self { alpha })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn next(&self, prev: f64, price: f64) -> f64 {
        prev * (1.0 - self.alpha) + price * self.alpha
    }
}
