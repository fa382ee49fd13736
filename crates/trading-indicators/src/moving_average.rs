//! Moving average indicators.

use trading_core::traits::Indicator;

/// Simple Moving Average (SMA).
///
/// Arithmetic mean of the last N values. A window that contains an
/// undefined input yields no value.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
}

impl Sma {
    /// Create a new SMA with the specified period.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }
}

impl Indicator for Sma {
    type Output = f64;

    fn calculate(&self, data: &[Option<f64>]) -> Vec<Option<f64>> {
        let period_f64 = self.period as f64;
        let mut result = Vec::with_capacity(data.len());
        let mut sum = 0.0;
        let mut missing = 0usize;

        // Sliding window over the defined values, counting holes
        for i in 0..data.len() {
            match data[i] {
                Some(v) => sum += v,
                None => missing += 1,
            }
            if i >= self.period {
                match data[i - self.period] {
                    Some(v) => sum -= v,
                    None => missing -= 1,
                }
            }

            if i + 1 >= self.period && missing == 0 {
                result.push(Some(sum / period_f64));
            } else {
                result.push(None);
            }
        }

        result
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "SMA"
    }
}

/// Exponential Moving Average (EMA) with span semantics.
///
/// alpha = 2 / (span + 1), seeded with the first defined input and no
/// bias adjustment, so a value exists from the first defined row on.
/// Undefined inputs after the seed produce no value and leave the state
/// untouched.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    alpha: f64,
}

impl Ema {
    /// Create a new EMA with the specified span.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        let alpha = 2.0 / (period as f64 + 1.0);
        Self { period, alpha }
    }

    /// Create an EMA with a custom smoothing factor.
    pub fn with_alpha(period: usize, alpha: f64) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        assert!(alpha > 0.0 && alpha <= 1.0, "Alpha must be in (0, 1]");
        Self { period, alpha }
    }

    /// Smoothing factor.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl Indicator for Ema {
    type Output = f64;

    fn calculate(&self, data: &[Option<f64>]) -> Vec<Option<f64>> {
        let mut state: Option<f64> = None;
        let one_minus_alpha = 1.0 - self.alpha;

        data.iter()
            .map(|value| {
                let x = (*value)?;
                let next = match state {
                    Some(prev) => x * self.alpha + prev * one_minus_alpha,
                    None => x,
                };
                state = Some(next);
                Some(next)
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "EMA"
    }
}

/// Wrap a plain series for the aligned indicator API.
pub fn defined(data: &[f64]) -> Vec<Option<f64>> {
    data.iter().copied().map(Some).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.map_or(false, |a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn test_sma_alignment() {
        let sma = Sma::new(3);
        let result = sma.calculate(&defined(&[1.0, 2.0, 3.0, 4.0, 5.0]));

        assert_eq!(result.len(), 5);
        assert_eq!(result[0], None);
        assert_eq!(result[1], None);
        assert!(approx(result[2], 2.0));
        assert!(approx(result[3], 3.0));
        assert!(approx(result[4], 4.0));
    }

    #[test]
    fn test_sma_skips_windows_with_holes() {
        let sma = Sma::new(2);
        let result = sma.calculate(&[None, Some(2.0), Some(4.0), None, Some(6.0), Some(8.0)]);
        assert_eq!(result[1], None);
        assert!(approx(result[2], 3.0));
        assert_eq!(result[3], None);
        assert_eq!(result[4], None);
        assert!(approx(result[5], 7.0));
    }

    #[test]
    fn test_ema_seeds_with_first_value() {
        let ema = Ema::new(3); // alpha = 0.5
        let result = ema.calculate(&defined(&[10.0, 20.0, 20.0, 40.0]));

        assert!(approx(result[0], 10.0));
        assert!(approx(result[1], 15.0));
        assert!(approx(result[2], 17.5));
        assert!(approx(result[3], 28.75));
    }

    #[test]
    fn test_ema_over_warming_input() {
        let ema = Ema::new(3);
        let result = ema.calculate(&[None, None, Some(4.0), Some(8.0)]);
        assert_eq!(result[..2], [None, None]);
        assert!(approx(result[2], 4.0));
        assert!(approx(result[3], 6.0));
    }

    #[test]
    fn test_constant_series() {
        let data = defined(&[5.0; 10]);
        assert!(Ema::new(4).calculate(&data).iter().all(|v| approx(*v, 5.0)));
        assert!(Sma::new(4).calculate(&data)[3..].iter().all(|v| approx(*v, 5.0)));
    }
}
