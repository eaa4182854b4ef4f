use crate::types::{GprError, GprResult, Trace};
use ndarray::Array1;

/// Band-limited (sinc) interpolator over a uniformly sampled trace
///
/// Evaluates sum_i data[i] * sinc(t / dt - i), reconstructing the
/// underlying band-limited waveform at arbitrary times. Used upstream of
/// the imaging core to resample traces or apply fractional-delay shifts.
#[derive(Debug, Clone)]
pub struct SincInterpolator {
    base: Array1<f64>,
    sample_interval: f64,
}

fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        let px = std::f64::consts::PI * x;
        px.sin() / px
    }
}

impl SincInterpolator {
    pub fn new(base: Array1<f64>, sample_interval: f64) -> GprResult<Self> {
        if base.is_empty() {
            return Err(GprError::Config(
                "interpolator needs at least one base sample".to_string(),
            ));
        }
        if !(sample_interval > 0.0) {
            return Err(GprError::Config(format!(
                "sample interval must be positive, got {}",
                sample_interval
            )));
        }
        Ok(Self {
            base,
            sample_interval,
        })
    }

    pub fn from_trace(trace: &Trace<f64>) -> GprResult<Self> {
        Self::new(
            trace.samples().clone(),
            trace.time_axis().sample_interval,
        )
    }

    /// Reconstructed waveform value at time `t` (same time origin as the
    /// base samples)
    pub fn value_at(&self, t: f64) -> f64 {
        let u = t / self.sample_interval;
        self.base
            .iter()
            .enumerate()
            .map(|(i, &v)| v * sinc(u - i as f64))
            .sum()
    }

    /// Evaluate the waveform at a set of times
    pub fn interpolate(&self, times: &Array1<f64>) -> Array1<f64> {
        times.mapv(|t| self.value_at(t))
    }

    /// Waveform delayed by `delay`, resampled on the original sample grid
    pub fn shift_by_delay(&self, delay: f64) -> Array1<f64> {
        Array1::from_iter(
            (0..self.base.len())
                .map(|i| self.value_at(i as f64 * self.sample_interval - delay)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_reproduces_base_samples_at_sample_instants() {
        let base = array![0.0, 1.0, -2.0, 3.5, 0.25];
        let interp = SincInterpolator::new(base.clone(), 0.5).unwrap();
        for (i, &v) in base.iter().enumerate() {
            assert_relative_eq!(interp.value_at(i as f64 * 0.5), v, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_integer_shift_moves_samples() {
        let base = array![0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        let interp = SincInterpolator::new(base, 1.0).unwrap();
        let shifted = interp.shift_by_delay(2.0);
        assert_relative_eq!(shifted[4], 1.0, epsilon = 1e-12);
        assert_relative_eq!(shifted[2], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_fractional_shift_of_band_limited_tone() {
        // A pure sinc pulse shifted by half a sample keeps its closed form
        let n = 64;
        let base = Array1::from_iter((0..n).map(|i| sinc(i as f64 - 32.0)));
        let interp = SincInterpolator::new(base, 1.0).unwrap();
        let shifted = interp.shift_by_delay(0.5);
        // Edge truncation leaks a little energy; check mid-trace samples
        for i in 20..44 {
            assert_relative_eq!(shifted[i], sinc(i as f64 - 32.5), epsilon = 1e-2);
        }
    }

    #[test]
    fn test_rejects_empty_base() {
        assert!(SincInterpolator::new(Array1::zeros(0), 1.0).is_err());
    }
}
