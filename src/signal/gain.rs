use crate::types::Trace;
use ndarray::Array1;
use std::ops::Mul;

/// Parameters of the single-pole spreading/attenuation gain curve
///
/// Times are in nanoseconds, `speed` in m/ns. The defaults match a
/// C-band survey with the direct wave arriving around 6 ns.
#[derive(Debug, Clone, Copy)]
pub struct SecGainParams {
    /// Arrival time of the direct wave; gain is unity before it
    pub t0: f64,
    /// Wavelet duration controlling the linear spreading term
    pub tw: f64,
    /// Constant floor added past t0
    pub const_gain: f64,
    /// Attenuation in dB/m
    pub alpha: f64,
    /// Wave speed in the medium (m/ns)
    pub speed: f64,
    /// Hard cap on the compensation factor
    pub max_gain: f64,
}

impl Default for SecGainParams {
    fn default() -> Self {
        Self {
            t0: 6.0,
            tw: 0.2,
            const_gain: 0.01,
            alpha: 0.05,
            speed: 0.173205,
            max_gain: 100.0,
        }
    }
}

/// Gain compensation factor at time `t`
///
/// Unity before the direct-wave arrival, then a spreading term scaled by
/// an exponential attenuation recovery, clamped to `max_gain`.
pub fn sec_gain(t: f64, params: &SecGainParams) -> f64 {
    let tau = t - params.t0;
    if tau < 0.0 {
        return 1.0;
    }
    // dB/m to nepers via 8.69 dB per neper
    let beta = params.alpha * params.speed / 8.69;
    let g = params.const_gain + (1.0 + tau / params.tw) * (beta * tau).exp();
    g.min(params.max_gain)
}

/// Gain curve over a whole time axis
pub fn gain_curve(times: &Array1<f64>, params: &SecGainParams) -> Array1<f64> {
    times.mapv(|t| sec_gain(t, params))
}

/// Scale a trace in place by the gain curve of its own time axis
pub fn apply_gain<T>(trace: &mut Trace<T>, params: &SecGainParams)
where
    T: Copy + Mul<f64, Output = T>,
{
    let axis = trace.time_axis();
    for (i, sample) in trace.samples_mut().iter_mut().enumerate() {
        *sample = *sample * sec_gain(axis.time_of(i), params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GprComplex, TimeAxis};
    use approx::assert_relative_eq;
    use ndarray::Array1;

    #[test]
    fn test_unity_before_direct_wave() {
        let params = SecGainParams::default();
        assert_eq!(sec_gain(0.0, &params), 1.0);
        assert_eq!(sec_gain(5.999, &params), 1.0);
    }

    #[test]
    fn test_gain_grows_then_saturates() {
        let params = SecGainParams::default();
        let early = sec_gain(7.0, &params);
        let late = sec_gain(20.0, &params);
        assert!(early > 1.0);
        assert!(late > early);
        assert_eq!(sec_gain(1000.0, &params), params.max_gain);
    }

    #[test]
    fn test_value_at_direct_wave_arrival() {
        let params = SecGainParams::default();
        // tau = 0: const_gain + 1
        assert_relative_eq!(sec_gain(params.t0, &params), 1.01, epsilon = 1e-12);
    }

    #[test]
    fn test_apply_gain_scales_complex_trace() {
        let params = SecGainParams::default();
        let samples = Array1::from_elem(20, GprComplex::new(1.0, 2.0));
        let mut trace =
            Trace::new(samples, TimeAxis::new(0.0, 1.0).unwrap()).unwrap();
        apply_gain(&mut trace, &params);

        // Samples before t0 untouched, samples after scaled up
        assert_eq!(trace.samples()[0], GprComplex::new(1.0, 2.0));
        let g = sec_gain(10.0, &params);
        assert_relative_eq!(trace.samples()[10].re, g, epsilon = 1e-12);
        assert_relative_eq!(trace.samples()[10].im, 2.0 * g, epsilon = 1e-12);
    }
}
