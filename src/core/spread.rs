use crate::core::map_hint::MapHint;
use crate::types::{GprError, GprResult, Trace};
use ndarray::{Array3, ArrayView1, ArrayViewMut2, Zip};
use num_traits::Zero;

/// Spreads trace sample windows into an image contribution
///
/// For every illuminated pixel the map-hint delay is converted to a sample
/// index, and `wavelet_dots` contiguous samples starting there are copied
/// into the contribution array at the pixel's position. Pixels carrying
/// the sentinel delay, or whose window would run outside the trace, stay
/// zero. Every pixel is independent, so the loop parallelizes over trail
/// rows.
#[derive(Debug, Clone)]
pub struct DataSpreader {
    wavelet_dots: usize,
}

impl DataSpreader {
    pub fn new(wavelet_dots: usize) -> GprResult<Self> {
        if wavelet_dots == 0 {
            return Err(GprError::Config(
                "wavelet width must be at least one sample".to_string(),
            ));
        }
        Ok(Self { wavelet_dots })
    }

    pub fn wavelet_dots(&self) -> usize {
        self.wavelet_dots
    }

    /// Compute one trace's contribution to the output image
    pub fn spread<T>(&self, hint: &MapHint, trace: &Trace<T>) -> GprResult<OutputContribution<T>>
    where
        T: Copy + Zero + Send + Sync,
    {
        let (n_trail, n_depth) = hint.delays.dim();
        let axis = trace.time_axis();
        let samples = trace.samples().view();
        let width = self.wavelet_dots;
        let mut contribution = Array3::zeros((n_trail, n_depth, width));

        #[cfg(feature = "parallel")]
        {
            Zip::from(contribution.outer_iter_mut())
                .and(hint.delays.outer_iter())
                .par_for_each(|row, hint_row| {
                    spread_row(row, hint_row, &samples, axis.start, axis.sample_interval, width);
                });
        }
        #[cfg(not(feature = "parallel"))]
        {
            Zip::from(contribution.outer_iter_mut())
                .and(hint.delays.outer_iter())
                .for_each(|row, hint_row| {
                    spread_row(row, hint_row, &samples, axis.start, axis.sample_interval, width);
                });
        }

        Ok(contribution)
    }
}

/// One trace's contribution: grid shape x wavelet width
pub type OutputContribution<T> = Array3<T>;

fn spread_row<T: Copy>(
    mut row: ArrayViewMut2<'_, T>,
    hint_row: ArrayView1<'_, f64>,
    samples: &ArrayView1<'_, T>,
    time_start: f64,
    sample_interval: f64,
    width: usize,
) {
    let n_samples = samples.len() as i64;
    for (idx_z, &delay) in hint_row.iter().enumerate() {
        // Sentinel: pixel outside the beam or skipped by the solver
        if delay == 0.0 {
            continue;
        }
        let index = ((delay + time_start) / sample_interval).floor() as i64;
        if index < 0 || index + width as i64 > n_samples - 1 {
            continue;
        }
        let start = index as usize;
        for k in 0..width {
            row[[idx_z, k]] = samples[start + k];
        }
    }
}
