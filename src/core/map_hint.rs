use crate::core::delay::TimeDelayProfile;
use crate::types::{AntennaBeam, AntennaPosition, GprResult, ProjectionGrid};
use ndarray::Array2;

/// Per-pixel combined transmit + receive delay over a projection grid
///
/// A value of 0 is the sentinel for "no contribution": the pixel is
/// outside the beam cone, above the antenna, or its refraction solve
/// failed. Illuminated pixels always carry a strictly positive delay.
#[derive(Debug, Clone)]
pub struct MapHint {
    pub delays: Array2<f64>,
    pub illuminated: usize,
    pub non_converged: usize,
}

/// Builds the delay map for one antenna geometry over a projection grid
#[derive(Debug, Clone)]
pub struct MapHintBuilder {
    beam: AntennaBeam,
}

impl MapHintBuilder {
    pub fn new(beam: AntennaBeam) -> Self {
        Self { beam }
    }

    pub fn beam(&self) -> AntennaBeam {
        self.beam
    }

    /// Compute the map hint for a transmitter/receiver pair
    ///
    /// Per pixel: pick the beam bound per side from the sign of the
    /// horizontal offset (the lobe is wider on one side), test cone
    /// membership with the squared-cosine comparison, and for illuminated
    /// pixels sum the two one-way delays from the profile. Pixels whose
    /// refraction solve fails keep the sentinel and are tallied.
    pub fn build(
        &self,
        grid: &ProjectionGrid,
        tx: &AntennaPosition,
        rx: &AntennaPosition,
        profile: &mut TimeDelayProfile,
    ) -> GprResult<MapHint> {
        let bounds = self.beam.bounds();
        let n_trail = grid.trail_len();
        let n_depth = grid.depth_len();
        let mut delays = Array2::zeros((n_trail, n_depth));
        let mut illuminated = 0;
        let mut non_converged = 0;

        for idx_xy in 0..n_trail {
            let xt = grid.x()[idx_xy] - tx.x;
            let yt = grid.y()[idx_xy] - tx.y;
            let xr = grid.x()[idx_xy] - rx.x;
            let yr = grid.y()[idx_xy] - rx.y;
            let bound_t = if xt < 0.0 { bounds.left } else { bounds.right };
            let bound_r = if xr < 0.0 { bounds.left } else { bounds.right };

            for idx_z in 0..n_depth {
                let z = grid.z()[idx_z];
                let zt = z - tx.z;
                let zr = z - rx.z;
                let rt_sq = xt * xt + yt * yt + zt * zt;
                let rr_sq = xr * xr + yr * yr + zr * zr;

                if zt < 0.0 && zt * zt >= bound_t * rt_sq && zr * zr >= bound_r * rr_sq {
                    let delay_tx = profile.one_way_delay(xt, yt, z, tx.z)?;
                    let delay_rx = profile.one_way_delay(xr, yr, z, rx.z)?;
                    match (delay_tx, delay_rx) {
                        (Some(t), Some(r)) => {
                            delays[[idx_xy, idx_z]] = t + r;
                            illuminated += 1;
                        }
                        _ => non_converged += 1,
                    }
                }
            }
        }

        if non_converged > 0 {
            log::warn!(
                "Map hint: {} pixels skipped due to non-converged refraction solves",
                non_converged
            );
        }
        log::debug!(
            "Map hint: {} of {} pixels illuminated",
            illuminated,
            grid.pixel_count()
        );

        Ok(MapHint {
            delays,
            illuminated,
            non_converged,
        })
    }
}
