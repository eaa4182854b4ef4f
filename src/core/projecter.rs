use crate::core::delay::TimeDelayProfile;
use crate::core::map_hint::{MapHint, MapHintBuilder};
use crate::core::spread::DataSpreader;
use crate::types::{
    AntennaBeam, AntennaPosition, GprError, GprResult, OutputImage, ProjectionGrid, Trace,
};
use ndarray::{ArrayView3, Zip};
use num_traits::Zero;

/// Back-projection orchestrator
///
/// Owns the accumulating output image for one survey. Each trace is turned
/// into a map hint for its antenna geometry, spread into a contribution,
/// and summed into the image; accumulation is commutative, so trace order
/// does not matter. The image is exported read-only.
pub struct Projecter<T> {
    grid: ProjectionGrid,
    builder: MapHintBuilder,
    spreader: DataSpreader,
    image: OutputImage<T>,
    trace_count: usize,
}

impl<T> Projecter<T>
where
    T: Copy + Zero + Send + Sync,
{
    pub fn new(grid: ProjectionGrid, beam: AntennaBeam, wavelet_dots: usize) -> GprResult<Self> {
        let spreader = DataSpreader::new(wavelet_dots)?;
        let image = OutputImage::zeros((grid.trail_len(), grid.depth_len(), wavelet_dots));
        log::info!(
            "Projecter ready: {} x {} grid, wavelet width {}",
            grid.trail_len(),
            grid.depth_len(),
            wavelet_dots
        );
        Ok(Self {
            grid,
            builder: MapHintBuilder::new(beam),
            spreader,
            image,
            trace_count: 0,
        })
    }

    /// Delay map for one antenna geometry; reusable across traces when the
    /// geometry does not move (the common monostatic-grid case)
    pub fn build_map_hint(
        &self,
        tx: &AntennaPosition,
        rx: &AntennaPosition,
        profile: &mut TimeDelayProfile,
    ) -> GprResult<MapHint> {
        self.builder.build(&self.grid, tx, rx, profile)
    }

    /// Project one trace with its own antenna geometry into the image
    pub fn project(
        &mut self,
        trace: &Trace<T>,
        tx: &AntennaPosition,
        rx: &AntennaPosition,
        profile: &mut TimeDelayProfile,
    ) -> GprResult<()> {
        let hint = self.build_map_hint(tx, rx, profile)?;
        self.project_with_hint(trace, &hint)
    }

    /// Project one trace using a precomputed map hint
    pub fn project_with_hint(&mut self, trace: &Trace<T>, hint: &MapHint) -> GprResult<()> {
        if hint.delays.dim() != (self.grid.trail_len(), self.grid.depth_len()) {
            return Err(GprError::Config(format!(
                "map hint shape {:?} does not match grid {} x {}",
                hint.delays.dim(),
                self.grid.trail_len(),
                self.grid.depth_len()
            )));
        }
        let contribution = self.spreader.spread(hint, trace)?;
        Zip::from(&mut self.image)
            .and(&contribution)
            .for_each(|acc, &c| *acc = *acc + c);
        self.trace_count += 1;
        log::debug!("Accumulated trace {} into the image", self.trace_count);
        Ok(())
    }

    /// Read-only view of the accumulated image
    pub fn image(&self) -> ArrayView3<'_, T> {
        self.image.view()
    }

    pub fn grid(&self) -> &ProjectionGrid {
        &self.grid
    }

    pub fn trace_count(&self) -> usize {
        self.trace_count
    }

    pub fn wavelet_dots(&self) -> usize {
        self.spreader.wavelet_dots()
    }
}
