use crate::core::delay_cache::{DelayCache, DelayKey};
use crate::core::fermat::FermatSolver;
use crate::types::{GprError, GprResult, LayerProfile};

/// One-way travel-time model for a layered medium
///
/// Computes the delay between an antenna above the surface and a subsurface
/// point, memoizing results in a [`DelayCache`] keyed by the canonical
/// relative geometry. Deterministic for a fixed layer profile.
///
/// The layer count selects the code path: zero layers is the straight-line
/// Euclidean case, a single traversed medium is a closed-form weighted
/// segment, and two or more traversed media go through the Fermat
/// shortest-optical-path solve.
pub struct TimeDelayProfile {
    profile: LayerProfile,
    cache: DelayCache,
    solver: FermatSolver,
    non_converged: u64,
}

impl TimeDelayProfile {
    /// Wrap a layer profile and its cache; the cache must have been opened
    /// against the same profile
    pub fn new(profile: LayerProfile, cache: DelayCache) -> GprResult<Self> {
        if cache.profile() != &profile {
            return Err(GprError::CacheMismatch(format!(
                "cache was opened for {:?}, profile is {:?}",
                cache.profile(),
                profile
            )));
        }
        Ok(Self {
            profile,
            cache,
            solver: FermatSolver::default(),
            non_converged: 0,
        })
    }

    /// Convenience constructor with a fresh in-memory cache
    pub fn in_memory(profile: LayerProfile) -> Self {
        let cache = DelayCache::in_memory(profile.clone());
        Self {
            profile,
            cache,
            solver: FermatSolver::default(),
            non_converged: 0,
        }
    }

    /// One-way delay in nanoseconds for a pixel at horizontal offset
    /// (`rel_x`, `rel_y`) from the antenna and absolute depth `pixel_z`,
    /// seen from an antenna at height `antenna_z`
    ///
    /// `Ok(None)` marks a pixel whose refraction solve did not converge;
    /// the caller should skip it rather than accumulate a wrong travel
    /// time. Configuration errors (a pixel below the deepest described
    /// interface) abort the reconstruction.
    pub fn one_way_delay(
        &mut self,
        rel_x: f64,
        rel_y: f64,
        pixel_z: f64,
        antenna_z: f64,
    ) -> GprResult<Option<f64>> {
        let range = (rel_x * rel_x + rel_y * rel_y).sqrt();
        let key = DelayKey::new(range, pixel_z, antenna_z);
        if let Some(delay) = self.cache.get(&key) {
            return Ok(Some(delay));
        }
        match self.compute(range, pixel_z, antenna_z)? {
            Some(delay) => {
                self.cache.put(key, delay);
                Ok(Some(delay))
            }
            None => {
                self.non_converged += 1;
                Ok(None)
            }
        }
    }

    fn compute(&self, range: f64, pixel_z: f64, antenna_z: f64) -> GprResult<Option<f64>> {
        let c = self.profile.speed_of_light();
        if self.profile.layers().is_empty() {
            let dz = pixel_z - antenna_z;
            return Ok(Some((range * range + dz * dz).sqrt() / c));
        }

        // Incident points: antenna, one crossing per interface above the
        // pixel, then the pixel itself inside the first layer containing it
        let mut depths = vec![antenna_z];
        let mut weights = Vec::new();
        let mut terminated = false;
        for layer in self.profile.layers() {
            weights.push(layer.epsilon_r.sqrt());
            if pixel_z < layer.depth {
                depths.push(layer.depth);
            } else {
                depths.push(pixel_z);
                terminated = true;
                break;
            }
        }
        if !terminated || weights.is_empty() {
            return Err(GprError::Config(format!(
                "pixel at depth {} m lies below the deepest described interface; \
                 extend the layer profile to cover the target half-space",
                pixel_z
            )));
        }

        if weights.len() == 1 {
            let dz = pixel_z - antenna_z;
            return Ok(Some((range * range + dz * dz).sqrt() / c * weights[0]));
        }

        let solve = self.solver.solve(&depths, &weights, range);
        if !solve.converged {
            log::warn!(
                "Refraction solve did not converge after {} iterations \
                 (range {:.3} m, pixel depth {:.3} m)",
                solve.iterations,
                range,
                pixel_z
            );
            return Ok(None);
        }
        Ok(Some(solve.optical_length / c))
    }

    /// Pixels skipped so far because the refraction solve failed
    pub fn non_converged(&self) -> u64 {
        self.non_converged
    }

    pub fn profile(&self) -> &LayerProfile {
        &self.profile
    }

    pub fn cache(&self) -> &DelayCache {
        &self.cache
    }

    /// Persist the memoized delays to the cache's backing store
    pub fn persist_cache(&mut self) -> GprResult<()> {
        self.cache.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Layer;
    use approx::assert_relative_eq;

    #[test]
    fn test_vacuum_delay_is_euclidean() {
        let mut profile = TimeDelayProfile::in_memory(LayerProfile::vacuum());
        // 3 m straight down at 0.3 m/ns
        let delay = profile.one_way_delay(0.0, 0.0, -3.0, 0.0).unwrap().unwrap();
        assert_relative_eq!(delay, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_vacuum_delay_over_random_offsets() {
        let mut profile = TimeDelayProfile::in_memory(LayerProfile::vacuum());
        // Low-discrepancy sweep standing in for random sampling
        let mut u = 0.5f64;
        for _ in 0..64 {
            u = (u + 0.618_033_988_749_895) % 1.0;
            let x = 8.0 * u - 4.0;
            let y = 6.0 * ((u * 7.0) % 1.0) - 3.0;
            let z = -0.1 - 5.0 * ((u * 13.0) % 1.0);
            let za = 0.5 * ((u * 3.0) % 1.0);
            let delay = profile.one_way_delay(x, y, z, za).unwrap().unwrap();
            let dist = (x * x + y * y + (z - za) * (z - za)).sqrt();
            assert_relative_eq!(delay, dist / 0.3, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_antenna_level_with_pixel_has_no_singularity() {
        let mut profile = TimeDelayProfile::in_memory(LayerProfile::vacuum());
        // Zero vertical offset must not divide by zero
        let delay = profile.one_way_delay(3.0, 0.0, 0.0, 0.0).unwrap().unwrap();
        assert_relative_eq!(delay, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_single_layer_direct_formula() {
        let layers = LayerProfile::new(vec![Layer::new(4.0, -5.0)]).unwrap();
        let mut profile = TimeDelayProfile::in_memory(layers);
        // Pixel inside the first layer: one weighted segment
        let delay = profile.one_way_delay(0.0, 0.0, -3.0, 0.0).unwrap().unwrap();
        assert_relative_eq!(delay, 3.0 / 0.3 * 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_single_layer_agrees_with_general_solver() {
        // Same physical medium described once directly and once split in
        // two, which forces the N-layer optimizer path
        let direct = LayerProfile::new(vec![Layer::new(6.25, -5.0)]).unwrap();
        let split = LayerProfile::new(vec![
            Layer::new(6.25, -1.0),
            Layer::new(6.25, -5.0),
        ])
        .unwrap();
        let mut direct = TimeDelayProfile::in_memory(direct);
        let mut split = TimeDelayProfile::in_memory(split);

        for (x, z) in [(0.0, -3.0), (1.5, -2.0), (4.0, -4.5), (-2.5, -1.25)] {
            let a = direct.one_way_delay(x, 0.0, z, 0.0).unwrap().unwrap();
            let b = split.one_way_delay(x, 0.0, z, 0.0).unwrap().unwrap();
            assert_relative_eq!(a, b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_two_layer_refraction_bends_toward_the_slow_medium() {
        let layers = LayerProfile::new(vec![
            Layer::new(1.0, -1.0),
            Layer::new(9.0, -10.0),
        ])
        .unwrap();
        let mut profile = TimeDelayProfile::in_memory(layers);
        let refracted = profile.one_way_delay(3.0, 0.0, -2.0, 0.0).unwrap().unwrap();

        // Straight-line time through the same stack is an upper bound on
        // the Fermat path and the vertical-only time a lower bound
        let straight = {
            let d_total = (3.0f64 * 3.0 + 2.0 * 2.0).sqrt();
            let frac_upper = 1.0 / 2.0;
            d_total * frac_upper / 0.3 + d_total * (1.0 - frac_upper) / 0.3 * 3.0
        };
        assert!(refracted < straight + 1e-9);
        assert!(refracted > (1.0 / 0.3) + (1.0 / 0.3 * 3.0) - 1e-9);
    }

    #[test]
    fn test_pixel_below_described_stack_is_fatal() {
        let layers = LayerProfile::new(vec![Layer::new(4.0, -2.0)]).unwrap();
        let mut profile = TimeDelayProfile::in_memory(layers);
        let result = profile.one_way_delay(0.0, 0.0, -3.0, 0.0);
        assert!(matches!(result, Err(GprError::Config(_))));
    }

    #[test]
    fn test_delays_are_memoized() {
        let mut profile = TimeDelayProfile::in_memory(LayerProfile::vacuum());
        profile.one_way_delay(1.0, 2.0, -3.0, 0.0).unwrap();
        assert_eq!(profile.cache().len(), 1);
        // Same geometry from a mirrored horizontal offset hits the entry
        profile.one_way_delay(-1.0, -2.0, -3.0, 0.0).unwrap();
        assert_eq!(profile.cache().len(), 1);
    }
}
