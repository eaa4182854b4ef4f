use nalgebra::{DMatrix, DVector};

/// Outcome of a shortest-optical-path solve
#[derive(Debug, Clone)]
pub struct FermatSolve {
    /// Horizontal offsets of the intermediate interface crossings (meters)
    pub offsets: Vec<f64>,
    /// Total optical path length sum(w_i * |p_{i+1} - p_i|) at the optimum
    pub optical_length: f64,
    pub converged: bool,
    pub iterations: usize,
}

/// Damped Newton solver for the discrete Fermat's-principle ray path
///
/// The ray runs from the antenna at (0, depths[0]) through one crossing
/// point per intermediate interface (unknown horizontal offset, fixed
/// depth) to the pixel at (range, depths[n]). Each segment i is weighted
/// by sqrt(epsilon_r) of its medium. The weighted-path-length objective is
/// convex in the unknown offsets for monotone depths and weights >= 1, so
/// the local optimum found from the zero-offset seed is global.
#[derive(Debug, Clone)]
pub struct FermatSolver {
    pub max_iterations: usize,
    pub step_tolerance: f64,
    pub gradient_tolerance: f64,
    pub damping: f64,
}

impl Default for FermatSolver {
    fn default() -> Self {
        Self {
            max_iterations: 60,
            step_tolerance: 1e-9,
            gradient_tolerance: 1e-10,
            damping: 1e-12,
        }
    }
}

// Shortest representable segment length; guards the 1/d terms when the
// antenna sits exactly on an interface.
const MIN_SEGMENT: f64 = 1e-12;

impl FermatSolver {
    /// Solve for the interface crossing offsets minimizing the optical path
    ///
    /// `depths` holds the n+1 point depths (antenna, interfaces, pixel) and
    /// `weights` the n per-segment sqrt(epsilon_r) factors. A result with
    /// `converged == false` must not be trusted as a travel time.
    pub fn solve(&self, depths: &[f64], weights: &[f64], range: f64) -> FermatSolve {
        debug_assert_eq!(depths.len(), weights.len() + 1);
        let n_unknown = weights.len().saturating_sub(1);
        if n_unknown == 0 {
            let dz = depths[depths.len() - 1] - depths[0];
            return FermatSolve {
                offsets: Vec::new(),
                optical_length: weights[0] * (range * range + dz * dz).sqrt(),
                converged: true,
                iterations: 0,
            };
        }

        // Full offset sequence including the fixed endpoints; unknowns are
        // x[1..=n_unknown], seeded at zero
        let mut x = vec![0.0; depths.len()];
        x[depths.len() - 1] = range;

        let mut converged = false;
        let mut iterations = 0;
        for iter in 0..self.max_iterations {
            iterations = iter + 1;

            let mut grad = DVector::<f64>::zeros(n_unknown);
            let mut hess = DMatrix::<f64>::zeros(n_unknown, n_unknown);
            for i in 0..weights.len() {
                let dx = x[i + 1] - x[i];
                let dz = depths[i + 1] - depths[i];
                let d = (dx * dx + dz * dz).sqrt().max(MIN_SEGMENT);
                let slope = weights[i] * dx / d;
                // d^2(w*d)/dx^2 = w * dz^2 / d^3 for both segment endpoints
                let curv = weights[i] * dz * dz / (d * d * d);

                // Segment i couples unknowns i-1 and i (0-based unknown
                // indices; segment endpoints are points i and i+1)
                if i >= 1 {
                    grad[i - 1] -= slope;
                    hess[(i - 1, i - 1)] += curv;
                }
                if i < n_unknown {
                    grad[i] += slope;
                    hess[(i, i)] += curv;
                }
                if i >= 1 && i < n_unknown {
                    hess[(i - 1, i)] -= curv;
                    hess[(i, i - 1)] -= curv;
                }
            }

            if grad.amax() < self.gradient_tolerance {
                converged = true;
                break;
            }

            for k in 0..n_unknown {
                hess[(k, k)] += self.damping;
            }
            let step = match hess.lu().solve(&(-&grad)) {
                Some(step) => step,
                None => break,
            };
            if step.iter().any(|s| !s.is_finite()) {
                break;
            }
            for k in 0..n_unknown {
                x[k + 1] += step[k];
            }
            if step.amax() < self.step_tolerance {
                converged = true;
                break;
            }
        }

        // The physical crossing points of a refracted ray stay inside the
        // horizontal span of the endpoints; anything else is a runaway
        // iterate, reported as non-convergence
        if converged {
            let lo = range.min(0.0);
            let hi = range.max(0.0);
            let tol = 1e-6 * (1.0 + range.abs());
            if x[1..=n_unknown]
                .iter()
                .any(|&xi| xi < lo - tol || xi > hi + tol)
            {
                converged = false;
            }
        }

        let mut optical_length = 0.0;
        for i in 0..weights.len() {
            let dx = x[i + 1] - x[i];
            let dz = depths[i + 1] - depths[i];
            optical_length += weights[i] * (dx * dx + dz * dz).sqrt();
        }

        FermatSolve {
            offsets: x[1..=n_unknown].to_vec(),
            optical_length,
            converged,
            iterations,
        }
    }
}
