use ndarray::{Array1, Array3};
use num_complex::Complex;
use serde::{Deserialize, Serialize};

/// Complex-valued trace sample (I + jQ)
pub type GprComplex = Complex<f64>;

/// Real-valued trace sample
pub type GprReal = f64;

/// Accumulated back-projection image (trail x depth x wavelet)
pub type OutputImage<T> = Array3<T>;

/// Free-space wave speed in meters per nanosecond
pub const DEFAULT_SPEED_OF_LIGHT: f64 = 0.3;

/// Antenna position in survey coordinates (meters)
///
/// Transmitter and receiver positions may differ (bistatic) or coincide
/// (monostatic). The z axis points up: antennas sit at z >= 0, subsurface
/// pixels at z < 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AntennaPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AntennaPosition {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Squared-cosine beam thresholds used by the pixel visibility test
#[derive(Debug, Clone, Copy)]
pub struct BeamBounds {
    pub left: f64,
    pub right: f64,
}

/// Antenna radiation cone as an angular half-aperture pair (radians)
///
/// The left and right apertures may differ to model a forward or backward
/// pointing lobe. Converted to squared-cosine bounds so the per-pixel cone
/// test needs no inverse trigonometric call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AntennaBeam {
    pub left: f64,
    pub right: f64,
}

impl AntennaBeam {
    pub fn new(left: f64, right: f64) -> Self {
        Self { left, right }
    }

    /// Squared-cosine thresholds for the cone membership test
    pub fn bounds(&self) -> BeamBounds {
        BeamBounds {
            left: (self.left - 1.5 * std::f64::consts::PI).cos().powi(2),
            right: (self.right - 1.5 * std::f64::consts::PI).cos().powi(2),
        }
    }
}

impl Default for AntennaBeam {
    /// Full-hemisphere beam: every pixel below the antenna is illuminated
    fn default() -> Self {
        Self {
            left: -std::f64::consts::PI,
            right: 2.0 * std::f64::consts::PI,
        }
    }
}

/// Rectangular projection lattice for the output image
///
/// `x` and `y` are paired trail coordinates (one (x, y) pair per trail
/// position), `z` is the depth axis. Immutable once constructed; pixel
/// count is `trail_len() * depth_len()`.
#[derive(Debug, Clone)]
pub struct ProjectionGrid {
    x: Array1<f64>,
    y: Array1<f64>,
    z: Array1<f64>,
}

impl ProjectionGrid {
    pub fn new(x: Array1<f64>, y: Array1<f64>, z: Array1<f64>) -> GprResult<Self> {
        if x.len() != y.len() {
            return Err(GprError::Config(format!(
                "trail axes must pair up: |X| = {}, |Y| = {}",
                x.len(),
                y.len()
            )));
        }
        if x.is_empty() || z.is_empty() {
            return Err(GprError::Config(
                "projection grid must contain at least one pixel".to_string(),
            ));
        }
        Ok(Self { x, y, z })
    }

    /// 2-D survey grid: trail along x at y = 0
    pub fn planar(x: Array1<f64>, z: Array1<f64>) -> GprResult<Self> {
        let y = Array1::zeros(x.len());
        Self::new(x, y, z)
    }

    pub fn x(&self) -> &Array1<f64> {
        &self.x
    }

    pub fn y(&self) -> &Array1<f64> {
        &self.y
    }

    pub fn z(&self) -> &Array1<f64> {
        &self.z
    }

    pub fn trail_len(&self) -> usize {
        self.x.len()
    }

    pub fn depth_len(&self) -> usize {
        self.z.len()
    }

    pub fn pixel_count(&self) -> usize {
        self.x.len() * self.z.len()
    }
}

/// One dielectric layer: `epsilon_r` applies above `depth`
///
/// Depths are negative (below the surface) and listed shallowest first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub epsilon_r: f64,
    pub depth: f64,
}

impl Layer {
    pub fn new(epsilon_r: f64, depth: f64) -> Self {
        Self { epsilon_r, depth }
    }
}

/// Horizontally stratified medium above a target half-space
///
/// An empty layer list means a homogeneous medium with one global wave
/// speed. The wave speed is an explicit field so units other than m/ns
/// can be used consistently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerProfile {
    layers: Vec<Layer>,
    speed_of_light: f64,
}

impl LayerProfile {
    pub fn new(layers: Vec<Layer>) -> GprResult<Self> {
        Self::with_speed_of_light(layers, DEFAULT_SPEED_OF_LIGHT)
    }

    pub fn with_speed_of_light(layers: Vec<Layer>, speed_of_light: f64) -> GprResult<Self> {
        if !(speed_of_light > 0.0) {
            return Err(GprError::Config(format!(
                "wave speed must be positive, got {}",
                speed_of_light
            )));
        }
        for layer in &layers {
            if !(layer.epsilon_r >= 1.0) {
                return Err(GprError::Config(format!(
                    "relative permittivity must be >= 1, got {}",
                    layer.epsilon_r
                )));
            }
            if !(layer.depth < 0.0) {
                return Err(GprError::Config(format!(
                    "interface depth must be below the surface (z < 0), got {}",
                    layer.depth
                )));
            }
        }
        for pair in layers.windows(2) {
            if pair[1].depth >= pair[0].depth {
                return Err(GprError::Config(format!(
                    "interface depths must strictly decrease, got {} then {}",
                    pair[0].depth, pair[1].depth
                )));
            }
        }
        Ok(Self {
            layers,
            speed_of_light,
        })
    }

    /// Homogeneous vacuum-equivalent medium
    pub fn vacuum() -> Self {
        Self {
            layers: Vec::new(),
            speed_of_light: DEFAULT_SPEED_OF_LIGHT,
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn speed_of_light(&self) -> f64 {
        self.speed_of_light
    }
}

/// Uniform sampling axis of a trace: start time plus sample interval (ns)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeAxis {
    pub start: f64,
    pub sample_interval: f64,
}

impl TimeAxis {
    pub fn new(start: f64, sample_interval: f64) -> GprResult<Self> {
        if !(sample_interval > 0.0) {
            return Err(GprError::Config(format!(
                "sample interval must be positive, got {}",
                sample_interval
            )));
        }
        Ok(Self {
            start,
            sample_interval,
        })
    }

    /// Time of sample `i`
    pub fn time_of(&self, i: usize) -> f64 {
        self.start + i as f64 * self.sample_interval
    }
}

/// A raw radar trace: uniformly sampled real or complex sample sequence
#[derive(Debug, Clone)]
pub struct Trace<T> {
    samples: Array1<T>,
    time_axis: TimeAxis,
}

impl<T> Trace<T> {
    pub fn new(samples: Array1<T>, time_axis: TimeAxis) -> GprResult<Self> {
        if samples.is_empty() {
            return Err(GprError::Config("trace must not be empty".to_string()));
        }
        Ok(Self { samples, time_axis })
    }

    pub fn samples(&self) -> &Array1<T> {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut Array1<T> {
        &mut self.samples
    }

    pub fn time_axis(&self) -> TimeAxis {
        self.time_axis
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Error types for back-projection processing
#[derive(Debug, thiserror::Error)]
pub enum GprError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Delay cache mismatch: {0}")]
    CacheMismatch(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Processing error: {0}")]
    Processing(String),
}

/// Result type for back-projection operations
pub type GprResult<T> = Result<T, GprError>;
