//! echomap: A Fast Back-Projection Imager for Layered-Media GPR
//!
//! This library reconstructs 2-D/3-D reflectivity images from raw
//! time-domain radar traces with a delay-and-sum back-projection engine.
//! Subsurface travel times account for refraction through horizontally
//! stratified dielectric layers via a Fermat shortest-optical-path solve,
//! memoized in a delay cache that can be shared across batch jobs.

pub mod core;
pub mod io;
pub mod signal;
pub mod types;

// Re-export main types and functions for easier access
pub use types::{
    AntennaBeam, AntennaPosition, GprComplex, GprError, GprReal, GprResult, Layer, LayerProfile,
    OutputImage, ProjectionGrid, TimeAxis, Trace, DEFAULT_SPEED_OF_LIGHT,
};

pub use crate::core::{
    DataSpreader, DelayCache, DelayKey, MapHint, MapHintBuilder, Projecter, TimeDelayProfile,
};

pub use io::{read_image, write_image};
pub use signal::{apply_gain, sec_gain, SecGainParams, SincInterpolator};
