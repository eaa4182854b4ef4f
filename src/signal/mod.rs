//! Trace conditioning: band-limited interpolation and gain compensation

pub mod gain;
pub mod sinc;

pub use gain::{apply_gain, gain_curve, sec_gain, SecGainParams};
pub use sinc::SincInterpolator;
