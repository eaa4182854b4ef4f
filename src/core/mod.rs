//! Core back-projection processing modules

pub mod delay;
pub mod delay_cache;
pub mod fermat;
pub mod map_hint;
pub mod projecter;
pub mod spread;

// Re-export main types
pub use delay::TimeDelayProfile;
pub use delay_cache::{DelayCache, DelayKey};
pub use fermat::{FermatSolve, FermatSolver};
pub use map_hint::{MapHint, MapHintBuilder};
pub use projecter::Projecter;
pub use spread::{DataSpreader, OutputContribution};
