//! Time-scale modification: pitch-period estimation and the overlap-add
//! scaler.

pub mod pitch;
pub mod sola;

pub use pitch::PitchPeriodEstimator;
pub use sola::SolaEngine;
