mod acquisition;
mod common;
mod config;
mod doppler;
mod error;
mod radio;
mod series;
pub mod simulate;
pub mod welch;

pub use acquisition::{combine_channels, run, Acquisition, LogObserver, Observer, StopHandle};
pub use common::*;
pub use config::TrackerConfig;
pub use doppler::{convert, DopplerConverter, DopplerEstimate, Geometry};
pub use error::{Error, Result};
pub use radio::{reference_tone, RadioConfig, RadioFrontEnd, RadioSession};
pub use series::{DopplerSample, VelocitySeries};
pub use welch::{estimate_psd, PsdEstimate, Welch, WelchConfig};
