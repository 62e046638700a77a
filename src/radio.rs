//! Contract of the transceiver that illuminates the target and delivers the
//! received baseband.

use std::ops::{Deref, DerefMut};

use log::debug;
use num::complex::Complex64;
use num::traits::FloatConst;
use serde::Serialize;

use crate::common::Real;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadioConfig {
    pub sample_rate: Real,
    pub center_freq: Real,
    pub rx_gain_db: [Real; 2],
    pub tx_gain_db: [Real; 2],
    /// Samples per channel returned by each `receive_block`.
    pub buffer_size: usize,
}

pub trait RadioFrontEnd {
    fn configure(&mut self, config: &RadioConfig) -> Result<()>;

    /// Start repeating `waveform` indefinitely on both transmit channels.
    fn transmit_continuous(&mut self, waveform: &[Complex64]) -> Result<()>;

    /// Block until the next buffer of both receive channels is available.
    fn receive_block(&mut self) -> Result<(Vec<Complex64>, Vec<Complex64>)>;

    /// Stop transmitting and release the device.
    fn close(&mut self);
}

/// Keeps a configured front-end open and closes it when dropped, including
/// when the acquisition ends with an error.
pub struct RadioSession<'a, R: RadioFrontEnd + ?Sized> {
    radio: &'a mut R,
}

impl<'a, R: RadioFrontEnd + ?Sized> RadioSession<'a, R> {
    pub fn open(radio: &'a mut R, config: &RadioConfig) -> Result<Self> {
        radio.configure(config)?;
        debug!(
            "Radio configured: {} S/s at {} Hz, {} samples per block",
            config.sample_rate, config.center_freq, config.buffer_size
        );
        Ok(Self { radio })
    }
}

impl<'a, R: RadioFrontEnd + ?Sized> Deref for RadioSession<'a, R> {
    type Target = R;

    fn deref(&self) -> &R {
        self.radio
    }
}

impl<'a, R: RadioFrontEnd + ?Sized> DerefMut for RadioSession<'a, R> {
    fn deref_mut(&mut self) -> &mut R {
        self.radio
    }
}

impl<'a, R: RadioFrontEnd + ?Sized> Drop for RadioSession<'a, R> {
    fn drop(&mut self) {
        self.radio.close();
        debug!("Radio closed");
    }
}

/// Continuous-wave reference at `tone_freq` relative to the carrier.
pub fn reference_tone(sample_rate: Real, tone_freq: Real, amplitude: Real, len: usize) -> Vec<Complex64> {
    (0..len)
        .map(|n| {
            let t = n as Real / sample_rate;
            Complex64::from_polar(amplitude, 2.0 * Real::PI() * tone_freq * t)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[derive(Default)]
    struct Recorder {
        configured: bool,
        closed: bool,
        fail_configure: bool,
    }

    impl RadioFrontEnd for Recorder {
        fn configure(&mut self, _config: &RadioConfig) -> Result<()> {
            if self.fail_configure {
                return Err(Error::HardwareIo("no device".into()));
            }
            self.configured = true;
            Ok(())
        }

        fn transmit_continuous(&mut self, _waveform: &[Complex64]) -> Result<()> {
            Ok(())
        }

        fn receive_block(&mut self) -> Result<(Vec<Complex64>, Vec<Complex64>)> {
            Err(Error::HardwareIo("not streaming".into()))
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    fn config() -> RadioConfig {
        RadioConfig {
            sample_rate: 1.0e6,
            center_freq: 2.3e9,
            rx_gain_db: [50.0, 50.0],
            tx_gain_db: [-5.0, -5.0],
            buffer_size: 16,
        }
    }

    #[test]
    fn session_closes_on_error_exit() {
        let mut radio = Recorder::default();
        let result = (|| -> Result<()> {
            let mut session = RadioSession::open(&mut radio, &config())?;
            session.receive_block()?;
            Ok(())
        })();

        assert!(result.is_err());
        assert!(radio.configured);
        assert!(radio.closed);
    }

    #[test]
    fn failed_configure_leaves_radio_untouched() {
        let mut radio = Recorder {
            fail_configure: true,
            ..Recorder::default()
        };
        assert!(RadioSession::open(&mut radio, &config()).is_err());
        assert!(!radio.closed);
    }

    #[test]
    fn reference_tone_has_constant_envelope() {
        let tone = reference_tone(600_000.0, 100_000.0, 0.5, 600);
        assert_eq!(tone.len(), 600);
        assert!(tone.iter().all(|x| (x.norm() - 0.5).abs() < 1e-12));
        // 100 kHz at 600 kS/s repeats every six samples.
        assert!((tone[6] - tone[0]).norm() < 1e-9);
    }
}
