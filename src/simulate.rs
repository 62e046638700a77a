use log::debug;
use ndarray::{Array1, Zip};
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use num::complex::Complex64;
use num::traits::FloatConst;

use crate::common::{Decibel, Real, Units, SPEED_OF_LIGHT};
use crate::doppler::Geometry;
use crate::error::{Error, Result};
use crate::radio::{RadioConfig, RadioFrontEnd};

/// Loopback front-end: the transmitted reference comes back from a single
/// target moving at a constant radial velocity, plus receiver noise on each
/// channel.
pub struct SimulatedRadio {
    target_velocity: Real,
    geometry: Geometry,
    noise: Option<Decibel>,
    fail_after: Option<usize>,
    config: Option<RadioConfig>,
    waveform: Vec<Complex64>,
    position: usize,
    blocks: usize,
    closed: bool,
}

impl SimulatedRadio {
    pub fn new(target_velocity: Real) -> Self {
        Self {
            target_velocity,
            geometry: Geometry::TwoWay,
            noise: None,
            fail_after: None,
            config: None,
            waveform: Vec::new(),
            position: 0,
            blocks: 0,
            closed: false,
        }
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Complex Gaussian noise with total power `level` on each channel.
    pub fn with_noise<L: Into<Decibel>>(mut self, level: L) -> Self {
        self.noise = Some(level.into());
        self
    }

    /// Report a hardware fault once `blocks` blocks have been delivered.
    pub fn failing_after(mut self, blocks: usize) -> Self {
        self.fail_after = Some(blocks);
        self
    }

    pub fn blocks_delivered(&self) -> usize {
        self.blocks
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn doppler_shift(&self, center_freq: Real) -> Real {
        self.target_velocity * self.geometry.path_factor() * center_freq / SPEED_OF_LIGHT
    }

    fn noise(&self, len: usize) -> Array1<Complex64> {
        match self.noise {
            Some(level) => {
                let s: Real = level.ratio().value() / Real::SQRT_2();
                let im = s * Array1::random(len, StandardNormal);
                let mut re = s * Array1::random(len, StandardNormal);

                Zip::from(&mut re)
                    .and(&im)
                    .apply_collect(|&mut re, &im| Complex64::new(re, im))
            }
            None => Array1::from_elem(len, Complex64::new(0.0, 0.0)),
        }
    }

    fn echo(&self, config: &RadioConfig) -> Vec<Complex64> {
        if self.waveform.is_empty() {
            return vec![Complex64::new(0.0, 0.0); config.buffer_size];
        }
        let shift = self.doppler_shift(config.center_freq);
        (self.position..self.position + config.buffer_size)
            .map(|m| {
                let cycles = (shift * m as Real / config.sample_rate).fract();
                self.waveform[m % self.waveform.len()]
                    * Complex64::from_polar(1.0, 2.0 * Real::PI() * cycles)
            })
            .collect()
    }
}

impl RadioFrontEnd for SimulatedRadio {
    fn configure(&mut self, config: &RadioConfig) -> Result<()> {
        if config.buffer_size == 0 {
            return Err(Error::HardwareIo("buffer size must be positive".into()));
        }
        if config.sample_rate <= 0.0 {
            return Err(Error::HardwareIo(format!(
                "unsupported sample rate {}",
                config.sample_rate
            )));
        }
        self.config = Some(config.clone());
        self.position = 0;
        self.blocks = 0;
        self.closed = false;
        Ok(())
    }

    fn transmit_continuous(&mut self, waveform: &[Complex64]) -> Result<()> {
        if self.config.is_none() {
            return Err(Error::HardwareIo("transmit before configure".into()));
        }
        self.waveform = waveform.to_vec();
        debug!("Transmitting {} sample cyclic buffer", waveform.len());
        Ok(())
    }

    fn receive_block(&mut self) -> Result<(Vec<Complex64>, Vec<Complex64>)> {
        let config = match (&self.config, self.closed) {
            (Some(config), false) => config.clone(),
            _ => return Err(Error::HardwareIo("receive on a closed radio".into())),
        };
        if let Some(limit) = self.fail_after {
            if self.blocks >= limit {
                return Err(Error::HardwareIo(format!(
                    "receive failed after {} blocks",
                    self.blocks
                )));
            }
        }

        let echo = Array1::from(self.echo(&config));
        let channel0 = &echo + &self.noise(config.buffer_size);
        let channel1 = &echo + &self.noise(config.buffer_size);

        self.position += config.buffer_size;
        self.blocks += 1;
        Ok((channel0.to_vec(), channel1.to_vec()))
    }

    fn close(&mut self) {
        self.waveform.clear();
        self.closed = true;
    }
}
