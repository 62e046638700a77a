//! Welch averaged-periodogram estimate of the power spectral density of a
//! complex baseband block.
//!
//! The block is split into overlapping segments, each segment has its mean
//! removed and is windowed, and the squared FFT magnitudes are averaged. The
//! result is scaled to power per Hz and reordered so that the two-sided
//! spectrum runs from -fs/2 up to just below +fs/2.

use std::sync::Arc;

use ndarray::Array1;
use num::complex::Complex64;
use num::traits::{FloatConst, Zero};
use rustfft::{FFTplanner, FFT};
use serde::{Deserialize, Serialize};

use crate::common::{Real, Storable};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Window {
    Hann,
    Hamming,
    Rectangular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Detrend {
    None,
    /// Subtract the segment mean before windowing.
    Constant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelchConfig {
    pub segment_length: usize,
    pub overlap: usize,
    pub window: Window,
    pub detrend: Detrend,
}

impl WelchConfig {
    /// Hann window, half-segment overlap and mean removal.
    pub fn new(segment_length: usize) -> Self {
        Self {
            segment_length,
            overlap: segment_length / 2,
            window: Window::Hann,
            detrend: Detrend::Constant,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PsdEstimate {
    /// Ascending, in Hz.
    pub frequencies: Array1<Real>,
    /// Power per Hz, one value per frequency.
    pub power: Array1<Real>,
    pub bin_width: Real,
    pub nof_segments: usize,
}

impl PsdEstimate {
    pub fn len(&self) -> usize {
        self.power.len()
    }

    pub fn is_empty(&self) -> bool {
        self.power.is_empty()
    }
}

impl Storable for PsdEstimate {}

// Periodic (DFT-even) windows.
fn window(kind: Window, length: usize) -> Array1<Real> {
    if length == 1 {
        return Array1::ones(1);
    }
    let l = length as Real;
    let n = Array1::linspace(0.0, l - 1.0, length);
    match kind {
        Window::Hann => n.map(|&n| Real::sin(Real::PI() * n / l).powf(2.0)),
        Window::Hamming => n.map(|&n| 0.54 - 0.46 * Real::cos(2.0 * Real::PI() * n / l)),
        Window::Rectangular => Array1::ones(length),
    }
}

fn check_sample_rate(sample_rate: Real) -> Result<()> {
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(Error::Configuration(format!(
            "sample rate must be positive, got {}",
            sample_rate
        )));
    }
    Ok(())
}

/// Reusable estimator holding the FFT plan and window for one segment length.
pub struct Welch {
    config: WelchConfig,
    sample_rate: Real,
    window: Array1<Real>,
    window_energy: Real,
    fft: Arc<dyn FFT<Real>>,
}

impl Welch {
    pub fn new(sample_rate: Real, config: WelchConfig) -> Result<Self> {
        check_sample_rate(sample_rate)?;
        if config.segment_length == 0 {
            return Err(Error::InvalidInput("segment length must be positive".into()));
        }
        if config.overlap >= config.segment_length {
            return Err(Error::Configuration(format!(
                "overlap {} must be shorter than the segment length {}",
                config.overlap, config.segment_length
            )));
        }

        let window = window(config.window, config.segment_length);
        let window_energy = window.dot(&window);

        let mut planner: FFTplanner<Real> = FFTplanner::new(false);
        let fft = planner.plan_fft(config.segment_length);

        Ok(Self {
            config,
            sample_rate,
            window,
            window_energy,
            fft,
        })
    }

    pub fn segment_length(&self) -> usize {
        self.config.segment_length
    }

    pub fn sample_rate(&self) -> Real {
        self.sample_rate
    }

    /// Frequency resolution of one bin.
    pub fn bin_width(&self) -> Real {
        self.sample_rate / self.config.segment_length as Real
    }

    fn frequencies(&self) -> Array1<Real> {
        let n = self.config.segment_length;
        let half = (n / 2) as Real;
        let bin_width = self.bin_width();
        (0..n).map(|k| (k as Real - half) * bin_width).collect()
    }

    pub fn estimate(&self, signal: &[Complex64]) -> Result<PsdEstimate> {
        let n = self.config.segment_length;

        if signal.is_empty() {
            return Err(Error::InvalidInput("empty sample block".into()));
        }
        if n > signal.len() {
            return Err(Error::InvalidInput(format!(
                "segment length {} exceeds block length {}",
                n,
                signal.len()
            )));
        }
        if signal.iter().any(|x| !x.re.is_finite() || !x.im.is_finite()) {
            return Err(Error::InvalidInput("non-finite sample in block".into()));
        }

        let step = n - self.config.overlap;
        let nof_segments = (signal.len() - n) / step + 1;

        let mut accumulated = Array1::<Real>::zeros(n);
        let mut windowed = vec![Complex64::zero(); n];
        let mut spectrum = vec![Complex64::zero(); n];

        for segment in (0..nof_segments).map(|i| &signal[i * step..i * step + n]) {
            let mean = match self.config.detrend {
                Detrend::Constant => segment.iter().sum::<Complex64>() / n as Real,
                Detrend::None => Complex64::zero(),
            };

            windowed
                .iter_mut()
                .zip(segment.iter().zip(self.window.iter()))
                .for_each(|(out, (&x, &w))| *out = (x - mean) * w);

            // The input buffer is used as scratch by the transform.
            self.fft.process(&mut windowed, &mut spectrum);

            accumulated
                .iter_mut()
                .zip(spectrum.iter())
                .for_each(|(acc, x)| *acc += x.norm_sqr());
        }

        let scale = 1.0 / (self.sample_rate * self.window_energy * nof_segments as Real);

        // Move negative frequencies in front of DC.
        let half = n / 2;
        let power: Array1<Real> = (0..n)
            .map(|k| accumulated[(k + n - half) % n] * scale)
            .collect();

        Ok(PsdEstimate {
            frequencies: self.frequencies(),
            power,
            bin_width: self.bin_width(),
            nof_segments,
        })
    }
}

/// One-shot Welch estimate with the default segment settings.
pub fn estimate_psd(
    signal: &[Complex64],
    sample_rate: Real,
    segment_length: usize,
) -> Result<PsdEstimate> {
    if signal.is_empty() {
        return Err(Error::InvalidInput("empty sample block".into()));
    }
    Welch::new(sample_rate, WelchConfig::new(segment_length))?.estimate(signal)
}
