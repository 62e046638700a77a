use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::common::{Decibel, Real, SPEED_OF_LIGHT};
use crate::doppler::{DopplerConverter, Geometry};
use crate::error::{Error, Result};
use crate::radio::RadioConfig;
use crate::welch::{Detrend, Window, WelchConfig};

/// Startup parameters of a tracking session. Every field has a default, so a
/// YAML file only needs to list what differs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub sample_rate: Real,
    pub center_freq: Real,
    /// Analysis window; also the Welch segment length.
    pub fft_size: usize,
    pub buffer_size: usize,
    pub rx_gain_db: [Real; 2],
    pub tx_gain_db: [Real; 2],
    /// Baseband offset of the transmitted reference tone.
    pub tone_freq: Real,
    pub tone_amplitude: Real,
    /// Subtract `tone_freq` from the spectral peak before converting. Off by
    /// default: the peak itself is reported as the shift.
    pub compensate_tone_offset: bool,
    pub window: Window,
    pub detrend: Detrend,
    pub speed_of_light: Real,
    pub geometry: Geometry,
    pub duration_s: Real,
    /// Blocks whose peak is weaker than this above the noise floor are dropped.
    pub min_snr: Option<Decibel>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 0.6e6,
            center_freq: 2.3e9,
            fft_size: 1024 * 4,
            buffer_size: 1024 * 4,
            rx_gain_db: [50.0, 50.0],
            tx_gain_db: [-5.0, -5.0],
            tone_freq: 100e3,
            tone_amplitude: 0.5,
            compensate_tone_offset: false,
            window: Window::Hann,
            detrend: Detrend::Constant,
            speed_of_light: SPEED_OF_LIGHT,
            geometry: Geometry::TwoWay,
            duration_s: 10.0,
            min_snr: None,
        }
    }
}

fn configuration<T>(message: String) -> Result<T> {
    Err(Error::Configuration(message))
}

impl TrackerConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn from_str(yaml: &str) -> Result<Self> {
        let config: TrackerConfig = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return configuration(format!("sample rate must be positive, got {}", self.sample_rate));
        }
        // Rejects a zero or non-finite carrier before any division by it.
        DopplerConverter::new(self.center_freq, self.speed_of_light, self.geometry)?;

        if self.fft_size == 0 {
            return configuration("FFT size must be positive".into());
        }
        if self.buffer_size < self.fft_size {
            return configuration(format!(
                "buffer size {} is shorter than the FFT size {}",
                self.buffer_size, self.fft_size
            ));
        }
        if !self.tone_freq.is_finite() || self.tone_freq.abs() >= self.sample_rate / 2.0 {
            return configuration(format!(
                "reference tone {} Hz is outside the {} S/s baseband",
                self.tone_freq, self.sample_rate
            ));
        }
        if !self.tone_amplitude.is_finite() {
            return configuration("tone amplitude must be finite".into());
        }
        if !self.duration_s.is_finite() || self.duration_s < 0.0 {
            return configuration(format!("duration must be non-negative, got {}", self.duration_s));
        }

        // The largest shift the spectrum can show must map below light speed.
        let max_shift = self.sample_rate / 2.0 + self.tone_freq.abs();
        if max_shift >= self.geometry.path_factor() * self.center_freq.abs() {
            return configuration(format!(
                "a {} Hz shift at {} Hz would exceed the speed of light",
                max_shift, self.center_freq
            ));
        }
        Ok(())
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_s.max(0.0))
    }

    pub fn radio_config(&self) -> RadioConfig {
        RadioConfig {
            sample_rate: self.sample_rate,
            center_freq: self.center_freq,
            rx_gain_db: self.rx_gain_db,
            tx_gain_db: self.tx_gain_db,
            buffer_size: self.buffer_size,
        }
    }

    pub fn welch_config(&self) -> WelchConfig {
        WelchConfig {
            window: self.window,
            detrend: self.detrend,
            ..WelchConfig::new(self.fft_size)
        }
    }

    pub fn converter(&self) -> Result<DopplerConverter> {
        let converter = DopplerConverter::new(self.center_freq, self.speed_of_light, self.geometry)?;
        Ok(if self.compensate_tone_offset {
            converter.with_reference_offset(self.tone_freq)
        } else {
            converter
        })
    }

    /// One second of the reference tone, repeated by the transmitter.
    pub fn tx_buffer_len(&self) -> usize {
        self.sample_rate.round() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Units;
    use crate::welch::PsdEstimate;
    use ndarray::Array1;

    #[test]
    fn defaults_match_the_bench_setup() {
        let config = TrackerConfig::default();
        assert_eq!(config.sample_rate, 600_000.0);
        assert_eq!(config.fft_size, 4096);
        assert_eq!(config.geometry, Geometry::TwoWay);
        assert!(!config.compensate_tone_offset);
        assert!(config.validate().is_ok());
        assert_eq!(config.tx_buffer_len(), 600_000);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = TrackerConfig::from_str(
            "center_freq: 915.0e6\ngeometry: one_way\nmin_snr: 12.0\nduration_s: 2.5\n",
        )
        .unwrap();
        assert_eq!(config.center_freq, 915.0e6);
        assert_eq!(config.geometry, Geometry::OneWay);
        assert_eq!(config.min_snr, Some(12.db()));
        assert_eq!(config.sample_rate, 600_000.0);
        assert_eq!(config.duration(), Duration::from_millis(2500));
    }

    #[test]
    fn window_and_detrend_reach_the_estimator() {
        let config = TrackerConfig::from_str("window: rectangular\ndetrend: 'none'\n").unwrap();
        let welch = config.welch_config();
        assert_eq!(welch.window, Window::Rectangular);
        assert_eq!(welch.detrend, Detrend::None);
        assert_eq!(welch.segment_length, config.fft_size);
        assert_eq!(welch.overlap, config.fft_size / 2);
    }

    #[test]
    fn malformed_yaml_is_reported() {
        assert!(matches!(TrackerConfig::from_str("fft_size: many"), Err(Error::Yaml(_))));
    }

    #[test]
    fn rejects_unusable_parameters() {
        let invalid = |f: fn(&mut TrackerConfig)| {
            let mut config = TrackerConfig::default();
            f(&mut config);
            matches!(config.validate(), Err(Error::Configuration(_)))
        };

        assert!(invalid(|c| c.center_freq = 0.0));
        assert!(invalid(|c| c.sample_rate = 0.0));
        assert!(invalid(|c| c.sample_rate = -600e3));
        assert!(invalid(|c| c.fft_size = 0));
        assert!(invalid(|c| c.buffer_size = 1024));
        assert!(invalid(|c| c.tone_freq = 400e3));
        assert!(invalid(|c| c.duration_s = -1.0));
        assert!(invalid(|c| c.center_freq = 100e3));
        assert!(invalid(|c| c.speed_of_light = 0.0));
    }

    #[test]
    fn converter_honours_tone_compensation() {
        let psd = PsdEstimate {
            frequencies: Array1::from(vec![100e3, 101e3]),
            power: Array1::from(vec![0.5, 1.0]),
            bin_width: 1e3,
            nof_segments: 1,
        };

        let mut config = TrackerConfig::default();
        let raw = config.converter().unwrap().convert(&psd).unwrap();
        config.compensate_tone_offset = true;
        let shifted = config.converter().unwrap().convert(&psd).unwrap();

        assert_eq!(shifted.doppler_shift_hz, 1e3);
        assert_eq!(raw.doppler_shift_hz, 101e3);
    }
}
