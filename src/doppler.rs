use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::common::{Decibel, Real};
use crate::error::{Error, Result};
use crate::welch::PsdEstimate;

/// Signal path assumed when turning a frequency shift into a velocity.
///
/// `TwoWay` is the radar case: the tone leaves the transmitter, is reflected
/// by the moving object and comes back, so the shift is doubled. `OneWay`
/// covers a moving transmitter observed directly, e.g. a satellite beacon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Geometry {
    OneWay,
    TwoWay,
}

impl Geometry {
    pub fn path_factor(self) -> Real {
        match self {
            Geometry::OneWay => 1.0,
            Geometry::TwoWay => 2.0,
        }
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Geometry::TwoWay
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DopplerEstimate {
    pub doppler_shift_hz: Real,
    pub velocity_mps: Real,
    /// Peak power over the median power of the spectrum.
    pub snr: Decibel,
}

#[derive(Debug, Clone)]
pub struct DopplerConverter {
    center_freq: Real,
    speed_of_light: Real,
    geometry: Geometry,
    reference_offset: Real,
}

impl DopplerConverter {
    pub fn new(center_freq: Real, speed_of_light: Real, geometry: Geometry) -> Result<Self> {
        if center_freq == 0.0 || !center_freq.is_finite() {
            return Err(Error::Configuration(format!(
                "center frequency must be non-zero, got {}",
                center_freq
            )));
        }
        if speed_of_light <= 0.0 || !speed_of_light.is_finite() {
            return Err(Error::Configuration(format!(
                "propagation speed must be positive, got {}",
                speed_of_light
            )));
        }
        Ok(Self {
            center_freq,
            speed_of_light,
            geometry,
            reference_offset: 0.0,
        })
    }

    /// Baseband frequency of the reference tone, subtracted from the spectral
    /// peak before it is reported as a shift.
    pub fn with_reference_offset(mut self, offset_hz: Real) -> Self {
        self.reference_offset = offset_hz;
        self
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn velocity(&self, doppler_shift_hz: Real) -> Real {
        doppler_shift_hz * self.speed_of_light / (self.geometry.path_factor() * self.center_freq)
    }

    pub fn doppler_shift(&self, velocity_mps: Real) -> Real {
        velocity_mps * self.geometry.path_factor() * self.center_freq / self.speed_of_light
    }

    pub fn convert(&self, psd: &PsdEstimate) -> Result<DopplerEstimate> {
        let index = peak_index(&psd.power)
            .ok_or_else(|| Error::InvalidInput("empty power spectrum".into()))?;
        let peak_freq = *psd.frequencies.get(index).ok_or_else(|| {
            Error::InvalidInput(format!(
                "{} frequencies for {} power values",
                psd.frequencies.len(),
                psd.power.len()
            ))
        })?;

        let doppler_shift_hz = peak_freq - self.reference_offset;

        Ok(DopplerEstimate {
            doppler_shift_hz,
            velocity_mps: self.velocity(doppler_shift_hz),
            snr: peak_snr(&psd.power, psd.power[index]),
        })
    }
}

/// Argmax over an ascending spectrum; equal maxima resolve to the lowest
/// frequency.
fn peak_index(power: &Array1<Real>) -> Option<usize> {
    power
        .indexed_iter()
        .fold(None, |best: Option<(usize, Real)>, (i, &p)| match best {
            Some((_, max)) if p <= max => best,
            _ => Some((i, p)),
        })
        .map(|(i, _)| i)
}

fn noise_floor(power: &Array1<Real>) -> Real {
    let mut sorted = power.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn peak_snr(power: &Array1<Real>, peak: Real) -> Decibel {
    let floor = noise_floor(power);
    if floor > 0.0 {
        Decibel::from_power_ratio(peak / floor)
    } else if peak > 0.0 {
        Decibel::from_power_ratio(Real::INFINITY)
    } else {
        Decibel::from_power_ratio(1.0)
    }
}

/// Two-way conversion of the dominant spectral peak.
pub fn convert(psd: &PsdEstimate, center_freq_hz: Real, speed_of_light: Real) -> Result<DopplerEstimate> {
    DopplerConverter::new(center_freq_hz, speed_of_light, Geometry::TwoWay)?.convert(psd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Units, SPEED_OF_LIGHT};
    use crate::welch::estimate_psd;
    use num::complex::Complex64;
    use num::traits::FloatConst;

    fn psd(frequencies: Vec<Real>, power: Vec<Real>) -> PsdEstimate {
        PsdEstimate {
            bin_width: 1.0,
            nof_segments: 1,
            frequencies: Array1::from(frequencies),
            power: Array1::from(power),
        }
    }

    #[test]
    fn picks_the_strongest_bin() {
        let p = psd(vec![-2.0, -1.0, 0.0, 1.0], vec![0.1, 0.2, 3.0, 0.1]);
        let estimate = convert(&p, 1.0e9, SPEED_OF_LIGHT).unwrap();
        assert_eq!(estimate.doppler_shift_hz, 0.0);
        assert_eq!(estimate.velocity_mps, 0.0);
    }

    #[test]
    fn ties_resolve_to_lowest_frequency() {
        let p = psd(vec![-2.0, -1.0, 0.0, 1.0], vec![0.1, 5.0, 1.0, 5.0]);
        let first = convert(&p, 1.0e9, SPEED_OF_LIGHT).unwrap();
        let second = convert(&p, 1.0e9, SPEED_OF_LIGHT).unwrap();
        assert_eq!(first.doppler_shift_hz, -1.0);
        assert_eq!(first, second);
    }

    #[test]
    fn edge_bin_peak_is_reported_as_is() {
        let p = psd(vec![-2.0, -1.0, 0.0, 1.0], vec![9.0, 0.2, 0.1, 0.1]);
        assert_eq!(convert(&p, 1.0e9, SPEED_OF_LIGHT).unwrap().doppler_shift_hz, -2.0);
    }

    #[test]
    fn zero_center_frequency_is_a_configuration_error() {
        let p = psd(vec![0.0], vec![1.0]);
        assert!(matches!(convert(&p, 0.0, SPEED_OF_LIGHT), Err(Error::Configuration(_))));
        assert!(matches!(
            DopplerConverter::new(Real::NAN, SPEED_OF_LIGHT, Geometry::OneWay),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            DopplerConverter::new(1.0e9, 0.0, Geometry::TwoWay),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn empty_spectrum_is_invalid_input() {
        let p = psd(vec![], vec![]);
        assert!(matches!(convert(&p, 1.0e9, SPEED_OF_LIGHT), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn geometry_scales_velocity() {
        let two_way = DopplerConverter::new(2.3e9, SPEED_OF_LIGHT, Geometry::TwoWay).unwrap();
        let one_way = DopplerConverter::new(2.3e9, SPEED_OF_LIGHT, Geometry::OneWay).unwrap();
        assert!((one_way.velocity(5000.0) - 2.0 * two_way.velocity(5000.0)).abs() < 1e-9);
        assert!((two_way.doppler_shift(two_way.velocity(1234.0)) - 1234.0).abs() < 1e-9);
    }

    #[test]
    fn reference_offset_is_removed_from_peak() {
        let p = psd(vec![99_000.0, 100_000.0, 101_000.0], vec![0.1, 0.1, 2.0]);
        let converter = DopplerConverter::new(2.3e9, SPEED_OF_LIGHT, Geometry::TwoWay)
            .unwrap()
            .with_reference_offset(100_000.0);
        assert_eq!(converter.convert(&p).unwrap().doppler_shift_hz, 1000.0);
    }

    #[test]
    fn snr_compares_peak_to_median() {
        let p = psd(vec![-1.0, 0.0, 1.0, 2.0, 3.0], vec![1.0, 1.0, 100.0, 1.0, 1.0]);
        let snr = convert(&p, 1.0e9, SPEED_OF_LIGHT).unwrap().snr;
        assert!((snr.value() - 20.0).abs() < 1e-9);

        let silent = psd(vec![0.0, 1.0], vec![0.0, 0.0]);
        assert_eq!(convert(&silent, 1.0e9, SPEED_OF_LIGHT).unwrap().snr.value(), 0.0);
    }

    #[test]
    fn recovers_tone_through_welch() {
        let (fs, fc, n) = (600_000.0, 2.3e9, 1024 * 4);
        let signal: Vec<Complex64> = (0..n)
            .map(|i| Complex64::from_polar(0.5, 2.0 * Real::PI() * 5000.0 * i as Real / fs))
            .collect();

        let psd = estimate_psd(&signal, fs, n).unwrap();
        let estimate = convert(&psd, fc, SPEED_OF_LIGHT).unwrap();

        assert!((estimate.doppler_shift_hz - 5000.0).abs() <= fs / n as Real);
        let expected = estimate.doppler_shift_hz * SPEED_OF_LIGHT / (2.0 * fc);
        assert!((estimate.velocity_mps - expected).abs() < 1e-9);
        let bin_velocity = fs / n as Real * SPEED_OF_LIGHT / (2.0 * fc);
        assert!((estimate.velocity_mps - 326.1).abs() <= bin_velocity);
        assert!(estimate.snr > 20.db());
    }
}
