use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use num::complex::Complex64;

use crate::common::{Real, Units};
use crate::config::TrackerConfig;
use crate::doppler::DopplerConverter;
use crate::error::{Error, Result};
use crate::radio::{reference_tone, RadioFrontEnd, RadioSession};
use crate::series::{DopplerSample, VelocitySeries};
use crate::welch::Welch;

/// Receives every sample as soon as it is appended to the series.
pub trait Observer {
    fn on_sample(&mut self, sample: &DopplerSample);
}

/// Writes one progress line per sample to the log.
pub struct LogObserver;

impl Observer for LogObserver {
    fn on_sample(&mut self, sample: &DopplerSample) {
        info!(
            "Time: {:.2}s | Doppler Shift: {:.2} Hz | Velocity: {:.2} m/s",
            sample.timestamp, sample.doppler_shift_hz, sample.velocity_mps
        );
    }
}

impl<F: FnMut(&DopplerSample)> Observer for F {
    fn on_sample(&mut self, sample: &DopplerSample) {
        self(sample)
    }
}

/// Cooperative cancellation, checked once per block.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Sums the two receive channels into one composite block.
pub fn combine_channels(channel0: &[Complex64], channel1: &[Complex64]) -> Result<Vec<Complex64>> {
    if channel0.len() != channel1.len() {
        return Err(Error::InvalidInput(format!(
            "channel lengths differ: {} and {}",
            channel0.len(),
            channel1.len()
        )));
    }
    if channel0.is_empty() {
        return Err(Error::InvalidInput("empty sample block".into()));
    }
    Ok(channel0.iter().zip(channel1).map(|(a, b)| a + b).collect())
}

pub struct Acquisition<'r, R: RadioFrontEnd> {
    radio: &'r mut R,
    config: TrackerConfig,
    welch: Welch,
    converter: DopplerConverter,
    stop: StopHandle,
}

impl<'r, R: RadioFrontEnd> Acquisition<'r, R> {
    /// Validates `config` and prepares the estimators; the radio is not
    /// touched until `run`.
    pub fn new(radio: &'r mut R, config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        let welch = Welch::new(config.sample_rate, config.welch_config())?;
        let converter = config.converter()?;
        Ok(Self {
            radio,
            config,
            welch,
            converter,
            stop: StopHandle::default(),
        })
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Collects velocity samples until `duration` has elapsed, the stop
    /// handle is raised, or any stage fails.
    pub fn run(&mut self, duration: Duration, observer: &mut dyn Observer) -> Result<VelocitySeries> {
        let waveform = reference_tone(
            self.config.sample_rate,
            self.config.tone_freq,
            self.config.tone_amplitude,
            self.config.tx_buffer_len(),
        );

        let mut session = RadioSession::open(&mut *self.radio, &self.config.radio_config())?;
        session.transmit_continuous(&waveform)?;

        info!(
            "Tracking for {:.1} s at {} Hz ({} S/s, {} point FFT, {:?})",
            duration.as_secs_f64(),
            self.config.center_freq,
            self.config.sample_rate,
            self.config.fft_size,
            self.converter.geometry()
        );

        let mut series = VelocitySeries::new();
        let start = Instant::now();

        while start.elapsed() < duration {
            if self.stop.is_stopped() {
                info!("Acquisition stopped after {} samples", series.len());
                break;
            }

            let (channel0, channel1) = session.receive_block()?;
            let timestamp = start.elapsed().as_secs_f64();

            let block = combine_channels(&channel0, &channel1)?;
            if block.len() != self.config.buffer_size {
                return Err(Error::InvalidInput(format!(
                    "unexpected block length {} (expected {})",
                    block.len(),
                    self.config.buffer_size
                )));
            }

            let psd = self.welch.estimate(&block)?;
            let estimate = self.converter.convert(&psd)?;
            debug!(
                "Block at {:.3} s: peak {:.1} Hz, SNR {:.1} dB over {} segments",
                timestamp,
                estimate.doppler_shift_hz,
                estimate.snr.value(),
                psd.nof_segments
            );

            if let Some(min_snr) = self.config.min_snr {
                if estimate.snr < min_snr {
                    warn!(
                        "Dropping block at {:.2}s: SNR {:.1} dB below {:.1} dB",
                        timestamp,
                        estimate.snr.value(),
                        min_snr.value()
                    );
                    continue;
                }
            }

            let sample = DopplerSample::new(timestamp, &estimate);
            observer.on_sample(&sample);
            series.push(sample);
        }

        info!("Acquired {} velocity samples", series.len());
        Ok(series)
    }
}

/// Tracks for `duration_seconds` with the default setup at the given rate
/// and carrier, logging every sample. The spectral peak is reported as the
/// shift; the reference tone sits at a sixth of the sample rate.
pub fn run<R: RadioFrontEnd>(
    duration_seconds: Real,
    radio: &mut R,
    sample_rate: Real,
    center_freq: Real,
) -> Result<VelocitySeries> {
    let config = TrackerConfig {
        sample_rate,
        center_freq,
        tone_freq: sample_rate / 6.0,
        compensate_tone_offset: false,
        duration_s: duration_seconds,
        ..TrackerConfig::default()
    };
    let duration = config.duration();
    Acquisition::new(radio, config)?.run(duration, &mut LogObserver)
}
