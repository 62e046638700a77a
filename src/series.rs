use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::common::{Decibel, Real, Storable};
use crate::doppler::DopplerEstimate;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DopplerSample {
    /// Seconds since the start of the acquisition.
    pub timestamp: Real,
    pub doppler_shift_hz: Real,
    pub velocity_mps: Real,
    pub snr: Decibel,
}

impl DopplerSample {
    pub fn new(timestamp: Real, estimate: &DopplerEstimate) -> Self {
        Self {
            timestamp,
            doppler_shift_hz: estimate.doppler_shift_hz,
            velocity_mps: estimate.velocity_mps,
            snr: estimate.snr,
        }
    }
}

#[derive(Serialize)]
struct Row {
    time_s: Real,
    velocity_mps: Real,
}

/// Append-only, time-ordered record of one acquisition session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VelocitySeries {
    samples: Vec<DopplerSample>,
}

impl VelocitySeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, sample: DopplerSample) {
        debug_assert!(self
            .samples
            .last()
            .map_or(true, |last| last.timestamp <= sample.timestamp));
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[DopplerSample] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DopplerSample> {
        self.samples.iter()
    }

    pub fn last(&self) -> Option<&DopplerSample> {
        self.samples.last()
    }

    /// Two columns, `time_s` and `velocity_mps`, with a header row.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        if self.samples.is_empty() {
            csv.write_record(&["time_s", "velocity_mps"])?;
        }
        for sample in &self.samples {
            csv.serialize(Row {
                time_s: sample.timestamp,
                velocity_mps: sample.velocity_mps,
            })?;
        }
        csv.flush()?;
        Ok(())
    }

    pub fn save_csv(&self, path: &Path) -> Result<()> {
        self.write_csv(File::create(path)?)
    }
}

impl<'a> IntoIterator for &'a VelocitySeries {
    type Item = &'a DopplerSample;
    type IntoIter = std::slice::Iter<'a, DopplerSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

impl Storable for VelocitySeries {}
