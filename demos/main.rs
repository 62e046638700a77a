extern crate doppler_track;

use doppler_track::simulate::SimulatedRadio;
use doppler_track::{Acquisition, DopplerSample, Geometry, TrackerConfig, Units};

fn main() {
    let config = TrackerConfig {
        fft_size: 1024,
        buffer_size: 1024 * 4,
        duration_s: 0.2,
        compensate_tone_offset: true,
        ..TrackerConfig::default()
    };

    let targets = [-450.0, 0.0, 120.0, 326.1];

    for &velocity in targets.iter() {
        for &geometry in [Geometry::TwoWay, Geometry::OneWay].iter() {
            let mut radio = SimulatedRadio::new(velocity)
                .with_geometry(geometry)
                .with_noise(-40.0.db());

            let config = TrackerConfig {
                geometry,
                ..config.clone()
            };
            let duration = config.duration();

            let mut acquisition =
                Acquisition::new(&mut radio, config).expect("Invalid configuration");

            let series = acquisition
                .run(duration, &mut |_: &DopplerSample| {})
                .expect("Acquisition failed");

            let mean = series.iter().map(|s| s.velocity_mps).sum::<f64>() / series.len() as f64;

            println!(
                "Target {:7.1} m/s ({:?}): {} samples, mean estimate {:7.1} m/s",
                velocity,
                geometry,
                series.len(),
                mean
            );
        }
    }
}
