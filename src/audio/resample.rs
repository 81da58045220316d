//! Sample-rate conversion via rubato

use anyhow::Result;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Resample a mono signal from one rate to another.
///
/// Returns the input untouched when the rates already match.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(
        to_rate as f64 / from_rate as f64,
        2.0,
        params,
        samples.len(),
        1,
    )?;

    let waves_in = vec![samples.to_vec()];
    let mut waves_out = resampler.process(&waves_in, None)?;

    log::debug!(
        "Resampled {} samples at {}Hz to {} samples at {}Hz",
        samples.len(),
        from_rate,
        waves_out[0].len(),
        to_rate
    );

    Ok(waves_out.remove(0))
}
