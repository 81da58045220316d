//! Super-resolution stage
//!
//! Deterministic approximation of learned audio super-resolution: sinc
//! resampling to the target rate followed by a linear magnitude lift over the
//! upper half of the spectrum.

use super::SuperResolver;
use crate::analysis::spectrum::{Stft, STAGE_FFT_SIZE, STAGE_HOP_SIZE};
use crate::audio::{resample, AudioBuffer};
use anyhow::Result;

pub struct DspSuperResolver;

impl DspSuperResolver {
    pub fn new() -> Self {
        Self
    }

    /// Scale each bin in the upper half of the one-sided spectrum by a
    /// factor rising linearly from 1.0 at the midpoint to 2.0 at Nyquist.
    /// Phase is untouched.
    fn enhance_harmonics(samples: &[f32]) -> Vec<f32> {
        let stft = Stft::new(STAGE_FFT_SIZE, STAGE_HOP_SIZE);
        let mut frames = stft.forward(samples);
        let bins = stft.bins();
        let half = bins / 2;

        for frame in frames.iter_mut() {
            for k in half..bins {
                let gain = 1.0 + (k - half) as f32 / (bins - 1 - half) as f32;
                frame[k] *= gain;
            }
        }

        stft.inverse(&frames, samples.len())
    }
}

impl Default for DspSuperResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SuperResolver for DspSuperResolver {
    fn process(&self, buffer: AudioBuffer, target_rate: u32) -> Result<AudioBuffer> {
        if buffer.sample_rate >= target_rate {
            log::debug!(
                "Sample rate {}Hz already at target {}Hz; passing through",
                buffer.sample_rate,
                target_rate
            );
            return Ok(buffer);
        }

        let buffer = buffer.into_mono();
        let upsampled = resample(&buffer.samples, buffer.sample_rate, target_rate)?;
        let enhanced = Self::enhance_harmonics(&upsampled);

        log::debug!(
            "Super-resolved {}Hz -> {}Hz ({} frames)",
            buffer.sample_rate,
            target_rate,
            enhanced.len()
        );

        Ok(AudioBuffer::mono(enhanced, target_rate))
    }
}
