//! Harmonic reconstruction stage
//!
//! Resynthesizes a harmonic approximation from the pitch track and
//! cross-fades it with the input by a strength factor.

use super::Reconstructor;
use crate::analysis::pitch::PITCH_FRAME_RATE;
use crate::analysis::FeatureExtractor;
use crate::audio::AudioBuffer;
use anyhow::Result;

const HARMONIC_COUNT: usize = 5;
/// Global attenuation standing in for a loudness envelope follower
const SYNTH_GAIN: f32 = 0.1;

pub struct DspReconstructor {
    extractor: FeatureExtractor,
}

impl DspReconstructor {
    pub fn new() -> Self {
        Self {
            extractor: FeatureExtractor::new(),
        }
    }

    /// Additive synthesis from the 100 Hz pitch track: five harmonics at
    /// amplitude 1/h per voiced frame, silence for unvoiced frames. Output
    /// length is frames * span, which frame rounding can leave shorter than
    /// the analyzed signal.
    fn synthesize(f0: &[f32], voicing: &[bool], sample_rate: u32) -> Vec<f32> {
        let span = (sample_rate / PITCH_FRAME_RATE) as usize;
        let total = f0.len() * span;
        let mut out = vec![0.0f32; total];

        for (frame, (&freq, &voiced)) in f0.iter().zip(voicing).enumerate() {
            if !voiced || !freq.is_finite() || freq <= 0.0 {
                continue;
            }
            let start = frame * span;
            let end = (start + span).min(total);

            for h in 1..=HARMONIC_COUNT {
                let harmonic_freq = freq * h as f32;
                let amplitude = 1.0 / h as f32;
                for (i, sample) in out[start..end].iter_mut().enumerate() {
                    let t = (start + i) as f32 / sample_rate as f32;
                    *sample +=
                        amplitude * (2.0 * std::f32::consts::PI * harmonic_freq * t).sin();
                }
            }
        }

        for s in out.iter_mut() {
            *s *= SYNTH_GAIN;
        }
        out
    }
}

impl Default for DspReconstructor {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconstructor for DspReconstructor {
    /// Per-sample cross-fade `original*(1-strength) + synthesized*strength`.
    /// The synthesized signal is zero-padded up to the input length when
    /// frame rounding makes it shorter, so the blend is defined everywhere.
    fn reconstruct(&self, buffer: AudioBuffer, strength: f32) -> Result<AudioBuffer> {
        let strength = strength.clamp(0.0, 1.0);
        let buffer = buffer.into_mono();

        if strength == 0.0 {
            return Ok(buffer);
        }

        let features = self.extractor.extract(&buffer);
        let synthesized = Self::synthesize(&features.f0, &features.voicing, buffer.sample_rate);

        let voiced_frames = features.voicing.iter().filter(|&&v| v).count();
        log::debug!(
            "Harmonic reconstruction: {}/{} voiced frames, strength {:.2}",
            voiced_frames,
            features.voicing.len(),
            strength
        );

        let blended: Vec<f32> = buffer
            .samples
            .iter()
            .enumerate()
            .map(|(i, &orig)| {
                let synth = synthesized.get(i).copied().unwrap_or(0.0);
                orig * (1.0 - strength) + synth * strength
            })
            .collect();

        Ok(AudioBuffer::mono(blended, buffer.sample_rate))
    }
}
