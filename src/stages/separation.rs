//! Source separation and stem remixing
//!
//! Separation slices one spectrum into fixed frequency-band ranges mapped to
//! semantic stems; remixing recombines stems under a named weighting profile.

use super::Separator;
use crate::analysis::spectrum::{Stft, STAGE_FFT_SIZE, STAGE_HOP_SIZE};
use crate::audio::AudioBuffer;
use anyhow::Result;
use rustfft::num_complex::Complex;
use std::collections::BTreeMap;

/// Semantic stem names (closed set).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stem {
    Drums,
    Bass,
    Vocals,
    Other,
}

impl Stem {
    pub const ALL: [Stem; 4] = [Stem::Drums, Stem::Bass, Stem::Vocals, Stem::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stem::Drums => "drums",
            Stem::Bass => "bass",
            Stem::Vocals => "vocals",
            Stem::Other => "other",
        }
    }

    /// Frequency-bin range assigned to this stem, over `bins` one-sided bins.
    ///
    /// The ranges are neither disjoint nor exhaustive: drums and bass overlap
    /// below bins/8, and bins above 3*bins/4 outside `other` belong to no
    /// stem. Kept exactly as-is for compatibility with existing containers.
    pub fn bin_range(&self, bins: usize) -> (usize, usize) {
        match self {
            Stem::Drums => (0, bins / 4),
            Stem::Bass => (0, bins / 8),
            Stem::Vocals => (bins / 4, 3 * bins / 4),
            Stem::Other => (bins / 2, bins),
        }
    }
}

/// Stems keyed by name, each of equal nominal duration to the source.
pub type StemSet = BTreeMap<Stem, AudioBuffer>;

/// Named stem-weight profiles. Stems absent from a profile contribute
/// nothing to the remix.
static PROFILES: &[(&str, [(Stem, f32); 4])] = &[
    (
        "balanced",
        [
            (Stem::Drums, 1.0),
            (Stem::Bass, 1.0),
            (Stem::Other, 1.0),
            (Stem::Vocals, 1.0),
        ],
    ),
    (
        "vocal",
        [
            (Stem::Drums, 0.7),
            (Stem::Bass, 0.6),
            (Stem::Other, 0.8),
            (Stem::Vocals, 1.5),
        ],
    ),
    (
        "instrumental",
        [
            (Stem::Drums, 1.2),
            (Stem::Bass, 1.3),
            (Stem::Other, 1.1),
            (Stem::Vocals, 0.5),
        ],
    ),
    (
        "bass_boost",
        [
            (Stem::Drums, 1.1),
            (Stem::Bass, 1.8),
            (Stem::Other, 0.9),
            (Stem::Vocals, 1.0),
        ],
    ),
];

/// Weight table for a profile name, falling back to `balanced` for
/// unrecognized names.
pub fn profile_weights(name: &str) -> &'static [(Stem, f32); 4] {
    match PROFILES.iter().find(|(n, _)| *n == name) {
        Some((_, weights)) => weights,
        None => {
            log::debug!("Unknown mix profile {:?}; falling back to balanced", name);
            &PROFILES[0].1
        }
    }
}

/// Frequency-band separation: each stem keeps only the bins in its assigned
/// range and is reconstructed independently.
pub struct DspSeparator;

impl DspSeparator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DspSeparator {
    fn default() -> Self {
        Self::new()
    }
}

impl Separator for DspSeparator {
    fn separate(&self, buffer: &AudioBuffer) -> Result<StemSet> {
        let mono = buffer.mono_samples();
        let samples: &[f32] = &mono;

        let stft = Stft::new(STAGE_FFT_SIZE, STAGE_HOP_SIZE);
        let frames = stft.forward(samples);
        let bins = stft.bins();

        let mut stems = StemSet::new();
        for stem in Stem::ALL {
            let (low, high) = stem.bin_range(bins);
            let masked: Vec<Vec<Complex<f32>>> = frames
                .iter()
                .map(|frame| {
                    frame
                        .iter()
                        .enumerate()
                        .map(|(k, &c)| {
                            if k >= low && k < high {
                                c
                            } else {
                                Complex::new(0.0, 0.0)
                            }
                        })
                        .collect()
                })
                .collect();

            let audio = stft.inverse(&masked, samples.len());
            log::debug!(
                "Extracted stem {} from bins [{}, {})",
                stem.as_str(),
                low,
                high
            );
            stems.insert(stem, AudioBuffer::mono(audio, buffer.sample_rate));
        }

        Ok(stems)
    }

    fn remix(&self, stems: &StemSet, profile: &str) -> AudioBuffer {
        let weights = profile_weights(profile);

        // The vocals stem is the accumulation base; other stems truncate to it
        let base_len = stems
            .get(&Stem::Vocals)
            .map(|b| b.samples.len())
            .unwrap_or(0);
        let sample_rate = stems.values().next().map(|b| b.sample_rate).unwrap_or(0);

        let mut mix = vec![0.0f32; base_len];
        for (stem, buffer) in stems {
            let weight = match weights.iter().find(|(s, _)| s == stem) {
                Some((_, w)) => *w,
                None => continue,
            };
            for i in 0..base_len.min(buffer.samples.len()) {
                mix[i] += buffer.samples[i] * weight;
            }
        }

        AudioBuffer::mono(mix, sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stem_set(values: [(Stem, f32); 4], len: usize, sample_rate: u32) -> StemSet {
        values
            .into_iter()
            .map(|(stem, v)| (stem, AudioBuffer::mono(vec![v; len], sample_rate)))
            .collect()
    }

    #[test]
    fn test_balanced_remix_is_elementwise_sum() {
        let stems = stem_set(
            [
                (Stem::Drums, 0.1),
                (Stem::Bass, 0.2),
                (Stem::Vocals, 0.3),
                (Stem::Other, 0.4),
            ],
            64,
            44100,
        );

        let separator = DspSeparator::new();
        let mix = separator.remix(&stems, "balanced");

        assert_eq!(mix.samples.len(), 64);
        for &s in &mix.samples {
            assert!((s - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_unknown_profile_falls_back_to_balanced() {
        let stems = stem_set(
            [
                (Stem::Drums, 0.5),
                (Stem::Bass, 0.25),
                (Stem::Vocals, 0.75),
                (Stem::Other, 1.0),
            ],
            32,
            44100,
        );

        let separator = DspSeparator::new();
        let unknown = separator.remix(&stems, "does_not_exist");
        let balanced = separator.remix(&stems, "balanced");

        assert_eq!(unknown.samples, balanced.samples);
    }

    #[test]
    fn test_remix_length_follows_vocals_stem() {
        let mut stems = stem_set(
            [
                (Stem::Drums, 0.1),
                (Stem::Bass, 0.1),
                (Stem::Vocals, 0.1),
                (Stem::Other, 0.1),
            ],
            40,
            44100,
        );
        stems.insert(Stem::Vocals, AudioBuffer::mono(vec![0.1; 20], 44100));

        let separator = DspSeparator::new();
        let mix = separator.remix(&stems, "balanced");
        assert_eq!(mix.samples.len(), 20);
    }

    // The drums and bass ranges overlap below bins/8. This duplication is
    // part of the wire-compatible behavior; this test documents it so a
    // "fix" shows up as a failure.
    #[test]
    fn test_drums_and_bass_bin_ranges_overlap() {
        let bins = STAGE_FFT_SIZE / 2 + 1;
        let (drums_low, drums_high) = Stem::Drums.bin_range(bins);
        let (bass_low, bass_high) = Stem::Bass.bin_range(bins);

        assert_eq!(drums_low, bass_low);
        assert!(bass_high <= drums_high, "bass range must sit inside drums");
        assert!(bass_high > 0, "overlap region must be non-empty");
    }

    #[test]
    fn test_low_tone_lands_in_both_drums_and_bass() {
        // 100 Hz sits far below the bass band edge, so both overlapping
        // stems must carry it.
        let samples: Vec<f32> = (0..44100)
            .map(|i| (2.0 * std::f32::consts::PI * 100.0 * i as f32 / 44100.0).sin())
            .collect();
        let buffer = AudioBuffer::mono(samples, 44100);

        let separator = DspSeparator::new();
        let stems = separator.separate(&buffer).unwrap();

        let rms = |b: &AudioBuffer| {
            (b.samples.iter().map(|s| s * s).sum::<f32>() / b.samples.len() as f32).sqrt()
        };

        assert!(rms(&stems[&Stem::Drums]) > 0.1);
        assert!(rms(&stems[&Stem::Bass]) > 0.1);
        assert!(rms(&stems[&Stem::Other]) < 0.01);
    }
}
