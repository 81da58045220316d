//! Feature extraction over a decoded buffer

use super::pitch;
use super::spectrum::Stft;
use super::tempo;
use crate::audio::AudioBuffer;

const FEATURE_FFT_SIZE: usize = 2048;
const FEATURE_HOP_SIZE: usize = 512;
const MFCC_COEFFS: usize = 13;
const MEL_BANDS: usize = 26;
const ROLLOFF_FRACTION: f32 = 0.85;
const DB_FLOOR: f32 = 1e-10;

/// Descriptors computed from one buffer.
///
/// Per-frame tracks plus scalar summaries. Non-finite pitch values are
/// replaced with zero before being exposed; unvoiced frames carry f0 = 0.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    /// Fundamental frequency per 100 Hz analysis frame
    pub f0: Vec<f32>,
    /// Voiced flag parallel to `f0`
    pub voicing: Vec<bool>,
    /// Mean spectrogram magnitude per STFT frame, in dB
    pub loudness_db: Vec<f32>,
    /// Spectral centroid per STFT frame, in Hz
    pub spectral_centroid: Vec<f32>,
    /// Spectral roll-off (85% energy point) per STFT frame, in Hz
    pub spectral_rolloff: Vec<f32>,
    /// Time-averaged 13-coefficient MFCC vector
    pub mfcc: [f32; MFCC_COEFFS],
    /// Estimated tempo in BPM
    pub tempo_bpm: f32,
    /// Mean zero-crossing rate
    pub zero_crossing_rate: f32,
    /// Mean squared energy
    pub energy: f32,
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self {
            f0: Vec::new(),
            voicing: Vec::new(),
            loudness_db: Vec::new(),
            spectral_centroid: Vec::new(),
            spectral_rolloff: Vec::new(),
            mfcc: [0.0; MFCC_COEFFS],
            tempo_bpm: 0.0,
            zero_crossing_rate: 0.0,
            energy: 0.0,
        }
    }
}

impl FeatureSet {
    /// Time-averaged spectral centroid, 0.0 for degenerate input
    pub fn mean_centroid(&self) -> f32 {
        if self.spectral_centroid.is_empty() {
            return 0.0;
        }
        self.spectral_centroid.iter().sum::<f32>() / self.spectral_centroid.len() as f32
    }
}

struct SpectralFeatures {
    loudness_db: Vec<f32>,
    centroid: Vec<f32>,
    rolloff: Vec<f32>,
    mfcc: [f32; MFCC_COEFFS],
    tempo_bpm: f32,
}

/// Derives a [`FeatureSet`] from an audio buffer. Pure; no side effects.
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract all features for one buffer.
    ///
    /// Inputs shorter than one analysis window return a zeroed default set
    /// rather than an error; callers must not assume non-degenerate output.
    pub fn extract(&self, buffer: &AudioBuffer) -> FeatureSet {
        let mono = buffer.mono_samples();
        let samples: &[f32] = &mono;
        let sample_rate = buffer.sample_rate;

        if samples.len() < FEATURE_FFT_SIZE || sample_rate < pitch::PITCH_FRAME_RATE {
            log::debug!(
                "Input too short for analysis ({} samples at {}Hz); returning default features",
                samples.len(),
                sample_rate
            );
            return FeatureSet::default();
        }

        // The pitch track and the spectrogram features are independent
        let ((f0, voicing), spectral) = rayon::join(
            || pitch::track(samples, sample_rate),
            || Self::spectral_features(samples, sample_rate),
        );

        let zero_crossing_rate = Self::zero_crossing_rate(samples);
        let energy = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;

        FeatureSet {
            f0,
            voicing,
            loudness_db: spectral.loudness_db,
            spectral_centroid: spectral.centroid,
            spectral_rolloff: spectral.rolloff,
            mfcc: spectral.mfcc,
            tempo_bpm: spectral.tempo_bpm,
            zero_crossing_rate,
            energy,
        }
    }

    fn spectral_features(samples: &[f32], sample_rate: u32) -> SpectralFeatures {
        let stft = Stft::new(FEATURE_FFT_SIZE, FEATURE_HOP_SIZE);
        let frames = stft.forward(samples);
        let bins = stft.bins();
        let bin_hz = stft.bin_hz(sample_rate);
        let mel_filters = mel_filterbank(MEL_BANDS, bins, sample_rate);

        let mut loudness_db = Vec::with_capacity(frames.len());
        let mut centroid = Vec::with_capacity(frames.len());
        let mut rolloff = Vec::with_capacity(frames.len());
        let mut mfcc_sum = [0.0f32; MFCC_COEFFS];

        for frame in &frames {
            let mags: Vec<f32> = frame.iter().map(|c| c.norm()).collect();
            let total: f32 = mags.iter().sum();

            loudness_db.push(
                mags.iter()
                    .map(|&m| 20.0 * m.max(DB_FLOOR).log10())
                    .sum::<f32>()
                    / bins as f32,
            );

            centroid.push(if total > 0.0 {
                mags.iter()
                    .enumerate()
                    .map(|(k, &m)| k as f32 * bin_hz * m)
                    .sum::<f32>()
                    / total
            } else {
                0.0
            });

            rolloff.push(Self::rolloff_hz(&mags, total, bin_hz));

            let coeffs = mfcc_frame(&mags, &mel_filters);
            for (sum, c) in mfcc_sum.iter_mut().zip(&coeffs) {
                *sum += c;
            }
        }

        let mut mfcc = [0.0f32; MFCC_COEFFS];
        if !frames.is_empty() {
            for (out, sum) in mfcc.iter_mut().zip(&mfcc_sum) {
                *out = sum / frames.len() as f32;
            }
        }

        SpectralFeatures {
            loudness_db,
            centroid,
            rolloff,
            mfcc,
            tempo_bpm: tempo::estimate(samples, sample_rate),
        }
    }

    /// Frequency below which `ROLLOFF_FRACTION` of the magnitude lies
    fn rolloff_hz(mags: &[f32], total: f32, bin_hz: f32) -> f32 {
        if total <= 0.0 {
            return 0.0;
        }
        let target = total * ROLLOFF_FRACTION;
        let mut cumulative = 0.0f32;
        for (k, &m) in mags.iter().enumerate() {
            cumulative += m;
            if cumulative >= target {
                return k as f32 * bin_hz;
            }
        }
        (mags.len() - 1) as f32 * bin_hz
    }

    fn zero_crossing_rate(samples: &[f32]) -> f32 {
        if samples.len() < 2 {
            return 0.0;
        }
        let crossings = samples
            .windows(2)
            .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
            .count();
        crossings as f32 / (samples.len() - 1) as f32
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Triangular mel filterbank over the one-sided bin range.
fn mel_filterbank(bands: usize, bins: usize, sample_rate: u32) -> Vec<Vec<f32>> {
    let mel = |hz: f32| 2595.0 * (1.0 + hz / 700.0).log10();
    let hz = |mel: f32| 700.0 * (10f32.powf(mel / 2595.0) - 1.0);

    let nyquist = sample_rate as f32 / 2.0;
    let mel_max = mel(nyquist);

    // bands + 2 edge points, evenly spaced on the mel scale
    let edges: Vec<f32> = (0..bands + 2)
        .map(|i| hz(mel_max * i as f32 / (bands + 1) as f32))
        .collect();

    let bin_hz = nyquist / (bins - 1) as f32;
    (0..bands)
        .map(|b| {
            let (low, center, high) = (edges[b], edges[b + 1], edges[b + 2]);
            (0..bins)
                .map(|k| {
                    let f = k as f32 * bin_hz;
                    if f <= low || f >= high {
                        0.0
                    } else if f <= center {
                        (f - low) / (center - low)
                    } else {
                        (high - f) / (high - center)
                    }
                })
                .collect()
        })
        .collect()
}

/// 13 MFCCs for one magnitude frame: log mel energies followed by a DCT-II.
fn mfcc_frame(mags: &[f32], mel_filters: &[Vec<f32>]) -> [f32; MFCC_COEFFS] {
    let log_energies: Vec<f32> = mel_filters
        .iter()
        .map(|filter| {
            let energy: f32 = filter
                .iter()
                .zip(mags)
                .map(|(w, &m)| w * m * m)
                .sum();
            energy.max(DB_FLOOR).ln()
        })
        .collect();

    let bands = log_energies.len() as f32;
    let mut coeffs = [0.0f32; MFCC_COEFFS];
    for (k, coeff) in coeffs.iter_mut().enumerate() {
        *coeff = log_energies
            .iter()
            .enumerate()
            .map(|(m, &e)| e * (std::f32::consts::PI * k as f32 * (m as f32 + 0.5) / bands).cos())
            .sum();
    }
    coeffs
}
