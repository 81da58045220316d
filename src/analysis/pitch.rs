//! Fundamental-frequency tracking
//!
//! Autocorrelation pitch tracker bounded to the musical range C2-C7. Frames
//! are produced at a fixed 100 Hz analysis rate so that the track length maps
//! directly onto the signal duration; the harmonic reconstruction stage
//! relies on this.

/// Analysis frame rate in Hz
pub const PITCH_FRAME_RATE: u32 = 100;

/// Lower pitch bound (C2)
const PITCH_FMIN_HZ: f32 = 65.41;
/// Upper pitch bound (C7)
const PITCH_FMAX_HZ: f32 = 2093.0;

const PITCH_WINDOW: usize = 2048;
const VOICING_THRESHOLD: f32 = 0.30;
const SILENCE_RMS: f32 = 1e-4;

/// Track f0 and voicing over a mono signal.
///
/// Unvoiced frames (and frames whose autocorrelation peak falls outside the
/// pitch bounds) report f0 = 0.0 and voicing false.
pub fn track(samples: &[f32], sample_rate: u32) -> (Vec<f32>, Vec<bool>) {
    let hop = (sample_rate / PITCH_FRAME_RATE) as usize;
    if hop == 0 || samples.len() < hop {
        return (Vec::new(), Vec::new());
    }

    let num_frames = samples.len() / hop;
    let lag_min = ((sample_rate as f32 / PITCH_FMAX_HZ).floor() as usize).max(2);
    let lag_max = ((sample_rate as f32 / PITCH_FMIN_HZ).ceil() as usize).min(PITCH_WINDOW / 2);

    let mut f0 = vec![0.0f32; num_frames];
    let mut voicing = vec![false; num_frames];

    for frame in 0..num_frames {
        let start = frame * hop;
        let end = (start + PITCH_WINDOW).min(samples.len());
        let window = &samples[start..end];

        // Tail frames without enough context stay unvoiced
        if window.len() < lag_max * 2 {
            continue;
        }

        let r0: f32 = window.iter().map(|s| s * s).sum();
        let rms = (r0 / window.len() as f32).sqrt();
        if rms < SILENCE_RMS || r0 <= 0.0 {
            continue;
        }

        // Normalized autocorrelation over the pitch lag range
        let mut corr = vec![0.0f32; lag_max + 1];
        let mut best_lag = 0usize;
        let mut best = 0.0f32;
        for lag in lag_min..=lag_max {
            let mut acc = 0.0f32;
            for i in 0..window.len() - lag {
                acc += window[i] * window[i + lag];
            }
            corr[lag] = acc / r0;
            if corr[lag] > best {
                best = corr[lag];
                best_lag = lag;
            }
        }

        if best_lag == 0 || best < VOICING_THRESHOLD {
            continue;
        }

        // Parabolic interpolation around the peak for sub-sample lag accuracy
        let refined = if best_lag > lag_min && best_lag < lag_max {
            let (a, b, c) = (corr[best_lag - 1], corr[best_lag], corr[best_lag + 1]);
            let denom = a - 2.0 * b + c;
            if denom.abs() > f32::EPSILON {
                best_lag as f32 + 0.5 * (a - c) / denom
            } else {
                best_lag as f32
            }
        } else {
            best_lag as f32
        };

        let freq = sample_rate as f32 / refined;
        if freq.is_finite() && (PITCH_FMIN_HZ..=PITCH_FMAX_HZ).contains(&freq) {
            f0[frame] = freq;
            voicing[frame] = true;
        }
    }

    (f0, voicing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, secs: f32, sample_rate: u32) -> Vec<f32> {
        let total = (secs * sample_rate as f32) as usize;
        (0..total)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_tracks_sine_fundamental() {
        let samples = sine(220.0, 1.0, 44100);
        let (f0, voicing) = track(&samples, 44100);

        assert_eq!(f0.len(), voicing.len());
        let voiced: Vec<f32> = f0
            .iter()
            .zip(&voicing)
            .filter(|(_, &v)| v)
            .map(|(&f, _)| f)
            .collect();
        assert!(!voiced.is_empty());

        let mean = voiced.iter().sum::<f32>() / voiced.len() as f32;
        assert!(
            (mean - 220.0).abs() < 10.0,
            "expected ~220 Hz, tracked {:.1} Hz",
            mean
        );
    }

    #[test]
    fn test_silence_is_unvoiced() {
        let samples = vec![0.0f32; 44100];
        let (f0, voicing) = track(&samples, 44100);
        assert!(voicing.iter().all(|&v| !v));
        assert!(f0.iter().all(|&f| f == 0.0));
    }

    #[test]
    fn test_too_short_input_yields_no_frames() {
        let (f0, voicing) = track(&[0.1; 10], 44100);
        assert!(f0.is_empty());
        assert!(voicing.is_empty());
    }
}
