//! Tempo estimation via spectral-flux beat tracking

use super::spectrum::Stft;

const TEMPO_FFT_SIZE: usize = 2048;
const TEMPO_HOP_SIZE: usize = 1024;

/// Fallback when too few beats are detected to measure an interval
const DEFAULT_BPM: f32 = 120.0;

/// Estimate tempo in BPM from a mono signal.
pub fn estimate(samples: &[f32], sample_rate: u32) -> f32 {
    let stft = Stft::new(TEMPO_FFT_SIZE, TEMPO_HOP_SIZE);
    let frames = stft.forward(samples);

    // Positive spectral flux per frame
    let mut flux_values: Vec<(f32, f32)> = Vec::with_capacity(frames.len());
    let mut prev = vec![0.0f32; stft.bins()];
    for (i, frame) in frames.iter().enumerate() {
        let mags: Vec<f32> = frame.iter().map(|c| c.norm()).collect();
        let flux: f32 = mags
            .iter()
            .zip(&prev)
            .map(|(cur, p)| (cur - p).max(0.0))
            .sum();
        let time = (i * TEMPO_HOP_SIZE) as f32 / sample_rate as f32;
        flux_values.push((time, flux));
        prev = mags;
    }

    let beats = detect_beats(&flux_values);
    estimate_from_beats(&beats)
}

/// Onset picking with an adaptive local threshold.
fn detect_beats(flux_values: &[(f32, f32)]) -> Vec<f32> {
    if flux_values.is_empty() {
        return Vec::new();
    }

    let window = 20;
    let mut beat_times = Vec::new();

    for i in 0..flux_values.len() {
        let start = i.saturating_sub(window);
        let end = (i + window + 1).min(flux_values.len());
        let local_mean: f32 =
            flux_values[start..end].iter().map(|(_, f)| f).sum::<f32>() / (end - start) as f32;
        let threshold = local_mean * 1.5 + 0.01;

        if flux_values[i].1 > threshold {
            let is_peak = (i == 0 || flux_values[i].1 >= flux_values[i - 1].1)
                && (i == flux_values.len() - 1 || flux_values[i].1 >= flux_values[i + 1].1);

            // Minimum 100ms gap between onsets
            let far_enough = beat_times
                .last()
                .map_or(true, |&last: &f32| flux_values[i].0 - last > 0.1);

            if is_peak && far_enough {
                beat_times.push(flux_values[i].0);
            }
        }
    }

    beat_times
}

fn estimate_from_beats(beat_times: &[f32]) -> f32 {
    if beat_times.len() < 2 {
        return DEFAULT_BPM;
    }

    let intervals: Vec<f32> = beat_times.windows(2).map(|w| w[1] - w[0]).collect();

    // Keep intervals corresponding to 60-200 BPM
    let mut reasonable: Vec<f32> = intervals
        .iter()
        .copied()
        .filter(|&i| (0.3..=1.0).contains(&i))
        .collect();

    if reasonable.is_empty() {
        return DEFAULT_BPM;
    }

    reasonable.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let median_interval = reasonable[reasonable.len() / 2];

    60.0 / median_interval
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steady_tone_falls_back_to_default() {
        let samples: Vec<f32> = (0..44100)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin())
            .collect();
        assert_eq!(estimate(&samples, 44100), DEFAULT_BPM);
    }

    #[test]
    fn test_click_train_tempo() {
        // 120 BPM click train: one impulse burst every 0.5s
        let sample_rate = 44100u32;
        let mut samples = vec![0.0f32; sample_rate as usize * 4];
        let period = sample_rate as usize / 2;
        for click in (0..samples.len()).step_by(period) {
            for i in click..(click + 200).min(samples.len()) {
                samples[i] = 0.9;
            }
        }

        let bpm = estimate(&samples, sample_rate);
        assert!(
            (bpm - 120.0).abs() < 15.0,
            "expected ~120 BPM, estimated {:.1}",
            bpm
        );
    }
}
