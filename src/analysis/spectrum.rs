//! Short-time Fourier transform helpers shared by the spectral stages

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// FFT size used by the spectral processing stages
pub const STAGE_FFT_SIZE: usize = 2048;
/// Hop size for the stages; half the FFT size so the analysis window
/// overlap-adds to unity
pub const STAGE_HOP_SIZE: usize = 1024;

/// Windowed STFT with overlap-add reconstruction.
pub struct Stft {
    fft_size: usize,
    hop_size: usize,
    window: Vec<f32>,
    fwd: Arc<dyn Fft<f32>>,
    inv: Arc<dyn Fft<f32>>,
}

impl Stft {
    pub fn new(fft_size: usize, hop_size: usize) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        Self {
            fft_size,
            hop_size,
            window: hann_window(fft_size),
            fwd: planner.plan_fft_forward(fft_size),
            inv: planner.plan_fft_inverse(fft_size),
        }
    }

    /// Number of one-sided frequency bins per frame
    pub fn bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Width of one bin in Hz
    pub fn bin_hz(&self, sample_rate: u32) -> f32 {
        sample_rate as f32 / self.fft_size as f32
    }

    /// Compute the one-sided complex spectrogram. Short inputs produce a
    /// single zero-padded frame.
    pub fn forward(&self, samples: &[f32]) -> Vec<Vec<Complex<f32>>> {
        let n = self.fft_size;
        let num_frames = if samples.len() >= n {
            (samples.len() - n) / self.hop_size + 1
        } else {
            1
        };

        (0..num_frames)
            .map(|frame| {
                let start = frame * self.hop_size;
                let end = (start + n).min(samples.len());
                let mut buf = vec![Complex::new(0.0f32, 0.0); n];
                for (i, &s) in samples[start..end].iter().enumerate() {
                    buf[i] = Complex::new(s * self.window[i], 0.0);
                }
                self.fwd.process(&mut buf);
                buf.truncate(self.bins());
                buf
            })
            .collect()
    }

    /// Overlap-add reconstruction of one-sided frames into `output_len`
    /// samples. Valid for hop == fft_size / 2, where the analysis window
    /// sums to one.
    pub fn inverse(&self, frames: &[Vec<Complex<f32>>], output_len: usize) -> Vec<f32> {
        let n = self.fft_size;
        let bins = self.bins();
        let mut out = vec![0.0f32; output_len];
        let mut full = vec![Complex::new(0.0f32, 0.0); n];

        for (frame_idx, frame) in frames.iter().enumerate() {
            full[..bins].copy_from_slice(frame);
            // Conjugate mirror for the negative frequencies
            for k in 1..bins - 1 {
                full[n - k] = frame[k].conj();
            }
            self.inv.process(&mut full);

            let start = frame_idx * self.hop_size;
            for (i, value) in full.iter().enumerate() {
                let idx = start + i;
                if idx >= output_len {
                    break;
                }
                out[idx] += value.re / n as f32;
            }
        }

        out
    }
}

/// Periodic Hann window
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / size as f32).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_preserves_interior() {
        let stft = Stft::new(STAGE_FFT_SIZE, STAGE_HOP_SIZE);
        let samples: Vec<f32> = (0..8192)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin())
            .collect();

        let frames = stft.forward(&samples);
        let restored = stft.inverse(&frames, samples.len());

        // Edges lose window coverage; the interior must reconstruct closely.
        for i in STAGE_FFT_SIZE..samples.len() - STAGE_FFT_SIZE {
            assert!(
                (samples[i] - restored[i]).abs() < 1e-3,
                "sample {} diverged: {} vs {}",
                i,
                samples[i],
                restored[i]
            );
        }
    }

    #[test]
    fn test_short_input_yields_one_frame() {
        let stft = Stft::new(STAGE_FFT_SIZE, STAGE_HOP_SIZE);
        let frames = stft.forward(&[0.5; 100]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), stft.bins());
    }
}
