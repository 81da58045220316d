//! AUDI chunk payload codec
//!
//! The audio payload is compressed losslessly to FLAC with flacenc and
//! decoded back with symphonia, so the chunk stays a self-describing audio
//! stream rather than raw samples.

use crate::audio::{decode_stream, AudioBuffer};
use anyhow::{Context, Result};
use flacenc::bitsink::ByteSink;
use flacenc::component::BitRepr;
use flacenc::error::Verify;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::probe::Hint;

const BITS_PER_SAMPLE: usize = 16;

/// Compress a buffer into a FLAC stream.
pub fn encode_flac(buffer: &AudioBuffer) -> Result<Vec<u8>> {
    let samples: Vec<i32> = buffer
        .samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i32)
        .collect();

    let config = flacenc::config::Encoder::default()
        .into_verified()
        .map_err(|(_, e)| anyhow::anyhow!("Invalid FLAC encoder config: {:?}", e))?;

    let source = flacenc::source::MemSource::from_samples(
        &samples,
        buffer.channels,
        BITS_PER_SAMPLE,
        buffer.sample_rate as usize,
    );

    let stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
        .map_err(|e| anyhow::anyhow!("FLAC encoding failed: {:?}", e))?;

    let mut sink = ByteSink::new();
    stream
        .write(&mut sink)
        .map_err(|e| anyhow::anyhow!("FLAC serialization failed: {:?}", e))?;

    log::debug!(
        "Compressed {} samples into {} FLAC bytes",
        buffer.samples.len(),
        sink.as_slice().len()
    );

    Ok(sink.as_slice().to_vec())
}

/// Decode an AUDI chunk payload back into a buffer.
pub fn decode_flac(payload: &[u8]) -> Result<AudioBuffer> {
    let cursor = std::io::Cursor::new(payload.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("flac");

    decode_stream(mss, hint).context("Failed to decode AUDI chunk payload")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flac_round_trip() {
        let samples: Vec<f32> = (0..4000)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 8000.0).sin() * 0.5)
            .collect();
        let buffer = AudioBuffer::mono(samples, 8000);

        let flac = encode_flac(&buffer).expect("encode");
        assert!(flac.starts_with(b"fLaC"));

        let decoded = decode_flac(&flac).expect("decode");
        assert_eq!(decoded.sample_rate, 8000);
        assert_eq!(decoded.channels, 1);
        assert_eq!(decoded.frames(), buffer.frames());

        // Lossless up to 16-bit quantization
        for (a, b) in buffer.samples.iter().zip(&decoded.samples) {
            assert!((a - b).abs() < 1e-3);
        }
    }
}
