//! Audio decoding via symphonia

use super::AudioBuffer;
use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Load and fully decode an audio file, preserving its channel layout.
pub fn load(path: &Path) -> Result<AudioBuffer> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open audio file: {:?}", path))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let buffer = decode_stream(mss, hint)
        .with_context(|| format!("Failed to decode audio file: {:?}", path))?;

    log::info!(
        "Decoded {:?}: {} frames, {} channel(s), {}Hz ({:.1}s)",
        path,
        buffer.frames(),
        buffer.channels,
        buffer.sample_rate,
        buffer.duration_secs()
    );

    Ok(buffer)
}

/// Decode an already-opened media stream to an interleaved f32 buffer.
///
/// Also used to decode the FLAC payload of an AUDI chunk from memory.
pub fn decode_stream(mss: MediaSourceStream, hint: Hint) -> Result<AudioBuffer> {
    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .context("Failed to probe audio format")?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .context("No audio track found")?;

    let track_id = track.id;
    let channels = track.codec_params.channels.map_or(1, |c| c.count());
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("No sample rate in audio track")?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create audio decoder")?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                log::warn!("Skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(sample_buf.samples());
    }

    if samples.is_empty() {
        anyhow::bail!("Audio stream contained no samples");
    }

    Ok(AudioBuffer::new(samples, sample_rate, channels))
}
