//! Container writer
//!
//! Chunks are streamed first; the integrity checksum and then the total
//! length are patched via seek-back. An interrupted write leaves a zero
//! length field, so partial files are detectably incomplete.

use super::{CHUNK_AIMD, CHUNK_AUDI, CHUNK_META, EUPH_MAGIC, VERSION_MAJOR, VERSION_MINOR};
use crate::audio::AudioBuffer;
use crate::euph::encode_flac;
use crate::model::{AudioMetadata, ModelRefs};
use anyhow::{Context, Result};
use crc32fast::Hasher;
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

const TOTAL_LENGTH_OFFSET: u64 = 6;
const INTEGRITY_OFFSET: u64 = 14;

/// Serialize the final buffer, metadata, and model references into a EUPH
/// stream. Returns the total byte length written.
pub fn write_euph<W: Write + Seek>(
    writer: &mut W,
    buffer: &AudioBuffer,
    metadata: &AudioMetadata,
    model_refs: &ModelRefs,
) -> Result<u64> {
    let metadata_json = serde_json::to_vec(metadata).context("Failed to serialize metadata")?;
    let model_json =
        serde_json::to_vec(model_refs).context("Failed to serialize model references")?;
    let audio_flac = encode_flac(buffer)?;

    // Header with zeroed length and integrity fields
    writer.write_all(&EUPH_MAGIC)?;
    writer.write_all(&[VERSION_MAJOR, VERSION_MINOR])?;
    writer.write_all(&0u64.to_le_bytes())?;
    writer.write_all(&0u32.to_le_bytes())?;

    // JSON metadata precedes the raw audio payload so a streaming decoder
    // sees the record before the bulk data.
    let mut hasher = Hasher::new();
    write_chunk(writer, &mut hasher, CHUNK_META, &metadata_json)?;
    write_chunk(writer, &mut hasher, CHUNK_AUDI, &audio_flac)?;
    write_chunk(writer, &mut hasher, CHUNK_AIMD, &model_json)?;

    let total_length = writer.stream_position()?;

    // Patch the integrity field first and the length field last; the length
    // doubles as the completeness marker.
    writer.seek(SeekFrom::Start(INTEGRITY_OFFSET))?;
    writer.write_all(&hasher.finalize().to_le_bytes())?;
    writer.seek(SeekFrom::Start(TOTAL_LENGTH_OFFSET))?;
    writer.write_all(&total_length.to_le_bytes())?;
    writer.seek(SeekFrom::Start(total_length))?;
    writer.flush()?;

    log::debug!(
        "Wrote EUPH container: {} bytes (META {}, AUDI {}, AIMD {})",
        total_length,
        metadata_json.len(),
        audio_flac.len(),
        model_json.len()
    );

    Ok(total_length)
}

fn write_chunk<W: Write>(
    writer: &mut W,
    hasher: &mut Hasher,
    tag: [u8; 4],
    payload: &[u8],
) -> Result<()> {
    let mut chunk = Vec::with_capacity(12 + payload.len());
    chunk.extend_from_slice(&tag);
    chunk.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    chunk.extend_from_slice(payload);

    hasher.update(&chunk);
    writer.write_all(&chunk)?;
    Ok(())
}

/// Write a container to a file path.
pub fn write_euph_file(
    path: &Path,
    buffer: &AudioBuffer,
    metadata: &AudioMetadata,
    model_refs: &ModelRefs,
) -> Result<u64> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {:?}", path))?;
    let mut writer = BufWriter::new(file);
    write_euph(&mut writer, buffer, metadata, model_refs)
}
