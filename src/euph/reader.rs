//! Container reader
//!
//! Fails closed: unknown magic, an unsupported major version, a length or
//! checksum mismatch, or a truncated chunk sequence all reject the file.
//! Unrecognized chunk tags are skipped via their declared length so newer
//! writers stay readable.

use super::{
    EuphError, CHUNK_AIMD, CHUNK_AUDI, CHUNK_META, EUPH_MAGIC, HEADER_LEN, VERSION_MAJOR,
};
use crate::audio::AudioBuffer;
use crate::euph::decode_flac;
use crate::model::{AudioMetadata, ModelRefs};
use binrw::BinRead;
use crc32fast::Hasher;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

#[derive(Debug, BinRead)]
#[br(little)]
struct RawHeader {
    magic: [u8; 4],
    version: [u8; 2],
    total_length: u64,
    integrity: u32,
}

#[derive(Debug, BinRead)]
#[br(little)]
struct RawChunkHeader {
    tag: [u8; 4],
    length: u64,
}

/// A fully parsed EUPH container.
#[derive(Debug)]
pub struct EuphFile {
    pub version: (u8, u8),
    pub total_length: u64,
    pub integrity: u32,
    pub metadata: AudioMetadata,
    pub audio_payload: Vec<u8>,
    pub model_refs: ModelRefs,
}

impl EuphFile {
    pub fn open(path: &Path) -> Result<Self, EuphError> {
        let file = File::open(path)?;
        Self::read(&mut BufReader::new(file))
    }

    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self, EuphError> {
        let header = RawHeader::read(reader).map_err(map_binrw)?;

        if header.magic != EUPH_MAGIC {
            return Err(EuphError::UnknownMagic);
        }
        if header.version[0] != VERSION_MAJOR {
            return Err(EuphError::UnsupportedVersion(
                header.version[0],
                header.version[1],
            ));
        }

        let mut payload = Vec::new();
        reader.read_to_end(&mut payload)?;
        let actual = HEADER_LEN + payload.len() as u64;
        if header.total_length != actual {
            // Covers interrupted writes too: their length field is still zero
            return Err(EuphError::LengthMismatch {
                declared: header.total_length,
                actual,
            });
        }

        // A zero integrity field marks a container written without a
        // checksum; nonzero must match the chunk region.
        if header.integrity != 0 {
            let mut hasher = Hasher::new();
            hasher.update(&payload);
            let computed = hasher.finalize();
            if computed != header.integrity {
                return Err(EuphError::ChecksumMismatch {
                    stored: header.integrity,
                    computed,
                });
            }
        }

        let mut metadata: Option<AudioMetadata> = None;
        let mut audio_payload: Option<Vec<u8>> = None;
        let mut model_refs: Option<ModelRefs> = None;

        let mut cursor = Cursor::new(payload.as_slice());
        while (cursor.position() as usize) < payload.len() {
            let offset = HEADER_LEN + cursor.position();
            let chunk = RawChunkHeader::read(&mut cursor).map_err(|_| EuphError::Truncated(offset))?;

            let start = cursor.position() as usize;
            if chunk.length > (payload.len() - start) as u64 {
                return Err(EuphError::Truncated(offset));
            }
            let end = start + chunk.length as usize;
            let data = &payload[start..end];

            match chunk.tag {
                CHUNK_META => {
                    metadata = Some(
                        serde_json::from_slice(data)
                            .map_err(|e| EuphError::MalformedChunk("META", e))?,
                    );
                }
                CHUNK_AUDI => audio_payload = Some(data.to_vec()),
                CHUNK_AIMD => {
                    model_refs = Some(
                        serde_json::from_slice(data)
                            .map_err(|e| EuphError::MalformedChunk("AIMD", e))?,
                    );
                }
                tag => {
                    log::debug!(
                        "Skipping unrecognized chunk {:?} ({} bytes)",
                        String::from_utf8_lossy(&tag),
                        chunk.length
                    );
                }
            }

            cursor.set_position(end as u64);
        }

        Ok(EuphFile {
            version: (header.version[0], header.version[1]),
            total_length: header.total_length,
            integrity: header.integrity,
            metadata: metadata.ok_or(EuphError::MissingChunk("META"))?,
            audio_payload: audio_payload.ok_or(EuphError::MissingChunk("AUDI"))?,
            model_refs: model_refs.ok_or(EuphError::MissingChunk("AIMD"))?,
        })
    }

    /// Decode the AUDI chunk into an audio buffer.
    pub fn decode_audio(&self) -> anyhow::Result<AudioBuffer> {
        decode_flac(&self.audio_payload)
    }
}

fn map_binrw(e: binrw::Error) -> EuphError {
    match e {
        binrw::Error::Io(e) => EuphError::Io(e),
        other => EuphError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            other.to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::euph::VERSION_MINOR;

    /// Assemble a container by hand with patched length and checksum.
    fn build_container(version: [u8; 2], chunks: &[([u8; 4], Vec<u8>)]) -> Vec<u8> {
        let mut chunk_region = Vec::new();
        for (tag, payload) in chunks {
            chunk_region.extend_from_slice(tag);
            chunk_region.extend_from_slice(&(payload.len() as u64).to_le_bytes());
            chunk_region.extend_from_slice(payload);
        }

        let total = HEADER_LEN + chunk_region.len() as u64;
        let mut hasher = Hasher::new();
        hasher.update(&chunk_region);

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&EUPH_MAGIC);
        bytes.extend_from_slice(&version);
        bytes.extend_from_slice(&total.to_le_bytes());
        bytes.extend_from_slice(&hasher.finalize().to_le_bytes());
        bytes.extend_from_slice(&chunk_region);
        bytes
    }

    fn meta_json() -> Vec<u8> {
        let metadata = AudioMetadata {
            sample_rate: 44100,
            duration: 1.0,
            channels: 1,
            genre: Some("pop".to_string()),
            tempo: None,
            key: None,
            mood: None,
            energy: None,
            valence: None,
        };
        serde_json::to_vec(&metadata).unwrap()
    }

    fn aimd_json() -> Vec<u8> {
        let mut refs = ModelRefs::new();
        refs.insert("ddsp".to_string(), "models/ddsp.onnx".to_string());
        serde_json::to_vec(&refs).unwrap()
    }

    fn standard_chunks() -> Vec<([u8; 4], Vec<u8>)> {
        vec![
            (CHUNK_META, meta_json()),
            (CHUNK_AUDI, vec![0xAA; 64]),
            (CHUNK_AIMD, aimd_json()),
        ]
    }

    #[test]
    fn test_reads_well_formed_container() {
        let bytes = build_container([VERSION_MAJOR, VERSION_MINOR], &standard_chunks());
        let file = EuphFile::read(&mut Cursor::new(bytes)).unwrap();

        assert_eq!(file.version, (1, 0));
        assert_eq!(file.metadata.genre.as_deref(), Some("pop"));
        assert_eq!(file.audio_payload, vec![0xAA; 64]);
        assert_eq!(file.model_refs.get("ddsp").unwrap(), "models/ddsp.onnx");
    }

    #[test]
    fn test_unknown_chunk_is_skipped() {
        let mut chunks = standard_chunks();
        chunks.insert(1, (*b"XTRA", vec![0x55; 37]));

        let bytes = build_container([VERSION_MAJOR, VERSION_MINOR], &chunks);
        let file = EuphFile::read(&mut Cursor::new(bytes)).unwrap();

        assert_eq!(file.audio_payload, vec![0xAA; 64]);
        assert!(!file.model_refs.is_empty());
    }

    #[test]
    fn test_bad_magic_fails_closed() {
        let mut bytes = build_container([VERSION_MAJOR, VERSION_MINOR], &standard_chunks());
        bytes[..4].copy_from_slice(b"RIFF");

        match EuphFile::read(&mut Cursor::new(bytes)) {
            Err(EuphError::UnknownMagic) => {}
            other => panic!("expected UnknownMagic, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_unsupported_major_version_fails_closed() {
        let bytes = build_container([2, 0], &standard_chunks());

        match EuphFile::read(&mut Cursor::new(bytes)) {
            Err(EuphError::UnsupportedVersion(2, 0)) => {}
            other => panic!("expected UnsupportedVersion, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_zero_length_field_is_rejected() {
        // An interrupted write never patches the length field
        let mut bytes = build_container([VERSION_MAJOR, VERSION_MINOR], &standard_chunks());
        bytes[6..14].copy_from_slice(&0u64.to_le_bytes());

        match EuphFile::read(&mut Cursor::new(bytes)) {
            Err(EuphError::LengthMismatch { declared: 0, .. }) => {}
            other => panic!("expected LengthMismatch, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_zero_integrity_is_accepted_as_legacy() {
        let mut bytes = build_container([VERSION_MAJOR, VERSION_MINOR], &standard_chunks());
        bytes[14..18].copy_from_slice(&0u32.to_le_bytes());

        assert!(EuphFile::read(&mut Cursor::new(bytes)).is_ok());
    }

    #[test]
    fn test_corrupted_payload_fails_checksum() {
        let mut bytes = build_container([VERSION_MAJOR, VERSION_MINOR], &standard_chunks());
        // Flip a byte inside the AUDI payload without touching the length
        let audi_start = bytes
            .windows(4)
            .position(|w| w == b"AUDI")
            .unwrap();
        bytes[audi_start + 12] ^= 0xFF;

        match EuphFile::read(&mut Cursor::new(bytes)) {
            Err(EuphError::ChecksumMismatch { .. }) => {}
            other => panic!("expected ChecksumMismatch, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_overlong_chunk_is_truncation() {
        let mut chunk_region = Vec::new();
        chunk_region.extend_from_slice(&CHUNK_META);
        // Declared length runs past the end of the file
        chunk_region.extend_from_slice(&1_000_000u64.to_le_bytes());
        chunk_region.extend_from_slice(&[0u8; 16]);

        let total = HEADER_LEN + chunk_region.len() as u64;
        let mut hasher = Hasher::new();
        hasher.update(&chunk_region);

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&EUPH_MAGIC);
        bytes.extend_from_slice(&[VERSION_MAJOR, VERSION_MINOR]);
        bytes.extend_from_slice(&total.to_le_bytes());
        bytes.extend_from_slice(&hasher.finalize().to_le_bytes());
        bytes.extend_from_slice(&chunk_region);

        match EuphFile::read(&mut Cursor::new(bytes)) {
            Err(EuphError::Truncated(_)) => {}
            other => panic!("expected Truncated, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_missing_audio_chunk_is_reported() {
        let chunks = vec![(CHUNK_META, meta_json()), (CHUNK_AIMD, aimd_json())];
        let bytes = build_container([VERSION_MAJOR, VERSION_MINOR], &chunks);

        match EuphFile::read(&mut Cursor::new(bytes)) {
            Err(EuphError::MissingChunk("AUDI")) => {}
            other => panic!("expected MissingChunk, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_meta_round_trip_through_writer() {
        use crate::euph::write_euph;

        let buffer = AudioBuffer::mono(vec![0.05; 1600], 8000);
        let mut metadata = AudioMetadata::for_buffer(&buffer);
        metadata.genre = Some("ambient".to_string());
        metadata.mood = Some(vec!["calm".to_string()]);
        metadata.energy = Some(0.2);

        let refs = ModelRefs::new();
        let mut cursor = Cursor::new(Vec::new());
        write_euph(&mut cursor, &buffer, &metadata, &refs).unwrap();
        cursor.set_position(0);

        let file = EuphFile::read(&mut cursor).unwrap();
        assert_eq!(file.metadata, metadata);
        assert_eq!(file.model_refs, refs);
    }
}
