//! Metadata records stored in the container

use crate::audio::AudioBuffer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mapping from model name to a path or URL reference string.
///
/// The encoder only stores this map (as the AIMD chunk); it never resolves or
/// validates the references. A BTreeMap keeps the serialized chunk
/// deterministic.
pub type ModelRefs = BTreeMap<String, String>;

/// Descriptive record written into the META chunk.
///
/// Serialized as JSON rather than binary fields so the record stays
/// forward-extensible. Once written into a container it is never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioMetadata {
    /// Sample rate of the source recording
    pub sample_rate: u32,

    /// Duration in seconds
    pub duration: f32,

    /// Channel count of the source recording
    pub channels: usize,

    /// Genre label; auto-filled by the pipeline when absent
    pub genre: Option<String>,

    /// Tempo in BPM
    pub tempo: Option<f32>,

    /// Musical key
    pub key: Option<String>,

    /// Mood tags
    pub mood: Option<Vec<String>>,

    /// Energy, conceptually in [0, 1]
    pub energy: Option<f32>,

    /// Valence, conceptually in [0, 1]
    pub valence: Option<f32>,
}

impl AudioMetadata {
    /// Build a metadata record describing a decoded buffer, with all
    /// descriptive fields unset.
    pub fn for_buffer(buffer: &AudioBuffer) -> Self {
        Self {
            sample_rate: buffer.sample_rate,
            duration: buffer.duration_secs(),
            channels: buffer.channels,
            genre: None,
            tempo: None,
            key: None,
            mood: None,
            energy: None,
            valence: None,
        }
    }
}
