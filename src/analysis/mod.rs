//! Audio feature extraction
//!
//! Derives the scalar and per-frame descriptors (pitch track, loudness,
//! spectral shape, MFCC, tempo) the enhancement stages and the genre
//! classifier consume. Feature sets live for one buffer and are never
//! persisted.

mod extractor;
pub mod pitch;
pub mod spectrum;
mod tempo;

pub use extractor::{FeatureExtractor, FeatureSet};
