//! Enhancement stages
//!
//! Each stage is a capability trait with a deterministic DSP implementation
//! as the default. A model-backed implementation can replace any single
//! stage behind the same contract without touching the others; the
//! orchestrator depends only on the traits.

mod genre;
mod harmonic;
mod separation;
mod super_resolution;

pub use genre::RuleBasedClassifier;
pub use harmonic::DspReconstructor;
pub use separation::{profile_weights, DspSeparator, Stem, StemSet};
pub use super_resolution::DspSuperResolver;

use crate::audio::AudioBuffer;
use crate::model::ModelRefs;
use anyhow::Result;

/// Execution settings passed into stage construction.
///
/// Carries the model-reference map so stage selection never consults
/// process-wide state. The DSP implementations only use it to report which
/// slots are running without a model behind them.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    model_refs: ModelRefs,
}

impl ExecutionContext {
    pub fn new(model_refs: ModelRefs) -> Self {
        Self { model_refs }
    }

    /// Reference string for a named model slot, if the caller supplied one.
    pub fn model_ref(&self, name: &str) -> Option<&str> {
        self.model_refs.get(name).map(String::as_str)
    }

    pub fn model_refs(&self) -> &ModelRefs {
        &self.model_refs
    }
}

/// Raises the sample rate to a target and enhances high-frequency content.
pub trait SuperResolver {
    /// Identity when the input rate already meets the target; never an error.
    fn process(&self, buffer: AudioBuffer, target_rate: u32) -> Result<AudioBuffer>;
}

/// Splits a mix into semantic stems and recombines them under a weighting
/// profile.
pub trait Separator {
    fn separate(&self, buffer: &AudioBuffer) -> Result<StemSet>;

    /// Unknown profile names fall back to `balanced`.
    fn remix(&self, stems: &StemSet, profile: &str) -> AudioBuffer;
}

/// Resynthesizes harmonic content and blends it with the input.
pub trait Reconstructor {
    /// Strength 0 is pure passthrough; strength 1 is pure resynthesis.
    fn reconstruct(&self, buffer: AudioBuffer, strength: f32) -> Result<AudioBuffer>;
}

/// Maps a buffer to a genre label and confidence.
pub trait Classifier {
    fn classify(&self, buffer: &AudioBuffer) -> (String, f32);
}
