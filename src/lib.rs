//! EUPH Encoder - AI-assisted audio enhancement and container encoding
//!
//! This library runs a fixed enhancement pipeline (super-resolution, source
//! separation, harmonic reconstruction) over a recording and serializes the
//! result into the chunked EUPH container together with descriptive metadata
//! and references to the AI models responsible for each stage.

pub mod analysis;
pub mod audio;
pub mod euph;
pub mod model;
pub mod pipeline;
pub mod stages;
pub mod validation;

pub use model::{AudioMetadata, ModelRefs};
pub use pipeline::{EncodePipeline, PipelineConfig};
pub use stages::ExecutionContext;
