//! Encode pipeline orchestration
//!
//! Sequences the enhancement stages deterministically and hands the result
//! to the container encoder. Each stage slot holds the deterministic DSP
//! implementation by default and can be swapped behind its trait without
//! touching the others.

use super::PipelineConfig;
use crate::audio::{self, AudioBuffer};
use crate::euph;
use crate::model::{AudioMetadata, ModelRefs};
use crate::stages::{
    Classifier, DspReconstructor, DspSeparator, DspSuperResolver, ExecutionContext, Reconstructor,
    RuleBasedClassifier, Separator, SuperResolver,
};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

/// Model slot names checked at construction time
const MODEL_SLOTS: [&str; 4] = ["audiosr", "demucs", "ddsp", "genre_classifier"];

pub struct EncodePipeline {
    config: PipelineConfig,
    super_resolver: Box<dyn SuperResolver>,
    separator: Box<dyn Separator>,
    reconstructor: Box<dyn Reconstructor>,
    classifier: Box<dyn Classifier>,
}

impl EncodePipeline {
    /// Build a pipeline with the DSP fallback in every stage slot.
    ///
    /// Slots without a model reference behind them are logged; running on
    /// the DSP approximation is a degradation, not an error.
    pub fn new(config: PipelineConfig, ctx: &ExecutionContext) -> Self {
        for slot in MODEL_SLOTS {
            match ctx.model_ref(slot) {
                Some(reference) => {
                    log::debug!("Model reference recorded for {}: {}", slot, reference)
                }
                None => log::info!("No model reference for {}; using DSP fallback", slot),
            }
        }

        Self {
            config,
            super_resolver: Box::new(DspSuperResolver::new()),
            separator: Box::new(DspSeparator::new()),
            reconstructor: Box::new(DspReconstructor::new()),
            classifier: Box::new(RuleBasedClassifier::new()),
        }
    }

    pub fn with_super_resolver(mut self, stage: Box<dyn SuperResolver>) -> Self {
        self.super_resolver = stage;
        self
    }

    pub fn with_separator(mut self, stage: Box<dyn Separator>) -> Self {
        self.separator = stage;
        self
    }

    pub fn with_reconstructor(mut self, stage: Box<dyn Reconstructor>) -> Self {
        self.reconstructor = stage;
        self
    }

    pub fn with_classifier(mut self, stage: Box<dyn Classifier>) -> Self {
        self.classifier = stage;
        self
    }

    /// Run the enhancement stages in their fixed order, auto-filling the
    /// genre field of the caller's metadata record when it is unset.
    pub fn process(
        &self,
        buffer: AudioBuffer,
        metadata: &mut AudioMetadata,
    ) -> Result<AudioBuffer> {
        if metadata.genre.is_none() {
            let (genre, confidence) = self.classifier.classify(&buffer);
            log::info!("Detected genre: {} (confidence: {:.2})", genre, confidence);
            metadata.genre = Some(genre);
        }

        let buffer = buffer.into_mono();

        log::info!(
            "Stage 1/3: super-resolution to {}Hz",
            self.config.target_sample_rate
        );
        let buffer = self
            .super_resolver
            .process(buffer, self.config.target_sample_rate)
            .context("Super-resolution stage failed")?;

        log::info!(
            "Stage 2/3: source separation (profile: {})",
            self.config.mix_profile
        );
        let stems = self
            .separator
            .separate(&buffer)
            .context("Separation stage failed")?;
        let buffer = self.separator.remix(&stems, &self.config.mix_profile);

        log::info!(
            "Stage 3/3: harmonic reconstruction (strength: {:.2})",
            self.config.harmonic_strength
        );
        let buffer = self
            .reconstructor
            .reconstruct(buffer, self.config.harmonic_strength)
            .context("Harmonic reconstruction stage failed")?;

        Ok(buffer)
    }

    /// Process and serialize into a EUPH stream. Returns the bytes written.
    pub fn encode<W: Write + Seek>(
        &self,
        buffer: AudioBuffer,
        metadata: &mut AudioMetadata,
        model_refs: &ModelRefs,
        writer: &mut W,
    ) -> Result<u64> {
        let enhanced = self.process(buffer, metadata)?;
        euph::write_euph(writer, &enhanced, metadata, model_refs)
    }

    /// Encode into a file, removing a partial output on failure so no
    /// complete-looking artifact is left behind.
    pub fn encode_to_path(
        &self,
        buffer: AudioBuffer,
        metadata: &mut AudioMetadata,
        model_refs: &ModelRefs,
        output: &Path,
    ) -> Result<u64> {
        let result = File::create(output)
            .with_context(|| format!("Failed to create output file: {:?}", output))
            .and_then(|file| {
                let mut writer = BufWriter::new(file);
                self.encode(buffer, metadata, model_refs, &mut writer)
            });

        if result.is_err() {
            if let Err(e) = std::fs::remove_file(output) {
                log::debug!("Could not remove partial output {:?}: {}", output, e);
            }
        }

        result
    }

    /// Load a source file, encode it, and write the container. Returns the
    /// metadata record as serialized (including the auto-filled genre).
    pub fn encode_file(
        &self,
        input: &Path,
        output: &Path,
        model_refs: &ModelRefs,
    ) -> Result<AudioMetadata> {
        let buffer = audio::load(input)?;
        let mut metadata = AudioMetadata::for_buffer(&buffer);

        let total = self.encode_to_path(buffer, &mut metadata, model_refs, output)?;
        log::info!("Encoded {:?} -> {:?} ({} bytes)", input, output, total);

        Ok(metadata)
    }
}
