//! Pipeline configuration

/// Configuration for one encode run.
///
/// Defaults are the fixed pipeline values: 48 kHz target, `balanced`
/// remix profile, harmonic strength 0.3.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Target sample rate for the super-resolution stage
    pub target_sample_rate: u32,

    /// Stem weighting profile applied when remixing
    pub mix_profile: String,

    /// Harmonic reconstruction blend strength in [0, 1]
    pub harmonic_strength: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 48_000,
            mix_profile: "balanced".to_string(),
            harmonic_strength: 0.3,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target_sample_rate(mut self, rate: u32) -> Self {
        self.target_sample_rate = rate;
        self
    }

    pub fn with_mix_profile(mut self, profile: impl Into<String>) -> Self {
        self.mix_profile = profile.into();
        self
    }

    pub fn with_harmonic_strength(mut self, strength: f32) -> Self {
        self.harmonic_strength = strength;
        self
    }
}
