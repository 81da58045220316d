//! Genre classification
//!
//! Threshold rules over spectral centroid and tempo. A deliberately coarse
//! stand-in for a trained model; the rule order and the fixed confidences
//! are load-bearing for compatibility and must not be tuned.

use super::Classifier;
use crate::analysis::FeatureExtractor;
use crate::audio::AudioBuffer;

pub struct RuleBasedClassifier {
    extractor: FeatureExtractor,
}

impl RuleBasedClassifier {
    pub fn new() -> Self {
        Self {
            extractor: FeatureExtractor::new(),
        }
    }

    /// Ordered decision list; the first matching rule wins.
    pub fn classify_features(centroid_hz: f32, tempo_bpm: f32) -> (&'static str, f32) {
        if centroid_hz > 3000.0 && tempo_bpm > 120.0 {
            ("electronic", 0.8)
        } else if centroid_hz < 2000.0 && tempo_bpm < 100.0 {
            ("ambient", 0.7)
        } else if tempo_bpm > 140.0 {
            ("metal", 0.6)
        } else {
            ("pop", 0.5)
        }
    }
}

impl Default for RuleBasedClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for RuleBasedClassifier {
    fn classify(&self, buffer: &AudioBuffer) -> (String, f32) {
        let features = self.extractor.extract(buffer);
        let centroid = features.mean_centroid();
        let (genre, confidence) = Self::classify_features(centroid, features.tempo_bpm);

        log::debug!(
            "Classified genre {} (centroid {:.0} Hz, tempo {:.1} BPM)",
            genre,
            centroid,
            features.tempo_bpm
        );

        (genre.to_string(), confidence)
    }
}
