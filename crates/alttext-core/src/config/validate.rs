//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

/// Upper bound for every size limit, in megabytes.
const MAX_SIZE_MB: u64 = 100;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_SIZE_MB).contains(&self.server.body_limit_mb) {
            return Err(ConfigError::ValidationError(format!(
                "server.body_limit_mb must be between 1 and {MAX_SIZE_MB}"
            )));
        }
        if !(1..=MAX_SIZE_MB).contains(&self.limits.max_upload_mb) {
            return Err(ConfigError::ValidationError(format!(
                "limits.max_upload_mb must be between 1 and {MAX_SIZE_MB}"
            )));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.vision_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.vision_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.completion_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.completion_timeout_ms must be > 0".into(),
            ));
        }
        if self.compression.max_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "compression.max_dimension must be > 0".into(),
            ));
        }
        if !(1..=MAX_SIZE_MB * 1024).contains(&self.compression.max_size_kb) {
            return Err(ConfigError::ValidationError(format!(
                "compression.max_size_kb must be between 1 and {}",
                MAX_SIZE_MB * 1024
            )));
        }
        if self.compression.quality_steps.is_empty()
            || self
                .compression
                .quality_steps
                .iter()
                .any(|q| *q == 0 || *q > 100)
        {
            return Err(ConfigError::ValidationError(
                "compression.quality_steps must be non-empty values in 1..=100".into(),
            ));
        }
        let rekognition = &self.vision.rekognition;
        if !(0.0..=100.0).contains(&rekognition.min_confidence) {
            return Err(ConfigError::ValidationError(
                "vision.rekognition.min_confidence must be between 0 and 100".into(),
            ));
        }
        if rekognition.max_labels == 0 {
            return Err(ConfigError::ValidationError(
                "vision.rekognition.max_labels must be > 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.vision.google.min_score) {
            return Err(ConfigError::ValidationError(
                "vision.google.min_score must be between 0.0 and 1.0".into(),
            ));
        }
        if self.completion.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "completion.max_tokens must be > 0".into(),
            ));
        }
        if self.completion.n == 0 {
            return Err(ConfigError::ValidationError(
                "completion.n must be > 0".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(ConfigError::ValidationError(
                "completion.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        Ok(())
    }
}
