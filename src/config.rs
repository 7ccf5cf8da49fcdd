//! Library configuration.
//!
//! Every section has defaults, so an empty JSON object is a valid config.

use serde::{Deserialize, Serialize};

use crate::analysis::RetryPolicy;
use crate::assessment::AssessmentConfig;
use crate::storage::BackendConfig;
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    pub backend: BackendConfig,
    pub assessment: AssessmentConfig,
    /// Applied to every call to the content generator.
    pub retry: RetryPolicy,
}

impl StudyConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be at least 1".into()));
        }
        if !(self.retry.backoff_multiplier >= 1.0) {
            return Err(Error::Config("retry.backoff_multiplier must be >= 1.0".into()));
        }
        let a = &self.assessment;
        if a.know_level > 100 || a.dont_know_level > 100 || a.weak_threshold > 100 {
            return Err(Error::Config("assessment levels must be within 0..=100".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() {
        assert_eq!(StudyConfig::from_json("{}").unwrap(), StudyConfig::default());
    }

    #[test]
    fn zero_attempts_rejected() {
        let json = r#"{"retry": {"max_attempts": 0,
                       "initial_delay": {"secs": 1, "nanos": 0},
                       "max_delay": {"secs": 1, "nanos": 0},
                       "backoff_multiplier": 2.0}}"#;
        assert!(matches!(StudyConfig::from_json(json), Err(Error::Config(_))));
    }

    #[test]
    fn out_of_range_level_rejected() {
        let json = r#"{"assessment": {"know_level": 120}}"#;
        assert!(matches!(StudyConfig::from_json(json), Err(Error::Config(_))));
    }
}
