use crate::{
    outlier::{DEFAULT_Z_THRESHOLD, TUKEY_MULTIPLIER},
    summary::SEGMENT_MAX_UNIQUE,
    types::INCURRED_CUM,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Columns with 2..=segment_max_unique distinct values are segment candidates.
    pub segment_max_unique: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self { segment_max_unique: SEGMENT_MAX_UNIQUE }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    pub iqr_multiplier:      f64,
    pub zscore_threshold:    f64,
    /// Cumulative column differenced for the z-score detector.
    pub zscore_value_column: String,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            iqr_multiplier:      TUKEY_MULTIPLIER,
            zscore_threshold:    DEFAULT_Z_THRESHOLD,
            zscore_value_column: INCURRED_CUM.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub delimiter: char,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { delimiter: ',' }
    }
}

impl InputConfig {
    /// The delimiter as a single byte. Non-ASCII delimiters fall back to ','.
    pub fn delimiter_byte(&self) -> u8 {
        if self.delimiter.is_ascii() {
            self.delimiter as u8
        } else {
            log::warn!("non-ASCII delimiter {:?}, using ','", self.delimiter);
            b','
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Normalized rows embedded as sample records in the stage-3 prompt.
    pub sample_rows: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self { sample_rows: 50 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model:             String,
    pub endpoint:          String,
    pub temperature:       f64,
    pub max_output_tokens: u32,
    pub timeout_secs:      u64,
    /// Environment variable holding the API key. No key, no client.
    pub api_key_env:       String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model:             "gpt-5.1-mini".into(),
            endpoint:          "https://api.openai.com/v1/responses".into(),
            temperature:       0.2,
            max_output_tokens: 900,
            timeout_secs:      60,
            api_key_env:       "OPENAI_API_KEY".into(),
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub summary:  SummaryConfig,
    pub outliers: OutlierConfig,
    pub input:    InputConfig,
    pub prompts:  PromptConfig,
    pub llm:      LlmConfig,
}

impl AnalysisConfig {
    /// Load from a JSON file. Missing sections and fields take defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: AnalysisConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        log::debug!("loaded analysis config from {path}");
        Ok(config)
    }
}
