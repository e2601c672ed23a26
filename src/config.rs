//! Configuration.
//!
//! Alignment options are plain structs passed into every operation. The
//! process-level [`Config`] loads them from environment variables and `.env`
//! files.

use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::constants::{alignment, storage};
use crate::error::{Error, Result};

/// Tunable alignment options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentConfig {
    /// Minimum similarity (inclusive) for an annotation to attach.
    pub min_score: f64,
    /// Longest run of consecutive lines a single annotation may cover.
    pub max_span_lines: usize,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            min_score: alignment::DEFAULT_MIN_SCORE,
            max_span_lines: alignment::DEFAULT_MAX_SPAN_LINES,
        }
    }
}

impl AlignmentConfig {
    /// Set the acceptance threshold.
    #[must_use]
    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    /// Set the maximum span length.
    #[must_use]
    pub const fn with_max_span_lines(mut self, lines: usize) -> Self {
        self.max_span_lines = lines;
        self
    }

    /// Check that the options are usable.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(Error::config(
                format!("min_score {} is outside [0, 1]", self.min_score),
                "Use a similarity threshold between 0.0 and 1.0, e.g. 0.6",
            ));
        }
        if self.max_span_lines == 0 || self.max_span_lines > alignment::MAX_SPAN_LINES_LIMIT {
            return Err(Error::config(
                format!("max_span_lines {} is out of range", self.max_span_lines),
                "Use a span length between 1 and 64",
            ));
        }
        Ok(())
    }
}

/// Configuration for the preprocessing tools.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the ingested data tree (`<data_dir>/songs/<id>/`)
    pub data_dir: PathBuf,
    /// Alignment options
    pub alignment: AlignmentConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(storage::DEFAULT_DATA_DIR),
            alignment: AlignmentConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self> {
        // Try to load .env file if present
        dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("SONG2QUIZ_DATA_DIR") {
            config.data_dir = PathBuf::from(shellexpand::tilde(&dir).to_string());
        }

        if let Some(raw) = lookup("SONG2QUIZ_MIN_SCORE") {
            config.alignment.min_score = raw.trim().parse().map_err(|_| {
                Error::config(
                    format!("SONG2QUIZ_MIN_SCORE '{raw}' is not a number"),
                    "Set SONG2QUIZ_MIN_SCORE to a decimal such as 0.6",
                )
            })?;
        }

        if let Some(raw) = lookup("SONG2QUIZ_MAX_SPAN_LINES") {
            config.alignment.max_span_lines = raw.trim().parse().map_err(|_| {
                Error::config(
                    format!("SONG2QUIZ_MAX_SPAN_LINES '{raw}' is not a whole number"),
                    "Set SONG2QUIZ_MAX_SPAN_LINES to a positive integer such as 8",
                )
            })?;
        }

        config.alignment.validate()?;
        Ok(config)
    }
}
