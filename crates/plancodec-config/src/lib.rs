//! TOML configuration for the plan codec.
//!
//! Every key is optional. A missing table or key falls back to the codec
//! defaults; unknown keys are rejected so typos surface at load time.
//!
//! ```toml
//! [encode]
//! include_runtime_stats = false
//!
//! [decode]
//! max_depth = 64
//! max_lines = 100000
//! ```

use plancodec_core::{
    decode::{DecodeOptions, PlanDecoder},
    encode::{EncodeOptions, PlanEncoder},
    error::CodecError,
};
use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<ConfigError> for CodecError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io { .. } => Self::config_internal(err.to_string()),
            ConfigError::Parse(_) | ConfigError::Invalid(_) => {
                Self::config_invalid(err.to_string())
            }
        }
    }
}

///
/// PlanCodecConfig
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlanCodecConfig {
    pub encode: EncodeOptions,
    pub decode: DecodeOptions,
}

impl PlanCodecConfig {
    /// Parse and validate configuration text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;

        Ok(config)
    }

    /// Read, parse, and validate a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.decode.max_depth == 0 {
            return Err(ConfigError::Invalid(
                "decode.max_depth must be at least 1".to_string(),
            ));
        }
        if self.decode.max_lines == 0 {
            return Err(ConfigError::Invalid(
                "decode.max_lines must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    #[must_use]
    pub const fn encoder(&self) -> PlanEncoder {
        PlanEncoder::new(self.encode)
    }

    #[must_use]
    pub const fn decoder(&self) -> PlanDecoder {
        PlanDecoder::new(self.decode)
    }
}
