// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Stream settings.
//!
//! [`WireConfig`] is a plain value built with chained setters. With the
//! `config-loaders` feature it can also be read from YAML; missing keys keep
//! their defaults:
//!
//! ```yaml
//! compression: zstd
//! zstd_level: 3
//! with_header: true
//! default_timezone: Europe/Berlin
//! ```

use crate::codec::CodecOptions;
use crate::transport::CompressionMethod;
use chrono_tz::Tz;
use thiserror::Error;

/// Default uncompressed bytes per emitted block.
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 1 << 20;

/// Default ceiling on a block's declared compressed size.
pub const DEFAULT_MAX_COMPRESSED_SIZE: usize = 1 << 30;

/// Default ceiling on a decoded `String` value.
pub const DEFAULT_MAX_STRING_LENGTH: usize = 1 << 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown timezone '{0}'")]
    InvalidTimezone(String),

    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "config-loaders")]
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Settings for one RowBinary stream.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "config-loaders",
    derive(serde::Deserialize, serde::Serialize),
    serde(default, deny_unknown_fields)
)]
pub struct WireConfig {
    /// Method used by [`BlockWriter`](crate::transport::BlockWriter).
    pub compression: CompressionMethod,
    /// Uncompressed bytes buffered before a block is emitted.
    pub max_block_size: usize,
    /// Blocks declaring a larger compressed size are rejected on read.
    pub max_compressed_size: usize,
    pub zstd_level: i32,
    /// Write/read the names-and-types header.
    pub with_header: bool,
    /// IANA zone used when a `Date` column without its own zone receives an instant.
    pub default_timezone: Option<String>,
    pub max_string_length: usize,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            compression: CompressionMethod::Lz4,
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
            max_compressed_size: DEFAULT_MAX_COMPRESSED_SIZE,
            zstd_level: 1,
            with_header: false,
            default_timezone: None,
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
        }
    }
}

impl WireConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compression(mut self, method: CompressionMethod) -> Self {
        self.compression = method;
        self
    }

    pub fn max_block_size(mut self, bytes: usize) -> Self {
        self.max_block_size = bytes;
        self
    }

    pub fn max_compressed_size(mut self, bytes: usize) -> Self {
        self.max_compressed_size = bytes;
        self
    }

    pub fn zstd_level(mut self, level: i32) -> Self {
        self.zstd_level = level;
        self
    }

    pub fn with_header(mut self, enable: bool) -> Self {
        self.with_header = enable;
        self
    }

    pub fn default_timezone(mut self, tz: impl Into<String>) -> Self {
        self.default_timezone = Some(tz.into());
        self
    }

    pub fn max_string_length(mut self, bytes: usize) -> Self {
        self.max_string_length = bytes;
        self
    }

    /// Check limits and resolve the timezone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_block_size == 0 || self.max_block_size > u32::MAX as usize {
            return Err(ConfigError::Invalid {
                field: "max_block_size",
                reason: format!("{} is outside 1..=u32::MAX", self.max_block_size),
            });
        }
        if self.max_compressed_size == 0 {
            return Err(ConfigError::Invalid {
                field: "max_compressed_size",
                reason: "must be positive".into(),
            });
        }
        self.timezone().map(|_| ())
    }

    /// Parsed [`default_timezone`](Self::default_timezone).
    pub fn timezone(&self) -> Result<Option<Tz>, ConfigError> {
        self.default_timezone
            .as_deref()
            .map(|name| {
                name.parse::<Tz>()
                    .map_err(|_| ConfigError::InvalidTimezone(name.to_string()))
            })
            .transpose()
    }

    /// Options handed to every value codec.
    pub fn codec_options(&self) -> Result<CodecOptions, ConfigError> {
        Ok(CodecOptions {
            default_timezone: self.timezone()?,
            max_string_length: self.max_string_length,
        })
    }

    #[cfg(feature = "config-loaders")]
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "config-loaders")]
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}
