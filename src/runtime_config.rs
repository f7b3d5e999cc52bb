//! # Runtime Configuration Module
//!
//! Environment settings for the serving process.
//!
//! ### `SPECROUTER_STACK_SIZE`
//!
//! Stack size of the may coroutines serving requests. Decimal (`16384`) or
//! hexadecimal (`0x4000`). Default `0x4000` (16 KB). Handlers with deep call
//! chains need more; memory use is `stack_size × concurrent requests`.
//!
//! ### `SPECROUTER_BODY_LIMIT`
//!
//! Largest JSON request body accepted, in bytes. Default `102400`.

use std::env;

use crate::middleware::DEFAULT_BODY_LIMIT;

pub const DEFAULT_STACK_SIZE: usize = 0x4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for coroutines in bytes
    pub stack_size: usize,
    /// Request body limit in bytes
    pub body_limit: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            stack_size: lookup("SPECROUTER_STACK_SIZE")
                .and_then(|v| parse_size(&v))
                .unwrap_or(DEFAULT_STACK_SIZE),
            body_limit: lookup("SPECROUTER_BODY_LIMIT")
                .and_then(|v| parse_size(&v))
                .unwrap_or(DEFAULT_BODY_LIMIT),
        }
    }
}

fn parse_size(value: &str) -> Option<usize> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}
