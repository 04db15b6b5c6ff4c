/*
    Lectern - live editor for generated teaching slides
    Copyright (C) 2025 meetzli

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.
*/

use lectern_render::RenderConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid editor config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid editor config: {0}")]
    Invalid(String),
}

fn default_history_limit() -> usize {
    50
}

fn default_history_settle_ms() -> u64 {
    500
}

fn default_style_flush_ms() -> u64 {
    1500
}

fn default_mode_retry_ms() -> Vec<u64> {
    vec![0, 100, 300, 600, 1000]
}

fn default_notice_ttl_ms() -> u64 {
    4000
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Quiet period before a source change becomes an undo step.
    #[serde(default = "default_history_settle_ms")]
    pub history_settle_ms: u64,
    /// Quiet period before queued element styles are pushed to the surface.
    #[serde(default = "default_style_flush_ms")]
    pub style_flush_ms: u64,
    /// Offsets from the start of a handshake at which `set-mode` is sent.
    #[serde(default = "default_mode_retry_ms")]
    pub mode_retry_ms: Vec<u64>,
    #[serde(default = "default_notice_ttl_ms")]
    pub notice_ttl_ms: u64,
    #[serde(default)]
    pub render: RenderConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            history_settle_ms: default_history_settle_ms(),
            style_flush_ms: default_style_flush_ms(),
            mode_retry_ms: default_mode_retry_ms(),
            notice_ttl_ms: default_notice_ttl_ms(),
            render: RenderConfig::default(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EditorConfig = serde_json::from_str(json)?;
        if config.history_limit == 0 {
            return Err(ConfigError::Invalid("historyLimit must be at least 1".into()));
        }
        if config.mode_retry_ms.is_empty() {
            return Err(ConfigError::Invalid("modeRetryMs needs at least one attempt".into()));
        }
        Ok(config)
    }
}
