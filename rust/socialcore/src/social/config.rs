//! Configuration surface for a bound engine.
//!
//! Every field has a default so hosts can pass a partial JSON object:
//! ```json
//! { "urlEnabled": false, "hashtagStyle": { "color": "#1da1f2" } }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use super::error::{Result, SocialError};
use super::style::StyleDescriptor;
use super::text::OffsetEncoding;

/// A user-supplied recognizer: regex + style under a unique id
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CustomPattern {
    pub id: String,
    pub regex: String,
    #[serde(default)]
    pub style: StyleDescriptor,
    /// Tie-break rank; registration order when absent
    #[serde(default)]
    pub priority: Option<i32>,
}

impl CustomPattern {
    pub fn new(id: impl Into<String>, regex: impl Into<String>, style: StyleDescriptor) -> Self {
        Self {
            id: id.into(),
            regex: regex.into(),
            style,
            priority: None,
        }
    }
}

/// Engine configuration
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SocialConfig {
    #[serde(default = "default_true")]
    pub hashtag_enabled: bool,
    #[serde(default = "default_true")]
    pub mention_enabled: bool,
    #[serde(default = "default_true")]
    pub url_enabled: bool,
    #[serde(default)]
    pub hashtag_style: StyleDescriptor,
    #[serde(default)]
    pub mention_style: StyleDescriptor,
    #[serde(default)]
    pub url_style: StyleDescriptor,
    /// Replaces the built-in hashtag regex
    #[serde(default)]
    pub hashtag_pattern: Option<String>,
    /// Replaces the built-in mention regex
    #[serde(default)]
    pub mention_pattern: Option<String>,
    #[serde(default)]
    pub custom_patterns: Vec<CustomPattern>,
    #[serde(default)]
    pub offset_encoding: OffsetEncoding,
    /// Coalescing window for rapid edits; 0 applies every edit immediately
    #[serde(default)]
    pub debounce_ms: u64,
    /// Allow windowed re-scans around the edited region
    #[serde(default = "default_true")]
    pub incremental: bool,
    /// Mirror diagnostics to the browser console
    #[serde(default)]
    pub debug: bool,
}

fn default_true() -> bool { true }

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            hashtag_enabled: true,
            mention_enabled: true,
            url_enabled: true,
            hashtag_style: StyleDescriptor::default(),
            mention_style: StyleDescriptor::default(),
            url_style: StyleDescriptor::default(),
            hashtag_pattern: None,
            mention_pattern: None,
            custom_patterns: Vec::new(),
            offset_encoding: OffsetEncoding::default(),
            debounce_ms: 0,
            incremental: true,
            debug: false,
        }
    }
}

impl SocialConfig {
    /// Parse from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SocialConfig = serde_json::from_str(json)
            .map_err(|e| SocialError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks that do not need regex compilation
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for pattern in &self.custom_patterns {
            if pattern.id.is_empty() {
                return Err(SocialError::InvalidConfig("custom pattern id is empty".to_string()));
            }
            if !seen.insert(pattern.id.as_str()) {
                return Err(SocialError::DuplicateCustomId(pattern.id.clone()));
            }
        }
        Ok(())
    }

    pub fn debounce(&self) -> Option<Duration> {
        (self.debounce_ms > 0).then(|| Duration::from_millis(self.debounce_ms))
    }

    /// Same config with every built-in style set to `{ "color": color }`
    pub fn with_accent(mut self, color: &str) -> Self {
        self.hashtag_style = StyleDescriptor::color(color);
        self.mention_style = StyleDescriptor::color(color);
        self.url_style = StyleDescriptor::color(color);
        self
    }
}
