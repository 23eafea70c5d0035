//! Provider domain model.
//!
//! Tracks the health state the fallback gateway needs to decide whether a
//! provider should be tried, independent of the driver implementation that
//! performs the actual call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Parameters that affect a generation call and therefore participate in
/// the cache fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            model: "default".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

impl GenerateOptions {
    /// Stable fingerprint of `(prompt, options)` for the response cache.
    /// Field order is fixed by this function, not by struct declaration
    /// order, so the fingerprint is independent of field reordering.
    pub fn fingerprint(&self, prompt: &str) -> String {
        let canonical = format!(
            "prompt={prompt}|model={}|temperature={}|max_tokens={}",
            self.model, self.temperature, self.max_tokens
        );
        let digest = Sha256::digest(canonical.as_bytes());
        format!("{digest:x}")
    }
}

/// Health and ordering state for one LLM provider in the fallback chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    /// Static ordering; lower is tried first.
    pub priority_rank: u32,
    /// Skipped by the gateway when false.
    pub available: bool,
    /// Monotonic count since the last reset or success.
    pub failure_count: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
}

impl Provider {
    pub fn new(name: impl Into<String>, priority_rank: u32) -> Self {
        Self {
            name: name.into(),
            priority_rank,
            available: true,
            failure_count: 0,
            last_failure_at: None,
        }
    }

    /// Record a successful call: resets failure state and marks available.
    pub fn record_success(&mut self) {
        self.failure_count = 0;
        self.available = true;
        self.last_failure_at = None;
    }

    /// Record a driver failure. Flips `available` to false once
    /// `failure_count` reaches `threshold`, or immediately if `force`
    /// (used for quota-exhaustion errors, which bypass the streak).
    pub fn record_failure(&mut self, threshold: u32, force: bool) {
        self.failure_count += 1;
        self.last_failure_at = Some(Utc::now());
        if force || self.failure_count >= threshold {
            self.available = false;
        }
    }

    /// Manual reset, used by `reset_all()` and by `generate_with_retry`'s
    /// between-attempt reconsideration of providers below the threshold.
    pub fn reset(&mut self) {
        self.failure_count = 0;
        self.available = true;
        self.last_failure_at = None;
    }
}
