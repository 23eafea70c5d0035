//! Deterministic in-memory driver, no network. Used for tests and for a
//! `mock` provider slot that can be registered unconditionally in a test
//! profile regardless of configured credentials.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::error::ProviderError;
use crate::domain::models::GenerateOptions;
use crate::domain::ports::ProviderDriver;

/// What the mock driver does on the next `generate` call.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    Text(String),
    Fail(MockFailure),
}

#[derive(Debug, Clone)]
pub enum MockFailure {
    Transient,
    Quota,
}

pub struct MockDriver {
    name: String,
    script: Mutex<Vec<ScriptedResponse>>,
    cursor: AtomicUsize,
    default_response: String,
}

impl MockDriver {
    /// A driver that always returns `response`.
    pub fn fixed(name: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(Vec::new()),
            cursor: AtomicUsize::new(0),
            default_response: response.into(),
        }
    }

    /// A driver that plays back `script` in order, then repeats the last
    /// entry for any further calls.
    pub fn scripted(name: impl Into<String>, script: Vec<ScriptedResponse>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(script),
            cursor: AtomicUsize::new(0),
            default_response: "mock response".to_string(),
        }
    }
}

#[async_trait]
impl ProviderDriver for MockDriver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, _prompt: &str, _options: &GenerateOptions) -> Result<String, ProviderError> {
        let script = self.script.lock().expect("mock driver script lock");
        if script.is_empty() {
            return Ok(self.default_response.clone());
        }

        let index = self.cursor.fetch_add(1, Ordering::SeqCst).min(script.len() - 1);
        match &script[index] {
            ScriptedResponse::Text(text) => Ok(text.clone()),
            ScriptedResponse::Fail(MockFailure::Transient) => {
                Err(ProviderError::RequestFailed("mock transient failure".to_string()))
            }
            ScriptedResponse::Fail(MockFailure::Quota) => Err(ProviderError::QuotaExceeded),
        }
    }
}
