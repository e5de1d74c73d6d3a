//! Session configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::Result;

/// Options controlling how a [`Session`](crate::Session) executes.
///
/// Every field has a default, so a partial JSON object is accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Size of a dedicated worker pool for kernel parallelism. `None` uses
    /// the global pool.
    pub threads: Option<usize>,

    /// Attach a [`TimingProfiler`](crate::TimingProfiler) to every run.
    pub profile: bool,

    /// Fail when an operator leaves any declared output unset, not only
    /// outputs that something downstream needs.
    pub strict_outputs: bool,
}

impl SessionConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| GraphError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| GraphError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.threads == Some(0) {
            return Err(GraphError::Config("threads must be at least 1".into()));
        }
        Ok(())
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn with_profile(mut self, profile: bool) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_strict_outputs(mut self, strict: bool) -> Self {
        self.strict_outputs = strict;
        self
    }
}
