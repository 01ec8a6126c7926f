//! Replay transport
//!
//! Serves previously recorded response documents in order, ignoring the
//! request parameters. Useful for debugging aggregation offline.

use super::Transport;
use crate::error::{Error, Result};
use crate::types::{JsonValue, QueryParams};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use tokio::sync::Mutex;
use tracing::debug;

/// Transport backed by a queue of recorded responses
#[derive(Debug, Default)]
pub struct ReplayTransport {
    responses: Mutex<VecDeque<JsonValue>>,
}

impl ReplayTransport {
    /// Replay the given documents in order
    pub fn new(responses: impl IntoIterator<Item = JsonValue>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
        }
    }

    /// Load recordings from a JSON array or a JSON-lines file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::Io(e)
            }
        })?;
        Self::from_str_content(&content)
    }

    /// Parse recordings from a JSON array or JSON lines
    pub fn from_str_content(content: &str) -> Result<Self> {
        if content.trim_start().starts_with('[') {
            let responses: Vec<JsonValue> = serde_json::from_str(content)?;
            return Ok(Self::new(responses));
        }

        let mut responses = Vec::new();
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let value = serde_json::from_str(line).map_err(|e| {
                Error::malformed(format!("recording line {}: {e}", line_num + 1))
            })?;
            responses.push(value);
        }
        Ok(Self::new(responses))
    }

    /// Number of recordings not yet served
    pub async fn remaining(&self) -> usize {
        self.responses.lock().await.len()
    }
}

#[async_trait]
impl Transport for ReplayTransport {
    async fn request(&self, params: &QueryParams) -> Result<JsonValue> {
        debug!(?params, "Replaying recorded response");
        self.responses
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| Error::exhausted("no recorded responses left to replay"))
    }
}
