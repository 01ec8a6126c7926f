//! Response source implementations

use super::types::ResponseSource;
use crate::error::Result;
use crate::response::Response;
use crate::transport::Transport;
use crate::types::{JsonValue, QueryParams};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

// ============================================================================
// Continuation
// ============================================================================

/// Issues one request per step, following `continue` tokens
///
/// The token of each response is merged over the base parameters for the
/// next request. The sequence ends after a response without a token.
pub struct Continuation {
    transport: Arc<dyn Transport>,
    base: QueryParams,
    pending: Option<QueryParams>,
    steps: usize,
}

impl Continuation {
    /// Start a continued request with the given base parameters
    pub fn new(transport: Arc<dyn Transport>, params: QueryParams) -> Self {
        Self {
            transport,
            pending: Some(params.clone()),
            base: params,
            steps: 0,
        }
    }

    /// Number of requests issued so far
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Whether the last response carried no continuation token
    pub fn is_finished(&self) -> bool {
        self.pending.is_none()
    }
}

#[async_trait]
impl ResponseSource for Continuation {
    async fn next_response(&mut self) -> Result<Option<Response>> {
        let Some(params) = self.pending.take() else {
            return Ok(None);
        };
        self.steps += 1;
        debug!(step = self.steps, "Requesting continuation step");

        let response = Response::from_value(self.transport.request(&params).await?)?;

        if let Some(token) = response.continuation() {
            let mut next = self.base.clone();
            for (key, value) in token {
                match param_value(value) {
                    Some(value) => next.insert(key.clone(), value),
                    None => next.remove(key),
                };
            }
            self.pending = Some(next);
        }
        Ok(Some(response))
    }
}

impl std::fmt::Debug for Continuation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Continuation")
            .field("base", &self.base)
            .field("pending", &self.pending)
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}

/// Render a token value as a request parameter (`None` = omit)
fn param_value(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(true) => Some(String::new()),
        JsonValue::Bool(false) | JsonValue::Null => None,
        JsonValue::Array(items) => Some(
            items
                .iter()
                .filter_map(param_value)
                .collect::<Vec<_>>()
                .join("|"),
        ),
        JsonValue::Object(_) => Some(value.to_string()),
    }
}

// ============================================================================
// Replay Source
// ============================================================================

/// Yields a fixed list of response documents
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    documents: VecDeque<JsonValue>,
}

impl ReplaySource {
    /// Replay the given documents in order
    pub fn new(documents: impl IntoIterator<Item = JsonValue>) -> Self {
        Self {
            documents: documents.into_iter().collect(),
        }
    }

    /// Number of documents not yet pulled
    pub fn remaining(&self) -> usize {
        self.documents.len()
    }
}

#[async_trait]
impl ResponseSource for ReplaySource {
    async fn next_response(&mut self) -> Result<Option<Response>> {
        self.documents
            .pop_front()
            .map(Response::from_value)
            .transpose()
    }
}
