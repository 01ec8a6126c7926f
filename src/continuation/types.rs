//! Response source trait

use crate::error::Result;
use crate::response::Response;
use async_trait::async_trait;

/// A stream of responses, pulled one at a time
#[async_trait]
pub trait ResponseSource: Send {
    /// Pull the next response; `None` once the sequence is exhausted
    async fn next_response(&mut self) -> Result<Option<Response>>;
}

#[async_trait]
impl<S: ResponseSource + ?Sized> ResponseSource for Box<S> {
    async fn next_response(&mut self) -> Result<Option<Response>> {
        (**self).next_response().await
    }
}
