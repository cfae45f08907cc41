//! Per-request context threaded through every core operation.
//!
//! Carries the REQUEST-level cache container and a cancellation token. The
//! container is a required field, so an operation can never run against a
//! missing request cache.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::cache::RequestCache;
use crate::error::{SubtrackError, SubtrackResult};

#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Uuid,
    request_cache: Arc<RequestCache>,
    cancel: CancellationToken,
}

impl RequestContext {
    /// Fresh context with an empty request cache
    pub fn new() -> Self {
        Self::with_cancellation(CancellationToken::new())
    }

    /// Fresh context observing an externally owned cancellation token
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            request_id: Uuid::now_v7(),
            request_cache: Arc::new(RequestCache::new()),
            cancel,
        }
    }

    /// Context for a fan-out task of the same request: shares the request
    /// cache, and is cancelled with its parent.
    pub fn child(&self) -> Self {
        Self {
            request_id: self.request_id,
            request_cache: Arc::clone(&self.request_cache),
            cancel: self.cancel.child_token(),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn request_cache(&self) -> &Arc<RequestCache> {
        &self.request_cache
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail with `Cancelled` once the request has been cancelled
    pub fn ensure_active(&self) -> SubtrackResult<()> {
        if self.is_cancelled() {
            return Err(SubtrackError::Cancelled);
        }
        Ok(())
    }

    /// Run an I/O future unless the request is cancelled first
    pub async fn run<F, T>(&self, operation: F) -> SubtrackResult<T>
    where
        F: std::future::Future<Output = SubtrackResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SubtrackError::Cancelled),
            result = operation => result,
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
