//! Request-scoped context
//!
//! Every lifecycle call receives a Context. It carries a request id and the
//! name of the operation being served so handlers can attach them to their
//! log output.

use std::sync::Arc;
use uuid::Uuid;

/// Context carries request-scoped values across async boundaries
/// Pass this as first parameter to every async trait method
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    request_id: Uuid,
    operation: String,
}

impl Context {
    pub fn new() -> Self {
        Self::for_operation("unspecified")
    }

    /// Context for one framework operation, e.g. "ReadDataSource"
    pub fn for_operation(operation: &str) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                request_id: Uuid::new_v4(),
                operation: operation.to_string(),
            }),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.inner.request_id
    }

    pub fn operation(&self) -> &str {
        &self.inner.operation
    }

    /// Tracing span tagged with the request id and operation
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "tfplug_request",
            request_id = %self.inner.request_id,
            operation = %self.inner.operation
        )
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
