//! BoxModelClient -- object-safe dynamic dispatch wrapper for ModelClient.
//!
//! Blanket-impl pattern:
//! 1. Define an object-safe `ModelClientDyn` trait with boxed futures
//! 2. Blanket-impl `ModelClientDyn` for all `T: ModelClient`
//! 3. `BoxModelClient` wraps `Box<dyn ModelClientDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use taskpilot_types::llm::{Dialect, LlmError, ModelRequest, ModelResponse, WireFormat};

use super::client::ModelClient;

/// Object-safe version of [`ModelClient`] with boxed futures.
pub trait ModelClientDyn: Send + Sync {
    fn name(&self) -> &str;

    fn wire_format(&self) -> WireFormat;

    fn supports(&self, dialect: Dialect) -> bool;

    fn complete_boxed<'a>(
        &'a self,
        request: &'a ModelRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ModelResponse, LlmError>> + Send + 'a>>;
}

impl<T: ModelClient> ModelClientDyn for T {
    fn name(&self) -> &str {
        ModelClient::name(self)
    }

    fn wire_format(&self) -> WireFormat {
        ModelClient::wire_format(self)
    }

    fn supports(&self, dialect: Dialect) -> bool {
        ModelClient::supports(self, dialect)
    }

    fn complete_boxed<'a>(
        &'a self,
        request: &'a ModelRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ModelResponse, LlmError>> + Send + 'a>> {
        Box::pin(self.complete(request))
    }
}

/// Type-erased model client for runtime provider selection.
///
/// Since `ModelClient` uses RPITIT, it cannot be used as a trait object
/// directly; `BoxModelClient` provides the same methods over a
/// `ModelClientDyn` trait object.
pub struct BoxModelClient {
    inner: Box<dyn ModelClientDyn + Send + Sync>,
}

impl BoxModelClient {
    /// Wrap a concrete `ModelClient` in a type-erased box.
    pub fn new<T: ModelClient + 'static>(client: T) -> Self {
        Self {
            inner: Box::new(client),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn wire_format(&self) -> WireFormat {
        self.inner.wire_format()
    }

    pub fn supports(&self, dialect: Dialect) -> bool {
        self.inner.supports(dialect)
    }

    pub async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, LlmError> {
        self.inner.complete_boxed(request).await
    }
}
