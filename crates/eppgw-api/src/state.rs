//! Application state shared by the transcoding handlers

use std::sync::Arc;
use std::time::Duration;

use eppgw_core::{BackendChannel, Route};

/// Knobs that apply to every route.
#[derive(Debug, Clone)]
pub struct TranscodeOptions {
    /// Reject bodies and query parameters carrying names the request
    /// message does not define, instead of ignoring them.
    pub strict: bool,
    /// Backend deadline used when the client sends no `grpc-timeout`.
    pub default_timeout: Duration,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self {
            strict: false,
            default_timeout: Duration::from_secs(30),
        }
    }
}

/// State shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    backend: Arc<dyn BackendChannel>,
    options: TranscodeOptions,
}

impl AppState {
    pub fn new(backend: Arc<dyn BackendChannel>, options: TranscodeOptions) -> Self {
        Self { backend, options }
    }

    pub fn backend(&self) -> &dyn BackendChannel {
        self.backend.as_ref()
    }

    pub fn options(&self) -> &TranscodeOptions {
        &self.options
    }
}

/// What one registered handler sees: the shared state plus its route.
#[derive(Clone)]
pub(crate) struct RouteState {
    pub(crate) app: AppState,
    pub(crate) route: Arc<Route>,
}
