//! State shared by every request a server handles.

use std::sync::Arc;

use crate::codec::Codec;
use crate::config::Config;
use crate::error::{DefaultErrorHandler, ErrorHandler};

/// Multipart memory limit used when none is configured: 32 MiB.
pub const DEFAULT_MAX_MEMORY: u64 = 32 << 20;

/// Read-only environment handed to each [`Context`](crate::Context).
pub struct Env {
    max_memory: u64,
    max_body: u64,
    codec: Option<Arc<dyn Codec>>,
    errors: Arc<dyn ErrorHandler>,
}

impl Default for Env {
    fn default() -> Self {
        Self {
            max_memory: 0,
            max_body: 0,
            codec: None,
            errors: Arc::new(DefaultErrorHandler),
        }
    }
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new()
            .with_max_memory(config.upload.max_memory)
            .with_max_body(config.upload.max_body)
    }

    /// `0` selects [`DEFAULT_MAX_MEMORY`].
    pub fn with_max_memory(mut self, bytes: u64) -> Self {
        self.max_memory = bytes;
        self
    }

    /// Largest request body the server buffers. `0` selects the effective
    /// [`max_memory`](Self::max_memory).
    pub fn with_max_body(mut self, bytes: u64) -> Self {
        self.max_body = bytes;
        self
    }

    pub fn with_codec(mut self, codec: impl Codec) -> Self {
        self.codec = Some(Arc::new(codec));
        self
    }

    pub fn with_error_handler(mut self, errors: impl ErrorHandler) -> Self {
        self.errors = Arc::new(errors);
        self
    }

    pub fn max_memory(&self) -> u64 {
        if self.max_memory == 0 { DEFAULT_MAX_MEMORY } else { self.max_memory }
    }

    pub fn max_body(&self) -> u64 {
        if self.max_body == 0 { self.max_memory() } else { self.max_body }
    }

    pub fn codec(&self) -> Option<&Arc<dyn Codec>> {
        self.codec.as_ref()
    }

    pub fn error_handler(&self) -> &Arc<dyn ErrorHandler> {
        &self.errors
    }
}
