//! Classifies the kind of the error.

use std::{error::Error, fmt::Debug, sync::Arc};

use fedgate_types::{ErrorChainExt, TransientAuthError};

/// Message fragment that identifies a failed GSS/SASL renegotiation.
pub const TRANSIENT_AUTH_MARKER: &str = "GSS initiate failed";

/// Dynamic classifier.
#[derive(Clone)]
pub struct ErrorClassifier {
    inner: Arc<dyn Fn(&(dyn Error + 'static)) -> bool + Send + Sync>,
}

impl ErrorClassifier {
    /// Create dyn-typed error classifier.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&(dyn Error + 'static)) -> bool + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Classifier for transient authentication failures, see [`is_transient_auth_failure`].
    pub fn transient_auth() -> Self {
        Self::new(is_transient_auth_failure)
    }

    /// Checks if given error matches this classifier.
    pub fn matches(&self, e: &(dyn Error + 'static)) -> bool {
        (self.inner)(e)
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::transient_auth()
    }
}

impl Debug for ErrorClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorClassifier").finish_non_exhaustive()
    }
}

/// Checks if this is a transient authentication failure.
///
/// True if any error in the source chain is a [`TransientAuthError`] or has
/// [`TRANSIENT_AUTH_MARKER`] in its message.
pub fn is_transient_auth_failure(e: &(dyn Error + 'static)) -> bool {
    e.error_chain().any(|e| {
        e.downcast_ref::<TransientAuthError>().is_some()
            || e.to_string().contains(TRANSIENT_AUTH_MARKER)
    })
}
