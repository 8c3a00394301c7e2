//! Error handling helpers for the connector boundary.
//!
//! Connectors are pluggable, so their failures are type-erased into [`DynError`]. The original
//! error stays reachable: [`DynError::downcast_ref`] for the wrapped value, and
//! [`ErrorChainExt::error_chain`] for the whole source chain.

/// Dynamic error.
///
/// This is a dedicated type because `Box<dyn std::error::Error + Send + Sync>` does NOT implement
/// [`std::error::Error`].
pub struct DynError(Box<dyn std::error::Error + Send + Sync>);

impl DynError {
    /// Create new dyn-typed error.
    pub fn new(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self(e.into())
    }

    /// The wrapped error, if it is a `T`.
    pub fn downcast_ref<T>(&self) -> Option<&T>
    where
        T: std::error::Error + 'static,
    {
        self.0.downcast_ref::<T>()
    }
}

impl std::fmt::Debug for DynError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.0, f)
    }
}

impl std::fmt::Display for DynError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for DynError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.0.as_ref())
    }
}

impl From<&str> for DynError {
    fn from(msg: &str) -> Self {
        Self(msg.into())
    }
}

impl From<String> for DynError {
    fn from(msg: String) -> Self {
        Self(msg.into())
    }
}

impl From<std::io::Error> for DynError {
    fn from(e: std::io::Error) -> Self {
        Self(Box::new(e))
    }
}

impl From<TransientAuthError> for DynError {
    fn from(e: TransientAuthError) -> Self {
        Self(Box::new(e))
    }
}

/// Structured marker for a transient authentication failure.
///
/// Connectors that can tell a renegotiation failure apart from other errors should return this
/// (possibly as the source of their own error) instead of relying on message text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transient authentication failure: {message}")]
pub struct TransientAuthError {
    message: String,
}

impl TransientAuthError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// [Iterator] over error [sources](std::error::Error::source).
#[allow(missing_copy_implementations)]
#[derive(Debug)]
pub struct ErrorChainIter<'a> {
    current: Option<&'a (dyn std::error::Error + 'static)>,
}

impl<'a> Iterator for ErrorChainIter<'a> {
    type Item = &'a (dyn std::error::Error + 'static);

    fn next(&mut self) -> Option<Self::Item> {
        let mut next = self.current.as_ref().and_then(|e| e.source());
        std::mem::swap(&mut next, &mut self.current);
        next
    }
}

/// Extension trait to access the error source chain.
pub trait ErrorChainExt {
    /// Iterate over error sources, including `self`.
    fn error_chain(&self) -> ErrorChainIter<'_>;
}

impl<E> ErrorChainExt for E
where
    E: std::error::Error + 'static,
{
    fn error_chain(&self) -> ErrorChainIter<'_> {
        ErrorChainIter {
            current: Some(self),
        }
    }
}

impl ErrorChainExt for dyn std::error::Error + 'static {
    fn error_chain(&self) -> ErrorChainIter<'_> {
        ErrorChainIter {
            current: Some(self),
        }
    }
}
