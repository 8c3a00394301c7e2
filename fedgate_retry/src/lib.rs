//! Transparent retry of transient authentication failures around connector calls.
//!
//! Secure (Kerberos) deployments occasionally fail a connection because the SASL/GSS handshake
//! could not be renegotiated. Such a failure goes away when the call is repeated with a freshly
//! created connector, so [`FaultTolerantExecutor`] repeats it, a bounded number of times and
//! only for failures the [`ErrorClassifier`] recognizes. Every other failure reaches the caller
//! untouched.

mod classifier;
mod executor;

pub use classifier::{ErrorClassifier, TRANSIENT_AUTH_MARKER, is_transient_auth_failure};
pub use executor::{
    AUTHENTICATION_KEY, DEFAULT_MAX_RETRIES, FaultTolerantExecutor, MAX_RETRIES_KEY,
};
