use std::error::Error;

use fedgate_types::{ConfigError, Configuration};
use tracing::{info, warn};

use crate::ErrorClassifier;

/// Authentication mode of the data source. Retries only happen when this is `kerberos`.
pub const AUTHENTICATION_KEY: &str = "hadoop.security.authentication";

/// Number of retries after a transient authentication failure.
pub const MAX_RETRIES_KEY: &str = "fedgate.sasl.connection.retries";

pub const DEFAULT_MAX_RETRIES: i64 = 5;

const SECURE_AUTHENTICATION: &str = "kerberos";

/// Runs connector operations and repeats them after transient authentication failures.
///
/// Whether and how often to retry is decided per call from the request's [`Configuration`]:
///
/// - unless [`AUTHENTICATION_KEY`] is `kerberos` the operation runs exactly once
/// - otherwise failures matching the classifier are retried up to [`MAX_RETRIES_KEY`] times
///   (default [`DEFAULT_MAX_RETRIES`]), without delay between attempts
/// - any other failure, a failing retry callback, or the last transient failure after the budget
///   is spent is returned as-is
///
/// The executor holds no per-call state and can be shared freely.
#[derive(Debug, Clone, Default)]
pub struct FaultTolerantExecutor {
    classifier: ErrorClassifier,
}

impl FaultTolerantExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `classifier` instead of the transient authentication classifier.
    pub fn with_classifier(classifier: ErrorClassifier) -> Self {
        Self { classifier }
    }

    /// Run `op`, retrying transient authentication failures.
    pub fn execute<T, E, F>(&self, config: &Configuration, label: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        E: Error + From<ConfigError> + 'static,
    {
        self.execute_stateful(config, label, &mut (), |_| op(), |_| Ok(()))
    }

    /// Like [`execute`](Self::execute), but runs `before_retry` before every retry (never before
    /// the first attempt). A failure of `before_retry` ends the call with that failure.
    pub fn execute_with_callback<T, E, F, C>(
        &self,
        config: &Configuration,
        label: &str,
        mut op: F,
        mut before_retry: C,
    ) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        C: FnMut() -> Result<(), E>,
        E: Error + From<ConfigError> + 'static,
    {
        self.execute_stateful(config, label, &mut (), |_| op(), |_| before_retry())
    }

    /// Like [`execute_with_callback`](Self::execute_with_callback), with `state` handed to both
    /// the operation and the callback. This is how a callback replaces the connector instance
    /// the operation works on.
    pub fn execute_stateful<S, T, E, F, C>(
        &self,
        config: &Configuration,
        label: &str,
        state: &mut S,
        mut op: F,
        mut before_retry: C,
    ) -> Result<T, E>
    where
        S: ?Sized,
        F: FnMut(&mut S) -> Result<T, E>,
        C: FnMut(&mut S) -> Result<(), E>,
        E: Error + From<ConfigError> + 'static,
    {
        if !is_secure(config) {
            return op(state);
        }

        let mut retry = RetryState::new(label, config)?;
        loop {
            match op(state) {
                Ok(v) => {
                    retry.log_recovery();
                    return Ok(v);
                }
                Err(e) if self.classifier.matches(&e) && retry.can_retry() => {
                    retry.next_attempt(&e);
                    before_retry(state)?;
                }
                Err(e) => {
                    retry.log_failure(&e, self.classifier.matches(&e));
                    return Err(e);
                }
            }
        }
    }
}

fn is_secure(config: &Configuration) -> bool {
    config
        .get(AUTHENTICATION_KEY)
        .is_some_and(|v| v.trim().eq_ignore_ascii_case(SECURE_AUTHENTICATION))
}

/// Bookkeeping for one secure [`FaultTolerantExecutor`] call.
#[derive(Debug)]
struct RetryState<'a> {
    label: &'a str,
    max_retries: u64,
    /// 1-based number of the attempt in flight.
    attempt: u64,
}

impl<'a> RetryState<'a> {
    fn new(label: &'a str, config: &Configuration) -> Result<Self, ConfigError> {
        let max_retries = config.get_i64(MAX_RETRIES_KEY, DEFAULT_MAX_RETRIES)?;
        let max_retries = u64::try_from(max_retries).map_err(|_| ConfigError::NegativeValue {
            key: MAX_RETRIES_KEY.to_owned(),
            value: max_retries,
        })?;

        Ok(Self {
            label,
            max_retries,
            attempt: 1,
        })
    }

    fn can_retry(&self) -> bool {
        self.attempt <= self.max_retries
    }

    fn next_attempt(&mut self, e: &dyn Error) {
        warn!(
            label = self.label,
            attempt = self.attempt,
            max_retries = self.max_retries,
            error = %e,
            "transient authentication failure, retrying",
        );
        self.attempt += 1;
    }

    fn log_recovery(&self) {
        if self.attempt > 1 {
            info!(
                label = self.label,
                retries = self.attempt - 1,
                "operation succeeded after retrying transient authentication failure",
            );
        }
    }

    fn log_failure(&self, e: &dyn Error, transient: bool) {
        if transient {
            warn!(
                label = self.label,
                attempts = self.attempt,
                error = %e,
                "transient authentication failure, retries exhausted",
            );
        }
    }
}
