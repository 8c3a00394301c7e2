//! Clock abstraction for idle-expiry bookkeeping.
//!
//! Expiry decisions only ever compare two readings of the same clock, so [`Time`] is a
//! monotonic offset from an arbitrary origin rather than a wall-clock timestamp. Tests swap
//! in a [`MockProvider`] to move time forward without sleeping.
use std::{
    ops::{Add, Sub},
    time::{Duration, Instant},
};

use parking_lot::RwLock;

/// A reading of a [`TimeProvider`].
///
/// Only meaningful relative to other readings of the same provider.
#[derive(Debug, Copy, Clone, Default, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct Time(Duration);

impl Time {
    /// The origin of every provider.
    pub const ZERO: Self = Self(Duration::ZERO);

    /// Makes a new `Time` the given offset past the provider origin.
    pub fn from_offset(offset: Duration) -> Self {
        Self(offset)
    }

    /// Offset past the provider origin.
    pub fn offset(&self) -> Duration {
        self.0
    }

    /// Returns the duration since `earlier`, or `None` if `earlier` is actually later.
    pub fn checked_duration_since(&self, earlier: Self) -> Option<Duration> {
        self.0.checked_sub(earlier.0)
    }

    /// Returns the duration since `earlier`, saturating at zero.
    pub fn saturating_duration_since(&self, earlier: Self) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<Duration> for Time {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0.saturating_add(rhs))
    }
}

impl Sub<Duration> for Time {
    type Output = Self;

    fn sub(self, rhs: Duration) -> Self::Output {
        Self(self.0.saturating_sub(rhs))
    }
}

impl std::fmt::Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

pub trait TimeProvider: std::fmt::Debug + Send + Sync + 'static {
    /// Returns the current `Time`. Successive calls never go backwards.
    fn now(&self) -> Time;
}

/// A [`TimeProvider`] backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemProvider {
    origin: Instant,
}

impl SystemProvider {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for SystemProvider {
    fn now(&self) -> Time {
        Time(self.origin.elapsed())
    }
}

/// A [`TimeProvider`] that returns a fixed `Time` that can be moved by [`MockProvider::set`]
/// or [`MockProvider::inc`].
#[derive(Debug)]
pub struct MockProvider {
    now: RwLock<Time>,
}

impl MockProvider {
    pub fn new(start: Time) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    pub fn set(&self, time: Time) {
        *self.now.write() = time
    }

    pub fn inc(&self, duration: Duration) -> Time {
        let mut now = self.now.write();
        *now = *now + duration;
        *now
    }
}

impl TimeProvider for MockProvider {
    fn now(&self) -> Time {
        *self.now.read()
    }
}
