// Copyright (c) 2022-2023 The MobileCoin Foundation

//! In-memory cache for a verified card PIN
//!
//! A [PinCache] holds at most one PIN, stamped with the time it was stored.
//! The entry is valid until [PinCache::timeout] has elapsed, after which the
//! next access clears it. There is no background timer, expiry is evaluated
//! lazily whenever the cache is queried.
//!
//! PIN material is held in [Zeroizing] storage, is wiped on replacement,
//! expiry, [PinCache::clear] and drop, and is never logged or persisted.

use std::time::{Duration, Instant};

use log::debug;
use zeroize::Zeroizing;

use crate::clock::{Clock, SystemClock};

/// Default cache lifetime for a verified PIN
pub const PIN_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Minimum PIN length (characters)
pub const PIN_MIN_LEN: usize = 4;

/// Maximum PIN length (characters)
pub const PIN_MAX_LEN: usize = 32;

/// PIN format validation errors
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PinFormatError {
    #[error("PIN too short (minimum {} characters)", PIN_MIN_LEN)]
    TooShort,

    #[error("PIN too long (maximum {} characters)", PIN_MAX_LEN)]
    TooLong,

    #[error("PIN must contain only letters and digits")]
    InvalidCharacters,
}

/// Validate PIN format.
///
/// Checks are applied in order (length bounds then character set), the
/// first failing check is reported.
pub fn validate_format(pin: &str) -> Result<(), PinFormatError> {
    let len = pin.chars().count();

    if len < PIN_MIN_LEN {
        return Err(PinFormatError::TooShort);
    }
    if len > PIN_MAX_LEN {
        return Err(PinFormatError::TooLong);
    }
    if !pin.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(PinFormatError::InvalidCharacters);
    }

    Ok(())
}

/// Observable cache state
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PinCacheState {
    /// No valid PIN cached
    Empty,
    /// A PIN is cached and remains valid for the contained duration
    ValidFor(Duration),
}

struct Entry {
    pin: Zeroizing<String>,
    first_used_at: Instant,
}

/// Time-bounded PIN cache
pub struct PinCache<C: Clock = SystemClock> {
    clock: C,
    timeout: Duration,
    entry: Option<Entry>,
}

impl PinCache<SystemClock> {
    /// Create an empty cache using the system clock and [PIN_TIMEOUT]
    pub fn new() -> Self {
        Self::with_clock(SystemClock, PIN_TIMEOUT)
    }
}

impl Default for PinCache<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> PinCache<C> {
    /// Create an empty cache with the provided clock and timeout
    pub fn with_clock(clock: C, timeout: Duration) -> Self {
        Self {
            clock,
            timeout,
            entry: None,
        }
    }

    /// Fetch the configured cache lifetime
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Store a PIN, replacing any existing entry and restarting the timer
    pub fn store_pin(&mut self, pin: &str) -> Result<(), PinFormatError> {
        validate_format(pin)?;

        self.entry = Some(Entry {
            pin: Zeroizing::new(pin.to_string()),
            first_used_at: self.clock.now(),
        });

        debug!("PIN cached for {:?}", self.timeout);

        Ok(())
    }

    /// Check whether a valid PIN is cached, clearing the entry if it has expired
    pub fn is_valid(&mut self) -> bool {
        let expired = match &self.entry {
            Some(e) => self.clock.now().saturating_duration_since(e.first_used_at) >= self.timeout,
            None => return false,
        };

        if expired {
            debug!("Cached PIN expired");
            self.entry = None;
        }

        !expired
    }

    /// Fetch the cached PIN if still valid
    pub fn valid_pin(&mut self) -> Option<&str> {
        if !self.is_valid() {
            return None;
        }

        self.entry.as_ref().map(|e| e.pin.as_str())
    }

    /// Remove any cached PIN
    pub fn clear(&mut self) {
        if self.entry.take().is_some() {
            debug!("Cached PIN cleared");
        }
    }

    /// Time remaining before the cached PIN expires, zero if unset
    pub fn remaining_time(&self) -> Duration {
        match &self.entry {
            Some(e) => {
                let elapsed = self.clock.now().saturating_duration_since(e.first_used_at);
                self.timeout.saturating_sub(elapsed)
            }
            None => Duration::ZERO,
        }
    }

    /// Fetch the cache state, clearing an expired entry
    pub fn state(&mut self) -> PinCacheState {
        match self.is_valid() {
            true => PinCacheState::ValidFor(self.remaining_time()),
            false => PinCacheState::Empty,
        }
    }
}

impl<C: Clock> core::fmt::Debug for PinCache<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PinCache")
            .field("timeout", &self.timeout)
            .field("cached", &self.entry.is_some())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ManualClock;

    fn cache() -> (PinCache<ManualClock>, ManualClock) {
        let c = ManualClock::new();
        (PinCache::with_clock(c.clone(), PIN_TIMEOUT), c)
    }

    #[test]
    fn format_validation() {
        assert_eq!(validate_format("abc"), Err(PinFormatError::TooShort));
        assert_eq!(validate_format(""), Err(PinFormatError::TooShort));
        assert_eq!(validate_format(&"a".repeat(33)), Err(PinFormatError::TooLong));
        assert_eq!(
            validate_format("ab!2"),
            Err(PinFormatError::InvalidCharacters)
        );
        assert_eq!(validate_format("Ab12"), Ok(()));
        assert_eq!(validate_format(&"Z9".repeat(16)), Ok(()));
    }

    #[test]
    fn format_first_failure_wins() {
        // Too short takes precedence over invalid characters
        assert_eq!(validate_format("!!"), Err(PinFormatError::TooShort));
        // Too long takes precedence over invalid characters
        assert_eq!(validate_format(&"!".repeat(40)), Err(PinFormatError::TooLong));
    }

    #[test]
    fn store_then_valid() {
        let (mut p, _c) = cache();

        assert!(!p.is_valid());
        assert_eq!(p.state(), PinCacheState::Empty);

        p.store_pin("1234").unwrap();

        assert!(p.is_valid());
        assert_eq!(p.valid_pin(), Some("1234"));
        assert_eq!(p.state(), PinCacheState::ValidFor(PIN_TIMEOUT));
    }

    #[test]
    fn store_rejects_invalid_format() {
        let (mut p, _c) = cache();

        assert_eq!(p.store_pin("12"), Err(PinFormatError::TooShort));
        assert!(!p.is_valid());

        // Existing entries survive a rejected store
        p.store_pin("1234").unwrap();
        assert_eq!(p.store_pin("12 34"), Err(PinFormatError::InvalidCharacters));
        assert_eq!(p.valid_pin(), Some("1234"));
    }

    #[test]
    fn expiry_clears_entry() {
        let (mut p, c) = cache();

        p.store_pin("1234").unwrap();

        c.advance(PIN_TIMEOUT - Duration::from_secs(1));
        assert!(p.is_valid());
        assert_eq!(p.remaining_time(), Duration::from_secs(1));

        c.advance(Duration::from_secs(1));
        assert_eq!(p.remaining_time(), Duration::ZERO);
        assert!(!p.is_valid());
        assert_eq!(p.valid_pin(), None);

        // Observed expiry removes the entry
        assert!(p.entry.is_none());
    }

    #[test]
    fn replace_resets_timer() {
        let (mut p, c) = cache();

        p.store_pin("1234").unwrap();
        c.advance(Duration::from_secs(9 * 60));

        p.store_pin("5678").unwrap();
        c.advance(Duration::from_secs(2 * 60));

        assert_eq!(p.valid_pin(), Some("5678"));
        assert_eq!(p.remaining_time(), Duration::from_secs(8 * 60));
    }

    #[test]
    fn clear() {
        let (mut p, _c) = cache();

        p.store_pin("1234").unwrap();
        p.clear();

        assert!(!p.is_valid());
        assert_eq!(p.remaining_time(), Duration::ZERO);
    }

    #[test]
    fn debug_redacts_pin() {
        let (mut p, _c) = cache();
        p.store_pin("secret1234").unwrap();

        assert!(!format!("{p:?}").contains("secret1234"));
    }
}
