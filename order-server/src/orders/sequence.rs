//! Day-scoped order numbers
//!
//! `YYYYMMDD-NNN` comes from an atomic increment of the day's counter in
//! redb. When the counter cannot be incremented after a few retries, a
//! number from the `T` namespace (`YYYYMMDD-T<HHMMSSmmm><2 digits>`) may be
//! issued instead. It can never collide with a counter number, but two
//! fallback numbers are not guaranteed distinct.

use chrono::{DateTime, NaiveDateTime};
use chrono_tz::Tz;
use rand::Rng;
use std::time::Duration;
use thiserror::Error;

use super::storage::{OrderStorage, StorageError};
use crate::utils::time::day_key;

/// Atomic per-day counter
pub trait CounterStore: Send + Sync {
    /// Increment the counter for `day` (creating it) and return the new value
    fn increment_day_counter(&self, day: &str) -> Result<u64, StorageError>;
}

impl CounterStore for OrderStorage {
    fn increment_day_counter(&self, day: &str) -> Result<u64, StorageError> {
        OrderStorage::increment_day_counter(self, day)
    }
}

impl<T: CounterStore + ?Sized> CounterStore for std::sync::Arc<T> {
    fn increment_day_counter(&self, day: &str) -> Result<u64, StorageError> {
        (**self).increment_day_counter(day)
    }
}

#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("Order number counter unavailable after {attempts} attempts: {source}")]
    Unavailable {
        attempts: u32,
        #[source]
        source: StorageError,
    },
}

/// Retry and fallback policy
#[derive(Debug, Clone)]
pub struct SequencePolicy {
    /// Increment attempts before giving up (at least one)
    pub retry_attempts: u32,
    /// Delay after the first failure, doubled after each further one
    pub retry_base: Duration,
    /// Issue `T`-namespace numbers when the counter stays down
    pub allow_degraded: bool,
}

impl Default for SequencePolicy {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            retry_base: Duration::from_millis(10),
            allow_degraded: true,
        }
    }
}

/// An issued order number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedNumber {
    pub number: String,
    /// From the fallback namespace
    pub degraded: bool,
}

/// Sequence Generator
pub struct SequenceGenerator<C = OrderStorage> {
    counter: C,
    policy: SequencePolicy,
    tz: Tz,
}

impl<C: CounterStore> SequenceGenerator<C> {
    pub fn new(counter: C, policy: SequencePolicy, tz: Tz) -> Self {
        Self {
            counter,
            policy,
            tz,
        }
    }

    /// Next number for the business day containing `now`
    pub fn next_for(&self, now: DateTime<chrono::Utc>) -> Result<IssuedNumber, SequenceError> {
        let local = now.with_timezone(&self.tz).naive_local();
        let day = day_key(local.date());
        self.next_order_number(&day, local)
    }

    /// Next number for `day`
    ///
    /// `now_local` only feeds the fallback suffix.
    pub fn next_order_number(
        &self,
        day: &str,
        now_local: NaiveDateTime,
    ) -> Result<IssuedNumber, SequenceError> {
        let attempts = self.policy.retry_attempts.max(1);
        let mut delay = self.policy.retry_base;
        let mut attempt = 0;

        let last_error = loop {
            attempt += 1;
            match self.counter.increment_day_counter(day) {
                Ok(seq) => {
                    return Ok(IssuedNumber {
                        number: format_number(day, seq),
                        degraded: false,
                    });
                }
                Err(e) if attempt < attempts => {
                    tracing::warn!(
                        day = %day,
                        attempt,
                        error = %e,
                        "Order number counter increment failed, retrying"
                    );
                    std::thread::sleep(delay);
                    delay = delay.saturating_mul(2);
                }
                Err(e) => break e,
            }
        };

        if !self.policy.allow_degraded {
            return Err(SequenceError::Unavailable {
                attempts,
                source: last_error,
            });
        }

        let number = fallback_number(day, now_local, rand::thread_rng().gen_range(0..100));
        tracing::error!(
            target: "operator",
            day = %day,
            order_number = %number,
            error = %last_error,
            "Order number counter unavailable, issued fallback number"
        );
        Ok(IssuedNumber {
            number,
            degraded: true,
        })
    }
}

/// `{day}-{seq}` zero-padded to at least three digits
pub fn format_number(day: &str, seq: u64) -> String {
    format!("{}-{:03}", day, seq)
}

/// `{day}-T{HHMMSSmmm}{NN}`
pub fn fallback_number(day: &str, now_local: NaiveDateTime, salt: u8) -> String {
    format!(
        "{}-T{}{:02}",
        day,
        now_local.format("%H%M%S%3f"),
        salt % 100
    )
}
