//! Whole-run retry with a fixed delay

use crate::error::{LedgerError, Result};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay_secs: u64) -> Self {
        Self {
            attempts: attempts.max(1),
            delay: Duration::from_secs(delay_secs),
        }
    }

    /// Single attempt, no waiting
    pub fn once() -> Self {
        Self {
            attempts: 1,
            delay: Duration::ZERO,
        }
    }

    /// Run `job` until it succeeds, fails non-retryably, or attempts run out.
    ///
    /// Each attempt starts from scratch; nothing is resumed.
    pub fn run<T>(&self, mut job: impl FnMut(u32) -> Result<T>) -> Result<T> {
        let mut attempt = 1;
        loop {
            match job(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => {
                    log::error!("{}", e);
                    return Err(e);
                }
                Err(e) => {
                    log::error!("Attempt {}/{}: {}", attempt, self.attempts, e);
                    if attempt >= self.attempts {
                        return Err(LedgerError::RetriesExhausted {
                            attempts: self.attempts,
                            last: Box::new(e),
                        });
                    }
                    if !self.delay.is_zero() {
                        log::info!("Retrying in {}s", self.delay.as_secs());
                        std::thread::sleep(self.delay);
                    }
                    attempt += 1;
                }
            }
        }
    }
}
