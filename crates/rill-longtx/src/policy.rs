//! Write operation policies: per-shard timeout, retry, completion.

use std::time::Duration;

use anyhow::{Context, Result};

/// How transient per-shard failures are retried.
///
/// Retries lean on the transport's `(tx, dedup)` idempotency: replaying an
/// attempt that actually landed is acknowledged, not re-applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// One attempt, no retries.
    None,
    /// Up to `attempts` tries with a fixed delay between them.
    Fixed { attempts: u32, delay: Duration },
    /// Up to `attempts` tries with delays doubling from `base`, capped at `max`.
    Exponential {
        attempts: u32,
        base: Duration,
        max: Duration,
    },
}

impl RetryPolicy {
    /// Total tries allowed, first attempt included.
    pub fn max_attempts(&self) -> u32 {
        match self {
            RetryPolicy::None => 1,
            RetryPolicy::Fixed { attempts, .. } | RetryPolicy::Exponential { attempts, .. } => {
                (*attempts).max(1)
            }
        }
    }

    /// Delay to sleep before issuing attempt number `attempt` (1-based).
    /// `None` = the policy is out of attempts.
    pub fn delay_before(&self, attempt: u32) -> Option<Duration> {
        if attempt <= 1 {
            return Some(Duration::ZERO);
        }
        if attempt > self.max_attempts() {
            return None;
        }
        match self {
            RetryPolicy::None => None,
            RetryPolicy::Fixed { delay, .. } => Some(*delay),
            RetryPolicy::Exponential { base, max, .. } => {
                let factor = 2u32.saturating_pow(attempt - 2);
                Some(base.saturating_mul(factor).min(*max))
            }
        }
    }
}

/// When the fan-in finalizes the write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionPolicy {
    /// Collect every partition outcome before replying.
    WaitForAll,
    /// Reply on the first partition failure and cancel the rest.
    FailFast,
}

/// Knobs for one coordinated write.
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    /// Wall-clock budget for each shard operation attempt.
    pub op_timeout: Duration,
    pub retry: RetryPolicy,
    pub completion: CompletionPolicy,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            op_timeout: Duration::from_secs(10),
            retry: RetryPolicy::None,
            completion: CompletionPolicy::WaitForAll,
        }
    }
}

impl WriteOptions {
    /// Read options from `RILL_WRITE_*` environment variables, falling
    /// back to the defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let op_timeout = match std::env::var("RILL_WRITE_OP_TIMEOUT_MS") {
            Ok(v) => Duration::from_millis(
                v.parse().context("Invalid RILL_WRITE_OP_TIMEOUT_MS")?,
            ),
            Err(_) => defaults.op_timeout,
        };
        let attempts: u32 = std::env::var("RILL_WRITE_RETRY_ATTEMPTS")
            .unwrap_or_else(|_| "1".to_string())
            .parse()
            .context("Invalid RILL_WRITE_RETRY_ATTEMPTS")?;
        let delay_ms: u64 = std::env::var("RILL_WRITE_RETRY_DELAY_MS")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .context("Invalid RILL_WRITE_RETRY_DELAY_MS")?;
        let retry = if attempts <= 1 {
            RetryPolicy::None
        } else {
            RetryPolicy::Fixed {
                attempts,
                delay: Duration::from_millis(delay_ms),
            }
        };
        let fail_fast = std::env::var("RILL_WRITE_FAIL_FAST")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let completion = if fail_fast {
            CompletionPolicy::FailFast
        } else {
            CompletionPolicy::WaitForAll
        };
        Ok(Self {
            op_timeout,
            retry,
            completion,
        })
    }
}
