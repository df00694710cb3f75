//! Retry classification for failed export runs
//!
//! The orchestrator never retries on its own. When a run fails the consumer
//! asks [`RetryPolicy::classify`] what to do with the message and routes it
//! accordingly.

use crate::config::RetryConfig;
use crate::domain::{ExportError, RetryMetadata};
use std::time::Duration;

/// Routing decision for a failed message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Terminal failure, acknowledge and drop
    Discard,
    /// Transient failure, republish to the retry topic after `delay`
    Retry { delay: Duration },
    /// Transient failure that ran out of attempts
    DeadLetter,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Discard => "discard",
            Classification::Retry { .. } => "retry",
            Classification::DeadLetter => "dead_letter",
        }
    }
}

/// Attempt cap and linear backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_secs(config.base_delay_secs),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next delivery of a message already tried `attempt_count` times
    pub fn backoff(&self, attempt_count: u32) -> Duration {
        self.base_delay
            .saturating_mul(attempt_count.saturating_add(1))
    }

    /// Decides how to route a failed message
    ///
    /// Terminal failures are discarded whatever the attempt count. Transient
    /// failures are retried until `max_attempts`, then dead-lettered.
    pub fn classify(&self, error: &ExportError, retry: &RetryMetadata) -> Classification {
        if error.is_terminal() {
            return Classification::Discard;
        }
        if retry.attempt_count >= self.max_attempts {
            return Classification::DeadLetter;
        }
        Classification::Retry {
            delay: self.backoff(retry.attempt_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        CampaignId, CampexError, DecodeError, ExportStep, InvalidCampaignState,
    };
    use test_case::test_case;

    fn upload_failure() -> ExportError {
        ExportError::step(
            ExportStep::Upload,
            CampexError::Storage("503 Service Unavailable".to_string()),
        )
    }

    #[test_case(0, 5 ; "first failure")]
    #[test_case(1, 10 ; "second failure")]
    #[test_case(2, 15 ; "third failure")]
    fn test_transient_failure_retries_with_linear_backoff(attempt: u32, secs: u64) {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.classify(&upload_failure(), &RetryMetadata::new(attempt)),
            Classification::Retry {
                delay: Duration::from_secs(secs)
            }
        );
    }

    #[test_case(3 ; "at cap")]
    #[test_case(4 ; "past cap")]
    #[test_case(u32::MAX ; "garbage count")]
    fn test_transient_failure_dead_letters_after_cap(attempt: u32) {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.classify(&upload_failure(), &RetryMetadata::new(attempt)),
            Classification::DeadLetter
        );
    }

    #[test_case(0 ; "fresh")]
    #[test_case(3 ; "at cap")]
    fn test_terminal_failures_always_discard(attempt: u32) {
        let policy = RetryPolicy::default();
        let retry = RetryMetadata::new(attempt);

        let decode = ExportError::from(DecodeError::MissingField("campaignId"));
        assert_eq!(policy.classify(&decode, &retry), Classification::Discard);

        let invalid = ExportError::from(InvalidCampaignState::NoRecipients(CampaignId::from(7)));
        assert_eq!(policy.classify(&invalid, &retry), Classification::Discard);

        let absent = ExportError::step(
            ExportStep::LoadCampaign,
            CampexError::NotFound("campaign 7".to_string()),
        );
        assert_eq!(policy.classify(&absent, &retry), Classification::Discard);
    }

    #[test]
    fn test_lookup_connectivity_failure_retries() {
        let policy = RetryPolicy::default();
        let unavailable = ExportError::step(
            ExportStep::LoadConfig,
            CampexError::Database("connection refused".to_string()),
        );
        assert!(matches!(
            policy.classify(&unavailable, &RetryMetadata::new(0)),
            Classification::Retry { .. }
        ));
    }

    #[test]
    fn test_cancelled_run_retries() {
        let policy = RetryPolicy::default();
        let cancelled = ExportError::Cancelled {
            step: ExportStep::Notify,
        };
        assert_eq!(
            policy.classify(&cancelled, &RetryMetadata::new(1)),
            Classification::Retry {
                delay: Duration::from_secs(10)
            }
        );
    }

    #[test]
    fn test_policy_from_config() {
        let config = RetryConfig {
            max_attempts: 5,
            base_delay_secs: 2,
        };
        let policy = RetryPolicy::from(&config);
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.backoff(4), Duration::from_secs(10));
    }

    #[test]
    fn test_zero_max_attempts_dead_letters_immediately() {
        let policy = RetryPolicy {
            max_attempts: 0,
            base_delay: Duration::from_secs(5),
        };
        assert_eq!(
            policy.classify(&upload_failure(), &RetryMetadata::new(0)),
            Classification::DeadLetter
        );
    }
}
