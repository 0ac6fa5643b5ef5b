use std::time::Duration;
use tracing::{debug, info, warn};

use crate::backend::{Backend, BackendError};
use crate::budget::approx_tokens;
use crate::prompts::compose_prompt;

pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_BASE_WAIT_SECS: u64 = 15;

/// Terminal outcome of an extraction call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("model '{model}' not found, check the model name ({message})")]
    ModelNotFound { model: String, message: String },
    #[error("backend error: {0}")]
    Backend(String),
    #[error("failed after {attempts} rate-limited attempts")]
    RetriesExhausted { attempts: u32 },
}

/// Linear-growth backoff: the n-th rate-limited attempt waits `base_wait * n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_wait: Duration::from_secs(DEFAULT_BASE_WAIT_SECS),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_wait.checked_mul(attempt).unwrap_or(Duration::MAX)
    }
}

/// Send template + capped transcript to the backend, retrying rate limits.
pub async fn extract(
    backend: &dyn Backend,
    template: &str,
    transcript: &str,
    transcript_cap: usize,
    policy: &RetryPolicy,
) -> Result<String, ExtractError> {
    let prompt = compose_prompt(template, transcript, transcript_cap);
    debug!(
        "Extraction starting - model={}, prompt_length={} chars, approx_tokens={}",
        backend.model(),
        prompt.len(),
        approx_tokens(&prompt)
    );

    for attempt in 1..=policy.max_retries {
        let start = std::time::Instant::now();
        match backend.generate(&prompt).await {
            Ok(answer) => {
                info!(
                    "LLM API call completed - duration={:.2}s, attempt={}, response_length={} chars",
                    start.elapsed().as_secs_f32(),
                    attempt,
                    answer.len()
                );
                return Ok(answer);
            }
            Err(BackendError::RateLimited(message)) => {
                if attempt == policy.max_retries {
                    warn!("Rate limited on final attempt {}/{} - {}", attempt, policy.max_retries, message);
                    break;
                }
                let wait = policy.delay_for(attempt);
                warn!(
                    "Rate limited - attempt={}/{}, waiting {}s",
                    attempt,
                    policy.max_retries,
                    wait.as_secs()
                );
                tokio::time::sleep(wait).await;
            }
            Err(BackendError::NotFound(message)) => {
                return Err(ExtractError::ModelNotFound {
                    model: backend.model().to_string(),
                    message,
                });
            }
            Err(BackendError::Other(message)) => return Err(ExtractError::Backend(message)),
        }
    }

    Err(ExtractError::RetriesExhausted {
        attempts: policy.max_retries,
    })
}
