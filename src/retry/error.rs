use super::classifier::ErrorKind;
use thiserror::Error;

/// Outcome of an operation the executor gave up on.
///
/// Every variant except `Cancelled` carries the error from the last attempt made.
#[derive(Debug, Error)]
pub enum RetryError<E>
where
    E: std::error::Error + 'static,
{
    /// The classifier considered the failure non-retryable
    #[error("{source}")]
    Fatal { attempts: u32, source: E },

    /// Every allowed attempt failed with a retryable error
    #[error("gave up after {attempts} attempt(s), last failure was {kind}: {source}")]
    Exhausted {
        attempts: u32,
        kind: ErrorKind,
        source: E,
    },

    /// The caller cancelled before or between attempts
    #[error("cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32, last: Option<E> },
}

impl<E> RetryError<E>
where
    E: std::error::Error + 'static,
{
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Fatal { attempts, .. }
            | RetryError::Exhausted { attempts, .. }
            | RetryError::Cancelled { attempts, .. } => *attempts,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }

    /// The error from the last attempt, if any attempt failed
    pub fn last_error(&self) -> Option<&E> {
        match self {
            RetryError::Fatal { source, .. } | RetryError::Exhausted { source, .. } => {
                Some(source)
            }
            RetryError::Cancelled { last, .. } => last.as_ref(),
        }
    }
}
