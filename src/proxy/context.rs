//! Cancellable, deadline-bearing execution context for a probe batch

use crate::proxy::transport::ProbeError;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Stand-in deadline for timeouts too large to represent (about 30 years)
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Shared deadline plus an explicit cancel switch.
///
/// Clones observe the same token and deadline.
#[derive(Debug, Clone)]
pub struct ProbeContext {
    deadline: Instant,
    token: CancellationToken,
}

impl ProbeContext {
    /// Context that expires `timeout` from now.
    ///
    /// Timeouts past what `Instant` can hold are capped to a deadline far
    /// in the future.
    pub fn with_timeout(timeout: Duration) -> Self {
        let now = Instant::now();
        let deadline = now
            .checked_add(timeout)
            .unwrap_or_else(|| now + FAR_FUTURE);
        Self::with_deadline(deadline)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline,
            token: CancellationToken::new(),
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Cancel the context before its deadline
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || Instant::now() >= self.deadline
    }

    /// Resolves once the context is cancelled or its deadline passes,
    /// yielding the reason.
    pub async fn done(&self) -> ProbeError {
        tokio::select! {
            _ = self.token.cancelled() => ProbeError::Cancelled,
            _ = tokio::time::sleep_until(self.deadline) => ProbeError::DeadlineExceeded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deadline_expires() {
        let ctx = ProbeContext::with_timeout(Duration::from_millis(20));
        assert!(!ctx.is_done());
        assert!(matches!(ctx.done().await, ProbeError::DeadlineExceeded));
        assert!(ctx.is_done());
    }

    #[tokio::test]
    async fn test_huge_timeout_does_not_overflow() {
        let ctx = ProbeContext::with_timeout(Duration::from_secs(u64::MAX));
        assert!(!ctx.is_done());
        assert!(ctx.deadline() > Instant::now() + Duration::from_secs(86400 * 365));

        ctx.cancel();
        assert!(matches!(ctx.done().await, ProbeError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_is_shared_by_clones() {
        let ctx = ProbeContext::with_timeout(Duration::from_secs(60));
        let clone = ctx.clone();
        ctx.cancel();
        assert!(clone.is_done());
        assert!(matches!(clone.done().await, ProbeError::Cancelled));
    }
}
