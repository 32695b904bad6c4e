//! Request-scoped execution context.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// Carries cancellation and an optional deadline through one pipeline run.
///
/// Every collaborator call is raced against both; whichever fires first
/// aborts the call and the stages after it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Uuid,
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fail if the request was cancelled or is past its deadline.
    pub fn check(&self) -> CoreResult<()> {
        if self.token.is_cancelled() {
            return Err(CoreError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(CoreError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Run `fut` unless the request is cancelled or times out first.
    pub async fn run<F, T>(&self, fut: F) -> CoreResult<T>
    where
        F: Future<Output = CoreResult<T>>,
    {
        self.check()?;

        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.token.cancelled() => Err(CoreError::Cancelled),
                _ = tokio::time::sleep_until(deadline) => Err(CoreError::DeadlineExceeded),
                result = fut => result,
            },
            None => tokio::select! {
                biased;
                _ = self.token.cancelled() => Err(CoreError::Cancelled),
                result = fut => result,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_completes() {
        let ctx = RequestContext::new();
        let value = ctx.run(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_cancelled_before_run() {
        let ctx = RequestContext::new();
        ctx.cancel();

        let result = ctx.run(async { Ok(()) }).await;
        assert!(matches!(result, Err(CoreError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_while_running() {
        let ctx = RequestContext::new();
        let token = ctx.cancellation_token().clone();

        let result = ctx
            .run(async move {
                token.cancel();
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(CoreError::Cancelled)));
    }

    #[tokio::test]
    async fn test_deadline() {
        let ctx = RequestContext::new().with_timeout(Duration::from_millis(50));

        let result = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(CoreError::DeadlineExceeded)));
        assert!(ctx.check().is_err());
    }
}
