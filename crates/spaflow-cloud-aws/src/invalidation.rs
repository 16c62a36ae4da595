//! CloudFront cache invalidation

use crate::context::Context;
use chrono::Utc;
use spaflow_cloud::model::Invalidation;
use spaflow_cloud::{PollState, Result, retry, wait_until};

pub struct CacheInvalidator<'a> {
    ctx: &'a Context,
}

impl<'a> CacheInvalidator<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Invalidate the comma separated `paths` in one batch, optionally
    /// waiting until the invalidation completes.
    pub async fn invalidate(
        &self,
        distribution_id: &str,
        paths: &str,
        wait: bool,
    ) -> Result<Invalidation> {
        let items: Vec<String> = paths
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        tracing::info!(
            "[CloudFront] ✏️ creating invalidation for {}...",
            items.join(", ")
        );

        let caller_reference = Utc::now().timestamp_millis().to_string();
        let invalidation = self
            .ctx
            .distributions
            .create_invalidation(distribution_id, items, &caller_reference)
            .await?;

        if !wait || invalidation.is_completed() {
            return Ok(invalidation);
        }

        tracing::info!(
            "[CloudFront] ⏱ waiting for invalidation to be completed (can take up to 10 minutes)..."
        );
        let id = invalidation.id.clone();
        let completed = wait_until(
            &format!("invalidation {id}"),
            self.ctx.settings.invalidation_wait(),
            || {
                let id = id.clone();
                async move {
                    let current = self
                        .ctx
                        .distributions
                        .get_invalidation(distribution_id, &id)
                        .await?;
                    if current.is_completed() {
                        Ok(PollState::Ready(current))
                    } else {
                        Ok(PollState::Pending(current.status))
                    }
                }
            },
        )
        .await?;
        tracing::info!("[CloudFront] 👍 invalidation {} completed", completed.id);
        Ok(completed)
    }

    /// [`invalidate`](Self::invalidate), retried up to the configured number
    /// of attempts without delay.
    pub async fn invalidate_with_retry(
        &self,
        distribution_id: &str,
        paths: &str,
        wait: bool,
    ) -> Result<Invalidation> {
        retry(
            "[CloudFront] cache invalidation",
            self.ctx.settings.invalidation_retry(),
            |_| self.invalidate(distribution_id, paths, wait),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::Mocks;
    use spaflow_cloud::CloudError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn throttled() -> CloudError {
        CloudError::Provider {
            service: "CloudFront",
            code: Some("Throttling".into()),
            status: Some(400),
            message: "rate exceeded".into(),
        }
    }

    fn invalidation(status: &str) -> Invalidation {
        Invalidation {
            id: "I1".into(),
            status: status.into(),
        }
    }

    /// Fails the first `failures` calls, then succeeds.
    fn flaky(mocks: &mut Mocks, failures: usize) -> Arc<AtomicUsize> {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        mocks
            .distributions
            .expect_create_invalidation()
            .returning(move |_, _, _| {
                if counter.fetch_add(1, Ordering::SeqCst) < failures {
                    Err(throttled())
                } else {
                    Ok(invalidation("InProgress"))
                }
            });
        calls
    }

    #[tokio::test]
    async fn test_retry_succeeds_below_five_failures() {
        for failures in 0..=6 {
            let mut mocks = Mocks::new();
            let calls = flaky(&mut mocks, failures);
            let ctx = mocks.into_context();

            let result = CacheInvalidator::new(&ctx)
                .invalidate_with_retry("E1", "/*", false)
                .await;
            assert_eq!(result.is_ok(), failures < 5, "failures = {failures}");
            assert_eq!(calls.load(Ordering::SeqCst), (failures + 1).min(5));
        }
    }

    #[tokio::test]
    async fn test_invalidate_splits_and_trims_paths() {
        let mut mocks = Mocks::new();
        mocks
            .distributions
            .expect_create_invalidation()
            .withf(|id, paths, reference| {
                id == "E1"
                    && paths == ["/app/*".to_string(), "/app/index.html".to_string()].as_slice()
                    && !reference.is_empty()
            })
            .times(1)
            .returning(|_, _, _| Ok(invalidation("InProgress")));
        mocks.distributions.expect_get_invalidation().never();
        let ctx = mocks.into_context();

        CacheInvalidator::new(&ctx)
            .invalidate("E1", "/app/*, ,/app/index.html,", false)
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_waits_for_completion() {
        let mut mocks = Mocks::new();
        mocks
            .distributions
            .expect_create_invalidation()
            .returning(|_, _, _| Ok(invalidation("InProgress")));
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        mocks
            .distributions
            .expect_get_invalidation()
            .returning(move |_, _| {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Ok(invalidation("InProgress"))
                } else {
                    Ok(invalidation("Completed"))
                }
            });
        let ctx = mocks.into_context();

        let done = CacheInvalidator::new(&ctx)
            .invalidate("E1", "/*", true)
            .await
            .unwrap();
        assert!(done.is_completed());
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_wait_times_out() {
        let mut mocks = Mocks::new();
        mocks.settings.invalidation_timeout_secs = 5;
        mocks
            .distributions
            .expect_create_invalidation()
            .returning(|_, _, _| Ok(invalidation("InProgress")));
        mocks
            .distributions
            .expect_get_invalidation()
            .returning(|_, _| Ok(invalidation("InProgress")));
        let ctx = mocks.into_context();

        let result = CacheInvalidator::new(&ctx).invalidate("E1", "/*", true).await;
        assert!(matches!(result, Err(CloudError::Timeout(_))));
    }
}
