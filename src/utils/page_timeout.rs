//! Timeout wrapper for page operations
//!
//! Bounds navigation and CDP calls so a wedged page cannot hang an executor.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;

/// Run `operation`, failing with a named timeout error after `limit`.
pub async fn with_page_timeout<F, T>(operation: F, limit: Duration, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "{operation_name} timeout after {:.1} seconds",
            limit.as_secs_f64()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_times_out_slow_operation() {
        let result: Result<()> = with_page_timeout(
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            },
            Duration::from_secs(5),
            "page.goto",
        )
        .await;

        let message = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert_eq!(message, "page.goto timeout after 5.0 seconds");
    }

    #[tokio::test]
    async fn test_passes_through_result() -> Result<()> {
        let value = with_page_timeout(async { Ok(7) }, Duration::from_secs(1), "noop").await?;
        assert_eq!(value, 7);
        Ok(())
    }
}
