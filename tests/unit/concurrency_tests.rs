/*!
 * Tests for the concurrency gate and retry policy
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use yakusu::errors::ClientError;
use yakusu::translation::concurrency::{ConcurrencyLimiter, RetryPolicy};

#[tokio::test]
async fn test_limiter_withManyTasks_shouldNeverExceedCapacity() {
    let limiter = ConcurrencyLimiter::new(3);
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..12)
        .map(|_| {
            let limiter = limiter.clone();
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            tokio::spawn(async move {
                let _slot = limiter.acquire().await.unwrap();
                let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(current, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(limiter.available(), 3);
}

#[test]
fn test_retryPolicy_default_shouldMatchDocumentedValues() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_retries, 2);
    assert_eq!(policy.base_delay, Duration::from_millis(500));

    let error = ClientError::network("timeout");
    assert_eq!(policy.delay_for(0, &error), Duration::from_millis(500));
    assert_eq!(policy.delay_for(1, &error), Duration::from_millis(1000));
    assert!(policy.should_retry(1));
    assert!(!policy.should_retry(2));
}

#[test]
fn test_retryPolicy_withZeroRetryAfter_shouldUseBackoff() {
    let policy = RetryPolicy::new(2, Duration::from_millis(100));
    let error = ClientError::RateLimit {
        message: "limited".to_string(),
        retry_after_secs: Some(0),
    };
    assert_eq!(policy.delay_for(1, &error), Duration::from_millis(200));
}

#[test]
fn test_limiter_withZeroCapacity_shouldStillAdmitOneCaller() {
    let limiter = ConcurrencyLimiter::new(0);
    let available_while_held = tokio_test::block_on(async {
        let _slot = limiter.acquire().await.unwrap();
        limiter.available()
    });

    assert_eq!(limiter.capacity(), 1);
    assert_eq!(available_while_held, 0);
    assert_eq!(limiter.available(), 1);
}
