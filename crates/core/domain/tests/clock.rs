use std::sync::Arc;

use async_trait::async_trait;
use domain::{ClockSynchronizer, HubError, HubResult, SystemClock};
use tokio::sync::Mutex;

struct TestClock {
    timestamp: Mutex<i64>,
    get_err: bool,
    set_err: bool,
}

impl TestClock {
    fn new(timestamp: i64) -> Self {
        Self {
            timestamp: Mutex::new(timestamp),
            get_err: false,
            set_err: false,
        }
    }

    fn with_get_err(timestamp: i64) -> Self {
        Self {
            get_err: true,
            ..Self::new(timestamp)
        }
    }

    fn with_set_err(timestamp: i64) -> Self {
        Self {
            set_err: true,
            ..Self::new(timestamp)
        }
    }

    async fn timestamp(&self) -> i64 {
        *self.timestamp.lock().await
    }
}

#[async_trait]
impl SystemClock for TestClock {
    async fn get_timestamp(&self) -> HubResult<i64> {
        if self.get_err {
            return Err(HubError::failed("get failed"));
        }
        Ok(*self.timestamp.lock().await)
    }

    async fn set_timestamp(&self, timestamp: i64) -> HubResult<()> {
        if self.set_err {
            return Err(HubError::NotSupported);
        }
        *self.timestamp.lock().await = timestamp;
        Ok(())
    }
}

#[tokio::test]
async fn synchronize_local_read_error() {
    let synchronizer = ClockSynchronizer::new(
        Arc::new(TestClock::with_get_err(-1)),
        Arc::new(TestClock::new(-1)),
        Arc::new(TestClock::new(-1)),
        0,
    );
    assert_eq!(
        synchronizer.synchronize().await.expect_err("local error"),
        HubError::OperationFailed(String::new())
    );
}

#[tokio::test]
async fn synchronize_remote_last_read_error() {
    let synchronizer = ClockSynchronizer::new(
        Arc::new(TestClock::new(10)),
        Arc::new(TestClock::with_get_err(-1)),
        Arc::new(TestClock::new(-1)),
        0,
    );
    assert!(synchronizer.synchronize().await.is_err());
}

#[tokio::test]
async fn synchronize_remote_last_ahead_of_local() {
    let synchronizer = ClockSynchronizer::new(
        Arc::new(TestClock::new(10)),
        Arc::new(TestClock::new(20)),
        Arc::new(TestClock::new(-1)),
        0,
    );
    assert_eq!(
        synchronizer.synchronize().await.expect_err("refused"),
        HubError::InvalidState
    );
}

#[tokio::test]
async fn synchronize_remote_curr_read_error() {
    let synchronizer = ClockSynchronizer::new(
        Arc::new(TestClock::new(10)),
        Arc::new(TestClock::new(5)),
        Arc::new(TestClock::with_get_err(-1)),
        0,
    );
    assert!(synchronizer.synchronize().await.is_err());
}

#[tokio::test]
async fn synchronize_remote_curr_ahead_of_local() {
    let synchronizer = ClockSynchronizer::new(
        Arc::new(TestClock::new(10)),
        Arc::new(TestClock::new(5)),
        Arc::new(TestClock::new(20)),
        0,
    );
    assert_eq!(
        synchronizer.synchronize().await.expect_err("refused"),
        HubError::InvalidState
    );
}

#[tokio::test]
async fn synchronize_device_set_error() {
    let synchronizer = ClockSynchronizer::new(
        Arc::new(TestClock::new(10)),
        Arc::new(TestClock::new(5)),
        Arc::new(TestClock::with_set_err(-1)),
        0,
    );
    assert_eq!(
        synchronizer.synchronize().await.expect_err("set error"),
        HubError::NotSupported
    );
}

#[tokio::test]
async fn synchronize_sets_unset_device_clock() {
    let local = Arc::new(TestClock::new(10));
    let remote_last = Arc::new(TestClock::new(5));
    let remote_curr = Arc::new(TestClock::new(-1));

    let synchronizer = ClockSynchronizer::new(
        local.clone(),
        remote_last.clone(),
        remote_curr.clone(),
        0,
    );
    synchronizer.synchronize().await.expect("synchronize");

    assert_eq!(local.timestamp().await, 10);
    assert_eq!(remote_last.timestamp().await, 5);
    assert_eq!(remote_curr.timestamp().await, 10);
}

#[tokio::test]
async fn synchronize_skips_device_within_drift() {
    let remote_curr = Arc::new(TestClock::new(8));

    let synchronizer = ClockSynchronizer::new(
        Arc::new(TestClock::new(10)),
        Arc::new(TestClock::new(5)),
        remote_curr.clone(),
        5,
    );
    synchronizer.synchronize().await.expect("synchronize");

    assert_eq!(remote_curr.timestamp().await, 8);
}

#[tokio::test]
async fn synchronize_corrects_device_beyond_drift() {
    let remote_curr = Arc::new(TestClock::new(2));

    let synchronizer = ClockSynchronizer::new(
        Arc::new(TestClock::new(10)),
        Arc::new(TestClock::new(1)),
        remote_curr.clone(),
        5,
    );
    synchronizer.synchronize().await.expect("synchronize");

    assert_eq!(remote_curr.timestamp().await, 10);
}
