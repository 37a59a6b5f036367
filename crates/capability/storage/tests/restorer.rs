use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use domain::{HubError, HubResult, SystemClock};
use hub_storage::{ClockRestorer, SystemClockReader};

struct TestReader {
    results: Mutex<Vec<HubResult<i64>>>,
}

impl TestReader {
    fn new(results: Vec<HubResult<i64>>) -> Self {
        Self {
            results: Mutex::new(results),
        }
    }
}

#[async_trait]
impl SystemClockReader for TestReader {
    async fn read_timestamp(&self) -> HubResult<i64> {
        self.results
            .lock()
            .expect("reader lock")
            .remove(0)
    }
}

#[tokio::test]
async fn get_timestamp_before_restore_is_invalid_state() {
    let restorer = ClockRestorer::new(Arc::new(TestReader::new(vec![])));

    assert_eq!(
        restorer.get_timestamp().await.expect_err("not restored"),
        HubError::InvalidState
    );
}

#[tokio::test]
async fn run_restores_persisted_timestamp() {
    let restorer = ClockRestorer::new(Arc::new(TestReader::new(vec![Ok(1733215816)])));

    restorer.run().await.expect("run");
    assert_eq!(restorer.get_timestamp().await.expect("get"), 1733215816);
}

#[tokio::test]
async fn run_treats_no_data_as_restored_with_minus_one() {
    let restorer = ClockRestorer::new(Arc::new(TestReader::new(vec![Err(HubError::NoData)])));

    restorer.run().await.expect("run");
    assert_eq!(restorer.get_timestamp().await.expect("get"), -1);
}

#[tokio::test]
async fn run_propagates_other_errors_for_retry() {
    let restorer = ClockRestorer::new(Arc::new(TestReader::new(vec![
        Err(HubError::failed("query failed")),
        Ok(42),
    ])));

    restorer.run().await.expect_err("first run fails");
    assert_eq!(
        restorer.get_timestamp().await.expect_err("still unrestored"),
        HubError::InvalidState
    );

    restorer.run().await.expect("retry");
    assert_eq!(restorer.get_timestamp().await.expect("get"), 42);
}

#[tokio::test]
async fn set_timestamp_pins_restoration() {
    let restorer = ClockRestorer::new(Arc::new(TestReader::new(vec![Ok(10)])));

    restorer.set_timestamp(100).await.expect("set");
    assert_eq!(restorer.get_timestamp().await.expect("get"), 100);

    // 慢恢复不会覆盖已经观测到的新值。
    restorer.run().await.expect("late run");
    assert_eq!(restorer.get_timestamp().await.expect("get"), 100);
}

#[tokio::test]
async fn set_timestamp_only_moves_forward() {
    let restorer = ClockRestorer::new(Arc::new(TestReader::new(vec![])));

    restorer.set_timestamp(100).await.expect("set");
    restorer.set_timestamp(50).await.expect("set older");

    assert_eq!(restorer.get_timestamp().await.expect("get"), 100);
}
