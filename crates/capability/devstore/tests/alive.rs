use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use domain::{HubResult, MonotonicClock};
use hub_devstore::{AliveMonitor, DeviceView, Store, StoreAliveMonitor};

struct TestMonotonicClock {
    base: Instant,
    offset: StdMutex<Duration>,
}

impl TestMonotonicClock {
    fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: StdMutex::new(Duration::ZERO),
        }
    }

    fn advance(&self, duration: Duration) {
        let mut offset = self.offset.lock().expect("offset lock");
        *offset += duration;
    }
}

impl MonotonicClock for TestMonotonicClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().expect("offset lock")
    }
}

#[derive(Default)]
struct TestStore {
    devices: StdMutex<HashMap<String, String>>,
    add_calls: StdMutex<usize>,
    remove_calls: StdMutex<usize>,
}

impl TestStore {
    fn count(&self) -> usize {
        self.devices.lock().expect("devices lock").len()
    }

    fn add_calls(&self) -> usize {
        *self.add_calls.lock().expect("add calls lock")
    }

    fn remove_calls(&self) -> usize {
        *self.remove_calls.lock().expect("remove calls lock")
    }

    fn has_device(&self, uri: &str, desc: &str) -> bool {
        self.devices
            .lock()
            .expect("devices lock")
            .get(uri)
            .map(|d| d == desc)
            .unwrap_or(false)
    }

    fn seed(&self, uri: &str, desc: &str) {
        self.devices
            .lock()
            .expect("devices lock")
            .insert(uri.to_string(), desc.to_string());
    }
}

#[async_trait]
impl Store for TestStore {
    async fn add(&self, uri: &str, desc: &str) -> HubResult<()> {
        *self.add_calls.lock().expect("add calls lock") += 1;
        self.seed(uri, desc);
        Ok(())
    }

    async fn remove(&self, uri: &str) -> HubResult<()> {
        *self.remove_calls.lock().expect("remove calls lock") += 1;
        self.devices.lock().expect("devices lock").remove(uri);
        Ok(())
    }

    async fn get_desc(&self) -> Vec<DeviceView> {
        self.devices
            .lock()
            .expect("devices lock")
            .iter()
            .map(|(uri, desc)| DeviceView {
                uri: uri.clone(),
                desc: desc.clone(),
                id: String::new(),
                created_at: String::new(),
            })
            .collect()
    }
}

const URI: &str = "http://bonsai-growlab.local/api/v1";
const DESC: &str = "home-plant";

#[tokio::test]
async fn active_device_is_kept() {
    let inactive_interval = Duration::from_secs(60);

    let clock = Arc::new(TestMonotonicClock::new());
    let store = Arc::new(TestStore::default());
    let monitor = StoreAliveMonitor::new(clock.clone(), store.clone(), inactive_interval);

    monitor.add(URI, DESC).await.expect("add");
    monitor.run().await.expect("run");

    assert_eq!(store.count(), 1);
    assert_eq!(store.add_calls(), 1);
    assert_eq!(store.remove_calls(), 0);
    assert!(store.has_device(URI, DESC));

    clock.advance(inactive_interval / 2);
    monitor.run().await.expect("run");

    assert_eq!(store.count(), 1);
    assert_eq!(store.remove_calls(), 0);
    assert!(store.has_device(URI, DESC));
}

#[tokio::test]
async fn silent_device_is_removed_once() {
    let resolution = Duration::from_secs(60);
    let inactive_interval = resolution * 10;

    let clock = Arc::new(TestMonotonicClock::new());
    let store = Arc::new(TestStore::default());
    let monitor = StoreAliveMonitor::new(clock.clone(), store.clone(), inactive_interval);

    let notifier = monitor.monitor(URI);

    monitor.add(URI, DESC).await.expect("add");
    monitor.run().await.expect("run");

    assert_eq!(store.count(), 1);
    assert_eq!(store.remove_calls(), 0);

    clock.advance(inactive_interval - resolution);
    monitor.run().await.expect("run");

    notifier.notify_alive().await;

    assert_eq!(store.remove_calls(), 0);
    assert!(store.has_device(URI, DESC));

    clock.advance(resolution);
    monitor.run().await.expect("run");

    assert_eq!(store.remove_calls(), 0);
    assert!(store.has_device(URI, DESC));

    clock.advance(inactive_interval - resolution);
    monitor.run().await.expect("run");

    assert_eq!(store.remove_calls(), 1);
    assert!(!store.has_device(URI, DESC));

    monitor.run().await.expect("run");

    assert_eq!(store.remove_calls(), 1);
    assert!(!store.has_device(URI, DESC));
}

#[tokio::test]
async fn restored_device_is_reaped_after_full_window() {
    let inactive_interval = Duration::from_secs(600);

    let clock = Arc::new(TestMonotonicClock::new());
    let store = Arc::new(TestStore::default());
    store.seed(URI, DESC);

    let monitor = StoreAliveMonitor::new(clock.clone(), store.clone(), inactive_interval);

    clock.advance(inactive_interval);
    monitor.run().await.expect("run");

    assert_eq!(store.remove_calls(), 1);
    assert!(!store.has_device(URI, DESC));

    monitor.run().await.expect("run");

    assert_eq!(store.remove_calls(), 1);
}

#[tokio::test]
async fn threshold_boundary() {
    let inactive_interval = Duration::from_secs(600);
    let epsilon = Duration::from_millis(1);

    let clock = Arc::new(TestMonotonicClock::new());
    let store = Arc::new(TestStore::default());
    let monitor = StoreAliveMonitor::new(clock.clone(), store.clone(), inactive_interval);

    monitor.add(URI, DESC).await.expect("add");

    clock.advance(inactive_interval - epsilon);
    monitor.run().await.expect("run");
    assert_eq!(store.remove_calls(), 0);

    clock.advance(epsilon + epsilon);
    monitor.run().await.expect("run");
    assert_eq!(store.remove_calls(), 1);
}

#[tokio::test]
async fn notifier_for_unregistered_uri_is_cleaned_up() {
    let inactive_interval = Duration::from_secs(600);

    let clock = Arc::new(TestMonotonicClock::new());
    let store = Arc::new(TestStore::default());
    let monitor = StoreAliveMonitor::new(clock.clone(), store.clone(), inactive_interval);

    let notifier = monitor.monitor("http://gone.local/api/v1");
    notifier.notify_alive().await;

    clock.advance(inactive_interval * 2);
    monitor.run().await.expect("run");

    // 未注册的 URI 不会触发 remove。
    assert_eq!(store.remove_calls(), 0);
}
