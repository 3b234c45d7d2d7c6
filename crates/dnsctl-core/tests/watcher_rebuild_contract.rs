//! End-to-end watcher behavior: an `Added` event must result in the zone
//! handle observing the new endpoint, and a later `Deleted` event must
//! remove it again, once each debounce window elapses.

use async_trait::async_trait;
use dnsctl_core::endpoint::RecordType;
use dnsctl_core::watcher::{WatchEvent, WatchSource, WatchStream, Watcher, WatchedObject};
use dnsctl_core::zone::ZoneHandle;
use dnsctl_core::{Endpoint, Zone};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

struct ScriptedSource {
    initial: Vec<WatchedObject>,
    events: tokio::sync::Mutex<Option<mpsc::Receiver<dnsctl_core::Result<WatchEvent>>>>,
}

#[async_trait]
impl WatchSource for ScriptedSource {
    async fn list(&self, _namespace: Option<&str>, _label_selector: &str) -> dnsctl_core::Result<Vec<WatchedObject>> {
        Ok(self.initial.clone())
    }

    async fn watch(&self, _namespace: Option<&str>, _label_selector: &str) -> dnsctl_core::Result<WatchStream> {
        let rx = self.events.lock().await.take().expect("watch called once");
        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

fn object(name: &str, endpoint: Endpoint) -> WatchedObject {
    WatchedObject {
        name: name.to_string(),
        namespace: "default".to_string(),
        labels: Default::default(),
        endpoints: vec![endpoint],
    }
}

#[tokio::test]
async fn added_then_deleted_event_rebuilds_zone_each_time() {
    let (tx, rx) = mpsc::channel(8);
    let source: Arc<dyn WatchSource> = Arc::new(ScriptedSource {
        initial: Vec::new(),
        events: tokio::sync::Mutex::new(Some(rx)),
    });

    let zone_handle = Arc::new(ZoneHandle::new(Zone::new("example.com.", "hostmaster@example.com")));
    let watcher = Watcher::new(
        "example.com.",
        "hostmaster@example.com",
        None,
        source,
        zone_handle.clone(),
        Duration::from_millis(10),
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let task = tokio::spawn(watcher.run(shutdown_rx));

    let added = object(
        "web",
        Endpoint::new("foo.example.com.", RecordType::A, vec!["1.1.1.1".into()]),
    );
    tx.send(Ok(WatchEvent::Added(added.clone()))).await.unwrap();

    let found = wait_until(|| !zone_handle.current().lookup("foo.example.com.", RecordType::A).answers.is_empty()).await;
    assert!(found, "zone never picked up the added endpoint");

    tx.send(Ok(WatchEvent::Deleted(added))).await.unwrap();
    let removed = wait_until(|| zone_handle.current().lookup("foo.example.com.", RecordType::A).answers.is_empty()).await;
    assert!(removed, "zone never dropped the deleted endpoint");

    drop(tx);
    let _ = shutdown_tx.send(true);
    let _ = task.await;
}

async fn wait_until(mut predicate: impl FnMut() -> bool) -> bool {
    for _ in 0..50 {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    predicate()
}
