//! An in-memory `WatchSource`, a stand-in for the external object-store
//! control plane (out of scope per the core crate) used by demos and tests.

use async_trait::async_trait;
use dnsctl_core::watcher::{WatchEvent, WatchSource, WatchStream, WatchedObject};
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Holds objects in memory and fans out add/modify/delete events to any
/// number of subscribed watchers.
pub struct InMemoryWatchSource {
    objects: RwLock<HashMap<(String, String), WatchedObject>>,
    events: broadcast::Sender<WatchEvent>,
}

impl InMemoryWatchSource {
    pub fn new() -> Self {
        let (events, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            objects: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Inserts or replaces an object, emitting `Added` or `Modified`.
    pub fn put(&self, object: WatchedObject) {
        let key = (object.namespace.clone(), object.name.clone());
        let existed = self.objects.read().contains_key(&key);
        self.objects.write().insert(key, object.clone());
        let event = if existed {
            WatchEvent::Modified(object)
        } else {
            WatchEvent::Added(object)
        };
        let _ = self.events.send(event);
    }

    /// Removes an object, emitting `Deleted` if it was present.
    pub fn delete(&self, namespace: &str, name: &str) {
        let key = (namespace.to_string(), name.to_string());
        if let Some(object) = self.objects.write().remove(&key) {
            let _ = self.events.send(WatchEvent::Deleted(object));
        }
    }
}

impl Default for InMemoryWatchSource {
    fn default() -> Self {
        Self::new()
    }
}

fn object_of(event: &WatchEvent) -> &WatchedObject {
    match event {
        WatchEvent::Added(o) | WatchEvent::Modified(o) | WatchEvent::Deleted(o) => o,
    }
}

fn matches_selector(object: &WatchedObject, namespace: Option<&str>, label_selector: &str) -> bool {
    if let Some(ns) = namespace {
        if object.namespace != ns {
            return false;
        }
    }
    if label_selector.is_empty() {
        return true;
    }
    match label_selector.split_once('=') {
        Some((key, value)) => object.labels.get(key).map(|v| v == value).unwrap_or(false),
        None => true,
    }
}

#[async_trait]
impl WatchSource for InMemoryWatchSource {
    async fn list(&self, namespace: Option<&str>, label_selector: &str) -> dnsctl_core::Result<Vec<WatchedObject>> {
        Ok(self
            .objects
            .read()
            .values()
            .filter(|o| matches_selector(o, namespace, label_selector))
            .cloned()
            .collect())
    }

    async fn watch(&self, namespace: Option<&str>, label_selector: &str) -> dnsctl_core::Result<WatchStream> {
        let rx = self.events.subscribe();
        let namespace = namespace.map(str::to_string);
        let label_selector = label_selector.to_string();

        let stream = BroadcastStream::new(rx).filter_map(move |item| match item {
            Ok(event) if matches_selector(object_of(&event), namespace.as_deref(), &label_selector) => {
                Some(Ok(event))
            }
            Ok(_) => None,
            Err(_lagged) => None,
        });

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dnsctl_core::endpoint::{Endpoint, RecordType};

    fn object(name: &str, zone_label: &str) -> WatchedObject {
        let mut labels = HashMap::new();
        labels.insert("zone-name-label".to_string(), zone_label.to_string());
        WatchedObject {
            name: name.to_string(),
            namespace: "default".to_string(),
            labels,
            endpoints: vec![Endpoint::new(
                format!("{name}.example.com."),
                RecordType::A,
                vec!["1.1.1.1".to_string()],
            )],
        }
    }

    #[tokio::test]
    async fn list_respects_label_selector() {
        let source = InMemoryWatchSource::new();
        source.put(object("foo", "example.com"));
        source.put(object("bar", "other.com"));

        let result = source.list(None, "zone-name-label=example.com").await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "foo");
    }

    #[tokio::test]
    async fn watch_emits_added_then_deleted() {
        let source = InMemoryWatchSource::new();
        let mut stream = source.watch(None, "zone-name-label=example.com").await.unwrap();

        source.put(object("foo", "example.com"));
        source.delete("default", "foo");

        let first = stream.next().await.unwrap().unwrap();
        assert!(matches!(first, WatchEvent::Added(_)));
        let second = stream.next().await.unwrap().unwrap();
        assert!(matches!(second, WatchEvent::Deleted(_)));
    }
}
