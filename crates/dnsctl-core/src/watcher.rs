//! Watch/refresh loop: subscribes to an external endpoint source and keeps
//! a zone's contents current (§4.7).

use crate::endpoint::Endpoint;
use crate::error::Error;
use crate::zone::{Zone, ZoneHandle};
use async_trait::async_trait;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, error, info, warn};

/// One object delivered by the external control plane: a named, namespaced
/// resource declaring zero or more endpoints (§6 Watched-object contract).
#[derive(Debug, Clone)]
pub struct WatchedObject {
    pub name: String,
    pub namespace: String,
    pub labels: HashMap<String, String>,
    pub endpoints: Vec<Endpoint>,
}

/// A single change notification from the watch stream.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    Added(WatchedObject),
    Modified(WatchedObject),
    Deleted(WatchedObject),
}

pub type WatchStream = Pin<Box<dyn Stream<Item = crate::Result<WatchEvent>> + Send>>;

/// The external object-store control plane, out of scope for this crate
/// (§1); only its list/watch interface is modeled here.
#[async_trait]
pub trait WatchSource: Send + Sync {
    async fn list(&self, namespace: Option<&str>, label_selector: &str) -> crate::Result<Vec<WatchedObject>>;
    async fn watch(&self, namespace: Option<&str>, label_selector: &str) -> crate::Result<WatchStream>;
}

/// Strips a trailing dot for the `zone-name-label` selector value (§4.7).
pub fn zone_label_selector(origin: &str) -> String {
    format!("zone-name-label={}", origin.trim_end_matches('.'))
}

/// One watcher per `(zone origin, optional namespace)` (§4.7).
pub struct Watcher {
    origin: String,
    rname: String,
    namespace: Option<String>,
    source: Arc<dyn WatchSource>,
    zone_handle: Arc<ZoneHandle>,
    debounce: Duration,
}

impl Watcher {
    pub fn new(
        origin: impl Into<String>,
        rname: impl Into<String>,
        namespace: Option<String>,
        source: Arc<dyn WatchSource>,
        zone_handle: Arc<ZoneHandle>,
        debounce: Duration,
    ) -> Self {
        Self {
            origin: origin.into(),
            rname: rname.into(),
            namespace,
            source,
            zone_handle,
            debounce,
        }
    }

    /// Runs until the stream ends or `shutdown` fires. Degraded-mode errors
    /// are logged and leave the zone empty; unexpected errors are fatal and
    /// cause the watcher to exit (§4.7, §7).
    pub async fn run(self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let selector = zone_label_selector(&self.origin);
        let mut cache: HashMap<(String, String), WatchedObject> = HashMap::new();

        match self.source.list(self.namespace.as_deref(), &selector).await {
            Ok(objects) => {
                for obj in objects {
                    cache.insert((obj.namespace.clone(), obj.name.clone()), obj);
                }
            }
            Err(Error::WatchPermissionDenied(msg)) => {
                warn!(origin = %self.origin, reason = %msg, "watch permission denied, continuing with empty zone");
            }
            Err(Error::WatchNotFound(msg)) => {
                warn!(origin = %self.origin, reason = %msg, "watched object kind not found, continuing with empty zone");
            }
            Err(e) => {
                error!(origin = %self.origin, error = %e, "fatal error listing endpoint source");
                return;
            }
        }
        self.rebuild(&cache);

        let mut stream = match self.source.watch(self.namespace.as_deref(), &selector).await {
            Ok(s) => s,
            Err(Error::WatchPermissionDenied(msg)) => {
                warn!(origin = %self.origin, reason = %msg, "watch subscription denied, serving last known state only");
                return;
            }
            Err(Error::WatchNotFound(msg)) => {
                warn!(origin = %self.origin, reason = %msg, "watch subscription unavailable, serving last known state only");
                return;
            }
            Err(e) => {
                error!(origin = %self.origin, error = %e, "fatal error subscribing to endpoint source");
                return;
            }
        };

        let mut dirty = false;
        let debounce_timer = tokio::time::sleep(self.debounce);
        tokio::pin!(debounce_timer);

        loop {
            tokio::select! {
                event = stream.next() => {
                    match event {
                        Some(Ok(ev)) => {
                            Self::apply_event(&mut cache, ev);
                            dirty = true;
                            debounce_timer.as_mut().reset(tokio::time::Instant::now() + self.debounce);
                        }
                        Some(Err(e)) => {
                            warn!(origin = %self.origin, error = %e, "error on watch stream, continuing");
                        }
                        None => {
                            debug!(origin = %self.origin, "watch stream closed");
                            break;
                        }
                    }
                }
                _ = &mut debounce_timer, if dirty => {
                    self.rebuild(&cache);
                    dirty = false;
                    debounce_timer.as_mut().reset(tokio::time::Instant::now() + self.debounce);
                }
                _ = shutdown.changed() => {
                    info!(origin = %self.origin, "watcher shutting down");
                    break;
                }
            }
        }
    }

    fn apply_event(cache: &mut HashMap<(String, String), WatchedObject>, event: WatchEvent) {
        match event {
            WatchEvent::Added(obj) | WatchEvent::Modified(obj) => {
                cache.insert((obj.namespace.clone(), obj.name.clone()), obj);
            }
            WatchEvent::Deleted(obj) => {
                cache.remove(&(obj.namespace, obj.name));
            }
        }
    }

    fn rebuild(&self, cache: &HashMap<(String, String), WatchedObject>) {
        let mut zone = Zone::new(&self.origin, &self.rname);
        for obj in cache.values() {
            for ep in &obj.endpoints {
                zone.insert_endpoint(ep);
            }
        }
        debug!(origin = %self.origin, objects = cache.len(), "rebuilt zone");
        self.zone_handle.refresh_from(zone);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_label_selector_strips_trailing_dot() {
        assert_eq!(zone_label_selector("example.com."), "zone-name-label=example.com");
    }
}
