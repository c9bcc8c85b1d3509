use std::future::Future;
use std::rc::Rc;

use gloo::events::EventListener;
use gloo::net::http::Request;
use unlockwall_core::*;
use wasm_bindgen::JsCast;
use web_sys::{EventSource, MessageEvent};

/// Stream events a realtime-database subscription can deliver.
pub(crate) const STREAM_EVENTS: [&str; 5] = ["put", "patch", "keep-alive", "cancel", "auth_revoked"];

/// Feeds one raw server-sent event through the payload parser.
pub(crate) fn dispatch_stream_event(event: &str, data: &str, on_event: &dyn Fn(StoreEvent)) {
    log::trace!("stream event {}: {} bytes", event, data.len());
    match parse_stream_event(event, data) {
        Ok(Some(change)) if !change.is_empty() || matches!(change, StoreChange::Snapshot(_)) => {
            on_event(StoreEvent::Change(change))
        }
        Ok(_) => {}
        Err(err) => on_event(StoreEvent::Error(err)),
    }
}

/// Realtime database reached over its REST interface: server-sent events for reads, `PUT` for writes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RealtimeStore {
    base_url: String,
}

impl RealtimeStore {
    pub(crate) fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }
}

pub(crate) struct RealtimeSubscription {
    source: EventSource,
    _listeners: Vec<EventListener>,
}

impl Drop for RealtimeSubscription {
    fn drop(&mut self) {
        log::debug!("closing stream {}", self.source.url());
        self.source.close();
    }
}

impl CellStore for RealtimeStore {
    type Subscription = RealtimeSubscription;

    fn subscribe<F>(
        &self,
        path: &str,
        on_event: F,
    ) -> core::result::Result<Self::Subscription, StoreError>
    where
        F: Fn(StoreEvent) + 'static,
    {
        let url = self.url(path);
        let source = EventSource::new(&url)
            .map_err(|err| StoreError::Subscription(format!("{:?}", err)))?;
        let on_event: Rc<dyn Fn(StoreEvent)> = Rc::new(on_event);
        on_event(StoreEvent::Status(ConnectionStatus::Connecting));

        let mut listeners: Vec<EventListener> = STREAM_EVENTS
            .iter()
            .map(|&name| {
                let on_event = on_event.clone();
                EventListener::new(&source, name, move |event| {
                    let data = event
                        .dyn_ref::<MessageEvent>()
                        .and_then(|event| event.data().as_string())
                        .unwrap_or_default();
                    dispatch_stream_event(name, &data, &*on_event);
                })
            })
            .collect();

        listeners.push({
            let on_event = on_event.clone();
            EventListener::new(&source, "open", move |_| {
                on_event(StoreEvent::Status(ConnectionStatus::Connected))
            })
        });
        listeners.push({
            let on_event = on_event.clone();
            EventListener::new(&source, "error", move |_| {
                // the browser keeps reconnecting on its own
                on_event(StoreEvent::Status(ConnectionStatus::Disconnected))
            })
        });

        log::info!("subscribed to {}", url);
        Ok(RealtimeSubscription {
            source,
            _listeners: listeners,
        })
    }

    fn write(
        &self,
        path: &str,
        value: &str,
    ) -> impl Future<Output = core::result::Result<(), StoreError>> {
        let url = self.url(path);
        let value = value.to_string();
        async move {
            let response = Request::put(&url)
                .json(&value)
                .map_err(|err| StoreError::Persist(err.to_string()))?
                .send()
                .await
                .map_err(|err| StoreError::Persist(err.to_string()))?;
            if response.ok() {
                Ok(())
            } else {
                Err(StoreError::Persist(format!(
                    "{} {}",
                    response.status(),
                    response.status_text()
                )))
            }
        }
    }
}

/// The store backing the page: the shared database when configured, otherwise this tab's memory.
pub(crate) enum WallStore {
    Realtime(RealtimeStore),
    Memory(MemoryStore),
}

impl WallStore {
    pub(crate) fn from_url(database_url: Option<&str>) -> Self {
        match database_url.filter(|url| !url.is_empty()) {
            Some(url) => Self::Realtime(RealtimeStore::new(url)),
            None => {
                log::warn!("no --database-url given, unlocks stay in this tab and are lost on reload");
                Self::Memory(MemoryStore::new())
            }
        }
    }

    pub(crate) fn is_shared(&self) -> bool {
        matches!(self, Self::Realtime(_))
    }
}

pub(crate) enum WallSubscription {
    Realtime(RealtimeSubscription),
    Memory(MemorySubscription),
}

impl CellStore for WallStore {
    type Subscription = WallSubscription;

    fn subscribe<F>(
        &self,
        path: &str,
        on_event: F,
    ) -> core::result::Result<Self::Subscription, StoreError>
    where
        F: Fn(StoreEvent) + 'static,
    {
        Ok(match self {
            Self::Realtime(store) => WallSubscription::Realtime(store.subscribe(path, on_event)?),
            Self::Memory(store) => WallSubscription::Memory(store.subscribe(path, on_event)?),
        })
    }

    fn write(
        &self,
        path: &str,
        value: &str,
    ) -> impl Future<Output = core::result::Result<(), StoreError>> {
        async move {
            match self {
                Self::Realtime(store) => store.write(path, value).await,
                Self::Memory(store) => store.write(path, value).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn collect(event: &str, data: &str) -> Vec<StoreEvent> {
        let events = RefCell::new(Vec::new());
        dispatch_stream_event(event, data, &|event| events.borrow_mut().push(event));
        events.into_inner()
    }

    #[test]
    fn urls_use_the_rest_suffix() {
        let store = RealtimeStore::new("https://wall.example.com/");
        assert_eq!(store.url("logos"), "https://wall.example.com/logos.json");
        assert_eq!(
            store.url(&store_path(42)),
            "https://wall.example.com/logos/42.json"
        );
    }

    #[test]
    fn empty_database_still_delivers_a_snapshot() {
        assert_eq!(
            collect("put", r#"{"path":"/","data":null}"#),
            vec![StoreEvent::Change(StoreChange::Snapshot(Default::default()))]
        );
    }

    #[test]
    fn keep_alive_and_empty_patches_are_silent() {
        assert!(collect("keep-alive", "null").is_empty());
        assert!(collect("patch", r#"{"path":"/","data":{}}"#).is_empty());
    }

    #[test]
    fn revoked_stream_surfaces_as_error() {
        assert!(matches!(
            collect("auth_revoked", "token expired").as_slice(),
            [StoreEvent::Error(StoreError::Subscription(_))]
        ));
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod browser_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn dropping_subscription_closes_the_stream() {
        let store = RealtimeStore::new("http://127.0.0.1:9");
        let subscription = store.subscribe(STORE_NAMESPACE, |_| {}).unwrap();
        let source = subscription.source.clone();
        assert_ne!(source.ready_state(), EventSource::CLOSED);

        drop(subscription);

        assert_eq!(source.ready_state(), EventSource::CLOSED);
    }
}
