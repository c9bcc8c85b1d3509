use std::cell::RefCell;
use std::collections::BTreeMap;
use std::future::{self, Future};
use std::rc::{Rc, Weak};

use crate::*;

/// Change to the children of a subscribed path, keyed relative to that path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreChange {
    /// Everything currently stored, delivered first to every subscriber.
    Snapshot(BTreeMap<String, String>),
    /// Individual keys; `None` marks a removed key.
    Update(Vec<(String, Option<String>)>),
}

impl StoreChange {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Snapshot(entries) => entries.is_empty(),
            Self::Update(entries) => entries.is_empty(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    Change(StoreChange),
    Status(ConnectionStatus),
    Error(StoreError),
}

/// Key-value backing store shared by every viewer of the wall.
///
/// Subscriptions stay live until the returned handle is dropped.
pub trait CellStore {
    type Subscription;

    fn subscribe<F>(&self, path: &str, on_event: F) -> core::result::Result<Self::Subscription, StoreError>
    where
        F: Fn(StoreEvent) + 'static;

    fn write(&self, path: &str, value: &str) -> impl Future<Output = core::result::Result<(), StoreError>>;
}

type Listener = Rc<dyn Fn(StoreEvent)>;

#[derive(Default)]
struct MemoryInner {
    entries: BTreeMap<String, String>,
    listeners: Vec<(u32, String, Listener)>,
    next_listener: u32,
    fail_writes: Option<String>,
}

/// Process-local [`CellStore`]: one viewer, nothing survives a reload.
///
/// Writes resolve immediately and echo synchronously to every subscriber of the parent path.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following write fail with `reason`, or succeed again with `None`.
    pub fn fail_writes(&self, reason: Option<&str>) {
        self.inner.borrow_mut().fail_writes = reason.map(str::to_string);
    }

    pub fn get(&self, path: &str) -> Option<String> {
        self.inner.borrow().entries.get(path).cloned()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    fn children(entries: &BTreeMap<String, String>, path: &str) -> BTreeMap<String, String> {
        let prefix = format!("{}/", path);
        entries
            .iter()
            .filter_map(|(key, value)| {
                let child = key.strip_prefix(&prefix)?;
                (!child.contains('/')).then(|| (child.to_string(), value.clone()))
            })
            .collect()
    }

    fn put(&self, path: &str, value: &str) -> core::result::Result<(), StoreError> {
        let (parent, child) = path
            .rsplit_once('/')
            .ok_or_else(|| StoreError::Persist(format!("path {:?} has no parent", path)))?;

        let listeners: Vec<Listener> = {
            let mut inner = self.inner.borrow_mut();
            if let Some(reason) = &inner.fail_writes {
                return Err(StoreError::Persist(reason.clone()));
            }
            inner.entries.insert(path.to_string(), value.to_string());
            inner
                .listeners
                .iter()
                .filter(|(_, listen_path, _)| listen_path == parent)
                .map(|(_, _, listener)| listener.clone())
                .collect()
        };

        let change = StoreChange::Update(vec![(child.to_string(), Some(value.to_string()))]);
        for listener in listeners {
            listener(StoreEvent::Change(change.clone()));
        }
        Ok(())
    }
}

pub struct MemorySubscription {
    id: u32,
    inner: Weak<RefCell<MemoryInner>>,
}

impl Drop for MemorySubscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.borrow_mut().listeners.retain(|(id, _, _)| *id != self.id);
        }
    }
}

impl CellStore for MemoryStore {
    type Subscription = MemorySubscription;

    fn subscribe<F>(&self, path: &str, on_event: F) -> core::result::Result<Self::Subscription, StoreError>
    where
        F: Fn(StoreEvent) + 'static,
    {
        let listener: Listener = Rc::new(on_event);
        let (id, snapshot) = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_listener;
            inner.next_listener += 1;
            inner.listeners.push((id, path.to_string(), listener.clone()));
            (id, Self::children(&inner.entries, path))
        };

        listener(StoreEvent::Status(ConnectionStatus::Connected));
        listener(StoreEvent::Change(StoreChange::Snapshot(snapshot)));

        Ok(MemorySubscription {
            id,
            inner: Rc::downgrade(&self.inner),
        })
    }

    fn write(&self, path: &str, value: &str) -> impl Future<Output = core::result::Result<(), StoreError>> {
        future::ready(self.put(path, value))
    }
}
