use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::*;

#[derive(Deserialize)]
struct StreamPayload {
    path: String,
    data: Value,
}

fn string_entry(key: &str, value: Value) -> Option<(String, Option<String>)> {
    match value {
        Value::String(value) => Some((key.to_string(), Some(value))),
        Value::Null => Some((key.to_string(), None)),
        other => {
            log::warn!("ignoring non-string value for key {:?}: {}", key, other);
            None
        }
    }
}

/// Children of a node. The database sends mostly-dense integer keys as an array, holes as `null`.
fn object_entries(data: Value) -> core::result::Result<Vec<(String, Option<String>)>, StoreError> {
    match data {
        Value::Object(map) => Ok(map
            .into_iter()
            .filter_map(|(key, value)| string_entry(&key, value))
            .collect()),
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .filter(|(_, value)| !value.is_null())
            .filter_map(|(index, value)| string_entry(&index.to_string(), value))
            .collect()),
        Value::Null => Ok(Vec::new()),
        other => Err(StoreError::Parse(format!("expected an object, got {}", other))),
    }
}

/// Translates one server-sent event of a realtime-database subscription into a [`StoreChange`].
///
/// `put` at `/` replaces the whole mapping, `put` at `/<key>` sets one key and `patch` at `/` merges several.
/// Keep-alives yield `None`; `cancel` and `auth_revoked` end the subscription and surface as errors.
pub fn parse_stream_event(
    event: &str,
    data: &str,
) -> core::result::Result<Option<StoreChange>, StoreError> {
    match event {
        "keep-alive" => return Ok(None),
        "cancel" | "auth_revoked" => {
            return Err(StoreError::Subscription(format!("{}: {}", event, data)));
        }
        "put" | "patch" => {}
        other => {
            log::debug!("ignoring stream event {:?}", other);
            return Ok(None);
        }
    }

    let payload: StreamPayload =
        serde_json::from_str(data).map_err(|err| StoreError::Parse(err.to_string()))?;
    let key = payload.path.trim_matches('/');

    Ok(match (event, key) {
        ("put", "") => Some(StoreChange::Snapshot(
            object_entries(payload.data)?
                .into_iter()
                .filter_map(|(key, value)| Some((key, value?)))
                .collect(),
        )),
        ("patch", "") => Some(StoreChange::Update(object_entries(payload.data)?)),
        ("put", key) if !key.contains('/') => {
            string_entry(key, payload.data).map(|entry| StoreChange::Update(vec![entry]))
        }
        (_, key) => {
            log::warn!("ignoring {} below a cell key: {:?}", event, key);
            None
        }
    })
}

/// Read path of the wall: reconciles store changes into the [`Grid`] and tracks the subscription's health.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridSync {
    status: ConnectionStatus,
    last_error: Option<StoreError>,
    applied: u64,
}

impl Default for GridSync {
    fn default() -> Self {
        Self::new()
    }
}

impl GridSync {
    pub const fn new() -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            last_error: None,
            applied: 0,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn last_error(&self) -> Option<&StoreError> {
        self.last_error.as_ref()
    }

    /// Number of cell updates applied so far, echoes of local writes included.
    pub fn applied(&self) -> u64 {
        self.applied
    }

    pub fn subscribe<S: CellStore, F>(
        store: &S,
        on_event: F,
    ) -> core::result::Result<S::Subscription, StoreError>
    where
        F: Fn(StoreEvent) + 'static,
    {
        store.subscribe(STORE_NAMESPACE, on_event)
    }

    /// Applies one store event, returning the indices whose display changed.
    pub fn on_event(&mut self, grid: &mut Grid, event: StoreEvent) -> Vec<CellIndex> {
        match event {
            StoreEvent::Change(change) => self.apply_change(grid, change),
            StoreEvent::Status(status) => {
                if self.status != status {
                    log::info!("store connection: {:?}", status);
                    self.status = status;
                }
                Vec::new()
            }
            StoreEvent::Error(err) => {
                log::warn!("store subscription error, grid may be stale: {}", err);
                self.last_error = Some(err);
                Vec::new()
            }
        }
    }

    /// Applies keys in whatever order they arrive. Unknown keys and removals are logged and skipped.
    pub fn apply_change(&mut self, grid: &mut Grid, change: StoreChange) -> Vec<CellIndex> {
        let entries: Vec<(String, Option<String>)> = match change {
            StoreChange::Snapshot(entries) => {
                if entries.is_empty() {
                    log::debug!("no stored images yet");
                }
                entries.into_iter().map(|(key, value)| (key, Some(value))).collect()
            }
            StoreChange::Update(entries) => entries,
        };

        let mut changed = Vec::new();
        for (key, value) in entries {
            let Some(index) = parse_store_key(&key) else {
                log::warn!("ignoring store key {:?}", key);
                continue;
            };
            let Some(value) = value else {
                log::debug!("cell {} removed from store, keeping last image", index);
                continue;
            };
            if value.is_empty() {
                log::debug!("cell {} has an empty image, skipping", index);
                continue;
            }
            match grid.apply(index, Thumbnail::from_store(value)) {
                Ok(outcome) if outcome.has_update() => {
                    self.applied += 1;
                    changed.push(index);
                }
                Ok(_) => {}
                Err(err) => log::warn!("ignoring store key {:?}: {}", key, err),
            }
        }
        changed
    }

    /// Write path: stores one cell's thumbnail, resolving on the store's acknowledgment. Never retries.
    pub async fn persist<S: CellStore>(
        store: &S,
        index: CellIndex,
        image: &Thumbnail,
    ) -> core::result::Result<(), StoreError> {
        let path = store_path(index);
        log::debug!("persisting {}", path);
        store.write(&path, image.as_str()).await.inspect_err(|err| {
            log::error!("failed to persist {}: {}", path, err);
        })
    }
}

/// Builds the snapshot a subscriber would receive for the given cells.
pub fn snapshot_of<'a>(entries: impl IntoIterator<Item = (CellIndex, &'a str)>) -> StoreChange {
    StoreChange::Snapshot(
        entries
            .into_iter()
            .map(|(index, value)| (store_key(index), value.to_string()))
            .collect::<BTreeMap<_, _>>(),
    )
}
