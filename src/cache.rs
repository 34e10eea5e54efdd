//! Client-side query cache.
//!
//! Entries are keyed by the query name plus its canonical filter JSON. Each
//! fetch is tagged with a generation; only the response for the key's
//! current in-flight generation is stored, so late answers from superseded
//! or cancelled fetches cannot overwrite newer data. Optimistic list
//! mutations are logged per key so any one of them can be rolled back
//! without disturbing the others.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// `query` + canonical filters. `serde_json` maps are ordered by key, so two
/// filter objects with the same content produce the same key.
pub fn cache_key(query: &str, filters: &Value) -> String {
    let filters = match filters {
        Value::Null => Value::Object(Default::default()),
        other => other.clone(),
    };
    format!("{}:{}", query, filters)
}

#[derive(Debug, Clone, Default)]
pub struct CacheEntry {
    pub data: Option<Value>,
    pub in_flight: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ListMutation {
    Create { item: Value },
    Update { id: String, item: Value },
    Delete { id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    NotAList(String),
    ItemNotFound(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::NotAList(field) => write!(f, "cached field {:?} is not a list", field),
            CacheError::ItemNotFound(id) => write!(f, "no cached item with id {:?}", id),
        }
    }
}

impl std::error::Error for CacheError {}

struct PendingMutation {
    id: String,
    list_field: Option<String>,
    mutation: ListMutation,
    settled: bool,
}

/// Optimistic mutations on one key, in the order they were applied on top
/// of `base`. Settled mutations stay in the log until every earlier one is
/// settled too, then fold into `base`.
struct PendingLog {
    base: Value,
    mutations: Vec<PendingMutation>,
}

impl PendingLog {
    fn open_position(&self, mutation_id: &str) -> Option<usize> {
        self.mutations
            .iter()
            .position(|m| m.id == mutation_id && !m.settled)
    }

    /// `base` with every remaining mutation replayed. A mutation whose target
    /// vanished with a rolled back one contributes nothing.
    fn replay(&self) -> Value {
        let mut data = self.base.clone();
        for m in &self.mutations {
            let _ = apply_list_mutation(&mut data, m.list_field.as_deref(), &m.mutation);
        }
        data
    }

    fn compact(&mut self) {
        let settled = self.mutations.iter().take_while(|m| m.settled).count();
        for m in self.mutations.drain(..settled) {
            let _ = apply_list_mutation(&mut self.base, m.list_field.as_deref(), &m.mutation);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome {
    pub mutation_id: String,
    pub data: Value,
}

#[derive(Default)]
pub struct QueryCache {
    entries: HashMap<String, CacheEntry>,
    pending: HashMap<String, PendingLog>,
    last_generation: u64,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fetch for `key` and returns its generation. Any fetch already
    /// in flight for the key becomes stale.
    pub fn begin(&mut self, key: &str) -> u64 {
        self.last_generation += 1;
        let generation = self.last_generation;
        self.entries.entry(key.to_string()).or_default().in_flight = Some(generation);
        generation
    }

    /// Stores `data` if `generation` is the key's current fetch. Returns
    /// whether the response was applied.
    pub fn resolve(&mut self, key: &str, generation: u64, data: Value) -> bool {
        let Some(entry) = self.entries.get_mut(key) else {
            return false;
        };
        if entry.in_flight != Some(generation) {
            return false;
        }
        entry.in_flight = None;
        entry.data = Some(data);
        // Server data supersedes any optimistic state taken before it.
        self.pending.remove(key);
        true
    }

    /// Drops the in-flight fetch for `key` so its response will be ignored.
    pub fn cancel(&mut self, key: &str) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => entry.in_flight.take().is_some(),
            None => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn data(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).and_then(|e| e.data.as_ref())
    }

    /// Removes entries for `query` (all entries when `None`).
    pub fn invalidate(&mut self, query: Option<&str>) -> usize {
        let before = self.entries.len();
        match query {
            None => self.entries.clear(),
            Some(q) => {
                let prefix = format!("{}:", q);
                self.entries.retain(|k, _| !k.starts_with(&prefix));
            }
        }
        let entries = &self.entries;
        self.pending.retain(|key, _| entries.contains_key(key));
        before - self.entries.len()
    }

    /// Applies an optimistic create/update/delete to the list stored at
    /// `list_field` (or to the cached value itself when it is the list).
    /// Returns `Ok(None)` when nothing is cached for `key`.
    pub fn mutate(
        &mut self,
        key: &str,
        list_field: Option<&str>,
        mutation: ListMutation,
    ) -> Result<Option<MutationOutcome>, CacheError> {
        let Some(current) = self.data(key).cloned() else {
            return Ok(None);
        };
        // The id is fixed here so a replay after rollback recreates the same item.
        let mutation = match mutation {
            ListMutation::Create { mut item } => {
                if let Some(obj) = item.as_object_mut() {
                    obj.entry("id")
                        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
                }
                ListMutation::Create { item }
            }
            other => other,
        };
        let mut next = current.clone();
        apply_list_mutation(&mut next, list_field, &mutation)?;

        let mutation_id = Uuid::new_v4().to_string();
        let log = self.pending.entry(key.to_string()).or_insert_with(|| PendingLog {
            base: current,
            mutations: Vec::new(),
        });
        log.mutations.push(PendingMutation {
            id: mutation_id.clone(),
            list_field: list_field.map(str::to_string),
            mutation,
            settled: false,
        });
        if let Some(entry) = self.entries.get_mut(key) {
            entry.data = Some(next.clone());
        }
        Ok(Some(MutationOutcome {
            mutation_id,
            data: next,
        }))
    }

    /// Undoes `mutation_id`. Other mutations on the same key, pending or
    /// settled, are replayed on top of the state it was applied to.
    pub fn rollback(&mut self, mutation_id: &str) -> bool {
        let Some((key, pos)) = self.find_open(mutation_id) else {
            return false;
        };
        let Some(log) = self.pending.get_mut(&key) else {
            return false;
        };
        log.mutations.remove(pos);
        let data = log.replay();
        log.compact();
        if log.mutations.is_empty() {
            self.pending.remove(&key);
        }
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.data = Some(data);
        }
        tracing::debug!(key = %key, mutation = %mutation_id, "optimistic mutation rolled back");
        true
    }

    /// Marks a mutation the server confirmed. Its effect can no longer be
    /// undone by rolling back an earlier mutation.
    pub fn settle(&mut self, mutation_id: &str) -> bool {
        let Some((key, pos)) = self.find_open(mutation_id) else {
            return false;
        };
        let Some(log) = self.pending.get_mut(&key) else {
            return false;
        };
        log.mutations[pos].settled = true;
        log.compact();
        if log.mutations.is_empty() {
            self.pending.remove(&key);
        }
        true
    }

    fn find_open(&self, mutation_id: &str) -> Option<(String, usize)> {
        self.pending
            .iter()
            .find_map(|(key, log)| log.open_position(mutation_id).map(|pos| (key.clone(), pos)))
    }
}

fn item_id(v: &Value) -> Option<&str> {
    v.get("id").and_then(Value::as_str)
}

/// Applies one list mutation and keeps a numeric `count` sibling in step.
/// Leaves `data` untouched on error.
fn apply_list_mutation(
    data: &mut Value,
    list_field: Option<&str>,
    mutation: &ListMutation,
) -> Result<(), CacheError> {
    let field_name = list_field.unwrap_or("").to_string();
    let list = match list_field {
        Some(field) => data.get_mut(field),
        None => Some(&mut *data),
    }
    .and_then(Value::as_array_mut)
    .ok_or(CacheError::NotAList(field_name))?;

    let delta: i64 = match mutation {
        ListMutation::Create { item } => {
            list.push(item.clone());
            1
        }
        ListMutation::Update { id, item } => {
            let existing = list
                .iter_mut()
                .find(|v| item_id(v) == Some(id.as_str()))
                .ok_or_else(|| CacheError::ItemNotFound(id.clone()))?;
            match item {
                Value::Object(patch) if existing.is_object() => {
                    if let Some(target) = existing.as_object_mut() {
                        target.extend(patch.clone());
                    }
                }
                replacement => *existing = replacement.clone(),
            }
            0
        }
        ListMutation::Delete { id } => {
            let pos = list
                .iter()
                .position(|v| item_id(v) == Some(id.as_str()))
                .ok_or_else(|| CacheError::ItemNotFound(id.clone()))?;
            list.remove(pos);
            -1
        }
    };

    if delta != 0 {
        if let Some(count) = data.get_mut("count") {
            if let Some(n) = count.as_i64() {
                *count = Value::from((n + delta).max(0));
            }
        }
    }
    Ok(())
}
