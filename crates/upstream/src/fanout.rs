//! Settle-all fan-out over a fixed set of upstream sources.

use crate::client::AnalyticsSource;
use crate::source::{Source, SourceRequest};
use futures::future::join_all;
use serde_json::{Map, Value};
use tracing::{debug, info};

/// Per-source results of one fan-out, in request order.
#[derive(Debug, Clone, Default)]
pub struct SnapshotSet {
    entries: Vec<(Source, Option<Value>)>,
}

impl SnapshotSet {
    pub fn new(entries: Vec<(Source, Option<Value>)>) -> Self {
        Self { entries }
    }

    /// A set where every listed source is absent.
    pub fn empty(sources: &[Source]) -> Self {
        Self::new(sources.iter().map(|s| (*s, None)).collect())
    }

    pub fn with(mut self, source: Source, data: Value) -> Self {
        match self.entries.iter_mut().find(|(s, _)| *s == source) {
            Some(entry) => entry.1 = Some(data),
            None => self.entries.push((source, Some(data))),
        }
        self
    }

    pub fn get(&self, source: Source) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(s, _)| *s == source)
            .and_then(|(_, v)| v.as_ref())
    }

    pub fn available(&self) -> usize {
        self.entries.iter().filter(|(_, v)| v.is_some()).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sources(&self) -> impl Iterator<Item = Source> + '_ {
        self.entries.iter().map(|(s, _)| *s)
    }

    /// JSON object keyed by source, `null` for absent sources.
    pub fn to_raw_bag(&self) -> Value {
        let mut bag = Map::new();
        for (source, data) in &self.entries {
            bag.insert(source.key().to_string(), data.clone().unwrap_or(Value::Null));
        }
        Value::Object(bag)
    }
}

/// Extract the `data` member of a `{ success, data }` envelope.
pub fn envelope_data(body: Value) -> Option<Value> {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Null) | None => None,
            Some(data) => Some(data),
        },
        _ => None,
    }
}

/// Issue every request concurrently and wait for all of them to settle.
///
/// Slot `i` of the result corresponds to `requests[i]`. A failed request
/// only empties its own slot.
pub async fn settle_all(
    source: &dyn AnalyticsSource,
    clinic_id: i64,
    auth_token: Option<&str>,
    requests: &[SourceRequest],
) -> SnapshotSet {
    let pending = requests
        .iter()
        .map(|r| source.fetch(&r.path, clinic_id, auth_token));
    let settled = join_all(pending).await;

    let entries: Vec<(Source, Option<Value>)> = requests
        .iter()
        .zip(settled)
        .map(|(request, body)| {
            let key = request.source.key();
            metrics::counter!("upstream.requests", "source" => key).increment(1);
            let data = body.and_then(envelope_data);
            if data.is_none() {
                metrics::counter!("upstream.failures", "source" => key).increment(1);
                debug!(source = key, clinic_id, "Source unavailable, treating as absent");
            }
            (request.source, data)
        })
        .collect();

    let set = SnapshotSet::new(entries);
    info!(
        clinic_id,
        requested = set.len(),
        available = set.available(),
        "Upstream fan-out settled"
    );
    set
}
