//! Merging person records into the canonical people index.
//!
//! The index is a JSON object keyed by display name. Incoming records find
//! their canonical entry through the name matcher, fill fields that are still
//! empty and report every disagreement instead of overwriting it. Only a
//! source of strictly higher authority replaces an existing value.

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use archive_types::IncomingPerson;

use crate::name::{names_match, normalize};
use crate::report::{Conflict, MergeOutcome, MergeReport, Resolution, SkipReason};

/// Fields whose values are unioned rather than compared.
pub const LIST_FIELDS: [&str; 3] = ["periods", "notes", "variants"];
pub const AUTHORITY_FIELD: &str = "authority";

// ── Authority ────────────────────────────────────────────────────────────

/// How far a source is trusted. Later variants outrank earlier ones.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Authority {
    /// Book extractions and other secondhand accounts
    Secondary,
    Scraped,
    /// Hand-maintained fact tables
    Curated,
    /// Checked against primary documents
    Verified,
}

impl Authority {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "secondary" => Some(Self::Secondary),
            "scraped" => Some(Self::Scraped),
            "curated" => Some(Self::Curated),
            "verified" => Some(Self::Verified),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Secondary => "secondary",
            Self::Scraped => "scraped",
            Self::Curated => "curated",
            Self::Verified => "verified",
        }
    }
}

/// Where a batch came from, for conflict reports and override decisions.
#[derive(Debug, Clone)]
pub struct BatchSource {
    pub label: String,
    pub authority: Authority,
}

impl BatchSource {
    pub fn new(label: impl Into<String>, authority: Authority) -> Self {
        Self {
            label: label.into(),
            authority,
        }
    }
}

// ── Value helpers ────────────────────────────────────────────────────────

/// Missing-equivalent: null, blank string, empty list or object.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Equal, or the same scalar written differently (`1940` vs `"1940"`).
pub fn same_value(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (scalar_text(a), scalar_text(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// A year stored as a number or a numeric string.
pub fn year_field(record: &Map<String, Value>, key: &str) -> Option<i32> {
    match record.get(key)? {
        Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Append the items of `incoming` that `record[field]` lacks, in place so the
/// record's key order is untouched. Returns whether anything was added.
pub fn union_into(record: &mut Map<String, Value>, field: &str, incoming: Value) -> bool {
    let items = match incoming {
        Value::Array(items) => items,
        other => vec![other],
    };
    let mut fresh: Vec<Value> = Vec::new();
    for item in items {
        if !is_empty(&item) && !fresh.iter().any(|f| same_value(f, &item)) {
            fresh.push(item);
        }
    }

    if !record.get(field).is_some_and(|v| !is_empty(v)) {
        if fresh.is_empty() {
            return false;
        }
        record.insert(field.to_string(), Value::Array(fresh));
        return true;
    }
    let Some(existing) = record.get_mut(field) else {
        return false;
    };

    if let Value::Array(current) = existing {
        let before = current.len();
        for item in fresh {
            if !current.iter().any(|c| same_value(c, &item)) {
                current.push(item);
            }
        }
        return current.len() > before;
    }

    // a lone scalar becomes a list only when something joins it
    fresh.retain(|item| !same_value(existing, item));
    if fresh.is_empty() {
        return false;
    }
    let mut list = vec![existing.take()];
    list.extend(fresh);
    *existing = Value::Array(list);
    true
}

fn variants(record: &Value) -> impl Iterator<Item = &str> {
    record
        .get("variants")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

// ── People store ─────────────────────────────────────────────────────────

/// Result of resolving a name against the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Normalized form equals the key or a recorded variant
    Exact(String),
    /// The only entry the relaxed matcher accepts
    Relaxed(String),
    Ambiguous(Vec<String>),
    Missing,
}

#[derive(Debug, Clone, Default)]
pub struct PeopleStore {
    records: Map<String, Value>,
}

impl PeopleStore {
    pub fn new(records: Map<String, Value>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &Map<String, Value> {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Exact normalized match on key or variants first, then the relaxed matcher.
    pub fn lookup(&self, name: &str) -> Lookup {
        let wanted = normalize(name);
        if wanted.is_empty() {
            return Lookup::Missing;
        }

        for (key, record) in &self.records {
            if normalize(key) == wanted || variants(record).any(|v| normalize(v) == wanted) {
                return Lookup::Exact(key.clone());
            }
        }

        let candidates: Vec<String> = self
            .records
            .iter()
            .filter(|(key, record)| {
                names_match(name, key) || variants(record).any(|v| names_match(name, v))
            })
            .map(|(key, _)| key.clone())
            .collect();

        match candidates.len() {
            0 => Lookup::Missing,
            1 => Lookup::Relaxed(candidates.into_iter().next().unwrap_or_default()),
            _ => Lookup::Ambiguous(candidates),
        }
    }

    /// Canonical key for a name when it resolves to exactly one entry.
    pub fn resolve(&self, name: &str) -> Option<String> {
        match self.lookup(name) {
            Lookup::Exact(key) | Lookup::Relaxed(key) => Some(key),
            Lookup::Ambiguous(_) | Lookup::Missing => None,
        }
    }

    /// Fold one incoming person into the index.
    pub fn merge_person(
        &mut self,
        incoming: &IncomingPerson,
        source: &BatchSource,
        report: &mut MergeReport,
    ) -> MergeOutcome {
        let outcome = self.merge_inner(incoming, source, report);
        report.record(outcome);
        outcome
    }

    fn merge_inner(
        &mut self,
        incoming: &IncomingPerson,
        source: &BatchSource,
        report: &mut MergeReport,
    ) -> MergeOutcome {
        let name = incoming.name.trim();
        if name.is_empty() {
            return MergeOutcome::Skipped(SkipReason::NoName);
        }

        let mut fields = match serde_json::to_value(incoming) {
            Ok(Value::Object(map)) => map,
            _ => return MergeOutcome::Skipped(SkipReason::Malformed),
        };
        fields.remove("name");
        let authority = fields
            .remove(AUTHORITY_FIELD)
            .as_ref()
            .and_then(Value::as_str)
            .and_then(Authority::from_name)
            .unwrap_or(source.authority);
        fields.retain(|_, v| !is_empty(v));

        match self.lookup(name) {
            Lookup::Missing => {
                debug!(name, "new person");
                fields.insert(AUTHORITY_FIELD.to_string(), json!(authority.as_str()));
                self.records.insert(name.to_string(), Value::Object(fields));
                MergeOutcome::Added
            }
            Lookup::Ambiguous(candidates) => {
                report.conflict(Conflict {
                    record: name.to_string(),
                    field: "name".to_string(),
                    existing: json!(candidates),
                    incoming: json!(name),
                    source: source.label.clone(),
                    resolution: Resolution::Ambiguous,
                });
                MergeOutcome::Skipped(SkipReason::Ambiguous)
            }
            Lookup::Exact(key) | Lookup::Relaxed(key) => {
                self.update(&key, name, fields, authority, &source.label, report)
            }
        }
    }

    fn update(
        &mut self,
        key: &str,
        name: &str,
        fields: Map<String, Value>,
        authority: Authority,
        source_label: &str,
        report: &mut MergeReport,
    ) -> MergeOutcome {
        let Some(Value::Object(record)) = self.records.get_mut(key) else {
            warn!(key, "index entry is not an object, leaving it alone");
            return MergeOutcome::Skipped(SkipReason::Malformed);
        };

        let record_authority = record
            .get(AUTHORITY_FIELD)
            .and_then(Value::as_str)
            .and_then(Authority::from_name)
            .unwrap_or(Authority::Curated);
        let overrides = authority > record_authority;

        let mut changed = false;
        let mut overridden = false;
        let mut conflicts = 0;

        if name != key && !record_has_variant(record, name) {
            changed |= union_into(record, "variants", json!([name]));
        }

        for (field, value) in fields {
            if LIST_FIELDS.contains(&field.as_str()) {
                changed |= union_into(record, &field, value);
                continue;
            }

            match record.get(&field) {
                Some(existing) if !is_empty(existing) => {
                    if same_value(existing, &value) {
                        continue;
                    }
                    conflicts += 1;
                    report.conflict(Conflict {
                        record: key.to_string(),
                        field: field.clone(),
                        existing: existing.clone(),
                        incoming: value.clone(),
                        source: source_label.to_string(),
                        resolution: if overrides {
                            Resolution::Overridden
                        } else {
                            Resolution::Kept
                        },
                    });
                    if overrides {
                        record.insert(field, value);
                        overridden = true;
                    }
                }
                _ => {
                    record.insert(field, value);
                    changed = true;
                }
            }
        }

        if overridden {
            record.insert(AUTHORITY_FIELD.to_string(), json!(authority.as_str()));
            changed = true;
        }

        if changed {
            MergeOutcome::Updated { conflicts }
        } else {
            MergeOutcome::Unchanged { conflicts }
        }
    }
}

fn record_has_variant(record: &Map<String, Value>, name: &str) -> bool {
    record
        .get("variants")
        .and_then(Value::as_array)
        .is_some_and(|vs| vs.iter().any(|v| v.as_str() == Some(name)))
}
