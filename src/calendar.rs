//! The archive calendar: dated events grouped by year and day.
//!
//! ```text
//! { "daily_calendar": { "1933": { "1933-09-25": { "bmc_events": [...],
//!                                                 "world_events": [...] } } },
//!   "metadata": { "<source>_integration": {...} } }
//! ```
//!
//! Events within one day and group are deduplicated by `source_id` when both
//! sides carry one, otherwise by their normalized `event` text.

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::date::BucketDate;
use crate::error::{ArchiveError, Result};
use crate::merge::is_empty;
use crate::report::{MergeOutcome, MergeReport, MergeStats, SkipReason};

pub const CALENDAR: &str = "daily_calendar";
pub const METADATA: &str = "metadata";
/// Groups every new day entry starts with.
pub const DEFAULT_GROUPS: [&str; 2] = ["bmc_events", "world_events"];
pub const TITLE_FIELD: &str = "event";

/// Lowercased, whitespace-collapsed event text used for duplicate detection.
pub fn title_key(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn source_id(event: &Map<String, Value>) -> Option<&str> {
    event
        .get("source_id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn same_event(existing: &Map<String, Value>, incoming: &Map<String, Value>) -> bool {
    if let (Some(a), Some(b)) = (source_id(existing), source_id(incoming)) {
        return a == b;
    }
    let title = |e: &Map<String, Value>| {
        e.get(TITLE_FIELD)
            .and_then(Value::as_str)
            .map(title_key)
            .unwrap_or_default()
    };
    let t = title(incoming);
    !t.is_empty() && title(existing) == t
}

#[derive(Debug, Clone, Default)]
pub struct Archive {
    doc: Map<String, Value>,
}

impl Archive {
    pub fn new(doc: Map<String, Value>) -> Self {
        Self { doc }
    }

    pub fn document(&self) -> &Map<String, Value> {
        &self.doc
    }

    /// Events stored under one day and group.
    #[cfg(test)]
    pub fn events(&self, day: &str, group: &str) -> &[Value] {
        let year = day.get(..4).unwrap_or_default();
        self.doc
            .get(CALENDAR)
            .and_then(|c| c.get(year))
            .and_then(|y| y.get(day))
            .and_then(|d| d.get(group))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of stored events across all days and groups.
    pub fn event_count(&self) -> usize {
        let Some(Value::Object(years)) = self.doc.get(CALENDAR) else {
            return 0;
        };
        years
            .values()
            .filter_map(Value::as_object)
            .flat_map(|days| days.values())
            .filter_map(Value::as_object)
            .flat_map(|groups| groups.values())
            .filter_map(Value::as_array)
            .map(Vec::len)
            .sum()
    }

    /// Add `event` under its day and group, or fill the empty fields of the
    /// matching event already there.
    pub fn merge_event(
        &mut self,
        date: &BucketDate,
        group: &str,
        event: Map<String, Value>,
        report: &mut MergeReport,
    ) -> Result<MergeOutcome> {
        let outcome = self.merge_inner(date, group, event)?;
        report.record(outcome);
        Ok(outcome)
    }

    fn merge_inner(
        &mut self,
        date: &BucketDate,
        group: &str,
        mut event: Map<String, Value>,
    ) -> Result<MergeOutcome> {
        let has_title = event
            .get(TITLE_FIELD)
            .and_then(Value::as_str)
            .is_some_and(|t| !t.trim().is_empty());
        if !has_title {
            return Ok(MergeOutcome::Skipped(SkipReason::NoTitle));
        }
        event.retain(|_, v| !is_empty(v));

        let day = date.bucket_key();
        let list = self.group_list(&day, group)?;

        for existing in list.iter_mut() {
            let Value::Object(existing) = existing else {
                continue;
            };
            if !same_event(existing, &event) {
                continue;
            }
            let mut changed = false;
            for (field, value) in event {
                match existing.get(&field) {
                    Some(v) if !is_empty(v) => {}
                    _ => {
                        existing.insert(field, value);
                        changed = true;
                    }
                }
            }
            return Ok(if changed {
                MergeOutcome::Updated { conflicts: 0 }
            } else {
                MergeOutcome::Unchanged { conflicts: 0 }
            });
        }

        debug!(day = %day, group, "new event");
        list.push(Value::Object(event));
        Ok(MergeOutcome::Added)
    }

    /// The event list for `day`/`group`, created on first use.
    fn group_list(&mut self, day: &str, group: &str) -> Result<&mut Vec<Value>> {
        let year = day.get(..4).unwrap_or_default().to_string();
        let shape = |what: &str| ArchiveError::Layout(format!("archive {what} is not a JSON object"));

        let calendar = object_entry(&mut self.doc, CALENDAR).ok_or_else(|| shape(CALENDAR))?;
        let days = object_entry(calendar, &year).ok_or_else(|| shape(&format!("year {year}")))?;
        if !days.contains_key(day) {
            let mut groups = Map::new();
            for g in DEFAULT_GROUPS {
                groups.insert(g.to_string(), json!([]));
            }
            days.insert(day.to_string(), Value::Object(groups));
        }
        let groups = object_entry(days, day).ok_or_else(|| shape(&format!("day {day}")))?;
        let list = groups
            .entry(group.to_string())
            .or_insert_with(|| json!([]));
        if list.is_null() {
            *list = json!([]);
        }
        list.as_array_mut()
            .ok_or_else(|| shape(&format!("group {group} on {day}")))
    }

    /// Record an integration stamp under `metadata.<source>_integration`.
    ///
    /// Only call this when the run changed the calendar; stamping a no-op run
    /// would make the file differ on every re-run.
    pub fn stamp_integration(&mut self, source: &str, citation: &str, stats: &MergeStats) {
        if !stats.changed() {
            return;
        }
        let meta = self
            .doc
            .entry(METADATA.to_string())
            .or_insert_with(|| json!({}));
        if !meta.is_object() {
            *meta = json!({});
        }
        if let Some(meta) = meta.as_object_mut() {
            meta.insert(
                format!("{source}_integration"),
                json!({
                    "integrated_at": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                    "events_added": stats.added,
                    "events_updated": stats.updated,
                    "source": citation,
                }),
            );
        }
    }
}

/// `parent[key]` as an object, inserting `{}` when absent or null. `None`
/// when the slot holds some other kind of value.
fn object_entry<'a>(parent: &'a mut Map<String, Value>, key: &str) -> Option<&'a mut Map<String, Value>> {
    let slot = parent
        .entry(key.to_string())
        .or_insert_with(|| json!({}));
    if slot.is_null() {
        *slot = json!({});
    }
    slot.as_object_mut()
}
