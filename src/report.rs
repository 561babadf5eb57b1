//! Merge bookkeeping: running totals, the conflict review list and the
//! console summary printed at the end of a run.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::Result;
use crate::store;

/// Why a record was left out of a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoName,
    NoTitle,
    NoDate,
    /// Several canonical records matched loosely and none exactly
    Ambiguous,
    /// The stored entry is not a JSON object
    Malformed,
    /// Source marked the item as failed (e.g. a scrape error)
    SourceError,
    /// Dated outside the years the archive covers
    OutOfEra,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoName => "no name",
            Self::NoTitle => "no title",
            Self::NoDate => "no parseable date",
            Self::Ambiguous => "ambiguous name",
            Self::Malformed => "malformed record",
            Self::SourceError => "source error",
            Self::OutOfEra => "outside the archive era",
        }
    }
}

/// Result of merging one incoming record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Added,
    /// At least one field filled, unioned or overridden
    Updated { conflicts: usize },
    Unchanged { conflicts: usize },
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    /// Records with at least one conflicting field
    pub conflicted: usize,
}

impl MergeStats {
    pub fn record(&mut self, outcome: MergeOutcome) {
        match outcome {
            MergeOutcome::Added => self.added += 1,
            MergeOutcome::Updated { conflicts } => {
                self.updated += 1;
                if conflicts > 0 {
                    self.conflicted += 1;
                }
            }
            MergeOutcome::Unchanged { conflicts } => {
                self.unchanged += 1;
                if conflicts > 0 {
                    self.conflicted += 1;
                }
            }
            MergeOutcome::Skipped(_) => self.skipped += 1,
        }
    }

    /// Whether the store differs from what was loaded.
    pub fn changed(&self) -> bool {
        self.added + self.updated > 0
    }

    pub fn total(&self) -> usize {
        self.added + self.updated + self.unchanged + self.skipped
    }
}

impl fmt::Display for MergeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "added {}, updated {}, unchanged {}, skipped {}, conflicted {}",
            self.added, self.updated, self.unchanged, self.skipped, self.conflicted
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Existing value retained
    Kept,
    /// A more authoritative source replaced the existing value
    Overridden,
    /// The incoming record was not merged; candidates listed in `existing`
    Ambiguous,
}

/// A disagreement between sources, written out for manual review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conflict {
    pub record: String,
    pub field: String,
    pub existing: Value,
    pub incoming: Value,
    pub source: String,
    pub resolution: Resolution,
}

#[derive(Debug, Default)]
pub struct MergeReport {
    pub stats: MergeStats,
    pub conflicts: Vec<Conflict>,
    /// Skip counts per reason, in first-seen order
    pub skips: Vec<(SkipReason, usize)>,
}

impl MergeReport {
    pub fn record(&mut self, outcome: MergeOutcome) {
        self.stats.record(outcome);
        if let MergeOutcome::Skipped(reason) = outcome {
            match self.skips.iter_mut().find(|(r, _)| *r == reason) {
                Some((_, n)) => *n += 1,
                None => self.skips.push((reason, 1)),
            }
        }
    }

    pub fn conflict(&mut self, conflict: Conflict) {
        warn!(
            record = %conflict.record,
            field = %conflict.field,
            resolution = ?conflict.resolution,
            "conflicting values"
        );
        self.conflicts.push(conflict);
    }

    /// Write the review list beside the store. Nothing is written when the
    /// run produced no conflicts.
    pub fn write_conflicts(&self, store_path: &Path) -> Result<()> {
        if self.conflicts.is_empty() {
            return Ok(());
        }
        let path = store::sidecar(store_path, "conflicts");
        store::save_json(&path, &self.conflicts)?;
        info!(path = %path.display(), count = self.conflicts.len(), "conflicts written for review");
        Ok(())
    }

    pub fn print_summary(&self, label: &str) {
        println!("{label}: {} record(s): {}", self.stats.total(), self.stats);
        for (reason, n) in &self.skips {
            println!("  {n:>4} skipped: {}", reason.as_str());
        }
        let mut by_field: Vec<(&str, usize)> = Vec::new();
        for c in &self.conflicts {
            match by_field.iter_mut().find(|(f, _)| *f == c.field) {
                Some((_, n)) => *n += 1,
                None => by_field.push((c.field.as_str(), 1)),
            }
        }
        for (field, n) in by_field {
            println!("  {n:>4} conflict(s) on {field}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stats_counting() {
        let mut s = MergeStats::default();
        s.record(MergeOutcome::Added);
        s.record(MergeOutcome::Updated { conflicts: 0 });
        s.record(MergeOutcome::Updated { conflicts: 2 });
        s.record(MergeOutcome::Unchanged { conflicts: 1 });
        s.record(MergeOutcome::Skipped(SkipReason::NoDate));
        assert_eq!(
            s,
            MergeStats {
                added: 1,
                updated: 2,
                unchanged: 1,
                skipped: 1,
                conflicted: 2,
            }
        );
        assert!(s.changed());
        assert_eq!(s.total(), 5);
    }

    #[test]
    fn test_unchanged_run_is_not_a_change() {
        let mut s = MergeStats::default();
        s.record(MergeOutcome::Unchanged { conflicts: 0 });
        s.record(MergeOutcome::Skipped(SkipReason::NoName));
        assert!(!s.changed());
    }

    #[test]
    fn test_skip_reasons_tallied() {
        let mut report = MergeReport::default();
        report.record(MergeOutcome::Skipped(SkipReason::NoDate));
        report.record(MergeOutcome::Added);
        report.record(MergeOutcome::Skipped(SkipReason::SourceError));
        report.record(MergeOutcome::Skipped(SkipReason::NoDate));
        assert_eq!(
            report.skips,
            vec![(SkipReason::NoDate, 2), (SkipReason::SourceError, 1)]
        );
        assert_eq!(report.stats.skipped, 3);
    }

    #[test]
    fn test_conflict_file_only_when_needed() {
        let dir = tempfile::tempdir().unwrap();
        let store_path = dir.path().join("people.json");

        let mut report = MergeReport::default();
        report.write_conflicts(&store_path).unwrap();
        assert!(!dir.path().join("people.conflicts.json").exists());

        report.conflict(Conflict {
            record: "Jane Doe".into(),
            field: "bio".into(),
            existing: json!("Painter."),
            incoming: json!("Weaver."),
            source: "test".into(),
            resolution: Resolution::Kept,
        });
        report.write_conflicts(&store_path).unwrap();
        let written: Value = crate::store::read_json(&dir.path().join("people.conflicts.json")).unwrap();
        assert_eq!(written[0]["resolution"], "kept");
        assert_eq!(written[0]["existing"], "Painter.");
    }
}
