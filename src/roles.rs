//! Summer-institute role qualification.
//!
//! Many visitors only came for the summer sessions (1944–1953). Their index
//! roles say "Faculty" or "Student" like the regular term's; this pass
//! rewrites them to "Summer Faculty", "Summer Student", etc.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ArchiveError, Result};
use crate::merge::{PeopleStore, year_field};
use crate::name::names_match;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummerRules {
    /// People who came for several summers; always qualified
    pub known_faculty: Vec<String>,
    /// Window for single-year faculty appointments
    pub first_year: i32,
    pub last_year: i32,
    /// Case-insensitive bio phrases marking a summer-only stay
    pub bio_patterns: Vec<String>,
}

impl Default for SummerRules {
    fn default() -> Self {
        Self {
            known_faculty: [
                "John Cage",
                "Merce Cunningham",
                "R. Buckminster Fuller",
                "Buckminster Fuller",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            first_year: 1944,
            last_year: 1953,
            bio_patterns: [
                r"Summer Art Institute",
                r"Summer Music Institute",
                r"Summer Institute",
                r"for the summer of \d{4}",
                r"for the \d{4} Summer",
                r"student for the Summer",
                r"was guest for the Summer",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl SummerRules {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.first_year > self.last_year {
            return Err(format!(
                "summer window starts after it ends ({} > {})",
                self.first_year, self.last_year
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummerReason {
    KnownFaculty,
    SingleYearFaculty,
    BioMention,
}

impl SummerReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KnownFaculty => "known summer faculty",
            Self::SingleYearFaculty => "single-year faculty in summer window",
            Self::BioMention => "bio mentions summer session",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleChange {
    pub name: String,
    pub old_role: String,
    pub new_role: String,
    pub year: Option<i32>,
    pub reason: SummerReason,
}

/// Qualified form of a plain role.
pub fn summer_role(role: &str) -> &'static str {
    let role = role.to_lowercase();
    if role.contains("faculty") {
        "Summer Faculty"
    } else if role.contains("student") {
        "Summer Student"
    } else if role.contains("staff") {
        "Summer Staff"
    } else {
        "Summer Guest"
    }
}

fn is_qualified(role: &str) -> bool {
    role.trim_start().to_lowercase().starts_with("summer ")
}

pub struct SummerQualifier {
    known: Vec<String>,
    first_year: i32,
    last_year: i32,
    bio: Option<Regex>,
}

impl SummerQualifier {
    pub fn new(rules: &SummerRules) -> Result<Self> {
        let bio = if rules.bio_patterns.is_empty() {
            None
        } else {
            let pattern = format!("(?i){}", rules.bio_patterns.join("|"));
            Some(Regex::new(&pattern).map_err(|source| ArchiveError::Pattern {
                pattern: pattern.clone(),
                source,
            })?)
        };
        Ok(Self {
            known: rules.known_faculty.clone(),
            first_year: rules.first_year,
            last_year: rules.last_year,
            bio,
        })
    }

    /// Why this record should get a summer role, if it should.
    pub fn reason(&self, name: &str, record: &Map<String, Value>) -> Option<SummerReason> {
        let role = record.get("role").and_then(Value::as_str).unwrap_or("");
        if is_qualified(role) {
            return None;
        }
        if self.known.iter().any(|k| names_match(name, k)) {
            return Some(SummerReason::KnownFaculty);
        }

        let start = year_field(record, "start_year")?;
        let end = year_field(record, "end_year")?;
        if start != end {
            return None;
        }
        if role.to_lowercase().contains("faculty")
            && (self.first_year..=self.last_year).contains(&start)
        {
            return Some(SummerReason::SingleYearFaculty);
        }
        let bio = record.get("bio").and_then(Value::as_str).unwrap_or("");
        match &self.bio {
            Some(re) if start >= self.first_year && re.is_match(bio) => {
                Some(SummerReason::BioMention)
            }
            _ => None,
        }
    }

    /// Rewrite roles in place and list what changed, in store order.
    pub fn qualify_all(&self, people: &mut PeopleStore) -> Vec<RoleChange> {
        let mut changes = Vec::new();
        for (name, record) in people.records_mut().iter_mut() {
            let Some(record) = record.as_object_mut() else {
                continue;
            };
            let Some(reason) = self.reason(name, record) else {
                continue;
            };
            let old_role = record
                .get("role")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            let new_role = summer_role(&old_role);
            debug!(name = %name, from = %old_role, to = new_role, reason = reason.as_str(), "role qualified");
            record.insert("role".to_string(), Value::String(new_role.to_string()));
            changes.push(RoleChange {
                name: name.clone(),
                old_role,
                new_role: new_role.to_string(),
                year: year_field(record, "start_year"),
                reason,
            });
        }
        changes
    }
}

/// Per start year: faculty names listed, students and others counted.
pub fn print_by_year(changes: &[RoleChange]) {
    println!("{} role(s) qualified as summer roles", changes.len());

    let mut by_year: BTreeMap<Option<i32>, Vec<&RoleChange>> = BTreeMap::new();
    for c in changes {
        by_year.entry(c.year).or_default().push(c);
    }
    for (year, group) in by_year {
        let label = year.map_or_else(|| "unknown year".to_string(), |y| y.to_string());
        println!("\n=== {label} ({} total) ===", group.len());

        let mut faculty: Vec<&str> = group
            .iter()
            .filter(|c| c.new_role == "Summer Faculty")
            .map(|c| c.name.as_str())
            .collect();
        faculty.sort_unstable();
        if !faculty.is_empty() {
            println!("  Faculty ({}):", faculty.len());
            for name in faculty.iter().take(20) {
                println!("    - {name}");
            }
            if faculty.len() > 20 {
                println!("    ... and {} more", faculty.len() - 20);
            }
        }
        let students = group.iter().filter(|c| c.new_role == "Summer Student").count();
        if students > 0 {
            println!("  Students: {students}");
        }
        let other = group.len() - faculty.len() - students;
        if other > 0 {
            println!("  Other: {other}");
        }
    }
}
