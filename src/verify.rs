//! Course-instructor consistency report.
//!
//! Every course in the catalog names its instructors. Each instructor should
//! be on the faculty (or administration) in the people index for that year.
//! Mismatches are printed with the date correction that would fix them.
//! Nothing is written.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

use serde_json::{Map, Value};

use archive_types::Course;

use crate::merge::{PeopleStore, year_field};
use crate::name::{last_name, surnames_in_list};

/// Academic years the college held classes.
pub const COLLEGE_YEARS: RangeInclusive<i32> = 1933..=1957;

/// Year (as a string key) → courses taught that year.
pub type CourseCatalog = BTreeMap<String, Vec<Course>>;

/// The index entry an instructor's surname resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub name: String,
    pub start: Option<i32>,
    pub end: Option<i32>,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fix {
    EndYear(i32),
    StartYear(i32),
    AddToIndex,
}

/// One instructor string whose courses fall outside their faculty years.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructorIssue {
    pub instructor: String,
    pub years: BTreeSet<i32>,
    pub courses: BTreeSet<String>,
    pub entry: Option<IndexEntry>,
}

impl InstructorIssue {
    pub fn year_range(&self) -> String {
        match (self.years.first(), self.years.last()) {
            (Some(a), Some(b)) if a != b => format!("{a}-{b}"),
            (Some(a), _) => a.to_string(),
            _ => String::new(),
        }
    }

    pub fn fixes(&self) -> Vec<Fix> {
        let Some(entry) = &self.entry else {
            return vec![Fix::AddToIndex];
        };
        let mut fixes = Vec::new();
        if let Some(&last) = self.years.last() {
            if last > entry.end.unwrap_or(0) {
                fixes.push(Fix::EndYear(last));
            }
        }
        if let Some(&first) = self.years.first() {
            if first < entry.start.unwrap_or(9999) {
                fixes.push(Fix::StartYear(first));
            }
        }
        fixes
    }
}

fn role_of(record: &Map<String, Value>) -> String {
    record
        .get("role")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

/// Surnames of people on the faculty or administration in `year`.
fn faculty_surnames(people: &PeopleStore, year: i32) -> BTreeSet<String> {
    people
        .records()
        .iter()
        .filter_map(|(name, record)| {
            let record = record.as_object()?;
            let start = year_field(record, "start_year")?;
            let end = year_field(record, "end_year")?;
            let role = role_of(record).to_lowercase();
            let teaching = role.contains("faculty") || role.contains("admin");
            if teaching && (start..=end).contains(&year) {
                last_name(name)
            } else {
                None
            }
        })
        .collect()
}

/// First index entry carrying this surname, in store order.
fn find_by_surname(people: &PeopleStore, surname: &str) -> Option<IndexEntry> {
    people.records().iter().find_map(|(name, record)| {
        if last_name(name).as_deref() != Some(surname) {
            return None;
        }
        let record = record.as_object()?;
        Some(IndexEntry {
            name: name.clone(),
            start: year_field(record, "start_year"),
            end: year_field(record, "end_year"),
            role: role_of(record),
        })
    })
}

/// Compare every course year in `years` against the index. Issues are keyed
/// by the instructor string as the catalog spells it, sorted by it.
pub fn verify_courses(
    catalog: &CourseCatalog,
    people: &PeopleStore,
    years: RangeInclusive<i32>,
) -> Vec<InstructorIssue> {
    let mut issues: BTreeMap<String, InstructorIssue> = BTreeMap::new();

    for year in years {
        let Some(courses) = catalog.get(&year.to_string()) else {
            continue;
        };
        if courses.is_empty() {
            continue;
        }
        let faculty = faculty_surnames(people, year);

        for course in courses {
            let instructor = course.instructor.trim();
            if instructor.is_empty() {
                continue;
            }
            for surname in surnames_in_list(instructor) {
                if faculty.contains(&surname) {
                    continue;
                }
                let issue = issues
                    .entry(instructor.to_string())
                    .or_insert_with(|| InstructorIssue {
                        instructor: instructor.to_string(),
                        years: BTreeSet::new(),
                        courses: BTreeSet::new(),
                        entry: find_by_surname(people, &surname),
                    });
                issue.years.insert(year);
                let course_name = if course.name.trim().is_empty() {
                    "Unknown"
                } else {
                    course.name.trim()
                };
                issue.courses.insert(course_name.to_string());
            }
        }
    }
    issues.into_values().collect()
}

pub fn print_report(issues: &[InstructorIssue]) {
    let rule = "=".repeat(70);
    println!("{rule}");
    println!("INSTRUCTORS NOT ON THE FACULTY FOR THEIR YEAR");
    println!("{rule}");

    for issue in issues {
        let courses: Vec<&str> = issue.courses.iter().map(String::as_str).collect();
        println!("\n{}", issue.instructor);
        println!("  Teaches: {} ({})", courses.join(", "), issue.year_range());
        if let Some(entry) = &issue.entry {
            let fmt_year = |y: Option<i32>| y.map_or_else(|| "?".to_string(), |y| y.to_string());
            println!("  In people index: {}", entry.name);
            println!("  Current years: {}-{}", fmt_year(entry.start), fmt_year(entry.end));
            println!("  Role: {}", entry.role);
        }
        for fix in issue.fixes() {
            match fix {
                Fix::EndYear(y) => println!("  >>> SUGGESTED FIX: Change end_year to {y}"),
                Fix::StartYear(y) => println!("  >>> SUGGESTED FIX: Change start_year to {y}"),
                Fix::AddToIndex => println!("  >>> NOT FOUND IN PEOPLE INDEX - needs to be added"),
            }
        }
    }

    let missing = issues.iter().filter(|i| i.entry.is_none()).count();
    println!("\n{rule}");
    println!("Total instructors with issues: {}", issues.len());
    println!("  - Need date correction: {}", issues.len() - missing);
    println!("  - Need to be added to index: {missing}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn people() -> PeopleStore {
        match json!({
            "Josef Albers": {"role": "Faculty", "start_year": 1933, "end_year": 1949},
            "Anni Albers": {"role": "Faculty", "start_year": 1933, "end_year": 1949},
            "Charles Olson": {"role": "Faculty", "start_year": 1951, "end_year": 1956},
            "Theodore Dreier": {"role": "Administration", "start_year": 1933, "end_year": 1949},
            "Ruth Asawa": {"role": "Student", "start_year": 1946, "end_year": 1949}
        }) {
            Value::Object(m) => PeopleStore::new(m),
            _ => unreachable!(),
        }
    }

    fn catalog(value: Value) -> CourseCatalog {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_consistent_catalog_has_no_issues() {
        let c = catalog(json!({
            "1940": [
                {"name": "Color", "instructor": "Josef Albers"},
                {"name": "Weaving", "instructor": "Anni Albers, Josef Albers"},
                {"name": "Physics", "instructor": "Theodore Dreier"}
            ]
        }));
        assert!(verify_courses(&c, &people(), COLLEGE_YEARS).is_empty());
    }

    #[test]
    fn test_end_year_fix_suggested() {
        let c = catalog(json!({
            "1956": [{"name": "Writing", "instructor": "Charles Olson"}],
            "1957": [{"name": "Writing", "instructor": "Charles Olson"}]
        }));
        let issues = verify_courses(&c, &people(), COLLEGE_YEARS);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].years, BTreeSet::from([1957]));
        assert_eq!(issues[0].fixes(), vec![Fix::EndYear(1957)]);
        assert_eq!(issues[0].entry.as_ref().unwrap().name, "Charles Olson");
    }

    #[test]
    fn test_student_teaching_gets_start_fix() {
        let c = catalog(json!({
            "1945": [{"name": "Drawing", "instructor": "Ruth Asawa"}],
            "1947": [{"name": "Drawing", "instructor": "Ruth Asawa"}]
        }));
        let issues = verify_courses(&c, &people(), COLLEGE_YEARS);
        assert_eq!(issues[0].year_range(), "1945-1947");
        assert_eq!(issues[0].courses.len(), 1);
        // listed as a student 1946-49: only the start needs moving
        assert_eq!(issues[0].fixes(), vec![Fix::StartYear(1945)]);
    }

    #[test]
    fn test_unknown_instructor() {
        let c = catalog(json!({
            "1952": [{"name": "Pottery", "instructor": "Karen Karnes, Jr."}]
        }));
        let issues = verify_courses(&c, &people(), COLLEGE_YEARS);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].entry.is_none());
        assert_eq!(issues[0].fixes(), vec![Fix::AddToIndex]);
    }

    #[test]
    fn test_years_outside_window_ignored() {
        let c = catalog(json!({
            "1960": [{"name": "Ghost", "instructor": "Nobody Here"}]
        }));
        assert!(verify_courses(&c, &people(), COLLEGE_YEARS).is_empty());
    }
}
