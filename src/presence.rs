//! Who was at the college in a given month, and what was taught that term.
//!
//! Presence comes from the people index's `start_year`/`end_year`. A record
//! with no end year counts for its start year only. Courses come from each
//! person's `courses` list or, failing that, the `courses_raw` transcript
//! line ("Fall 1935: Music with Evarts, Drawing with Albers / Spring 1936: ...").

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::merge::{PeopleStore, year_field};

const BIO_LIMIT: usize = 200;

// ── Semester ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Semester {
    Spring,
    Summer,
    Fall,
}

impl Semester {
    /// September onward is fall, June onward summer, the rest spring.
    pub fn from_month(month: u32) -> Self {
        if month >= 9 {
            Self::Fall
        } else if month >= 6 {
            Self::Summer
        } else {
            Self::Spring
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "spring" => Some(Self::Spring),
            "summer" => Some(Self::Summer),
            "fall" | "autumn" => Some(Self::Fall),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Fall => "fall",
        }
    }
}

// ── People present ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresentPerson {
    pub name: String,
    pub focus: String,
    /// First 200 characters
    pub bio: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Presence {
    pub year: i32,
    pub month: u32,
    pub semester: Semester,
    pub faculty: Vec<PresentPerson>,
    pub students: Vec<PresentPerson>,
    pub staff: Vec<PresentPerson>,
    pub guests: Vec<PresentPerson>,
}

impl Presence {
    pub fn total(&self) -> usize {
        self.faculty.len() + self.students.len() + self.staff.len() + self.guests.len()
    }
}

fn text_field(record: &Map<String, Value>, key: &str) -> String {
    record
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string()
}

/// Everyone whose stay covers `year`, grouped by role. People whose role is
/// none of faculty, student, staff or guest are left out.
pub fn present_at(people: &PeopleStore, year: i32, month: u32) -> Presence {
    let mut presence = Presence {
        year,
        month,
        semester: Semester::from_month(month),
        faculty: Vec::new(),
        students: Vec::new(),
        staff: Vec::new(),
        guests: Vec::new(),
    };

    for (name, record) in people.records() {
        let Some(record) = record.as_object() else {
            continue;
        };
        let Some(start) = year_field(record, "start_year") else {
            continue;
        };
        let end = year_field(record, "end_year").unwrap_or(start);
        if !(start..=end).contains(&year) {
            continue;
        }

        let role = text_field(record, "role").to_lowercase();
        let bucket = if role.contains("faculty") || role.contains("professor") {
            &mut presence.faculty
        } else if role.contains("student") {
            &mut presence.students
        } else if role.contains("staff") {
            &mut presence.staff
        } else if role.contains("guest") {
            &mut presence.guests
        } else {
            continue;
        };
        bucket.push(PresentPerson {
            name: name.clone(),
            focus: text_field(record, "focus"),
            bio: text_field(record, "bio").chars().take(BIO_LIMIT).collect(),
        });
    }
    presence
}

// ── Courses ──────────────────────────────────────────────────────────────

/// One course a person took (or taught) in one term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseTaken {
    pub course: String,
    pub instructor: Option<String>,
    pub semester: Semester,
    pub year: i32,
}

static RE_TERM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(fall|spring|summer)\s+([0-9]{4})(?:-[0-9]{2,4})?[:\s]+([^/]+)").unwrap()
});
static RE_WITH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(.+?)\s+with\s+(\w+)").unwrap());

/// Split a transcript line into courses. A range like `1943-44` counts as
/// its first year.
pub fn parse_courses(raw: &str) -> Vec<CourseTaken> {
    let mut out = Vec::new();
    for caps in RE_TERM.captures_iter(raw) {
        let Some(semester) = Semester::from_name(&caps[1]) else {
            continue;
        };
        let Ok(year) = caps[2].parse() else {
            continue;
        };
        for item in caps[3].split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (course, instructor) = match RE_WITH.captures(item) {
                Some(w) => (w[1].trim().to_string(), Some(w[2].to_string())),
                None => (item.to_string(), None),
            };
            out.push(CourseTaken {
                course,
                instructor,
                semester,
                year,
            });
        }
    }
    out
}

fn structured_course(value: &Value) -> Option<CourseTaken> {
    let c = value.as_object()?;
    Some(CourseTaken {
        course: text_field(c, "course"),
        instructor: Some(text_field(c, "teacher")).filter(|t| !t.is_empty()),
        semester: Semester::from_name(c.get("semester")?.as_str()?)?,
        year: year_field(c, "year")?,
    })
}

fn courses_of(record: &Map<String, Value>) -> Vec<CourseTaken> {
    match record.get("courses").and_then(Value::as_array) {
        Some(list) => list.iter().filter_map(structured_course).collect(),
        None => parse_courses(&text_field(record, "courses_raw")),
    }
}

/// A course offered in one term, with everyone listed as taking it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SemesterCourse {
    pub course: String,
    pub instructor: String,
    pub students: Vec<String>,
}

/// Courses given in `semester` of `year`, in first-seen order.
pub fn courses_for_semester(people: &PeopleStore, year: i32, semester: Semester) -> Vec<SemesterCourse> {
    let mut courses: Vec<SemesterCourse> = Vec::new();
    for (name, record) in people.records() {
        let Some(record) = record.as_object() else {
            continue;
        };
        for taken in courses_of(record) {
            if taken.year != year || taken.semester != semester {
                continue;
            }
            let instructor = taken.instructor.unwrap_or_default();
            let pos = courses
                .iter()
                .position(|c| c.course == taken.course && c.instructor == instructor);
            let entry = match pos {
                Some(i) => &mut courses[i],
                None => {
                    courses.push(SemesterCourse {
                        course: taken.course,
                        instructor,
                        students: Vec::new(),
                    });
                    let last = courses.len() - 1;
                    &mut courses[last]
                }
            };
            if !entry.students.contains(name) {
                entry.students.push(name.clone());
            }
        }
    }
    courses
}

pub fn print_presence(presence: &Presence, courses: &[SemesterCourse]) {
    println!(
        "{}-{:02} ({} {}): {} people present",
        presence.year,
        presence.month,
        presence.semester.as_str(),
        presence.year,
        presence.total()
    );
    for (label, group) in [
        ("Faculty", &presence.faculty),
        ("Students", &presence.students),
        ("Staff", &presence.staff),
        ("Guests", &presence.guests),
    ] {
        if group.is_empty() {
            continue;
        }
        println!("\n  {label} ({}):", group.len());
        for p in group {
            if p.focus.is_empty() {
                println!("    - {}", p.name);
            } else {
                println!("    - {} ({})", p.name, p.focus);
            }
        }
    }
    if !courses.is_empty() {
        println!("\n  Courses ({}):", courses.len());
        for c in courses {
            let instructor = if c.instructor.is_empty() { "?" } else { c.instructor.as_str() };
            println!("    - {} with {instructor}: {} student(s)", c.course, c.students.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn people(value: Value) -> PeopleStore {
        match value {
            Value::Object(m) => PeopleStore::new(m),
            _ => unreachable!(),
        }
    }

    fn names(group: &[PresentPerson]) -> Vec<&str> {
        group.iter().map(|p| p.name.as_str()).collect()
    }

    // ── semesters ────────────────────────────────────────────────────

    #[test]
    fn test_semester_boundaries() {
        assert_eq!(Semester::from_month(1), Semester::Spring);
        assert_eq!(Semester::from_month(5), Semester::Spring);
        assert_eq!(Semester::from_month(6), Semester::Summer);
        assert_eq!(Semester::from_month(8), Semester::Summer);
        assert_eq!(Semester::from_month(9), Semester::Fall);
        assert_eq!(Semester::from_month(12), Semester::Fall);
    }

    // ── presence ─────────────────────────────────────────────────────

    #[test]
    fn test_present_grouped_by_role() {
        let index = people(json!({
            "Josef Albers": {"role": "Faculty", "start_year": 1933, "end_year": 1949, "focus": "Art"},
            "Ruth Asawa": {"role": "Student", "start_year": "1946", "end_year": 1949},
            "John Cage": {"role": "Summer Faculty", "start_year": 1948, "end_year": 1948},
            "Jack Lewis": {"role": "Staff (farm)", "start_year": 1941, "end_year": 1950},
            "Albert Einstein": {"role": "Guest", "start_year": 1948},
            "Someone": {"role": "Donor", "start_year": 1948, "end_year": 1948}
        }));
        let p = present_at(&index, 1948, 7);
        assert_eq!(p.semester, Semester::Summer);
        assert_eq!(names(&p.faculty), vec!["Josef Albers", "John Cage"]);
        assert_eq!(names(&p.students), vec!["Ruth Asawa"]);
        assert_eq!(names(&p.staff), vec!["Jack Lewis"]);
        assert_eq!(names(&p.guests), vec!["Albert Einstein"]);
        assert_eq!(p.total(), 5);
        assert_eq!(p.faculty[0].focus, "Art");
    }

    #[test]
    fn test_missing_end_year_means_start_year_only() {
        let index = people(json!({
            "Albert Einstein": {"role": "Guest", "start_year": 1948},
            "No Dates": {"role": "Faculty"}
        }));
        assert_eq!(present_at(&index, 1948, 3).guests.len(), 1);
        assert_eq!(present_at(&index, 1949, 3).total(), 0);
        assert_eq!(present_at(&index, 1947, 3).total(), 0);
    }

    #[test]
    fn test_bio_is_shortened() {
        let index = people(json!({
            "Ruth Asawa": {"role": "Student", "start_year": 1946, "end_year": 1949, "bio": "é".repeat(300)}
        }));
        let p = present_at(&index, 1947, 10);
        assert_eq!(p.students[0].bio.chars().count(), 200);
    }

    // ── courses ──────────────────────────────────────────────────────

    #[test]
    fn test_parse_transcript_line() {
        let courses = parse_courses(
            "Fall 1935: Music with Evarts, Drawing with Albers / Spring 1943-44: Weaving",
        );
        assert_eq!(courses.len(), 3);
        assert_eq!(courses[0].course, "Music");
        assert_eq!(courses[0].instructor.as_deref(), Some("Evarts"));
        assert_eq!((courses[0].semester, courses[0].year), (Semester::Fall, 1935));
        assert_eq!(courses[1].instructor.as_deref(), Some("Albers"));
        assert_eq!(courses[2].course, "Weaving");
        assert_eq!(courses[2].instructor, None);
        assert_eq!((courses[2].semester, courses[2].year), (Semester::Spring, 1943));
        assert!(parse_courses("no transcript").is_empty());
    }

    #[test]
    fn test_courses_for_semester_collects_students() {
        let index = people(json!({
            "Ruth Asawa": {"courses_raw": "Fall 1946: Color with Albers, Design with Albers"},
            "Ray Johnson": {"courses_raw": "Fall 1946: Color with Albers / Summer 1948: Dance with Cunningham"},
            "Kenneth Noland": {"courses": [
                {"course": "Color", "teacher": "Albers", "semester": "fall", "year": "1946"},
                {"course": "Painting", "teacher": "Bolotowsky", "semester": "spring", "year": 1947}
            ]}
        }));
        let fall = courses_for_semester(&index, 1946, Semester::Fall);
        assert_eq!(fall.len(), 2);
        assert_eq!(fall[0].course, "Color");
        assert_eq!(fall[0].students, vec!["Ruth Asawa", "Ray Johnson", "Kenneth Noland"]);
        assert_eq!(fall[1].course, "Design");

        let summer = courses_for_semester(&index, 1948, Semester::Summer);
        assert_eq!(summer.len(), 1);
        assert_eq!(summer[0].instructor, "Cunningham");
        assert!(courses_for_semester(&index, 1946, Semester::Spring).is_empty());
    }
}
