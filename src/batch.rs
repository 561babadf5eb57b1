//! Batch adapters: turn each source collection's file layout into records
//! the mergers understand.
//!
//! People batches:
//!   generic   array of person objects, or an object of name → attributes
//!   yearbook  scraped bio pages with a free-text `attendance` string
//!
//! Event batches:
//!   generic   events already in the archive's own shape
//!   dreier    `{documents: [...]}` scraped from the museum's collection pages
//!   duberman  `{events: [...]}` sentences extracted from the 1972 history

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value, json};
use tracing::warn;

use archive_types::{
    DreierCollection, DreierDocument, DubermanEvent, DubermanExtract, IncomingEvent,
    IncomingPerson, YearbookEntry,
};

use crate::date::{BucketDate, DateParse, DateParser};
use crate::error::{ArchiveError, Result};
use crate::merge::PeopleStore;
use crate::report::SkipReason;
use crate::store;

pub const DREIER_CITATION: &str =
    "Theodore Dreier Sr., Black Mountain College Documents Collection, Asheville Art Museum";
pub const DUBERMAN_CITATION: &str =
    "DUBERMAN, Martin. Black Mountain: An Exploration in Community. New York: E.P. Dutton, 1972.";
pub const DEFAULT_GROUP: &str = "bmc_events";

const DREIER_CERTAINTY: u8 = 95;
const DUBERMAN_CERTAINTY: u8 = 90;
const DREIER_DESCRIPTION_LIMIT: usize = 500;
const DUBERMAN_TITLE_LIMIT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PeopleFormat {
    Generic,
    Yearbook,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EventFormat {
    Generic,
    Dreier,
    Duberman,
}

impl EventFormat {
    /// Key of the `metadata.<key>_integration` stamp.
    pub fn integration_key(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Dreier => "dreier",
            Self::Duberman => "duberman",
        }
    }

    pub fn citation(&self) -> Option<&'static str> {
        match self {
            Self::Generic => None,
            Self::Dreier => Some(DREIER_CITATION),
            Self::Duberman => Some(DUBERMAN_CITATION),
        }
    }
}

/// An event ready for the calendar merge.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedEvent {
    pub date: BucketDate,
    pub group: String,
    pub fields: Map<String, Value>,
}

/// Each input item either converts or names why it cannot be merged.
pub type Prepared<T> = std::result::Result<T, SkipReason>;

// ── Small text helpers ───────────────────────────────────────────────────

/// At most `limit` characters, with "..." appended when cut.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn unescape_html(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
}

/// Map names to canonical index keys where they resolve, dropping repeats.
pub fn resolve_people(names: &[String], people: Option<&PeopleStore>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for raw in names {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let name = people
            .and_then(|p| p.resolve(raw))
            .unwrap_or_else(|| raw.to_string());
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

fn put(fields: &mut Map<String, Value>, key: &str, value: impl Into<Value>) {
    fields.insert(key.to_string(), value.into());
}

fn put_opt(fields: &mut Map<String, Value>, key: &str, value: Option<impl Into<Value>>) {
    if let Some(v) = value {
        put(fields, key, v);
    }
}

// ── People ───────────────────────────────────────────────────────────────

pub fn read_people(path: &Path, format: PeopleFormat) -> Result<Vec<Prepared<IncomingPerson>>> {
    let value: Value = store::read_json(path)?;
    match format {
        PeopleFormat::Generic => generic_people(path, value),
        PeopleFormat::Yearbook => {
            let Value::Array(items) = value else {
                return Err(ArchiveError::shape(path, "yearbook batch must be an array"));
            };
            Ok(items
                .into_iter()
                .map(|item| {
                    serde_json::from_value::<YearbookEntry>(item)
                        .map(yearbook_person)
                        .map_err(|e| {
                            warn!(path = %path.display(), error = %e, "unreadable yearbook entry");
                            SkipReason::Malformed
                        })
                })
                .collect())
        }
    }
}

fn person_from(path: &Path, value: Value) -> Prepared<IncomingPerson> {
    serde_json::from_value(value).map_err(|e| {
        warn!(path = %path.display(), error = %e, "unreadable person record");
        SkipReason::Malformed
    })
}

/// Array of person objects, or a fact table keyed by name.
fn generic_people(path: &Path, value: Value) -> Result<Vec<Prepared<IncomingPerson>>> {
    match value {
        Value::Array(items) => Ok(items.into_iter().map(|v| person_from(path, v)).collect()),
        Value::Object(table) => Ok(table
            .into_iter()
            .map(|(name, attrs)| {
                let mut attrs = match attrs {
                    Value::Object(m) => m,
                    _ => return Err(SkipReason::Malformed),
                };
                attrs.insert("name".to_string(), json!(name));
                person_from(path, Value::Object(attrs))
            })
            .collect()),
        _ => Err(ArchiveError::shape(
            path,
            "people batch must be an array or an object keyed by name",
        )),
    }
}

// ── Yearbook attendance ──────────────────────────────────────────────────

/// Attendance interval as written on a yearbook page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attendance {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
}

static RE_DAY_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{4}-[0-9]{2}-[0-9]{2})\s*[-–—]\s*([0-9]{4}-[0-9]{2}-[0-9]{2})").unwrap()
});
static RE_MONTH_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{4})-([0-9]{2})\s*[-–—]\s*([0-9]{4})-([0-9]{2})").unwrap()
});
static RE_YEAR_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{4})\s*[-–—]\s*([0-9]{4})").unwrap());
static RE_ONE_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([0-9]{4})").unwrap());

fn year_of(date: &str) -> Option<i32> {
    date.get(..4)?.parse().ok()
}

/// Parse "1933-09-25 - 1949-06-15", "1948-06 - 1948-09", "1933 - 1949" or
/// "1948". Month ranges end on the 28th, the last day every month has.
pub fn parse_attendance(text: &str) -> Attendance {
    if let Some(c) = RE_DAY_RANGE.captures(text) {
        let (start, end) = (c[1].to_string(), c[2].to_string());
        return Attendance {
            start_year: year_of(&start),
            end_year: year_of(&end),
            start_date: Some(start),
            end_date: Some(end),
        };
    }
    if let Some(c) = RE_MONTH_RANGE.captures(text) {
        return Attendance {
            start_date: Some(format!("{}-{}-01", &c[1], &c[2])),
            end_date: Some(format!("{}-{}-28", &c[3], &c[4])),
            start_year: c[1].parse().ok(),
            end_year: c[3].parse().ok(),
        };
    }
    if let Some(c) = RE_YEAR_RANGE.captures(text) {
        return Attendance {
            start_year: c[1].parse().ok(),
            end_year: c[2].parse().ok(),
            ..Attendance::default()
        };
    }
    if let Some(c) = RE_ONE_YEAR.captures(text) {
        let year = c[1].parse().ok();
        return Attendance {
            start_year: year,
            end_year: year,
            ..Attendance::default()
        };
    }
    Attendance::default()
}

pub fn yearbook_person(entry: YearbookEntry) -> IncomingPerson {
    let attendance = entry
        .attendance
        .as_deref()
        .map(parse_attendance)
        .unwrap_or_default();

    let mut extra = Map::new();
    put_opt(&mut extra, "url", entry.url);
    put_opt(&mut extra, "relations", entry.relations);

    IncomingPerson {
        name: entry.name.unwrap_or_default(),
        role: entry.role,
        focus: entry.focus,
        bio: entry.bio,
        start_year: attendance.start_year,
        end_year: attendance.end_year,
        start_date: attendance.start_date,
        end_date: attendance.end_date,
        extra,
        ..IncomingPerson::default()
    }
}

// ── Events ───────────────────────────────────────────────────────────────

pub fn read_events(
    path: &Path,
    format: EventFormat,
    parser: &DateParser,
    group: &str,
    people: Option<&PeopleStore>,
) -> Result<Vec<Prepared<PreparedEvent>>> {
    match format {
        EventFormat::Generic => {
            let value: Value = store::read_json(path)?;
            let items = match value {
                Value::Array(items) => items,
                Value::Object(mut doc) => match doc.remove("events") {
                    Some(Value::Array(items)) => items,
                    _ => return Err(ArchiveError::shape(path, "expected an array of events")),
                },
                _ => return Err(ArchiveError::shape(path, "expected an array of events")),
            };
            Ok(items
                .into_iter()
                .map(|item| match serde_json::from_value::<IncomingEvent>(item) {
                    Ok(e) => generic_event(e, parser, group, people),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "unreadable event");
                        Err(SkipReason::Malformed)
                    }
                })
                .collect())
        }
        EventFormat::Dreier => {
            let collection: DreierCollection = store::read_json(path)?;
            Ok(collection
                .documents
                .into_iter()
                .map(|doc| dreier_event(doc, parser, people))
                .collect())
        }
        EventFormat::Duberman => {
            let extract: DubermanExtract = store::read_json(path)?;
            Ok(extract
                .events
                .into_iter()
                .map(|e| duberman_event(e, parser, people))
                .collect())
        }
    }
}

/// A parsed date inside the archive era.
fn dated(parser: &DateParser, parse: DateParse) -> Prepared<BucketDate> {
    let date = parse.parsed().ok_or(SkipReason::NoDate)?;
    if parser.in_era(&date) {
        Ok(date)
    } else {
        Err(SkipReason::OutOfEra)
    }
}

// ── Certainty ────────────────────────────────────────────────────────────

const CERTAINTY_CAP: u8 = 95;

/// Certainty for an event that does not declare one. Precision sets the
/// base; oral histories, Duberman page citations and high-confidence
/// extractions raise it, never past 95.
pub fn certainty_for(precision: &str, source: &str, context: &str, confidence: Option<&str>) -> u8 {
    let mut certainty: u8 = match precision {
        "exact" => 95,
        "day" => 90,
        "month" => 75,
        "year" => 60,
        "approximate" => 40,
        _ => 50,
    };
    let boost = |c: u8, by: u8| c.saturating_add(by).min(CERTAINTY_CAP);

    if source.contains("Harris interview") || source.contains("Oral history") {
        certainty = boost(certainty, 10);
    } else if (source.contains("Page") || source.contains("p. "))
        && (source.contains("Duberman") || context.contains("Duberman"))
    {
        certainty = boost(certainty, 5);
    }
    if confidence.is_some_and(|c| c.trim().eq_ignore_ascii_case("high")) {
        certainty = boost(certainty, 10);
    }
    certainty
}

pub fn generic_event(
    e: IncomingEvent,
    parser: &DateParser,
    default_group: &str,
    people: Option<&PeopleStore>,
) -> Prepared<PreparedEvent> {
    if e.title.trim().is_empty() {
        return Err(SkipReason::NoTitle);
    }
    let date = dated(parser, parser.parse_with(&e.date, e.precision.as_deref()))?;

    let mut extra = e.extra;
    let group = match extra.remove("group") {
        Some(Value::String(g)) if !g.trim().is_empty() => g,
        _ => default_group.to_string(),
    };

    let certainty = e.certainty.unwrap_or_else(|| {
        let precision = match e.precision.as_deref().map(str::trim) {
            Some(declared) if !declared.is_empty() => declared.to_ascii_lowercase(),
            _ if date.exact => "exact".to_string(),
            _ => date.precision.as_str().to_string(),
        };
        certainty_for(
            &precision,
            e.source.as_deref().unwrap_or(""),
            extra.get("context").and_then(Value::as_str).unwrap_or(""),
            extra.get("confidence").and_then(Value::as_str),
        )
    });

    let mut fields = Map::new();
    put(&mut fields, "event", e.title);
    put_opt(&mut fields, "category", e.category);
    put_opt(&mut fields, "description", e.description);
    put_opt(&mut fields, "location", e.location);
    put_opt(&mut fields, "source", e.source);
    put_opt(&mut fields, "source_id", e.source_id);
    put_opt(&mut fields, "end_date", e.end_date);
    let people = resolve_people(&e.people, people);
    if !people.is_empty() {
        put(&mut fields, "people", people);
    }
    put(&mut fields, "certainty", certainty);
    put(&mut fields, "date_precision", date.precision.as_str());
    for (k, v) in extra {
        fields.entry(k).or_insert(v);
    }

    Ok(PreparedEvent {
        date,
        group,
        fields,
    })
}

/// Category and optional subcategory for a museum document type.
pub fn dreier_category(document_type: &str) -> (&'static str, Option<&'static str>) {
    match document_type.trim().to_ascii_lowercase().as_str() {
        "catalogue" | "catalog" | "bulletin" => ("administrative", Some("publication")),
        "correspondence" => ("communication", None),
        "photograph" => ("documentation", None),
        "program" => ("performance", None),
        _ => ("administrative", None),
    }
}

pub fn dreier_event(
    doc: DreierDocument,
    parser: &DateParser,
    people: Option<&PeopleStore>,
) -> Prepared<PreparedEvent> {
    if doc.error.is_some() {
        return Err(SkipReason::SourceError);
    }
    let title = unescape_html(doc.title.trim());
    if title.is_empty() {
        return Err(SkipReason::NoTitle);
    }
    let date = dated(parser, parser.parse(&doc.date, None))?;
    let (category, subcategory) = dreier_category(&doc.document_type);

    let mut fields = Map::new();
    put(&mut fields, "event", format!("Document: {title}"));
    put(&mut fields, "category", category);
    put_opt(&mut fields, "subcategory", subcategory);
    put(&mut fields, "certainty", DREIER_CERTAINTY);
    let people = resolve_people(&doc.extracted_people, people);
    if !people.is_empty() {
        put(&mut fields, "people", people);
    }
    put(&mut fields, "source", format!("Dreier Collection, {}", doc.object_id));
    if !doc.object_id.trim().is_empty() {
        put(&mut fields, "source_id", doc.object_id.trim());
    }
    if !doc.source_url.is_empty() {
        put(&mut fields, "source_url", doc.source_url);
    }
    let document_type = if doc.document_type.is_empty() {
        "document".to_string()
    } else {
        doc.document_type
    };
    put(&mut fields, "document_type", document_type);
    let description = unescape_html(doc.description.trim());
    if !description.is_empty() {
        put(
            &mut fields,
            "description",
            truncate_chars(&description, DREIER_DESCRIPTION_LIMIT),
        );
    }
    put(&mut fields, "date_precision", date.precision.as_str());

    Ok(PreparedEvent {
        date,
        group: DEFAULT_GROUP.to_string(),
        fields,
    })
}

/// The first date the extraction recorded, or failing that the first one
/// mentioned in the sentence itself.
fn duberman_date(e: &DubermanEvent, parser: &DateParser) -> Option<BucketDate> {
    if !e.dates.is_empty() {
        return e
            .dates
            .iter()
            .find_map(|d| parser.parse(&d.raw, None).parsed());
    }
    parser.scan(&e.text).into_iter().next()
}

pub fn duberman_event(
    e: DubermanEvent,
    parser: &DateParser,
    people: Option<&PeopleStore>,
) -> Prepared<PreparedEvent> {
    let text = e.text.trim();
    if text.is_empty() {
        return Err(SkipReason::NoTitle);
    }
    let date = duberman_date(&e, parser).ok_or(SkipReason::NoDate)?;
    if !parser.in_era(&date) {
        return Err(SkipReason::OutOfEra);
    }

    let mut fields = Map::new();
    put(&mut fields, "event", truncate_chars(text, DUBERMAN_TITLE_LIMIT));
    put(&mut fields, "full_text", text);
    put(&mut fields, "category", "historical");
    put(&mut fields, "certainty", DUBERMAN_CERTAINTY);
    let people = resolve_people(&e.people, people);
    if !people.is_empty() {
        put(&mut fields, "people", people);
    }
    put(&mut fields, "source", format!("{DUBERMAN_CITATION} p. {}.", e.page));
    put(&mut fields, "source_type", "secondary");
    put(&mut fields, "page", e.page);
    put(&mut fields, "date_precision", date.precision.as_str());

    Ok(PreparedEvent {
        date,
        group: DEFAULT_GROUP.to_string(),
        fields,
    })
}
