use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// ── Lenient scalars ──────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum RawYear {
    Number(i64),
    Text(String),
}

/// A year written as `1946` or `"1946"`. Blank strings read as missing.
fn lenient_year<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i32>, D::Error> {
    match Option::<RawYear>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawYear::Number(n)) => i32::try_from(n).map(Some).map_err(D::Error::custom),
        Some(RawYear::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(RawYear::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("not a year: {s:?}"))),
    }
}

// ── People batches ───────────────────────────────────────────────────────

/// One attendance period for a repeat visitor (e.g. several summer sessions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub start: String,
    pub end: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A freshly observed person record, as produced by scrapers or curated
/// fact tables. Only populated fields take part in a merge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncomingPerson {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_year",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_year: Option<i32>,
    #[serde(
        default,
        deserialize_with = "lenient_year",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    /// Curated tables call this `note`.
    #[serde(default, alias = "note", skip_serializing_if = "Option::is_none")]
    pub date_note: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub periods: Vec<Period>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    /// Anything else the source carried; merged like the named scalars.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A scraped bmcyearbook.org biography page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct YearbookEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub attendance: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub focus: Option<String>,
    #[serde(default)]
    pub relations: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

// ── Event batches ────────────────────────────────────────────────────────

/// A dated occurrence in the archive's own event shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncomingEvent {
    #[serde(default)]
    pub date: String,
    /// Declared precision: day, month, year, approximate, academic_year, circa.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<String>,
    #[serde(default, alias = "event")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Stable external identifier (accession number, object id).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub people: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certainty: Option<u8>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One document page scraped from the Dreier collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DreierDocument {
    #[serde(default)]
    pub object_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub document_type: String,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub extracted_people: Vec<String>,
    /// Set by the scraper when the page could not be fetched.
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DreierCollection {
    #[serde(default)]
    pub documents: Vec<DreierDocument>,
}

/// A date mention as recorded by the book extraction. Only the raw text is
/// trusted; it is re-parsed on ingestion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDate {
    #[serde(default)]
    pub raw: String,
}

/// A dated sentence extracted from Duberman's *Black Mountain* (1972).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DubermanEvent {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub people: Vec<String>,
    #[serde(default)]
    pub dates: Vec<RawDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DubermanExtract {
    #[serde(default)]
    pub events: Vec<DubermanEvent>,
}

// ── Headlines ────────────────────────────────────────────────────────────

/// A front-page headline with its subject tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub date: String,
    pub headline: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub url: String,
}

/// A headline filed under one category, in the site's timeline shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedHeadline {
    pub date: String,
    pub title: String,
    pub source: String,
    pub url: String,
}

// ── Courses ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Course {
    #[serde(default)]
    pub name: String,
    /// One or more instructor names, comma separated.
    #[serde(default)]
    pub instructor: String,
}
