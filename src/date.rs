//! Date expression parsing.
//!
//! Turns the date strings found across scraped pages, curated tables and
//! book extractions into a comparable bucket key plus an exactness flag.
//!
//! Real data examples:
//!   "1933-09-25"            exact day
//!   "October 16, 1933"      exact day
//!   "March 1935"            month
//!   "fall of 1945"          season
//!   "1933-34"               academic year
//!   "early 1930s"           decade
//!   "c. 1940"               circa

use std::ops::Range;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

// ── Precision ────────────────────────────────────────────────────────────

/// Granularity a parsed expression actually specifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    Day,
    Month,
    Season,
    Year,
    AcademicYear,
    Decade,
    Circa,
    Approximate,
}

impl Precision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Month => "month",
            Self::Season => "season",
            Self::Year => "year",
            Self::AcademicYear => "academic_year",
            Self::Decade => "decade",
            Self::Circa => "circa",
            Self::Approximate => "approximate",
        }
    }

    /// Finer precisions sort first.
    fn rank(&self) -> u8 {
        match self {
            Self::Day => 0,
            Self::Month => 1,
            Self::Season => 2,
            Self::Year | Self::Circa | Self::Approximate => 3,
            Self::AcademicYear => 4,
            Self::Decade => 5,
        }
    }
}

/// Precision declared by the source alongside the date string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum PrecisionHint {
    Day,
    Month,
    Year,
    Approximate,
    AcademicYear,
    Circa,
}

impl PrecisionHint {
    /// Accepts the spellings used by the source collections.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "day" | "exact" => Some(Self::Day),
            "month" => Some(Self::Month),
            "year" => Some(Self::Year),
            "approximate" | "approx" => Some(Self::Approximate),
            "academic_year" | "academic-year" | "range" => Some(Self::AcademicYear),
            "circa" => Some(Self::Circa),
            _ => None,
        }
    }
}

// ── Parse results ────────────────────────────────────────────────────────

/// A date expression resolved to a concrete calendar bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketDate {
    pub key: NaiveDate,
    pub exact: bool,
    pub precision: Precision,
    /// Byte range of the matched expression in the input
    pub span: Range<usize>,
    /// Last year of an academic-year range
    pub end_year: Option<i32>,
}

impl BucketDate {
    /// `YYYY-MM-DD` string used as the grouping key in the stores.
    pub fn bucket_key(&self) -> String {
        self.key.format("%Y-%m-%d").to_string()
    }

    pub fn year(&self) -> i32 {
        self.key.year()
    }
}

/// Outcome of parsing one whole date expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateParse {
    Parsed(BucketDate),
    /// No recognizable date; the caller counts it and moves on.
    Skipped,
}

impl DateParse {
    pub fn parsed(self) -> Option<BucketDate> {
        match self {
            DateParse::Parsed(d) => Some(d),
            DateParse::Skipped => None,
        }
    }
}

// ── Configuration ────────────────────────────────────────────────────────

/// Representative month for each season keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonMonths {
    pub spring: u32,
    pub summer: u32,
    pub fall: u32,
    pub winter: u32,
}

impl Default for SeasonMonths {
    fn default() -> Self {
        Self {
            spring: 3,
            summer: 6,
            fall: 9,
            winter: 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateConfig {
    pub seasons: SeasonMonths,
    /// Month the institutional year begins in
    pub academic_year_start_month: u32,
    /// Events dated outside `earliest_year..=latest_year` are left out
    pub earliest_year: i32,
    pub latest_year: i32,
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            seasons: SeasonMonths::default(),
            academic_year_start_month: 9,
            earliest_year: 1919,
            latest_year: 1960,
        }
    }
}

impl DateConfig {
    pub fn validate(&self) -> Result<(), String> {
        let s = &self.seasons;
        for (name, m) in [
            ("spring", s.spring),
            ("summer", s.summer),
            ("fall", s.fall),
            ("winter", s.winter),
            ("academic_year_start_month", self.academic_year_start_month),
        ] {
            if !(1..=12).contains(&m) {
                return Err(format!("{name} must be a month number 1-12, got {m}"));
            }
        }
        if self.earliest_year > self.latest_year {
            return Err(format!(
                "earliest_year {} is after latest_year {}",
                self.earliest_year, self.latest_year
            ));
        }
        Ok(())
    }
}

// ── Regex patterns ───────────────────────────────────────────────────────
//
// Each rule has an anchored form for whole-expression parsing and a
// word-bounded form for scanning running text. Longer month spellings come
// first so the alternation never stops at a prefix.

const MONTH: &str = r"january|february|march|april|may|june|july|august|september|october|november|december|jan\.?|feb\.?|mar\.?|apr\.?|jun\.?|jul\.?|aug\.?|sept\.?|sep\.?|oct\.?|nov\.?|dec\.?";
const SEASON: &str = r"spring|summer|fall|autumn|winter";

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("date regex")
}

static RE_ISO: LazyLock<Regex> = LazyLock::new(|| re(r"^([0-9]{4})-([0-9]{2})-([0-9]{2})$"));
static RE_MONTH_DAY_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    re(&format!(
        r"(?i)^({MONTH})\s+([0-9]{{1,2}})(?:st|nd|rd|th)?,?\s+([0-9]{{4}})$"
    ))
});
static RE_MONTH_YEAR: LazyLock<Regex> =
    LazyLock::new(|| re(&format!(r"(?i)^({MONTH}),?\s+(?:of\s+)?([0-9]{{4}})$")));
static RE_SEASON: LazyLock<Regex> =
    LazyLock::new(|| re(&format!(r"(?i)^({SEASON})\s*,?\s+(?:of\s+)?([0-9]{{4}})$")));
static RE_YEAR: LazyLock<Regex> = LazyLock::new(|| re(r"^([0-9]{4})$"));
static RE_ACADEMIC: LazyLock<Regex> =
    LazyLock::new(|| re(r"^([0-9]{4})\s*[-–/]\s*([0-9]{4}|[0-9]{2})$"));
static RE_DECADE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)([0-9]{3}0)'?s\b"));
static RE_CIRCA: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)^(?:circa|ca\.?|c\.?)\s*([0-9]{4})$"));
static RE_ANY_YEAR: LazyLock<Regex> = LazyLock::new(|| re(r"([0-9]{4})"));

static SCAN_ISO: LazyLock<Regex> =
    LazyLock::new(|| re(r"\b([0-9]{4})-([0-9]{2})-([0-9]{2})\b"));
static SCAN_MONTH_DAY_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    re(&format!(
        r"(?i)\b({MONTH})\s+([0-9]{{1,2}})(?:st|nd|rd|th)?,?\s+([0-9]{{4}})\b"
    ))
});
static SCAN_MONTH_YEAR: LazyLock<Regex> =
    LazyLock::new(|| re(&format!(r"(?i)\b({MONTH}),?\s+(?:of\s+)?([0-9]{{4}})\b")));
static SCAN_SEASON: LazyLock<Regex> =
    LazyLock::new(|| re(&format!(r"(?i)\b({SEASON})\s*,?\s+(?:of\s+)?([0-9]{{4}})\b")));
static SCAN_ACADEMIC: LazyLock<Regex> =
    LazyLock::new(|| re(r"\b([0-9]{4})\s*[-–/]\s*([0-9]{4}|[0-9]{2})\b"));
static SCAN_DECADE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)\b([0-9]{3}0)'?s\b"));
static SCAN_CIRCA: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\b(?:circa|ca\.|c\.)\s*([0-9]{4})\b"));
static SCAN_YEAR: LazyLock<Regex> = LazyLock::new(|| re(r"\b([0-9]{4})\b"));

// ── Rules ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Iso,
    MonthDayYear,
    MonthYear,
    Season,
    Year,
    AcademicYear,
    Decade,
    Circa,
    AnyYear,
}

/// Whole-expression precedence: the first rule that produces a date wins.
const PARSE_ORDER: [Rule; 9] = [
    Rule::Iso,
    Rule::MonthDayYear,
    Rule::MonthYear,
    Rule::Season,
    Rule::Year,
    Rule::AcademicYear,
    Rule::Decade,
    Rule::Circa,
    Rule::AnyYear,
];

/// Scan order: a bare year must come last or it would claim the start of
/// every range and full date before the specific rules see them.
const SCAN_ORDER: [Rule; 8] = [
    Rule::Iso,
    Rule::MonthDayYear,
    Rule::MonthYear,
    Rule::Season,
    Rule::AcademicYear,
    Rule::Decade,
    Rule::Circa,
    Rule::AnyYear,
];

impl Rule {
    fn precision(&self) -> Precision {
        match self {
            Rule::Iso | Rule::MonthDayYear => Precision::Day,
            Rule::MonthYear => Precision::Month,
            Rule::Season => Precision::Season,
            Rule::Year => Precision::Year,
            Rule::AcademicYear => Precision::AcademicYear,
            Rule::Decade => Precision::Decade,
            Rule::Circa => Precision::Circa,
            Rule::AnyYear => Precision::Approximate,
        }
    }

    fn anchored(&self) -> &'static Regex {
        match self {
            Rule::Iso => &RE_ISO,
            Rule::MonthDayYear => &RE_MONTH_DAY_YEAR,
            Rule::MonthYear => &RE_MONTH_YEAR,
            Rule::Season => &RE_SEASON,
            Rule::Year => &RE_YEAR,
            Rule::AcademicYear => &RE_ACADEMIC,
            Rule::Decade => &RE_DECADE,
            Rule::Circa => &RE_CIRCA,
            Rule::AnyYear => &RE_ANY_YEAR,
        }
    }

    fn scanner(&self) -> &'static Regex {
        match self {
            Rule::Iso => &SCAN_ISO,
            Rule::MonthDayYear => &SCAN_MONTH_DAY_YEAR,
            Rule::MonthYear => &SCAN_MONTH_YEAR,
            Rule::Season => &SCAN_SEASON,
            Rule::AcademicYear => &SCAN_ACADEMIC,
            Rule::Decade => &SCAN_DECADE,
            Rule::Circa => &SCAN_CIRCA,
            Rule::Year | Rule::AnyYear => &SCAN_YEAR,
        }
    }
}

/// Month name or abbreviation → month number.
pub fn month_number(name: &str) -> Option<u32> {
    let lower = name.trim().trim_end_matches('.').to_ascii_lowercase();
    let prefix = lower.get(..3)?;
    let m = match prefix {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(m)
}

/// Expand the end of `1933-34` to `1934`, keeping the start year's century.
/// A range that would run backwards (`1999-00`) rolls into the next century,
/// but only by a single year: `1948-06` is a year and month, not a range.
pub fn expand_end_year(start: i32, end: &str) -> Option<i32> {
    let value: i32 = end.parse().ok()?;
    if end.len() != 2 {
        return (value >= start).then_some(value);
    }
    let full = start - start.rem_euclid(100) + value;
    if full >= start {
        Some(full)
    } else {
        let rolled = full + 100;
        (rolled - start <= 1).then_some(rolled)
    }
}

// ── Parser ───────────────────────────────────────────────────────────────

/// Parser for date expressions, built from an explicit [`DateConfig`].
#[derive(Debug, Clone, Default)]
pub struct DateParser {
    config: DateConfig,
}

impl DateParser {
    pub fn new(config: DateConfig) -> Self {
        Self { config }
    }

    /// Parse one whole date expression, optionally capped by a declared precision.
    pub fn parse(&self, expr: &str, hint: Option<PrecisionHint>) -> DateParse {
        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return DateParse::Skipped;
        }
        let offset = expr.len() - expr.trim_start().len();

        for rule in PARSE_ORDER {
            let Some(caps) = rule.anchored().captures(trimmed) else {
                continue;
            };
            let Some(mut date) = self.build(rule, &caps) else {
                continue;
            };
            let m = caps.get(0).map(|m| m.range()).unwrap_or(0..trimmed.len());
            date.span = (m.start + offset)..(m.end + offset);
            if let Some(h) = hint {
                date = self.apply_hint(date, h);
            }
            return DateParse::Parsed(date);
        }
        DateParse::Skipped
    }

    /// Whether `date` falls in the years the archive covers.
    pub fn in_era(&self, date: &BucketDate) -> bool {
        (self.config.earliest_year..=self.config.latest_year).contains(&date.year())
    }

    /// Parse with a hint given as a source-collection string (`"exact"`, `"range"`, …).
    /// Unknown hint names are ignored.
    pub fn parse_with(&self, expr: &str, hint: Option<&str>) -> DateParse {
        self.parse(expr, hint.and_then(PrecisionHint::from_name))
    }

    /// Find every date mentioned in running text.
    ///
    /// Rules run most-specific first; a match overlapping a span already
    /// claimed by an earlier rule is dropped, so "October 16, 1933" yields one
    /// exact date and not an extra month or year. Results are in text order.
    pub fn scan(&self, text: &str) -> Vec<BucketDate> {
        let mut found: Vec<BucketDate> = Vec::new();

        for rule in SCAN_ORDER {
            for caps in rule.scanner().captures_iter(text) {
                let Some(m) = caps.get(0) else { continue };
                let span = m.range();
                if found.iter().any(|d| overlaps(&d.span, &span)) {
                    continue;
                }
                if let Some(mut date) = self.build(rule, &caps) {
                    date.span = span;
                    found.push(date);
                }
            }
        }

        found.sort_by_key(|d| d.span.start);
        found
    }

    fn build(&self, rule: Rule, caps: &Captures) -> Option<BucketDate> {
        let group = |i: usize| caps.get(i).map(|m| m.as_str());
        let year = |i: usize| group(i).and_then(|s| s.parse::<i32>().ok());

        let (key, end_year) = match rule {
            Rule::Iso => {
                let month = group(2)?.parse().ok()?;
                let day = group(3)?.parse().ok()?;
                (NaiveDate::from_ymd_opt(year(1)?, month, day)?, None)
            }
            Rule::MonthDayYear => {
                let month = month_number(group(1)?)?;
                let day = group(2)?.parse().ok()?;
                (NaiveDate::from_ymd_opt(year(3)?, month, day)?, None)
            }
            Rule::MonthYear => {
                let month = month_number(group(1)?)?;
                (NaiveDate::from_ymd_opt(year(2)?, month, 1)?, None)
            }
            Rule::Season => {
                let month = self.season_month(group(1)?)?;
                (NaiveDate::from_ymd_opt(year(2)?, month, 1)?, None)
            }
            Rule::AcademicYear => {
                let start = year(1)?;
                let end = expand_end_year(start, group(2)?)?;
                let month = self.config.academic_year_start_month;
                (NaiveDate::from_ymd_opt(start, month, 1)?, Some(end))
            }
            Rule::Year | Rule::Decade | Rule::Circa | Rule::AnyYear => {
                (NaiveDate::from_ymd_opt(year(1)?, 1, 1)?, None)
            }
        };

        let precision = rule.precision();
        Some(BucketDate {
            key,
            exact: precision == Precision::Day,
            precision,
            span: 0..0,
            end_year,
        })
    }

    fn season_month(&self, season: &str) -> Option<u32> {
        let s = &self.config.seasons;
        match season.to_ascii_lowercase().as_str() {
            "spring" => Some(s.spring),
            "summer" => Some(s.summer),
            "fall" | "autumn" => Some(s.fall),
            "winter" => Some(s.winter),
            _ => None,
        }
    }

    /// Coarsen a parsed date to the declared precision. A hint never makes a
    /// date finer or exact.
    fn apply_hint(&self, date: BucketDate, hint: PrecisionHint) -> BucketDate {
        let year = date.year();
        let coarsen = |precision: Precision, key: Option<NaiveDate>| BucketDate {
            key: key.unwrap_or(date.key),
            exact: false,
            precision,
            span: date.span.clone(),
            end_year: date.end_year,
        };

        match hint {
            PrecisionHint::Day => date,
            PrecisionHint::Month => {
                if date.precision.rank() < Precision::Month.rank() {
                    coarsen(Precision::Month, date.key.with_day(1))
                } else {
                    date
                }
            }
            PrecisionHint::Year | PrecisionHint::Approximate | PrecisionHint::Circa => {
                if date.precision.rank() < Precision::Year.rank() {
                    let precision = match hint {
                        PrecisionHint::Year => Precision::Year,
                        PrecisionHint::Circa => Precision::Circa,
                        _ => Precision::Approximate,
                    };
                    coarsen(precision, NaiveDate::from_ymd_opt(year, 1, 1))
                } else {
                    date
                }
            }
            PrecisionHint::AcademicYear => {
                if date.precision.rank() >= Precision::AcademicYear.rank() {
                    return date;
                }
                let month = self.config.academic_year_start_month;
                let mut d = coarsen(
                    Precision::AcademicYear,
                    NaiveDate::from_ymd_opt(year, month, 1),
                );
                d.end_year = Some(year + 1);
                d
            }
        }
    }
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> DateParser {
        DateParser::default()
    }

    fn key(expr: &str) -> (String, bool) {
        let d = parser().parse(expr, None).parsed().expect("parsed");
        (d.bucket_key(), d.exact)
    }

    // ── whole-expression precedence ──────────────────────────────────

    #[test]
    fn test_iso_date_is_itself_and_exact() {
        for iso in ["1933-01-05", "1949-06-15", "1957-12-31", "1940-02-29"] {
            assert_eq!(key(iso), (iso.to_string(), true));
        }
    }

    #[test]
    fn test_iso_date_must_exist() {
        // Falls through to the four-digit fallback rather than an exact day
        let d = parser().parse("1933-02-30", None).parsed().unwrap();
        assert_eq!(d.bucket_key(), "1933-01-01");
        assert!(!d.exact);
        assert_eq!(d.precision, Precision::Approximate);
    }

    #[test]
    fn test_month_day_year() {
        assert_eq!(key("October 16, 1933"), ("1933-10-16".into(), true));
        assert_eq!(key("October 16 1933"), ("1933-10-16".into(), true));
        assert_eq!(key("Sept. 25, 1933"), ("1933-09-25".into(), true));
        assert_eq!(key("june 1st, 1948"), ("1948-06-01".into(), true));
    }

    #[test]
    fn test_month_year_is_first_of_month() {
        assert_eq!(key("March 1935"), ("1935-03-01".into(), false));
        assert_eq!(key("Dec 1941"), ("1941-12-01".into(), false));
    }

    #[test]
    fn test_season_mapping() {
        assert_eq!(key("Spring 1935"), ("1935-03-01".into(), false));
        assert_eq!(key("summer 1948"), ("1948-06-01".into(), false));
        assert_eq!(key("fall of 1945"), ("1945-09-01".into(), false));
        assert_eq!(key("Autumn 1945"), ("1945-09-01".into(), false));
        assert_eq!(key("winter 1950"), ("1950-12-01".into(), false));
    }

    #[test]
    fn test_bare_year() {
        let d = parser().parse("1933", None).parsed().unwrap();
        assert_eq!(d.bucket_key(), "1933-01-01");
        assert!(!d.exact);
        assert_eq!(d.precision, Precision::Year);
    }

    #[test]
    fn test_academic_year_starts_in_september() {
        for (expr, end) in [("1933-1934", 1934), ("1946-47", 1947), ("1933–34", 1934)] {
            let d = parser().parse(expr, None).parsed().unwrap();
            assert_eq!(d.bucket_key()[..4], expr[..4]);
            assert_eq!(&d.bucket_key()[4..], "-09-01");
            assert!(!d.exact);
            assert_eq!(d.precision, Precision::AcademicYear);
            assert_eq!(d.end_year, Some(end));
        }
    }

    #[test]
    fn test_two_digit_end_year_reuses_century() {
        assert_eq!(expand_end_year(1933, "34"), Some(1934));
        assert_eq!(expand_end_year(1956, "57"), Some(1957));
        assert_eq!(expand_end_year(1999, "00"), Some(2000));
        assert_eq!(expand_end_year(1940, "1939"), None);
    }

    #[test]
    fn test_year_month_is_not_a_range() {
        assert_eq!(expand_end_year(1948, "06"), None);
        assert_eq!(expand_end_year(1998, "00"), None);

        let d = parser().parse("1948-06", None).parsed().unwrap();
        assert_eq!(d.bucket_key(), "1948-01-01");
        assert_eq!(d.end_year, None);
        assert_ne!(d.precision, Precision::AcademicYear);

        let dates = parser().scan("letter filed 1948-06 in Box 12");
        assert_eq!(dates.len(), 1);
        assert_eq!(dates[0].year(), 1948);
        assert_eq!(dates[0].end_year, None);
    }

    #[test]
    fn test_decade() {
        assert_eq!(key("1930s"), ("1930-01-01".into(), false));
        assert_eq!(key("early 1940s"), ("1940-01-01".into(), false));
        assert_eq!(key("the 1950's"), ("1950-01-01".into(), false));
    }

    #[test]
    fn test_circa() {
        let d = parser().parse("c. 1940", None).parsed().unwrap();
        assert_eq!(d.bucket_key(), "1940-01-01");
        assert_eq!(d.precision, Precision::Circa);
        assert_eq!(
            parser().parse("circa 1938", None).parsed().unwrap().precision,
            Precision::Circa
        );
    }

    #[test]
    fn test_fallback_any_year() {
        let d = parser().parse("Bulletin, vol. 3 (1937)", None).parsed().unwrap();
        assert_eq!(d.bucket_key(), "1937-01-01");
        assert_eq!(d.precision, Precision::Approximate);
    }

    #[test]
    fn test_unparseable_is_skipped() {
        assert_eq!(parser().parse("", None), DateParse::Skipped);
        assert_eq!(parser().parse("   ", None), DateParse::Skipped);
        assert_eq!(parser().parse("undated", None), DateParse::Skipped);
        assert_eq!(parser().parse("n.d.", Some(PrecisionHint::Year)), DateParse::Skipped);
    }

    #[test]
    fn test_span_accounts_for_leading_whitespace() {
        let d = parser().parse("  1933-09-25 ", None).parsed().unwrap();
        assert_eq!(d.span, 2..12);
    }

    // ── hints ────────────────────────────────────────────────────────

    #[test]
    fn test_hint_caps_precision() {
        let p = parser();
        let d = p.parse("October 16, 1933", Some(PrecisionHint::Year)).parsed().unwrap();
        assert_eq!(d.bucket_key(), "1933-01-01");
        assert!(!d.exact);

        let d = p.parse("1933-10-16", Some(PrecisionHint::Month)).parsed().unwrap();
        assert_eq!(d.bucket_key(), "1933-10-01");
        assert_eq!(d.precision, Precision::Month);

        let d = p.parse("1941", Some(PrecisionHint::Circa)).parsed().unwrap();
        assert_eq!(d.precision, Precision::Year);
    }

    #[test]
    fn test_hint_never_refines() {
        let d = parser().parse("March 1935", Some(PrecisionHint::Day)).parsed().unwrap();
        assert_eq!(d.bucket_key(), "1935-03-01");
        assert!(!d.exact);
    }

    #[test]
    fn test_academic_year_hint_on_single_year() {
        let d = parser().parse("1945", Some(PrecisionHint::AcademicYear)).parsed().unwrap();
        assert_eq!(d.bucket_key(), "1945-09-01");
        assert_eq!(d.end_year, Some(1946));
    }

    #[test]
    fn test_academic_year_hint_leaves_decade_alone() {
        let d = parser().parse("1930s", Some(PrecisionHint::AcademicYear)).parsed().unwrap();
        assert_eq!(d.precision, Precision::Decade);
        assert_eq!(d.bucket_key(), "1930-01-01");
        assert_eq!(d.end_year, None);

        let d = parser().parse("c. 1940", Some(PrecisionHint::AcademicYear)).parsed().unwrap();
        assert_eq!(d.precision, Precision::AcademicYear);
        assert_eq!(d.bucket_key(), "1940-09-01");
        assert_eq!(d.end_year, Some(1941));
        assert!(!d.exact);
    }

    #[test]
    fn test_hint_names_from_sources() {
        assert_eq!(PrecisionHint::from_name("exact"), Some(PrecisionHint::Day));
        assert_eq!(PrecisionHint::from_name("range"), Some(PrecisionHint::AcademicYear));
        assert_eq!(PrecisionHint::from_name("Circa"), Some(PrecisionHint::Circa));
        assert_eq!(PrecisionHint::from_name("fortnight"), None);
    }

    #[test]
    fn test_configured_season_months() {
        let config = DateConfig {
            seasons: SeasonMonths {
                summer: 7,
                ..SeasonMonths::default()
            },
            ..DateConfig::default()
        };
        let d = DateParser::new(config).parse("Summer 1952", None).parsed().unwrap();
        assert_eq!(d.bucket_key(), "1952-07-01");
    }

    #[test]
    fn test_config_validation() {
        assert!(DateConfig::default().validate().is_ok());
        let bad = DateConfig {
            academic_year_start_month: 13,
            ..DateConfig::default()
        };
        assert!(bad.validate().is_err());
        let backwards = DateConfig {
            earliest_year: 1960,
            latest_year: 1919,
            ..DateConfig::default()
        };
        assert!(backwards.validate().is_err());
    }

    #[test]
    fn test_era_bounds() {
        let p = parser();
        let inside = |expr: &str| p.in_era(&p.parse(expr, None).parsed().unwrap());
        assert!(inside("1919"));
        assert!(inside("December 31, 1960"));
        assert!(!inside("1918"));
        assert!(!inside("1961-01-01"));
    }

    // ── free-text scan ───────────────────────────────────────────────

    #[test]
    fn test_scan_full_date_not_double_counted() {
        let dates = parser().scan("Albers arrived on November 25, 1933 by train.");
        assert_eq!(dates.len(), 1);
        assert_eq!(dates[0].bucket_key(), "1933-11-25");
        assert!(dates[0].exact);
    }

    #[test]
    fn test_scan_range_claims_its_years() {
        let dates = parser().scan("During 1933-34 the college rented Lee Hall.");
        assert_eq!(dates.len(), 1);
        assert_eq!(dates[0].precision, Precision::AcademicYear);
        assert_eq!(dates[0].bucket_key(), "1933-09-01");
    }

    #[test]
    fn test_scan_mixed_text_in_order() {
        let text = "Founded in 1933, the college moved to Lake Eden in spring of 1941 \
                    and closed in the fall 1956 term; the 1940s were its peak.";
        let keys: Vec<(String, Precision)> = parser()
            .scan(text)
            .iter()
            .map(|d| (d.bucket_key(), d.precision))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("1933-01-01".to_string(), Precision::Approximate),
                ("1941-03-01".to_string(), Precision::Season),
                ("1956-09-01".to_string(), Precision::Season),
                ("1940-01-01".to_string(), Precision::Decade),
            ]
        );
    }

    #[test]
    fn test_scan_iso_inside_text() {
        let dates = parser().scan("Attendance: 1933-09-25 - 1949-06-15");
        let keys: Vec<String> = dates.iter().map(|d| d.bucket_key()).collect();
        assert_eq!(keys, vec!["1933-09-25", "1949-06-15"]);
        assert!(dates.iter().all(|d| d.exact));
    }

    #[test]
    fn test_scan_no_dates() {
        assert!(parser().scan("no dates mentioned here").is_empty());
    }

    #[test]
    fn test_month_number() {
        assert_eq!(month_number("January"), Some(1));
        assert_eq!(month_number("sept."), Some(9));
        assert_eq!(month_number("Dec"), Some(12));
        assert_eq!(month_number("Ma"), None);
        assert_eq!(month_number("Smarch"), None);
    }
}
