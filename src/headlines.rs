//! Front-page headlines for the college years from the NYT archive API, and
//! their split into culture / national / international timelines.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::thread;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use archive_types::{CategorizedHeadline, Headline};

use crate::classify::{Classification, Classifier};
use crate::error::Result;
use crate::fetch::{Fetch, FetchError, FetchPolicy, get_with_retry, redact};
use crate::store;

pub const SOURCE_LABEL: &str = "NY Times";
const TITLE_LIMIT: usize = 200;
const KEYWORD_LIMIT: usize = 5;
const KEYWORD_KINDS: [&str; 4] = ["subject", "persons", "organizations", "glocations"];
const MAJOR_DESKS: [&str; 6] = [
    "front page",
    "foreign",
    "national",
    "washington",
    "politics",
    "war news",
];
const MAJOR_SECTIONS: [&str; 4] = ["front page", "world", "national", "politics"];
const MAJOR_MATERIAL: [&str; 2] = ["front page", "news"];

// ── Configuration ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadlineConfig {
    pub api_base: String,
    /// First and last archive month, inclusive, as (year, month)
    pub first_month: (i32, u32),
    pub last_month: (i32, u32),
    pub per_day: usize,
    pub output_dir: PathBuf,
}

impl Default for HeadlineConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.nytimes.com/svc/archive/v1".to_string(),
            first_month: (1933, 9),
            last_month: (1957, 10),
            per_day: 3,
            output_dir: PathBuf::from("."),
        }
    }
}

impl HeadlineConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (y, m) in [self.first_month, self.last_month] {
            if !(1..=12).contains(&m) {
                return Err(format!("month {m} of {y} is out of range"));
            }
        }
        if self.first_month > self.last_month {
            return Err("headline window starts after it ends".to_string());
        }
        if self.per_day == 0 {
            return Err("per_day must be at least 1".to_string());
        }
        Ok(())
    }

    /// Every (year, month) in the window, in order.
    pub fn months(&self) -> Vec<(i32, u32)> {
        let mut out = Vec::new();
        let (mut y, mut m) = self.first_month;
        while (y, m) <= self.last_month {
            out.push((y, m));
            m += 1;
            if m > 12 {
                m = 1;
                y += 1;
            }
        }
        out
    }

    pub fn month_url(&self, year: i32, month: u32, api_key: &str) -> String {
        format!(
            "{}/{year}/{month}.json?api-key={api_key}",
            self.api_base.trim_end_matches('/')
        )
    }

    pub fn headlines_path(&self) -> PathBuf {
        let (first, _) = self.first_month;
        let (last, _) = self.last_month;
        self.output_dir.join(format!("nyt_headlines_{first}-{last}.json"))
    }

    pub fn category_path(&self, category: &str) -> PathBuf {
        self.output_dir.join(format!("nyt_{category}.json"))
    }
}

// ── Archive documents ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NytHeadline {
    #[serde(default)]
    pub main: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NytKeyword {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

/// One article from a monthly archive dump. Only the fields we read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NytArticle {
    #[serde(default)]
    pub headline: Option<NytHeadline>,
    /// Sent as a string or a number depending on the decade
    #[serde(default)]
    pub print_page: Option<Value>,
    #[serde(default)]
    pub news_desk: Option<String>,
    #[serde(default)]
    pub section_name: Option<String>,
    #[serde(default)]
    pub type_of_material: Option<String>,
    #[serde(default)]
    pub pub_date: Option<String>,
    #[serde(default)]
    pub keywords: Option<Vec<NytKeyword>>,
    #[serde(default)]
    pub web_url: Option<String>,
}

fn lower(field: &Option<String>) -> String {
    field.as_deref().unwrap_or("").to_lowercase()
}

/// Printed on page one, or filed by a major news desk or section.
pub fn is_front_page(article: &NytArticle) -> bool {
    let page_one = match &article.print_page {
        Some(Value::String(s)) => s.trim() == "1",
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    };
    if page_one {
        return true;
    }
    let desk = lower(&article.news_desk);
    if MAJOR_DESKS.iter().any(|d| desk.contains(d)) {
        return true;
    }
    let section = lower(&article.section_name);
    if MAJOR_SECTIONS.contains(&section.as_str()) {
        return true;
    }
    let material = lower(&article.type_of_material);
    MAJOR_MATERIAL.contains(&material.as_str())
}

/// Headline record for an article, or `None` for blank, very short or
/// short all-caps banner headlines.
pub fn extract_headline(article: &NytArticle) -> Option<Headline> {
    let main = article.headline.as_ref()?.main.as_deref()?.trim();
    let len = main.chars().count();
    if len < 10 {
        return None;
    }
    if main.to_uppercase() == main && len < 30 {
        return None;
    }

    let date: String = article
        .pub_date
        .as_deref()
        .unwrap_or("")
        .chars()
        .take(10)
        .collect();
    let keywords = article
        .keywords
        .iter()
        .flatten()
        .filter(|k| k.name.as_deref().is_some_and(|n| KEYWORD_KINDS.contains(&n)))
        .filter_map(|k| k.value.clone())
        .take(KEYWORD_LIMIT)
        .collect();
    let section = article
        .section_name
        .clone()
        .filter(|s| !s.is_empty())
        .or_else(|| article.news_desk.clone())
        .unwrap_or_default();

    Some(Headline {
        date,
        headline: main.to_string(),
        section,
        keywords,
        url: article.web_url.clone().unwrap_or_default(),
    })
}

/// Keep the first `per_day` headlines of each date, preserving order.
pub fn keep_per_day(headlines: Vec<Headline>, per_day: usize) -> Vec<Headline> {
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    headlines
        .into_iter()
        .filter(|h| {
            let n = seen.entry(h.date.clone()).or_insert(0);
            *n += 1;
            *n <= per_day
        })
        .collect()
}

/// Decode a monthly dump (`{"response": {"docs": [...]}}`). Articles that do
/// not decode are dropped.
pub fn parse_month(body: &str) -> std::result::Result<Vec<NytArticle>, serde_json::Error> {
    let root: Value = serde_json::from_str(body)?;
    let docs = match root.pointer("/response/docs") {
        Some(Value::Array(docs)) => docs.clone(),
        _ => Vec::new(),
    };
    Ok(docs
        .into_iter()
        .filter_map(|d| match serde_json::from_value::<NytArticle>(d) {
            Ok(a) => Some(a),
            Err(e) => {
                debug!(error = %e, "skipping undecodable article");
                None
            }
        })
        .collect())
}

// ── Fetch run ────────────────────────────────────────────────────────────

/// Fetch every month in the window, one request at a time.
///
/// A month that answers with an error status, fails in transport or does not
/// decode is logged and counted as empty. Exhausting the rate-limit retries
/// ends the run.
pub fn fetch_headlines(
    fetcher: &dyn Fetch,
    config: &HeadlineConfig,
    policy: &FetchPolicy,
    api_key: &str,
) -> Result<Vec<Headline>> {
    let months = config.months();
    let mut all = Vec::new();

    for (i, &(year, month)) in months.iter().enumerate() {
        if i > 0 {
            thread::sleep(policy.delay());
        }
        let url = config.month_url(year, month, api_key);
        let articles = match get_with_retry(fetcher, &url, policy.max_retries, policy.backoff()) {
            Ok(body) => parse_month(&body).unwrap_or_else(|e| {
                warn!(url = %redact(&url), error = %e, "undecodable archive month");
                Vec::new()
            }),
            Err(e @ FetchError::RateLimited { .. }) => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, "archive month unavailable");
                Vec::new()
            }
        };

        let front: Vec<Headline> = articles
            .iter()
            .filter(|a| is_front_page(a))
            .filter_map(extract_headline)
            .collect();
        let kept = keep_per_day(front, config.per_day);
        info!(
            month = %format!("{year}-{month:02}"),
            articles = articles.len(),
            kept = kept.len(),
            "fetched"
        );
        all.extend(kept);
    }

    all.sort_by(|a, b| a.date.cmp(&b.date));
    Ok(all)
}

// ── Categorization ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct CategorizedSet {
    pub by_category: BTreeMap<String, Vec<CategorizedHeadline>>,
    pub uncategorized: usize,
}

pub fn categorize(headlines: &[Headline], classifier: &Classifier) -> CategorizedSet {
    let mut set = CategorizedSet::default();
    for h in headlines {
        match classifier.classify(&h.headline, &h.keywords) {
            Classification::Category(name) => {
                set.by_category
                    .entry(name)
                    .or_default()
                    .push(CategorizedHeadline {
                        date: h.date.clone(),
                        title: h.headline.chars().take(TITLE_LIMIT).collect(),
                        source: SOURCE_LABEL.to_string(),
                        url: h.url.clone(),
                    });
            }
            Classification::Unclassified => set.uncategorized += 1,
        }
    }
    set
}

impl CategorizedSet {
    /// One file per category that received headlines.
    pub fn write(&self, config: &HeadlineConfig) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for (name, items) in &self.by_category {
            let path = config.category_path(name);
            store::save_json(&path, items)?;
            written.push(path);
        }
        Ok(written)
    }

    pub fn print_summary(&self) {
        println!("Results:");
        for (name, items) in &self.by_category {
            println!("  {name}: {}", items.len());
        }
        println!("  uncategorized: {}", self.uncategorized);
    }
}

pub fn read_headlines(path: &Path) -> Result<Vec<Headline>> {
    store::read_json(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ClassifierConfig;
    use crate::fetch::Response;
    use serde_json::json;
    use std::cell::RefCell;

    fn article(value: Value) -> NytArticle {
        serde_json::from_value(value).unwrap()
    }

    // ── filtering ────────────────────────────────────────────────────

    #[test]
    fn test_front_page_signals() {
        assert!(is_front_page(&article(json!({"print_page": "1"}))));
        assert!(is_front_page(&article(json!({"print_page": 1}))));
        assert!(is_front_page(&article(json!({"news_desk": "Foreign Desk"}))));
        assert!(is_front_page(&article(json!({"section_name": "World"}))));
        assert!(is_front_page(&article(json!({"type_of_material": "News"}))));
        assert!(!is_front_page(&article(json!({
            "print_page": "14", "section_name": "Sports", "type_of_material": "Review"
        }))));
    }

    #[test]
    fn test_extract_headline() {
        let a = article(json!({
            "headline": {"main": "Hitler Made Chancellor of Germany"},
            "pub_date": "1933-01-31T05:00:00+0000",
            "news_desk": "Foreign",
            "keywords": [
                {"name": "persons", "value": "Hitler, Adolf"},
                {"name": "type_of_material", "value": "News"},
                {"name": "glocations", "value": "Germany"}
            ],
            "web_url": "https://example.org/1933/01/31"
        }));
        let h = extract_headline(&a).unwrap();
        assert_eq!(h.date, "1933-01-31");
        assert_eq!(h.section, "Foreign");
        assert_eq!(h.keywords, vec!["Hitler, Adolf", "Germany"]);
        assert_eq!(h.url, "https://example.org/1933/01/31");
    }

    #[test]
    fn test_short_and_banner_headlines_dropped() {
        assert!(extract_headline(&article(json!({"headline": {"main": "Index"}}))).is_none());
        assert!(extract_headline(&article(json!({"headline": {"main": "LATE CITY EDITION"}}))).is_none());
        assert!(extract_headline(&article(json!({"headline": null}))).is_none());
        assert!(extract_headline(&article(json!({"headline": {"main": "ROOSEVELT WINS"}}))).is_none());
        assert!(
            extract_headline(&article(json!({
                "headline": {"main": "ROOSEVELT WINS IN LANDSLIDE, CARRIES 46 STATES"}
            })))
            .is_some()
        );
    }

    #[test]
    fn test_keep_per_day() {
        let h = |date: &str, n: usize| Headline {
            date: date.to_string(),
            headline: format!("Headline number {n}"),
            section: String::new(),
            keywords: vec![],
            url: String::new(),
        };
        let kept = keep_per_day(
            vec![h("1940-05-10", 1), h("1940-05-10", 2), h("1940-05-11", 3), h("1940-05-10", 4)],
            2,
        );
        let n: Vec<&str> = kept.iter().map(|h| h.headline.as_str()).collect();
        assert_eq!(n, vec!["Headline number 1", "Headline number 2", "Headline number 3"]);
    }

    #[test]
    fn test_month_window() {
        let cfg = HeadlineConfig {
            first_month: (1933, 11),
            last_month: (1934, 2),
            ..HeadlineConfig::default()
        };
        assert_eq!(cfg.months(), vec![(1933, 11), (1933, 12), (1934, 1), (1934, 2)]);
        assert_eq!(HeadlineConfig::default().months().len(), 290);
        assert!(cfg.validate().is_ok());

        let bad = HeadlineConfig {
            last_month: (1934, 13),
            ..HeadlineConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    // ── fetch run ────────────────────────────────────────────────────

    /// Answers by URL substring; anything unknown is a 500.
    struct FakeArchive {
        pages: Vec<(&'static str, std::result::Result<Response, u16>)>,
        calls: RefCell<Vec<String>>,
    }

    impl Fetch for FakeArchive {
        fn get(&self, url: &str) -> std::result::Result<Response, FetchError> {
            self.calls.borrow_mut().push(url.to_string());
            for (needle, reply) in &self.pages {
                if url.contains(needle) {
                    return reply.clone().map_err(|status| FetchError::Status {
                        url: url.to_string(),
                        status,
                    });
                }
            }
            Err(FetchError::Status {
                url: url.to_string(),
                status: 500,
            })
        }
    }

    fn quick_policy() -> FetchPolicy {
        FetchPolicy {
            backoff_secs: 0,
            delay_secs: 0,
            max_retries: 1,
            ..FetchPolicy::default()
        }
    }

    fn month_body(docs: Value) -> Response {
        Response::Body(json!({"response": {"docs": docs}}).to_string())
    }

    #[test]
    fn test_fetch_run_collects_sorted_headlines() {
        let cfg = HeadlineConfig {
            first_month: (1939, 8),
            last_month: (1939, 10),
            ..HeadlineConfig::default()
        };
        let fake = FakeArchive {
            pages: vec![
                (
                    "/1939/9.json",
                    Ok(month_body(json!([
                        {"headline": {"main": "Germany Invades Poland; Britain Mobilizes"},
                         "pub_date": "1939-09-01T05:00:00Z", "print_page": "1"},
                        {"headline": {"main": "Yankees Beat Red Sox in Twelve Innings"},
                         "pub_date": "1939-09-01T05:00:00Z", "section_name": "Sports"}
                    ]))),
                ),
                (
                    "/1939/8.json",
                    Ok(month_body(json!([
                        {"headline": {"main": "Soviet and Reich Sign Nonaggression Pact"},
                         "pub_date": "1939-08-24T05:00:00Z", "news_desk": "Foreign"}
                    ]))),
                ),
            ],
            calls: RefCell::new(Vec::new()),
        };

        let got = fetch_headlines(&fake, &cfg, &quick_policy(), "KEY").unwrap();
        let dates: Vec<&str> = got.iter().map(|h| h.date.as_str()).collect();
        assert_eq!(dates, vec!["1939-08-24", "1939-09-01"]);
        // October answered 500 and counted as empty
        assert_eq!(fake.calls.borrow().len(), 3);
        assert!(fake.calls.borrow()[0].ends_with("/1939/8.json?api-key=KEY"));
    }

    #[test]
    fn test_fetch_run_stops_when_rate_limit_persists() {
        let cfg = HeadlineConfig {
            first_month: (1940, 1),
            last_month: (1940, 3),
            ..HeadlineConfig::default()
        };
        let fake = FakeArchive {
            pages: vec![("/1940/", Ok(Response::RateLimited))],
            calls: RefCell::new(Vec::new()),
        };
        let err = fetch_headlines(&fake, &cfg, &quick_policy(), "KEY").unwrap_err();
        assert!(matches!(
            err,
            crate::error::ArchiveError::Fetch(FetchError::RateLimited { attempts: 2, .. })
        ));
        assert_eq!(fake.calls.borrow().len(), 2);
    }

    // ── categorize ───────────────────────────────────────────────────

    #[test]
    fn test_categorize_and_write() {
        let classifier = Classifier::new(&ClassifierConfig::default()).unwrap();
        let h = |headline: &str, keywords: Vec<&str>| Headline {
            date: "1933-01-30".to_string(),
            headline: headline.to_string(),
            section: String::new(),
            keywords: keywords.into_iter().map(String::from).collect(),
            url: "https://example.org".to_string(),
        };
        let set = categorize(
            &[
                h("Hitler appointed Chancellor of Germany", vec![]),
                h("Banker dies at his home", vec![]),
                h("Yankees beat Tigers, 5 to 3", vec![]),
            ],
            &classifier,
        );
        assert_eq!(set.by_category["international"].len(), 1);
        assert_eq!(set.by_category["international"][0].source, "NY Times");
        assert_eq!(set.uncategorized, 2);

        let dir = tempfile::tempdir().unwrap();
        let cfg = HeadlineConfig {
            output_dir: dir.path().to_path_buf(),
            ..HeadlineConfig::default()
        };
        let written = set.write(&cfg).unwrap();
        assert_eq!(written, vec![dir.path().join("nyt_international.json")]);
        let back: Vec<CategorizedHeadline> = store::read_json(&written[0]).unwrap();
        assert_eq!(back[0].title, "Hitler appointed Chancellor of Germany");
    }
}
