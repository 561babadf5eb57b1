//! Keyword classification of headlines into timeline categories.
//!
//! Each category is a list of terms; a text scores one point per distinct
//! term it contains (case-insensitive substring). Exclusion patterns veto a
//! text outright, before any scoring.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Category(String),
    Unclassified,
}

impl Classification {
    pub fn category(&self) -> Option<&str> {
        match self {
            Classification::Category(c) => Some(c),
            Classification::Unclassified => None,
        }
    }
}

// ── Configuration ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTerms {
    pub name: String,
    pub terms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub categories: Vec<CategoryTerms>,
    /// Case-insensitive regexes; any match leaves the text unclassified
    pub exclude: Vec<String>,
    /// Tie-break order, most specific first. Unlisted categories rank last.
    pub priority: Vec<String>,
}

fn terms(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let culture = terms(&[
            // art
            "art", "artist", "painter", "painting", "sculpture", "sculptor", "museum", "gallery",
            "exhibition", "moma", "metropolitan museum", "guggenheim", "whitney",
            // music
            "music", "musician", "composer", "symphony", "orchestra", "opera", "concert", "jazz",
            "singer", "philharmonic", "carnegie hall", "conductor",
            // stage and screen
            "theater", "theatre", "broadway", "play", "playwright", "actor", "actress", "film",
            "movie", "cinema", "hollywood", "director", "premiere", "curtain",
            // dance
            "dance", "dancer", "ballet", "choreograph",
            // letters
            "book", "author", "novelist", "poet", "poetry", "literary", "publisher", "novel",
            "fiction",
            // design
            "architect", "architecture", "bauhaus", "design",
            // education
            "college", "university", "professor", "academic",
        ]);
        let national = terms(&[
            "president", "congress", "senate", "senator", "representative",
            "house of representatives", "white house", "capitol", "washington", "democrat",
            "republican", "election", "vote", "ballot", "supreme court", "justice", "federal",
            "legislation", "bill", "law passed",
            "roosevelt", "truman", "eisenhower", "fdr",
            "economy", "economic", "wall street", "stock", "market", "depression", "new deal",
            "unemployment", "labor", "strike", "union", "wage",
            "new york", "california", "texas", "chicago", "los angeles", "boston",
            "american", "u.s.", "united states", "domestic", "national",
        ]);
        let international = terms(&[
            "germany", "german", "hitler", "nazi", "reich", "berlin", "munich",
            "france", "french", "paris", "vichy",
            "britain", "british", "england", "english", "london", "churchill",
            "italy", "italian", "rome", "mussolini", "fascist",
            "spain", "spanish", "franco", "madrid",
            "russia", "russian", "soviet", "moscow", "stalin", "kremlin",
            "japan", "japanese", "tokyo", "hiroshima", "nagasaki",
            "china", "chinese", "peking", "shanghai", "mao", "chiang",
            "korea", "korean", "pyongyang", "seoul",
            "mexico", "mexican", "cuba", "cuban", "havana",
            "europe", "european", "asia", "asian", "africa", "african",
            "middle east", "palestine", "israel", "arab",
            "united nations", "u.n.", "nato", "treaty",
            "invasion", "allied", "allies", "axis", "troops abroad", "foreign",
            "d-day", "normandy", "dunkirk", "pacific theater",
        ]);
        // sports, obituaries, society pages
        let exclude = terms(&[
            r"\bgiants?\b.*\b(beat|win|lose|game|score)",
            r"\byankees?\b.*\b(beat|win|lose|game|score)",
            r"\bdodgers?\b.*\b(beat|win|lose|game|score)",
            r"\bboxing\b",
            r"\bfight\b.*\bround\b",
            r"\btennis\b",
            r"\bgolf\b",
            r"\bracing\b",
            r"\bhorse\b",
            r"\bdies at\b",
            r"\bfuneral\b",
            r"\bobituary\b",
            r"\bwedding\b",
            r"\bengaged\b",
            r"\bmarried\b",
        ]);

        Self {
            categories: vec![
                CategoryTerms { name: "culture".into(), terms: culture },
                CategoryTerms { name: "national".into(), terms: national },
                CategoryTerms { name: "international".into(), terms: international },
            ],
            exclude,
            priority: terms(&["international", "national", "culture"]),
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.categories.is_empty() {
            return Err("classifier needs at least one category".to_string());
        }
        for p in &self.priority {
            if !self.categories.iter().any(|c| &c.name == p) {
                return Err(format!("priority names unknown category {p:?}"));
            }
        }
        Ok(())
    }
}

// ── Classifier ───────────────────────────────────────────────────────────

struct Category {
    name: String,
    terms: Vec<String>,
    rank: usize,
}

pub struct Classifier {
    categories: Vec<Category>,
    exclude: Vec<Regex>,
}

impl Classifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        let exclude = config
            .exclude
            .iter()
            .map(|p| {
                Regex::new(&format!("(?i){p}")).map_err(|source| ArchiveError::Pattern {
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let categories = config
            .categories
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let mut terms: Vec<String> = c.terms.iter().map(|t| t.to_lowercase()).collect();
                terms.sort();
                terms.dedup();
                let rank = config
                    .priority
                    .iter()
                    .position(|p| p == &c.name)
                    .unwrap_or(config.priority.len() + i);
                Category {
                    name: c.name.clone(),
                    terms,
                    rank,
                }
            })
            .collect();

        Ok(Self {
            categories,
            exclude,
        })
    }

    /// Per-category scores, in configuration order.
    pub fn scores(&self, text: &str, tags: &[String]) -> Vec<(&str, usize)> {
        let haystack = haystack(text, tags);
        self.categories
            .iter()
            .map(|c| {
                let n = c.terms.iter().filter(|t| haystack.contains(t.as_str())).count();
                (c.name.as_str(), n)
            })
            .collect()
    }

    /// Classify a text plus its subject tags.
    ///
    /// Highest score wins; equal scores go to the category listed first in
    /// `priority`.
    pub fn classify(&self, text: &str, tags: &[String]) -> Classification {
        let all = haystack(text, tags);
        if self.exclude.iter().any(|re| re.is_match(&all)) {
            return Classification::Unclassified;
        }

        let best = self
            .categories
            .iter()
            .map(|c| (c, c.terms.iter().filter(|t| all.contains(t.as_str())).count()))
            .filter(|(_, score)| *score > 0)
            .max_by(|(a, sa), (b, sb)| sa.cmp(sb).then(b.rank.cmp(&a.rank)));

        match best {
            Some((c, _)) => Classification::Category(c.name.clone()),
            None => Classification::Unclassified,
        }
    }
}

fn haystack(text: &str, tags: &[String]) -> String {
    let mut all = text.to_lowercase();
    for tag in tags {
        all.push(' ');
        all.push_str(&tag.to_lowercase());
    }
    all
}
