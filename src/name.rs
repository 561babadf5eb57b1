//! Personal-name normalization and same-person matching.
//!
//! Sources spell people differently: "Joseph (\"Joe\") Fiore", "Josef Albers, Jr.",
//! "J. Smith". Normalization strips asides and suffixes so the forms can be
//! compared; matching then accepts surname + compatible first name.

use std::sync::LazyLock;

use regex::Regex;

static RE_PAREN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^)]*\)").unwrap());
static RE_DOUBLE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""[^"]*"|\u{201C}[^\u{201D}]*\u{201D}"#).unwrap());
/// Single quotes only count as a nickname when whitespace-delimited, so
/// "O'Neill" and "D'Amico" survive.
static RE_SINGLE_QUOTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|\s)['\u{2018}][^'\u{2018}\u{2019}]*['\u{2019}](\s|$)").unwrap()
});
/// Requires a comma or whitespace before the suffix; "Dov" keeps its "v".
static RE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:,\s*|\s+)(?:jr\.?|sr\.?|iii|ii|iv|v)\s*$").unwrap()
});
static RE_BARE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:jr\.?|sr\.?|iii|ii|iv|v)$").unwrap());

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical comparison form of a name. Empty input gives an empty string.
///
/// If stripping would erase the whole name (a name that is nothing but a
/// parenthetical or a quoted nickname) the lowercased raw form is kept so
/// the record still has an identity.
pub fn normalize(name: &str) -> String {
    let mut s = RE_DOUBLE_QUOTED.replace_all(name, " ").into_owned();
    s = RE_PAREN.replace_all(&s, " ").into_owned();
    s = RE_SINGLE_QUOTED.replace_all(&s, " ").into_owned();
    s = RE_SUFFIX
        .replace(s.trim().trim_end_matches(','), "")
        .into_owned();

    let cleaned = collapse(&s);
    let cleaned = cleaned.trim_end_matches(',').trim();
    if cleaned.is_empty() {
        return collapse(name).to_lowercase();
    }
    cleaned.to_lowercase()
}

/// Whether two name strings plausibly denote the same person.
///
/// Identical normalized forms match. Otherwise both names need two or more
/// tokens, the same surname and a compatible first token: equal, or one of
/// them an initial ("J.", "M.C.") agreeing with the other's first letter.
/// The initial rule trades precision for recall: "J. Smith" matches both
/// "John Smith" and "Jane Smith", while those two stay distinct.
pub fn names_match(a: &str, b: &str) -> bool {
    let na = normalize(a);
    let nb = normalize(b);
    if na.is_empty() || nb.is_empty() {
        return false;
    }
    if na == nb {
        return true;
    }

    let ta: Vec<&str> = na.split_whitespace().collect();
    let tb: Vec<&str> = nb.split_whitespace().collect();
    if ta.len() < 2 || tb.len() < 2 {
        return false;
    }
    if ta[ta.len() - 1] != tb[tb.len() - 1] {
        return false;
    }
    let (fa, fb) = (ta[0], tb[0]);
    fa == fb || ((is_initial(fa) || is_initial(fb)) && fa.chars().next() == fb.chars().next())
}

/// "j", "j." or "m.c.": every dot-separated piece is a single letter.
fn is_initial(token: &str) -> bool {
    token
        .split('.')
        .filter(|piece| !piece.is_empty())
        .all(|piece| piece.chars().count() == 1)
        && token.chars().any(char::is_alphabetic)
}

/// Normalized surname (last token), or `None` for an empty name.
pub fn last_name(name: &str) -> Option<String> {
    normalize(name)
        .split_whitespace()
        .last()
        .map(|s| s.trim_end_matches(',').to_string())
}

/// Surnames in a comma-separated list of people ("Josef Albers, Anni Albers").
/// A segment that is only a generational suffix belongs to the previous name.
pub fn surnames_in_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|seg| !seg.is_empty() && !RE_BARE_SUFFIX.is_match(seg))
        .filter_map(last_name)
        .collect()
}
