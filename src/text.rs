//! Plain-text cleanup: punctuation normalizing and profanity removal.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;

const BUNDLED_WORDS: &str = include_str!("../data/swear-words.json");

static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").expect("static regex"));

static DEFAULT_FILTER: Lazy<ProfanityFilter> = Lazy::new(|| {
    ProfanityFilter::from_json(BUNDLED_WORDS).unwrap_or_else(|err| {
        tracing::error!("bundled word list is unusable: {err:#}");
        ProfanityFilter::empty()
    })
});

/// Straightens quotes and dashes, blanks out control characters and trims.
///
/// Applying it twice gives the same result as applying it once.
pub fn normalize_text(text: &str) -> String {
    let mapped: String = text
        .chars()
        .map(|ch| match ch {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2014}' | '\u{2E3A}' | '\u{2015}' => '-',
            '\u{00A0}' | '\u{007F}' => ' ',
            '\u{0000}'..='\u{0009}' | '\u{000B}' | '\u{000C}' | '\u{000E}'..='\u{001F}' => ' ',
            other => other,
        })
        .collect();
    mapped.trim().to_string()
}

/// Whole-word, case-insensitive matcher built once from a word list.
#[derive(Clone, Debug)]
pub struct ProfanityFilter {
    pattern: Option<Regex>,
    words: usize,
}

impl ProfanityFilter {
    pub fn empty() -> Self {
        Self {
            pattern: None,
            words: 0,
        }
    }

    pub fn from_words<I, S>(words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let escaped: Vec<String> = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_string())
            .filter(|w| !w.is_empty())
            .map(|w| regex::escape(&w))
            .collect();
        if escaped.is_empty() {
            return Ok(Self::empty());
        }
        let source = format!(r"(?i)\b(?:{})\b", escaped.join("|"));
        let pattern = Regex::new(&source).context("Failed to compile word list pattern")?;
        Ok(Self {
            pattern: Some(pattern),
            words: escaped.len(),
        })
    }

    /// Parses a JSON array of strings.
    pub fn from_json(json: &str) -> Result<Self> {
        let words: Vec<String> =
            serde_json::from_str(json).context("Word list is not a JSON array of strings")?;
        Self::from_words(words)
    }

    pub fn len(&self) -> usize {
        self.words
    }

    pub fn is_empty(&self) -> bool {
        self.words == 0
    }

    /// Drops every listed word, then squeezes runs of spaces down to one.
    pub fn clean(&self, text: &str) -> String {
        let stripped = match &self.pattern {
            Some(pattern) => pattern.replace_all(text, ""),
            None => text.into(),
        };
        MULTI_SPACE.replace_all(&stripped, " ").into_owned()
    }
}

/// The process-wide filter built from the bundled word list.
pub fn default_filter() -> &'static ProfanityFilter {
    &DEFAULT_FILTER
}

pub fn remove_profanity(text: &str) -> String {
    default_filter().clean(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn straightens_quotes_and_dashes() {
        assert_eq!(
            normalize_text("\u{201C}It\u{2019}s fine\u{201D} \u{2014} she said"),
            "\"It's fine\" - she said"
        );
        assert_eq!(normalize_text("a\u{2E3A}b\u{2015}c"), "a-b-c");
    }

    #[test]
    fn blanks_controls_and_trims() {
        assert_eq!(normalize_text("\u{00A0}one\u{0007}two\ttab\u{007F} "), "one two tab");
        assert_eq!(normalize_text("keep\nnewline"), "keep\nnewline");
    }

    #[test]
    fn removes_listed_words_only() {
        let filter = ProfanityFilter::from_words(["badword"]).unwrap();
        assert_eq!(filter.clean("this is a badword here"), "this is a here");
        assert_eq!(filter.clean("BadWord at start"), " at start");
        assert_eq!(filter.clean("notbadwordish stays"), "notbadwordish stays");
    }

    #[test]
    fn keeps_casing_of_other_text() {
        let filter = ProfanityFilter::from_words(["darn"]).unwrap();
        assert_eq!(filter.clean("Well DARN It All"), "Well It All");
    }

    #[test]
    fn escapes_regex_metacharacters() {
        let filter = ProfanityFilter::from_words(["a.b"]).unwrap();
        assert_eq!(filter.clean("axb a.b"), "axb ");
    }

    #[test]
    fn empty_list_only_collapses_spaces() {
        let filter = ProfanityFilter::from_words(Vec::<String>::new()).unwrap();
        assert!(filter.is_empty());
        assert_eq!(filter.clean("a    b"), "a b");
    }

    #[test]
    fn bundled_list_loads() {
        let filter = default_filter();
        assert!(!filter.is_empty());
        assert_eq!(remove_profanity("what the hell is this"), "what the is this");
        assert_eq!(remove_profanity("hello shell"), "hello shell");
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(ProfanityFilter::from_json("{\"not\": \"a list\"}").is_err());
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(s in "\\PC*|[\\x00-\\xA0\\x{2014}\\x{2018}\\x{201D} ]*") {
            let once = normalize_text(&s);
            prop_assert_eq!(normalize_text(&once), once.clone());
        }
    }
}
