//! Year, category, and entity extraction from a raw query string.

use regex::Regex;
use std::sync::OnceLock;

use crate::query::{ExtractedFilters, YearFilter};

const MIN_YEAR: i32 = 1990;
const MAX_YEAR: i32 = 2030;
const MAX_ENTITIES: usize = 5;

const STOPWORDS: &[&str] = &[
    "The", "A", "An", "I", "My", "What", "When", "Where", "How", "Why", "Did", "Do", "Does",
    "Is", "Are", "Was", "Were", "In", "On", "At", "Tell", "Show",
];

struct CategoryEntry {
    name: &'static str,
    keywords: &'static [&'static str],
}

const CATEGORY_KEYWORDS: &[CategoryEntry] = &[
    CategoryEntry {
        name: "ideas",
        keywords: &[
            "idea", "ideas", "concept", "brainstorm", "thought experiment", "hypothesis",
            "proposal", "theory", "insight", "inspiration", "innovation",
        ],
    },
    CategoryEntry {
        name: "learning",
        keywords: &[
            "learn", "learning", "course", "tutorial", "study", "studied", "lesson",
            "education", "training", "practice", "skill",
        ],
    },
    CategoryEntry {
        name: "personal",
        keywords: &[
            "feel", "feeling", "personal", "life", "family", "relationship", "health",
            "emotion", "diary", "journal", "reflection",
        ],
    },
    CategoryEntry {
        name: "saved",
        keywords: &[
            "saved", "bookmark", "article", "link", "reference", "clipped", "archived",
            "collected", "read later", "snippet", "excerpt",
        ],
    },
];

fn require_year_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            [
                r"(?i)only from (19|20)\d{2}",
                r"(?i)specifically in (19|20)\d{2}",
                r"(?i)exactly in (19|20)\d{2}",
                r"(?i)from (19|20)\d{2} only",
                r"(?i)in (19|20)\d{2} specifically",
            ]
            .iter()
            .map(|p| Regex::new(p).unwrap())
            .collect()
        })
        .as_slice()
}

fn year_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap())
}

fn year_range_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b((?:19|20)\d{2})\s*(?:-|to|through)\s*((?:19|20)\d{2})\b").unwrap())
}

fn extract_year(query: &str) -> Option<YearFilter> {
    if let Some(caps) = year_range_regex().captures(query) {
        let start: i32 = caps[1].parse().ok()?;
        let end: i32 = caps[2].parse().ok()?;
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        let years: Vec<i32> = (start.max(MIN_YEAR)..=end.min(MAX_YEAR)).collect();
        let strict = is_year_required(query);
        return Some(YearFilter { years, strict, is_range: true });
    }

    let mut distinct: Vec<i32> = year_token_regex()
        .find_iter(query)
        .filter_map(|m| m.as_str().parse::<i32>().ok())
        .filter(|&y| (MIN_YEAR..=MAX_YEAR).contains(&y))
        .collect();
    distinct.sort_unstable();
    distinct.dedup();

    if distinct.is_empty() {
        return None;
    }

    let strict = is_year_required(query);

    // More than one distinct year mentioned (e.g. "between 2020 and 2024",
    // with no explicit range connector) is treated as a range over its
    // min/max, same as an explicit "2020-2024" span.
    if distinct.len() > 1 {
        let start = *distinct.first().unwrap();
        let end = *distinct.last().unwrap();
        return Some(YearFilter { years: (start..=end).collect(), strict, is_range: true });
    }

    Some(YearFilter { years: distinct, strict, is_range: false })
}

fn is_year_required(query: &str) -> bool {
    require_year_patterns().iter().any(|re| re.is_match(query))
}

fn extract_category(query: &str) -> Option<String> {
    let lower = query.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .map(|entry| {
            let hits = entry.keywords.iter().filter(|kw| lower.contains(*kw)).count();
            (entry.name, hits)
        })
        .filter(|(_, hits)| *hits > 0)
        .max_by_key(|(_, hits)| *hits)
        .map(|(name, _)| name.to_string())
}

/// Extracts quoted substrings and consecutive-capitalized-token runs as
/// entity candidates, skipping sentence-initial capitals and stopwords.
fn extract_entities(query: &str) -> Vec<String> {
    let mut entities = Vec::new();

    let mut chars = query.char_indices().peekable();
    let mut in_quote = false;
    let mut quote_start = 0usize;
    while let Some((idx, ch)) = chars.next() {
        if ch == '"' {
            if in_quote {
                entities.push(query[quote_start..idx].to_string());
                in_quote = false;
            } else {
                in_quote = true;
                quote_start = idx + 1;
            }
        }
    }

    let words: Vec<&str> = query.split_whitespace().collect();
    let mut i = 0;
    while i < words.len() {
        let word = words[i].trim_matches(|c: char| !c.is_alphanumeric());
        let is_capitalized = word.chars().next().map(|c| c.is_uppercase()).unwrap_or(false);
        let is_sentence_initial = i == 0;
        let is_stopword = STOPWORDS.contains(&word);

        if is_capitalized && !is_sentence_initial && !is_stopword && !word.is_empty() {
            let mut run = vec![word];
            let mut j = i + 1;
            while j < words.len() {
                let next_word = words[j].trim_matches(|c: char| !c.is_alphanumeric());
                let next_cap = next_word.chars().next().map(|c| c.is_uppercase()).unwrap_or(false);
                if next_cap && !STOPWORDS.contains(&next_word) && !next_word.is_empty() {
                    run.push(next_word);
                    j += 1;
                } else {
                    break;
                }
            }
            entities.push(run.join(" "));
            i = j;
        } else {
            i += 1;
        }
    }

    entities.truncate(MAX_ENTITIES);
    entities
}

pub fn extract_filters(query: &str) -> ExtractedFilters {
    ExtractedFilters {
        year: extract_year(query),
        category: extract_category(query),
        entities: extract_entities(query),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_single_year() {
        let filters = extract_year("what did I learn in 2021");
        let filter = filters.unwrap();
        assert_eq!(filter.years, vec![2021]);
        assert!(!filter.strict);
    }

    #[test]
    fn detects_strict_year_phrase() {
        let filters = extract_year("show me notes only from 2020");
        assert!(filters.unwrap().strict);
    }

    #[test]
    fn clamps_years_outside_range() {
        let filters = extract_year("in 1899 and 2021");
        assert_eq!(filters.unwrap().years, vec![2021]);
    }

    #[test]
    fn extracts_year_range() {
        let filters = extract_year("between 2019 and 2021").unwrap();
        assert_eq!(filters.years, vec![2019, 2020, 2021]);
        assert!(filters.is_range);
    }

    #[test]
    fn category_keyword_counting_picks_highest() {
        let category = extract_category("I want to learn about a course and a tutorial I studied");
        assert_eq!(category, Some("learning".to_string()));
    }

    #[test]
    fn entities_skip_sentence_initial_capital() {
        let entities = extract_entities("Tell me about Rust ownership");
        assert_eq!(entities, vec!["Rust".to_string()]);
    }
}
